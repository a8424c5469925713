//! Name suggestion scheduling library.
//!
//! This crate turns many independent candidate-generation strategies into one
//! bounded suggestion list per request:
//! - Pipelines wrapping a strategy into a lazy, memoized candidate stream
//! - A combination limiter keeping per-token Cartesian products tractable
//! - A weighted meta-sampler enforcing quotas, deduplication and a
//!   minimum number of available names
//! - A diversity-constrained top-k selector for ranked result sets
//! - An availability classifier and a collection lookup service

/// Pipeline configuration and the strategy registry.
pub mod config;

/// Availability classifier (registry status and score of names).
pub mod domains;

/// Error types.
pub mod error;

/// Shared data model: names, request context, parameters.
pub mod model;

/// Candidate sources, filters and memoized streams.
pub mod pipeline;

/// Diversity selection and collection lookup.
pub mod ranking;

/// Pipeline samplers and the meta-sampler.
pub mod sampling;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use domains::Domains;
pub use model::generated_name::{GeneratedName, Status};
pub use model::input_name::{InputName, Interpretation};
pub use model::request_params::{RequestParams, SamplerKind};
pub use sampling::meta_sampler::MetaSampler;
