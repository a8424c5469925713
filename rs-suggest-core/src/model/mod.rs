//! Shared data model of a suggestion request.
//!
//! - Generated candidates (`GeneratedName`) and their registry `Status`
//! - The request context (`InputName`) with its interpretations and cache
//! - Request parameters (`RequestParams`)

/// Generated candidate names.
///
/// Identity by rendered string, provenance merged as a set.
pub mod generated_name;

/// Request context and interpretations.
///
/// Owns the per-request memoization cache of pipeline streams.
pub mod input_name;

/// Per-request scheduling parameters.
pub mod request_params;
