//! Candidate generation: sources, filters and memoized pipeline streams.

/// The `Pipeline` type: one source, its filters and its weights.
pub mod definition;

/// Post-generation filters.
pub mod filter;

/// Combination limiter for per-token Cartesian products.
pub mod limiter;

/// The `CandidateSource` strategy interface.
pub mod source;

/// Reference strategies.
pub mod strategies;

/// Lazy, exactly-once candidate streams.
pub mod stream;

/// Weight tables, mode multipliers and global limits.
pub mod weights;
