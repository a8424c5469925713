//! Post-processing of externally ranked result sets.

/// Collection lookup over the remote search collaborator.
///
/// Fans the request out to two searches, merges them and diversifies the result.
pub mod collections;

/// Greedy diversity-constrained top-k selection with backfill.
pub mod diversity;
