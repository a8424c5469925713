//! Scheduling of candidate streams into the final suggestion list.
//!
//! - Weighted draws over plain weight slices (`weighted`)
//! - Per-interpretation pipeline selection (`pipeline_sampler`)
//! - The request scheduler itself (`meta_sampler`)

/// The request scheduler.
///
/// Draws buckets and interpretations by weight, drives pipeline samplers and
/// admits candidates under quotas and the minimum-available obligation.
pub mod meta_sampler;

/// Round-robin and weighted pipeline samplers.
pub mod pipeline_sampler;

/// Weighted random index selection.
mod weighted;
