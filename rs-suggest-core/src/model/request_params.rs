use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Discipline used to pick the next pipeline inside one interpretation.
///
/// # Variants
/// - `RoundRobin`: deterministic cyclic interleave over the pipelines.
/// - `WeightedSampling`: random draw proportional to the resolved weights,
///   with the weight of a drawn pipeline halved after each success.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
	RoundRobin,
	#[default]
	WeightedSampling,
}

impl FromStr for SamplerKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"round_robin" | "round-robin" => Ok(SamplerKind::RoundRobin),
			"weighted_sampling" | "weighted-sampling" | "weighted" => Ok(SamplerKind::WeightedSampling),
			other => Err(format!("Unknown sampler `{}`, expected 'round_robin' or 'weighted_sampling'", other)),
		}
	}
}

impl fmt::Display for SamplerKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SamplerKind::RoundRobin => f.write_str("round_robin"),
			SamplerKind::WeightedSampling => f.write_str("weighted_sampling"),
		}
	}
}

/// Per-request parameters consumed by the scheduler.
///
/// # Responsibilities
/// - Bound the output (`min_suggestions`, `max_suggestions`)
/// - Carry the minimum-available obligation (`min_available_fraction`)
/// - Select the mode used by pipeline multipliers and quotas
/// - Select the sub-scheduler discipline
/// - Optionally fix the random seed and a wall-time deadline
///
/// # Invariants
/// - `min_available_fraction` is always in `[0.0, 1.0]`
#[derive(Clone, Debug)]
pub struct RequestParams {
	/// Number of suggestions the caller would like at least.
	pub min_suggestions: usize,

	/// Hard upper bound on the number of returned suggestions.
	pub max_suggestions: usize,

	/// Fraction of `min_suggestions` that should be available names.
	pub(crate) min_available_fraction: f64,

	/// Request mode (e.g. "full", "instant"), used by multipliers and quotas.
	pub mode: String,

	/// Pipeline selection discipline.
	pub sampler: SamplerKind,

	/// Explicit seed. When `None` the seed is derived from the input.
	pub seed: Option<u64>,

	/// Wall-time budget of the scheduling loop.
	pub deadline: Option<Duration>,
}

impl Default for RequestParams {
	fn default() -> Self {
		Self {
			min_suggestions: 10,
			max_suggestions: 100,
			min_available_fraction: 0.1,
			mode: "full".to_owned(),
			sampler: SamplerKind::default(),
			seed: None,
			deadline: None,
		}
	}
}

impl RequestParams {
	pub fn min_available_fraction(&self) -> f64 {
		self.min_available_fraction
	}

	/// Sets the minimum available fraction (0.0..1.0).
	///
	/// # Errors
	/// Returns an error if the value is outside the valid range.
	pub fn set_min_available_fraction(&mut self, fraction: f64) -> Result<(), String> {
		if !(0.0..=1.0).contains(&fraction) {
			return Err("Minimum available fraction must be between 0.0 and 1.0".to_owned());
		}
		self.min_available_fraction = fraction;
		Ok(())
	}

	/// Number of available names the output must contain when enough exist.
	///
	/// Computed as `ceil(min_suggestions * min_available_fraction)`.
	pub fn min_available_required(&self) -> usize {
		(self.min_suggestions as f64 * self.min_available_fraction).ceil() as usize
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fraction_is_validated() {
		let mut params = RequestParams::default();
		assert!(params.set_min_available_fraction(1.5).is_err());
		assert!(params.set_min_available_fraction(-0.1).is_err());
		assert!(params.set_min_available_fraction(0.25).is_ok());
		assert_eq!(params.min_available_fraction(), 0.25);
	}

	#[test]
	fn required_available_rounds_up() {
		let mut params = RequestParams { min_suggestions: 10, ..Default::default() };
		params.set_min_available_fraction(0.25).unwrap();
		assert_eq!(params.min_available_required(), 3);
		params.set_min_available_fraction(0.0).unwrap();
		assert_eq!(params.min_available_required(), 0);
	}

	#[test]
	fn sampler_kind_parses() {
		assert_eq!("round_robin".parse::<SamplerKind>(), Ok(SamplerKind::RoundRobin));
		assert_eq!("Weighted-Sampling".parse::<SamplerKind>(), Ok(SamplerKind::WeightedSampling));
		assert!("random".parse::<SamplerKind>().is_err());
	}
}
