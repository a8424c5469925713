use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Language key used when a type table has no entry for the requested language.
pub const DEFAULT_LANG: &str = "default";

/// Cap on the number of output candidates of one pipeline.
///
/// Written as an integer (absolute count) or a float (fraction of
/// `min_suggestions`, resolved at scheduling time).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(untagged)]
pub enum GlobalLimit {
	Absolute(usize),
	Fraction(f64),
}

impl GlobalLimit {
	/// Resolves the limit to an absolute count.
	///
	/// Fractions are floored: `0.25` of `10` gives `2`.
	pub fn resolve(&self, min_suggestions: usize) -> usize {
		match self {
			GlobalLimit::Absolute(count) => *count,
			GlobalLimit::Fraction(fraction) => (fraction.max(0.0) * min_suggestions as f64).floor() as usize,
		}
	}
}

/// Weight table of a pipeline.
///
/// # Invariants
/// - every type table contains a `"default"` language entry
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PipelineWeights {
	/// `type -> lang -> weight`
	#[serde(default)]
	pub weights: BTreeMap<String, BTreeMap<String, f64>>,

	/// `mode -> multiplier`. Modes without an entry use `1.0`.
	#[serde(default)]
	pub mode_multipliers: BTreeMap<String, f64>,

	/// `mode -> limit`. Modes without an entry are unlimited.
	#[serde(default)]
	pub global_limits: BTreeMap<String, GlobalLimit>,
}

impl PipelineWeights {
	/// Checks that every type table has a `"default"` fallback.
	///
	/// # Errors
	/// Returns `ConfigError::MissingDefaultWeight` naming the first offending type.
	pub fn validate(&self, pipeline: &str) -> Result<(), ConfigError> {
		for (kind, langs) in &self.weights {
			if !langs.contains_key(DEFAULT_LANG) {
				return Err(ConfigError::MissingDefaultWeight { pipeline: pipeline.to_owned(), kind: kind.clone() });
			}
		}
		Ok(())
	}

	/// Resolves the weight of the pipeline for an interpretation and a mode.
	///
	/// # Returns
	/// - `None` if the pipeline does not apply to the type
	/// - otherwise `weight(type, lang or default) * multiplier(mode)`
	pub fn resolve(&self, kind: &str, lang: &str, mode: &str) -> Option<f64> {
		let langs = self.weights.get(kind)?;
		let weight = langs.get(lang).or_else(|| langs.get(DEFAULT_LANG))?;
		let multiplier = self.mode_multipliers.get(mode).copied().unwrap_or(1.0);
		Some(weight * multiplier)
	}

	/// Resolves the global limit for a mode.
	pub fn global_limit(&self, mode: &str, min_suggestions: usize) -> Option<usize> {
		self.global_limits.get(mode).map(|limit| limit.resolve(min_suggestions))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn weights() -> PipelineWeights {
		let mut weights = PipelineWeights::default();
		weights.weights.insert(
			"ngram".to_owned(),
			BTreeMap::from([("default".to_owned(), 1.0), ("en".to_owned(), 2.0)]),
		);
		weights.mode_multipliers.insert("instant".to_owned(), 0.5);
		weights.global_limits.insert("full".to_owned(), GlobalLimit::Fraction(0.25));
		weights.global_limits.insert("instant".to_owned(), GlobalLimit::Absolute(3));
		weights
	}

	#[test]
	fn resolves_language_then_default() {
		let weights = weights();
		assert_eq!(weights.resolve("ngram", "en", "full"), Some(2.0));
		assert_eq!(weights.resolve("ngram", "de", "full"), Some(1.0));
		assert_eq!(weights.resolve("ngram", "en", "instant"), Some(1.0));
		assert_eq!(weights.resolve("person", "en", "full"), None);
	}

	#[test]
	fn resolves_limits() {
		let weights = weights();
		assert_eq!(weights.global_limit("full", 10), Some(2));
		assert_eq!(weights.global_limit("instant", 10), Some(3));
		assert_eq!(weights.global_limit("domain_detail", 10), None);
	}

	#[test]
	fn missing_default_is_rejected() {
		let mut weights = weights();
		weights.weights.insert("person".to_owned(), BTreeMap::from([("en".to_owned(), 1.0)]));
		assert!(matches!(
			weights.validate("p"),
			Err(ConfigError::MissingDefaultWeight { kind, .. }) if kind == "person"
		));
	}
}
