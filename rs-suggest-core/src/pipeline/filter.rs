use crate::error::FilterError;
use crate::model::generated_name::GeneratedName;

/// Longest label accepted by the registry.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Post-generation filter of a pipeline.
///
/// Filters run sequentially on every candidate. `Ok(None)` drops the
/// candidate, `Ok(Some(..))` passes it on (possibly augmented). An `Err`
/// ends the pipeline stream for the current request.
pub trait CandidateFilter: Send + Sync {
	fn name(&self) -> &str;

	fn apply(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError>;
}

/// Drops candidates longer than `max` characters.
#[derive(Debug, Clone)]
pub struct MaxLengthFilter {
	pub max: usize,
}

impl Default for MaxLengthFilter {
	fn default() -> Self {
		Self { max: MAX_LABEL_LENGTH }
	}
}

impl CandidateFilter for MaxLengthFilter {
	fn name(&self) -> &str {
		"max_length"
	}

	fn apply(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError> {
		if name.rendered().chars().count() > self.max {
			return Ok(None);
		}
		Ok(Some(name))
	}
}

/// Keeps candidates made of ASCII alphanumerics and `-` only.
#[derive(Debug, Clone, Default)]
pub struct AsciiFilter;

impl CandidateFilter for AsciiFilter {
	fn name(&self) -> &str {
		"ascii"
	}

	fn apply(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError> {
		let valid = name.rendered().chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
		Ok(valid.then_some(name))
	}
}

/// Drops candidates repeating the same token back-to-back.
#[derive(Debug, Clone, Default)]
pub struct DistinctTokensFilter;

impl CandidateFilter for DistinctTokensFilter {
	fn name(&self) -> &str {
		"distinct_tokens"
	}

	fn apply(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError> {
		let repeated = name.tokens().windows(2).any(|pair| pair[0] == pair[1]);
		Ok((!repeated).then_some(name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn name(parts: &[&str]) -> GeneratedName {
		GeneratedName::new(parts.iter().map(|s| s.to_string()).collect(), vec!["test".to_owned()])
	}

	#[test]
	fn max_length_drops_long_names() {
		let filter = MaxLengthFilter { max: 4 };
		assert!(filter.apply(name(&["ab", "cd"])).unwrap().is_some());
		assert!(filter.apply(name(&["ab", "cde"])).unwrap().is_none());
	}

	#[test]
	fn ascii_keeps_hyphens() {
		assert!(AsciiFilter.apply(name(&["foo", "-", "bar"])).unwrap().is_some());
		assert!(AsciiFilter.apply(name(&["café"])).unwrap().is_none());
		assert!(AsciiFilter.apply(name(&["foo bar"])).unwrap().is_none());
	}

	#[test]
	fn distinct_tokens_drops_stutter() {
		assert!(DistinctTokensFilter.apply(name(&["go", "go"])).unwrap().is_none());
		assert!(DistinctTokensFilter.apply(name(&["go", "to", "go"])).unwrap().is_some());
	}
}
