use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::model::input_name::{InputName, Interpretation};
use crate::pipeline::filter::CandidateFilter;
use crate::pipeline::source::CandidateSource;
use crate::pipeline::stream::{CandidateStream, StreamSpec};
use crate::pipeline::weights::PipelineWeights;

/// One generation strategy plus its filters and weights.
///
/// Pipelines are built once per process and shared read-only by every
/// request. All per-request state lives in the `InputName` cache.
pub struct Pipeline {
	name: String,
	source: Arc<dyn CandidateSource>,
	filters: Arc<Vec<Box<dyn CandidateFilter>>>,
	weights: PipelineWeights,
}

impl Pipeline {
	/// Creates a pipeline.
	///
	/// # Errors
	/// Returns an error if a type weight table has no `"default"` entry.
	pub fn new(
		name: &str,
		source: Arc<dyn CandidateSource>,
		filters: Vec<Box<dyn CandidateFilter>>,
		weights: PipelineWeights,
	) -> Result<Self, ConfigError> {
		weights.validate(name)?;
		Ok(Self { name: name.to_owned(), source, filters: Arc::new(filters), weights })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn weights(&self) -> &PipelineWeights {
		&self.weights
	}

	/// Returns the stream of this pipeline for an interpretation.
	///
	/// # Behavior
	/// - Reduces the interpretation to the source arguments.
	/// - Returns the cached stream of `(pipeline, arguments)` if the request
	///   already has one, so two interpretations with the same arguments share
	///   one cursor.
	/// - Otherwise creates a lazy stream; the source runs on its first pull.
	pub fn apply(&self, interpretation: &Interpretation, input: &InputName) -> CandidateStream {
		let args = self.source.prepare_arguments(interpretation);
		input.stream_or_insert_with(&self.name, &args, || {
			CandidateStream::new(StreamSpec {
				pipeline: self.name.clone(),
				kind: interpretation.kind.clone(),
				lang: interpretation.lang.clone(),
				source: Arc::clone(&self.source),
				filters: Arc::clone(&self.filters),
				args: args.clone(),
				params: input.params().clone(),
				echo: input.normalized().to_owned(),
			})
		})
	}
}

impl fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pipeline")
			.field("name", &self.name)
			.field("source", &self.source.name())
			.field("filters", &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>())
			.field("weights", &self.weights)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::error::{FilterError, SourceError};
	use crate::model::generated_name::GeneratedName;
	use crate::model::request_params::RequestParams;
	use crate::pipeline::filter::DistinctTokensFilter;
	use crate::pipeline::source::{SourceArgs, TokenTuples};

	struct CountingSource {
		calls: Arc<AtomicUsize>,
		items: Vec<Vec<String>>,
		fail_after: Option<usize>,
	}

	impl CandidateSource for CountingSource {
		fn name(&self) -> &str {
			"counting"
		}

		fn prepare_arguments(&self, interpretation: &Interpretation) -> SourceArgs {
			// Only the first token matters to this source.
			SourceArgs::from_tokens(&interpretation.tokenization[..1])
		}

		fn generate(&self, _args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let fail_after = self.fail_after;
			let items = self.items.clone().into_iter().enumerate().map(move |(i, item)| match fail_after {
				Some(limit) if i >= limit => Err(SourceError::new("counting", "backend lost")),
				_ => Ok(item),
			});
			Ok(Box::new(items))
		}
	}

	struct FailingFilter;

	impl CandidateFilter for FailingFilter {
		fn name(&self) -> &str {
			"failing"
		}

		fn apply(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError> {
			if name.rendered() == "boom" {
				return Err(FilterError { filter: "failing".to_owned(), reason: "unexpected".to_owned() });
			}
			Ok(Some(name))
		}
	}

	fn tokens(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	fn ngram_weights() -> PipelineWeights {
		let mut weights = PipelineWeights::default();
		weights.weights.insert("ngram".to_owned(), BTreeMap::from([("default".to_owned(), 1.0)]));
		weights
	}

	fn pipeline(items: &[&[&str]], fail_after: Option<usize>, filters: Vec<Box<dyn CandidateFilter>>) -> (Pipeline, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let source = CountingSource {
			calls: Arc::clone(&calls),
			items: items.iter().map(|item| tokens(item)).collect(),
			fail_after,
		};
		(Pipeline::new("counting", Arc::new(source), filters, ngram_weights()).unwrap(), calls)
	}

	fn drain(stream: &CandidateStream) -> Vec<String> {
		std::iter::from_fn(|| stream.try_next()).map(|n| n.rendered().to_owned()).collect()
	}

	#[test]
	fn source_runs_lazily_and_once() {
		let (pipeline, calls) = pipeline(&[&["a"], &["b"]], None, Vec::new());
		let input = InputName::new("input", RequestParams::default());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["in", "put"]), 1.0);

		let stream = pipeline.apply(&interpretation, &input);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert_eq!(drain(&stream), vec!["a", "b"]);
		let again = pipeline.apply(&interpretation, &input);
		assert!(again.same_stream(&stream));
		assert!(again.try_next().is_none());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn equal_arguments_share_a_stream() {
		let (pipeline, calls) = pipeline(&[&["a"], &["b"], &["c"]], None, Vec::new());
		let input = InputName::new("input", RequestParams::default());
		let first = Interpretation::new("ngram", "en", tokens(&["in", "put"]), 0.5);
		let second = Interpretation::new("ngram", "en", tokens(&["in", "p", "ut"]), 0.5);

		let one = pipeline.apply(&first, &input);
		let two = pipeline.apply(&second, &input);
		assert!(one.same_stream(&two));

		// Exactly-once advancement: pulls are partitioned between the handles.
		assert_eq!(one.try_next().unwrap().rendered(), "a");
		assert_eq!(two.try_next().unwrap().rendered(), "b");
		assert_eq!(one.try_next().unwrap().rendered(), "c");
		assert!(two.try_next().is_none());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(input.cached_streams(), 1);
	}

	#[test]
	fn caches_are_request_scoped() {
		let (pipeline, calls) = pipeline(&[&["a"]], None, Vec::new());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["input"]), 1.0);
		for _ in 0..2 {
			let input = InputName::new("input", RequestParams::default());
			assert_eq!(drain(&pipeline.apply(&interpretation, &input)), vec!["a"]);
		}
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn drops_input_echo_and_tags_results() {
		let (pipeline, _) = pipeline(&[&["in", "put"], &["out", "put"]], None, Vec::new());
		let input = InputName::new("Input", RequestParams::default());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["in", "put"]), 1.0);

		let stream = pipeline.apply(&interpretation, &input);
		let name = stream.try_next().unwrap();
		assert_eq!(name.rendered(), "output");
		assert_eq!(name.source_pipeline(), Some("counting"));
		assert_eq!(name.interpretation(), Some(("ngram", "en")));
		assert!(name.provenance().contains(&vec!["counting".to_owned()]));
		assert!(stream.try_next().is_none());
	}

	#[test]
	fn filters_drop_candidates() {
		let (pipeline, _) = pipeline(&[&["go", "go"], &["go", "on"]], None, vec![Box::new(DistinctTokensFilter)]);
		let input = InputName::new("input", RequestParams::default());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["input"]), 1.0);
		let stream = pipeline.apply(&interpretation, &input);
		let name = stream.try_next().unwrap();
		assert_eq!(name.rendered(), "goon");
		assert!(name.provenance().contains(&vec!["counting".to_owned(), "distinct_tokens".to_owned()]));
	}

	#[test]
	fn filter_error_ends_the_stream() {
		let (pipeline, _) = pipeline(&[&["a"], &["boom"], &["c"]], None, vec![Box::new(FailingFilter)]);
		let input = InputName::new("input", RequestParams::default());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["input"]), 1.0);
		let stream = pipeline.apply(&interpretation, &input);
		assert_eq!(drain(&stream), vec!["a"]);
		assert!(stream.is_exhausted());
	}

	#[test]
	fn source_error_ends_the_stream() {
		let (pipeline, _) = pipeline(&[&["a"], &["b"], &["c"]], Some(2), Vec::new());
		let input = InputName::new("input", RequestParams::default());
		let interpretation = Interpretation::new("ngram", "en", tokens(&["input"]), 1.0);
		let stream = pipeline.apply(&interpretation, &input);
		assert_eq!(drain(&stream), vec!["a", "b"]);
		assert_eq!(stream.pulled(), 2);
	}
}
