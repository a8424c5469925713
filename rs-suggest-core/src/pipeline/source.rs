use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::input_name::Interpretation;
use crate::model::request_params::RequestParams;

/// Lazy sequence of token tuples produced by a source.
pub type TokenTuples = Box<dyn Iterator<Item = Result<Vec<String>, SourceError>>>;

/// Normalized argument set of a source.
///
/// This is the memoization key of a pipeline: two interpretations reducing
/// to the same arguments share one stream.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceArgs {
	pub tokens: Vec<String>,
	pub lang: Option<String>,
}

impl SourceArgs {
	pub fn from_tokens(tokens: &[String]) -> Self {
		Self { tokens: tokens.to_vec(), lang: None }
	}
}

/// A candidate generation strategy.
///
/// # Contract
/// - `generate` returns a lazy, possibly very large, sequence of token tuples,
///   best-first where ranking is meaningful.
/// - `generate` is called at most once per (pipeline, arguments) per request.
///   The pipeline cache enforces this, not the source.
/// - An `Err` item is unexpected; the pipeline treats it as end of stream.
pub trait CandidateSource: Send + Sync {
	/// Strategy name, used in logs and error reports.
	fn name(&self) -> &str;

	/// Reduces an interpretation to the arguments the source depends on.
	///
	/// Defaults to the tokenization alone.
	fn prepare_arguments(&self, interpretation: &Interpretation) -> SourceArgs {
		SourceArgs::from_tokens(&interpretation.tokenization)
	}

	fn generate(&self, args: &SourceArgs, params: &RequestParams) -> Result<TokenTuples, SourceError>;
}
