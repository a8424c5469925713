use thiserror::Error;

/// Errors raised while building pipelines from their configuration.
///
/// These are fatal at process startup and never happen at request time.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read configuration: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to parse configuration: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("pipeline `{pipeline}` references unknown strategy `{strategy}`")]
	UnknownStrategy { pipeline: String, strategy: String },

	#[error("pipeline `{pipeline}` references unknown filter `{filter}`")]
	UnknownFilter { pipeline: String, filter: String },

	#[error("pipeline `{pipeline}` has no `default` weight for type `{kind}`")]
	MissingDefaultWeight { pipeline: String, kind: String },

	#[error("pipeline `{0}` is declared twice")]
	DuplicatePipeline(String),

	#[error("invalid options for strategy `{strategy}`: {reason}")]
	InvalidOptions { strategy: String, reason: String },
}

/// Unexpected failure inside a candidate source.
///
/// The pipeline degrades to an exhausted stream when it sees one.
#[derive(Debug, Error)]
#[error("source `{source_name}` failed: {reason}")]
pub struct SourceError {
	pub source_name: String,
	pub reason: String,
}

impl SourceError {
	pub fn new(source_name: &str, reason: impl Into<String>) -> Self {
		Self { source_name: source_name.to_owned(), reason: reason.into() }
	}
}

/// Failure inside a post-generation filter.
#[derive(Debug, Error)]
#[error("filter `{filter}` failed: {reason}")]
pub struct FilterError {
	pub filter: String,
	pub reason: String,
}

/// Failure reported by the remote collection search collaborator.
#[derive(Debug, Error)]
pub enum SearchError {
	#[error("search backend unavailable: {0}")]
	Unavailable(String),

	#[error("search timed out")]
	Timeout,
}

/// Errors raised while loading the availability classifier snapshot.
#[derive(Debug, Error)]
pub enum DomainsError {
	#[error("failed to read domains file: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to decode domains cache: {0}")]
	Cache(#[from] postcard::Error),

	#[error("line {line}: unknown status `{status}`")]
	UnknownStatus { line: usize, status: String },

	#[error("line {line}: invalid score `{score}`")]
	InvalidScore { line: usize, score: String },
}
