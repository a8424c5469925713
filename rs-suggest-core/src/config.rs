use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ConfigError;
use crate::io::read_to_string;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::filter::{AsciiFilter, CandidateFilter, DistinctTokensFilter, MaxLengthFilter};
use crate::pipeline::source::CandidateSource;
use crate::pipeline::strategies::{
	AffixOptions, AffixPosition, AffixSource, HyphenateSource, PermuteSource, StaticSource, SubstituteOptions,
	SubstituteSource,
};
use crate::pipeline::weights::{GlobalLimit, PipelineWeights};

/// Declarative description of one pipeline.
///
/// ```toml
/// [[pipelines]]
/// name = "suffix"
/// strategy = "suffix"
/// filters = ["ascii", "max_length"]
/// options = { affixes = ["app", "hq"] }
/// weights = { ngram = { default = 1.0, en = 2.0 } }
/// mode_multipliers = { instant = 0.5 }
/// global_limits = { full = 0.2, instant = 3 }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct PipelineConfig {
	pub name: String,
	pub strategy: String,
	#[serde(default)]
	pub filters: Vec<String>,
	#[serde(default)]
	pub options: toml::Table,
	#[serde(default)]
	pub weights: BTreeMap<String, BTreeMap<String, f64>>,
	#[serde(default)]
	pub mode_multipliers: BTreeMap<String, f64>,
	#[serde(default)]
	pub global_limits: BTreeMap<String, GlobalLimit>,
}

impl PipelineConfig {
	pub fn pipeline_weights(&self) -> PipelineWeights {
		PipelineWeights {
			weights: self.weights.clone(),
			mode_multipliers: self.mode_multipliers.clone(),
			global_limits: self.global_limits.clone(),
		}
	}
}

/// Ordered list of pipeline descriptions, loaded once per process.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PipelinesConfig {
	#[serde(default)]
	pub pipelines: Vec<PipelineConfig>,
}

impl PipelinesConfig {
	pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(content)?)
	}

	/// Loads a configuration file.
	///
	/// # Errors
	/// Returns an error if the file cannot be read or is not valid TOML.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		let config = Self::from_toml(&read_to_string(&path)?)?;
		info!("loaded {} pipeline definitions from {}", config.pipelines.len(), path.as_ref().display());
		Ok(config)
	}
}

/// Builds a source from the `options` table of a pipeline.
pub type StrategyFactory = Box<dyn Fn(&toml::Table) -> Result<Arc<dyn CandidateSource>, ConfigError> + Send + Sync>;

/// Builds a filter.
pub type FilterFactory = Box<dyn Fn() -> Box<dyn CandidateFilter> + Send + Sync>;

/// Maps strategy and filter ids to their constructors.
///
/// Unknown ids are configuration errors, raised when the pipelines are
/// built, never at request time.
pub struct StrategyRegistry {
	strategies: BTreeMap<String, StrategyFactory>,
	filters: BTreeMap<String, FilterFactory>,
}

impl Default for StrategyRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl StrategyRegistry {
	/// Creates a registry without any entry.
	pub fn empty() -> Self {
		Self { strategies: BTreeMap::new(), filters: BTreeMap::new() }
	}

	/// Creates a registry holding the reference strategies and filters.
	///
	/// Strategies: `static`, `permute`, `prefix`, `suffix`, `hyphenate`, `substitute`.
	/// Filters: `max_length`, `ascii`, `distinct_tokens`.
	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();

		registry.register_strategy("static", |options| {
			Ok(Arc::new(parse_options::<StaticSource>("static", options)?))
		});
		registry.register_strategy("permute", |_| Ok(Arc::new(PermuteSource)));
		registry.register_strategy("hyphenate", |_| Ok(Arc::new(HyphenateSource)));
		registry.register_strategy("prefix", |options| {
			let options: AffixOptions = parse_options("prefix", options)?;
			Ok(Arc::new(AffixSource::new(AffixPosition::Prefix, options.affixes)))
		});
		registry.register_strategy("suffix", |options| {
			let options: AffixOptions = parse_options("suffix", options)?;
			Ok(Arc::new(AffixSource::new(AffixPosition::Suffix, options.affixes)))
		});
		registry.register_strategy("substitute", |options| {
			let options: SubstituteOptions = parse_options("substitute", options)?;
			Ok(Arc::new(SubstituteSource::new(options)))
		});

		registry.register_filter("max_length", || Box::new(MaxLengthFilter::default()));
		registry.register_filter("ascii", || Box::new(AsciiFilter));
		registry.register_filter("distinct_tokens", || Box::new(DistinctTokensFilter));
		registry
	}

	pub fn register_strategy<F>(&mut self, id: &str, factory: F)
	where
		F: Fn(&toml::Table) -> Result<Arc<dyn CandidateSource>, ConfigError> + Send + Sync + 'static,
	{
		self.strategies.insert(id.to_owned(), Box::new(factory));
	}

	pub fn register_filter<F>(&mut self, id: &str, factory: F)
	where
		F: Fn() -> Box<dyn CandidateFilter> + Send + Sync + 'static,
	{
		self.filters.insert(id.to_owned(), Box::new(factory));
	}

	/// Builds one pipeline.
	///
	/// # Errors
	/// - `UnknownStrategy` / `UnknownFilter` for ids missing from the registry
	/// - `InvalidOptions` if the strategy rejects its options
	/// - `MissingDefaultWeight` if a type table has no `"default"` entry
	pub fn build(&self, config: &PipelineConfig) -> Result<Pipeline, ConfigError> {
		let factory = self.strategies.get(&config.strategy).ok_or_else(|| ConfigError::UnknownStrategy {
			pipeline: config.name.clone(),
			strategy: config.strategy.clone(),
		})?;
		let source = factory(&config.options)?;

		let mut filters = Vec::with_capacity(config.filters.len());
		for id in &config.filters {
			let factory = self.filters.get(id).ok_or_else(|| ConfigError::UnknownFilter {
				pipeline: config.name.clone(),
				filter: id.clone(),
			})?;
			filters.push(factory());
		}

		Pipeline::new(&config.name, source, filters, config.pipeline_weights())
	}

	/// Builds every pipeline of a configuration, in order.
	pub fn build_all(&self, config: &PipelinesConfig) -> Result<Vec<Pipeline>, ConfigError> {
		config.pipelines.iter().map(|pipeline| self.build(pipeline)).collect()
	}
}

fn parse_options<T: DeserializeOwned>(strategy: &str, options: &toml::Table) -> Result<T, ConfigError> {
	T::deserialize(toml::Value::Table(options.clone()))
		.map_err(|e| ConfigError::InvalidOptions { strategy: strategy.to_owned(), reason: e.to_string() })
}
