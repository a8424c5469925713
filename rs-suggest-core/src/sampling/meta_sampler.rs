use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{PipelinesConfig, StrategyRegistry};
use crate::domains::Domains;
use crate::error::ConfigError;
use crate::model::generated_name::{GeneratedName, Status};
use crate::model::input_name::{InputName, TypeLang};
use crate::pipeline::definition::Pipeline;
use crate::pipeline::stream::CandidateStream;
use crate::sampling::pipeline_sampler::{make_sampler, PipelineEntry, PipelineSampler};
use crate::sampling::weighted::weighted_index;

/// The scheduler of a suggestion request.
///
/// Drives every (interpretation, pipeline) stream of a request and merges
/// them into one list of unique, availability-aware, quota-respecting names.
///
/// # Responsibilities
/// - Draw a `(type, lang)` bucket, then an interpretation, by weight
/// - Ask the interpretation's pipeline sampler which pipeline to pull from
/// - Admit or skip pulled candidates (duplicates, input echo, malformed
///   names, minimum-available obligation)
/// - Enforce the per-pipeline global limits
///
/// # Notes
/// - The selection loop is sequential. All mutable state of a run is local
///   to `sample`, so one `MetaSampler` serves concurrent requests.
/// - Every iteration either accepts a name or removes a pipeline,
///   interpretation or bucket, so the loop terminates.
#[derive(Debug)]
pub struct MetaSampler {
	pipelines: Vec<Arc<Pipeline>>,
}

/// Outcome of pulling from one stream.
enum Pull {
	Accepted(GeneratedName),
	Exhausted,
	Deadline,
}

/// Interpretations of one `(type, lang)` bucket: `(sampler index, weight)`.
struct Bucket {
	key: TypeLang,
	weight: f64,
	members: Vec<(usize, f64)>,
}

/// Accepted names and the admission state of one run.
struct Run<'a> {
	input: &'a InputName,
	domains: &'a Domains,
	started: Instant,
	required_available: usize,
	accepted: Vec<GeneratedName>,
	positions: HashMap<String, usize>,
	available: usize,
}

impl MetaSampler {
	/// Creates a scheduler over a set of pipelines.
	///
	/// # Errors
	/// Returns an error if two pipelines share a name.
	pub fn new(pipelines: Vec<Pipeline>) -> Result<Self, ConfigError> {
		let mut seen = BTreeMap::new();
		for pipeline in &pipelines {
			if seen.insert(pipeline.name().to_owned(), ()).is_some() {
				return Err(ConfigError::DuplicatePipeline(pipeline.name().to_owned()));
			}
		}
		Ok(Self { pipelines: pipelines.into_iter().map(Arc::new).collect() })
	}

	/// Builds the pipelines of a configuration and the scheduler over them.
	pub fn from_config(config: &PipelinesConfig, registry: &StrategyRegistry) -> Result<Self, ConfigError> {
		Self::new(registry.build_all(config)?)
	}

	pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
		self.pipelines.iter().map(|p| p.as_ref())
	}

	/// Produces the suggestions of one request.
	///
	/// # Parameters
	/// - `input`: request context, holding the interpretations, parameters and
	///   stream cache.
	/// - `domains`: availability classifier.
	///
	/// # Returns
	/// At most `max_suggestions` names, pairwise distinct, none equal to the
	/// normalized input. A shorter list is a valid outcome.
	///
	/// # Behavior
	/// - The random generator is seeded from the request, so identical
	///   requests give identical results.
	/// - A non-available name is skipped when accepting it could leave fewer
	///   than `ceil(min_suggestions * min_available_fraction)` available names:
	///   `available + remaining_slots <= required`.
	/// - Duplicates are not repeated; their provenance is merged into the
	///   accepted name.
	/// - When the deadline passes, the names accepted so far are returned.
	pub fn sample(&self, input: &InputName, domains: &Domains) -> Vec<GeneratedName> {
		let params = input.params();
		if !domains.is_open() {
			warn!("domains classifier is closed, statuses of `{}` will be unknown", input.normalized());
		}
		let mut rng = StdRng::seed_from_u64(input.seed());

		let mut samplers: Vec<Box<dyn PipelineSampler>> = Vec::new();
		let mut buckets = self.build_buckets(input, &mut samplers);

		let mut limits: HashMap<String, Option<usize>> = self
			.pipelines
			.iter()
			.map(|p| (p.name().to_owned(), p.weights().global_limit(&params.mode, params.min_suggestions)))
			.collect();

		let mut run = Run {
			input,
			domains,
			started: Instant::now(),
			required_available: params.min_available_required(),
			accepted: Vec::new(),
			positions: HashMap::new(),
			available: 0,
		};

		'outer: while run.accepted.len() < params.max_suggestions && !buckets.is_empty() {
			if run.expired() {
				debug!("deadline reached for `{}` with {} suggestions", input.normalized(), run.accepted.len());
				break;
			}

			let bucket_weights: Vec<f64> = buckets.iter().map(|b| b.weight).collect();
			let Some(b) = weighted_index(&mut rng, &bucket_weights) else { break };
			let member_weights: Vec<f64> = buckets[b].members.iter().map(|(_, w)| *w).collect();
			let Some(m) = weighted_index(&mut rng, &member_weights) else { break };
			let sampler = &mut samplers[buckets[b].members[m].0];

			loop {
				let eligible = |name: &str| limits.get(name).copied().flatten() != Some(0);
				let Some(slot) = sampler.next_pipeline(&mut rng, &eligible) else {
					buckets[b].members.remove(m);
					if buckets[b].members.is_empty() {
						debug!("bucket {:?} exhausted", buckets[b].key);
						buckets.remove(b);
					}
					break;
				};

				let stream = sampler.entry(slot).stream.clone();
				match run.pull(&stream) {
					Pull::Accepted(name) => {
						if let Some(Some(limit)) = limits.get_mut(&sampler.entry(slot).pipeline) {
							*limit = limit.saturating_sub(1);
						}
						sampler.on_success(slot);
						run.accept(name);
						break;
					}
					Pull::Exhausted => sampler.on_exhausted(slot),
					Pull::Deadline => {
						debug!("deadline reached for `{}` with {} suggestions", input.normalized(), run.accepted.len());
						break 'outer;
					}
				}
			}
		}

		debug!(
			"sampled {} suggestions for `{}` ({} available, {} streams)",
			run.accepted.len(),
			input.normalized(),
			run.available,
			input.cached_streams()
		);
		run.accepted
	}

	/// Creates one pipeline sampler per interpretation, grouped in buckets.
	///
	/// Buckets with a non-positive weight, interpretations without any
	/// applicable pipeline, and pipelines with a non-positive resolved weight
	/// are left out.
	fn build_buckets(&self, input: &InputName, samplers: &mut Vec<Box<dyn PipelineSampler>>) -> Vec<Bucket> {
		let params = input.params();
		let mut buckets = Vec::new();

		for (key, weight) in input.type_lang_weights() {
			if !(*weight > 0.0) {
				continue;
			}
			let Some(interpretations) = input.interpretations().get(key) else { continue };

			let mut members = Vec::new();
			for interpretation in interpretations {
				let entries: Vec<PipelineEntry> = self
					.pipelines
					.iter()
					.filter_map(|pipeline| {
						let weight = pipeline.weights().resolve(&interpretation.kind, &interpretation.lang, &params.mode)?;
						(weight > 0.0).then(|| PipelineEntry {
							pipeline: pipeline.name().to_owned(),
							weight,
							stream: pipeline.apply(interpretation, input),
						})
					})
					.collect();
				if entries.is_empty() {
					continue;
				}
				samplers.push(make_sampler(params.sampler, entries));
				members.push((samplers.len() - 1, interpretation.in_type_probability));
			}

			if !members.is_empty() {
				buckets.push(Bucket { key: key.clone(), weight: *weight, members });
			}
		}
		buckets
	}
}

impl Run<'_> {
	fn expired(&self) -> bool {
		match self.input.params().deadline {
			Some(deadline) => self.started.elapsed() >= deadline,
			None => false,
		}
	}

	/// Pulls from `stream` until a name is admissible or the stream ends.
	fn pull(&mut self, stream: &CandidateStream) -> Pull {
		let max = self.input.params().max_suggestions;
		loop {
			if self.expired() {
				return Pull::Deadline;
			}
			let Some(mut name) = stream.try_next() else {
				return Pull::Exhausted;
			};

			if let Some(&position) = self.positions.get(name.rendered()) {
				self.accepted[position].merge(&name);
				continue;
			}
			if name.rendered() == self.input.normalized() {
				continue;
			}
			if !is_well_formed(name.rendered()) {
				debug!("skipping malformed candidate `{}` from `{}`", name.rendered(), stream.pipeline());
				continue;
			}

			let status = name.resolve_status(self.domains);
			let remaining = max.saturating_sub(self.accepted.len());
			if status != Status::Available && self.available + remaining <= self.required_available {
				continue;
			}
			return Pull::Accepted(name);
		}
	}

	fn accept(&mut self, name: GeneratedName) {
		if name.status() == Status::Available {
			self.available += 1;
		}
		self.positions.insert(name.rendered().to_owned(), self.accepted.len());
		self.accepted.push(name);
	}
}

/// Final normalization check of a rendered name.
///
/// A well-formed name is non-empty, already lowercase, and holds no
/// whitespace, control character or dot.
pub fn is_well_formed(rendered: &str) -> bool {
	!rendered.is_empty()
		&& rendered.chars().all(|c| !c.is_whitespace() && !c.is_control() && c != '.')
		&& rendered.to_lowercase() == rendered
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;
	use std::time::Duration;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::model::input_name::Interpretation;
	use crate::model::request_params::{RequestParams, SamplerKind};
	use crate::pipeline::strategies::StaticSource;
	use crate::pipeline::weights::{GlobalLimit, PipelineWeights};

	fn tuples(names: &[&str]) -> Vec<Vec<String>> {
		names.iter().map(|n| vec![n.to_string()]).collect()
	}

	fn weights(limit: Option<GlobalLimit>) -> PipelineWeights {
		let mut weights = PipelineWeights::default();
		weights.weights.insert("ngram".to_owned(), BTreeMap::from([("default".to_owned(), 1.0)]));
		if let Some(limit) = limit {
			weights.global_limits.insert("full".to_owned(), limit);
		}
		weights
	}

	fn static_pipeline(name: &str, names: &[&str], limit: Option<GlobalLimit>) -> Pipeline {
		Pipeline::new(name, Arc::new(StaticSource::new(tuples(names))), Vec::new(), weights(limit)).unwrap()
	}

	fn input(params: RequestParams) -> InputName {
		let mut input = InputName::new("input", params);
		input.add_interpretation(Interpretation::new("ngram", "en", vec!["input".to_owned()], 1.0));
		input
	}

	fn rendered(names: &[GeneratedName]) -> Vec<&str> {
		names.iter().map(|n| n.rendered()).collect()
	}

	#[test]
	fn duplicate_pipelines_are_rejected() {
		let result = MetaSampler::new(vec![static_pipeline("a", &[], None), static_pipeline("a", &[], None)]);
		assert!(matches!(result, Err(ConfigError::DuplicatePipeline(name)) if name == "a"));
	}

	#[test]
	fn respects_global_limits() {
		let sampler = MetaSampler::new(vec![
			static_pipeline("limited", &["l1", "l2", "l3", "l4"], Some(GlobalLimit::Absolute(2))),
			static_pipeline("free", &["f1", "f2", "f3"], None),
		])
		.unwrap();
		let params = RequestParams { sampler: SamplerKind::RoundRobin, ..Default::default() };
		let result = sampler.sample(&input(params), &Domains::from_entries(Vec::new()));
		assert_eq!(rendered(&result), vec!["l1", "f1", "l2", "f2", "f3"]);
	}

	#[test]
	fn fractional_limit_resolves_against_min_suggestions() {
		let sampler = MetaSampler::new(vec![static_pipeline(
			"limited",
			&["a", "b", "c", "d", "e"],
			Some(GlobalLimit::Fraction(0.3)),
		)])
		.unwrap();
		let params = RequestParams { min_suggestions: 10, ..Default::default() };
		let result = sampler.sample(&input(params), &Domains::from_entries(Vec::new()));
		assert_eq!(result.len(), 3);
	}

	#[test]
	fn enforces_minimum_available() {
		let domains = Domains::from_entries(
			["t1", "t2", "t3", "t4"].iter().map(|n| (n.to_string(), Status::Taken, 0.5)).collect::<Vec<_>>(),
		);
		let sampler = MetaSampler::new(vec![static_pipeline("p", &["t1", "t2", "t3", "t4", "a1", "a2"], None)]).unwrap();
		let mut params = RequestParams { min_suggestions: 4, max_suggestions: 4, ..Default::default() };
		params.set_min_available_fraction(0.5).unwrap();

		let result = sampler.sample(&input(params), &domains);
		// 2 available are required among 4 slots: only two taken names fit.
		assert_eq!(rendered(&result), vec!["t1", "t2", "a1", "a2"]);
		assert_eq!(result.iter().filter(|n| n.status() == Status::Available).count(), 2);
	}

	#[test]
	fn merges_duplicates_across_pipelines() {
		let sampler = MetaSampler::new(vec![
			static_pipeline("one", &["same", "x"], None),
			static_pipeline("two", &["same", "y"], None),
		])
		.unwrap();
		let params = RequestParams { sampler: SamplerKind::RoundRobin, ..Default::default() };
		let result = sampler.sample(&input(params), &Domains::from_entries(Vec::new()));
		assert_eq!(rendered(&result), vec!["same", "y", "x"]);
		assert_eq!(result[0].source_pipeline(), Some("one"));
	}

	#[test]
	fn skips_malformed_and_echo() {
		let sampler = MetaSampler::new(vec![static_pipeline("p", &["Upper", "has space", "a.b", "", "input", "ok"], None)]).unwrap();
		let result = sampler.sample(&input(RequestParams::default()), &Domains::from_entries(Vec::new()));
		assert_eq!(rendered(&result), vec!["ok"]);
	}

	#[test]
	fn stops_at_max_suggestions() {
		let sampler = MetaSampler::new(vec![static_pipeline("p", &["a", "b", "c", "d"], None)]).unwrap();
		let params = RequestParams { max_suggestions: 2, ..Default::default() };
		let result = sampler.sample(&input(params), &Domains::from_entries(Vec::new()));
		assert_eq!(rendered(&result), vec!["a", "b"]);
	}

	#[test]
	fn expired_deadline_returns_early() {
		let sampler = MetaSampler::new(vec![static_pipeline("p", &["a", "b"], None)]).unwrap();
		let params = RequestParams { deadline: Some(Duration::ZERO), ..Default::default() };
		let result = sampler.sample(&input(params), &Domains::from_entries(Vec::new()));
		assert!(result.is_empty());
	}

	#[test]
	fn inapplicable_types_are_ignored() {
		let sampler = MetaSampler::new(vec![static_pipeline("p", &["a"], None)]).unwrap();
		let mut input = InputName::new("input", RequestParams::default());
		input.add_interpretation(Interpretation::new("person", "en", vec!["input".to_owned()], 1.0));
		assert!(sampler.sample(&input, &Domains::from_entries(Vec::new())).is_empty());
	}

	#[test]
	fn well_formed_names() {
		assert!(is_well_formed("foo-bar"));
		assert!(is_well_formed("🔥fire"));
		assert!(!is_well_formed(""));
		assert!(!is_well_formed("Foo"));
		assert!(!is_well_formed("foo.eth"));
		assert!(!is_well_formed("foo\tbar"));
	}
}
