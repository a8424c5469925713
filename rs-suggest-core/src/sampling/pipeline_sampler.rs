use rand::rngs::StdRng;

use crate::model::request_params::SamplerKind;
use crate::pipeline::stream::CandidateStream;
use crate::sampling::weighted::weighted_index;

/// A pipeline applied to one interpretation, with its resolved weight.
pub struct PipelineEntry {
	pub pipeline: String,
	pub weight: f64,
	pub stream: CandidateStream,
}

/// Picks the next pipeline to pull from, inside one interpretation.
///
/// Slots are indices into the entries given at construction and stay valid
/// for the whole run.
pub trait PipelineSampler {
	/// Returns the slot of the next pipeline accepted by `eligible`.
	///
	/// Returns `None` when no remaining pipeline is eligible.
	fn next_pipeline(&mut self, rng: &mut StdRng, eligible: &dyn Fn(&str) -> bool) -> Option<usize>;

	/// Records a successful pull from `slot`.
	fn on_success(&mut self, slot: usize);

	/// Records that the stream of `slot` has ended; the slot is never returned again.
	fn on_exhausted(&mut self, slot: usize);

	fn entry(&self, slot: usize) -> &PipelineEntry;

	/// Number of pipelines that are not used up.
	fn remaining(&self) -> usize;
}

/// Builds the sampler of the requested discipline.
pub fn make_sampler(kind: SamplerKind, entries: Vec<PipelineEntry>) -> Box<dyn PipelineSampler> {
	match kind {
		SamplerKind::RoundRobin => Box::new(RoundRobin::new(entries)),
		SamplerKind::WeightedSampling => Box::new(WeightedSampler::new(entries)),
	}
}

/// Deterministic cyclic interleave over the pipelines.
///
/// # Behavior
/// - Visits the pipelines in construction order, one per call.
/// - Ineligible pipelines are skipped but stay in the cycle.
/// - Used-up pipelines leave the cycle without disturbing its order.
pub struct RoundRobin {
	entries: Vec<PipelineEntry>,
	active: Vec<usize>,
	position: usize,
}

impl RoundRobin {
	pub fn new(entries: Vec<PipelineEntry>) -> Self {
		let active = (0..entries.len()).collect();
		Self { entries, active, position: 0 }
	}
}

impl PipelineSampler for RoundRobin {
	fn next_pipeline(&mut self, _rng: &mut StdRng, eligible: &dyn Fn(&str) -> bool) -> Option<usize> {
		let len = self.active.len();
		for offset in 0..len {
			let index = (self.position + offset) % len;
			let slot = self.active[index];
			if eligible(&self.entries[slot].pipeline) {
				self.position = index + 1;
				return Some(slot);
			}
		}
		None
	}

	fn on_success(&mut self, _slot: usize) {}

	fn on_exhausted(&mut self, slot: usize) {
		if let Some(index) = self.active.iter().position(|&s| s == slot) {
			self.active.remove(index);
			if index < self.position {
				self.position -= 1;
			}
		}
	}

	fn entry(&self, slot: usize) -> &PipelineEntry {
		&self.entries[slot]
	}

	fn remaining(&self) -> usize {
		self.active.len()
	}
}

/// Random draw proportional to the pipeline weights.
///
/// # Behavior
/// - A successful pull halves the weight of the drawn pipeline, so a heavy
///   pipeline is still favored on average without monopolizing the run.
/// - An exhausted pipeline is removed from the draw.
pub struct WeightedSampler {
	entries: Vec<PipelineEntry>,
	weights: Vec<Option<f64>>,
}

impl WeightedSampler {
	pub fn new(entries: Vec<PipelineEntry>) -> Self {
		let weights = entries.iter().map(|e| Some(e.weight)).collect();
		Self { entries, weights }
	}

	/// Current weight of a slot, `None` once removed.
	pub fn weight(&self, slot: usize) -> Option<f64> {
		self.weights.get(slot).copied().flatten()
	}
}

impl PipelineSampler for WeightedSampler {
	fn next_pipeline(&mut self, rng: &mut StdRng, eligible: &dyn Fn(&str) -> bool) -> Option<usize> {
		let (slots, weights): (Vec<usize>, Vec<f64>) = self
			.weights
			.iter()
			.enumerate()
			.filter_map(|(slot, weight)| weight.map(|w| (slot, w)))
			.filter(|(slot, _)| eligible(&self.entries[*slot].pipeline))
			.unzip();
		weighted_index(rng, &weights).map(|index| slots[index])
	}

	fn on_success(&mut self, slot: usize) {
		if let Some(Some(weight)) = self.weights.get_mut(slot) {
			*weight /= 2.0;
		}
	}

	fn on_exhausted(&mut self, slot: usize) {
		if let Some(weight) = self.weights.get_mut(slot) {
			*weight = None;
		}
	}

	fn entry(&self, slot: usize) -> &PipelineEntry {
		&self.entries[slot]
	}

	fn remaining(&self) -> usize {
		self.weights.iter().filter(|w| w.is_some()).count()
	}
}
