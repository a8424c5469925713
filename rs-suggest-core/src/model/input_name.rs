use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::model::request_params::RequestParams;
use crate::pipeline::source::SourceArgs;
use crate::pipeline::stream::CandidateStream;

/// Key of an interpretation bucket: `(type, lang)`.
pub type TypeLang = (String, String);

/// One reading of the input.
///
/// Produced by the (external) preprocessing step and read-only afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Interpretation {
	/// Interpretation type, e.g. "ngram" or "person".
	pub kind: String,
	pub lang: String,
	pub tokenization: Vec<String>,
	/// Probability of this tokenization among the interpretations of the same type.
	pub in_type_probability: f64,
	pub features: BTreeMap<String, serde_json::Value>,
}

impl Interpretation {
	pub fn new(kind: &str, lang: &str, tokenization: Vec<String>, in_type_probability: f64) -> Self {
		Self {
			kind: kind.to_owned(),
			lang: lang.to_owned(),
			tokenization,
			in_type_probability: in_type_probability.clamp(0.0, 1.0),
			features: BTreeMap::new(),
		}
	}

	pub fn with_feature(mut self, key: &str, value: serde_json::Value) -> Self {
		self.features.insert(key.to_owned(), value);
		self
	}

	pub fn type_lang(&self) -> TypeLang {
		(self.kind.clone(), self.lang.clone())
	}
}

/// Request context for one suggestion request.
///
/// Holds the input, its interpretations and weights, the request parameters,
/// and the memoization cache of pipeline streams.
///
/// # Notes
/// - The cache lives exactly as long as the `InputName`. It is never shared
///   between requests since the candidates depend on per-request state.
/// - `InputName` is not `Send`: the cached streams are single-owner cursors.
pub struct InputName {
	input_name: String,
	normalized: String,
	params: RequestParams,
	type_lang_weights: BTreeMap<TypeLang, f64>,
	interpretations: BTreeMap<TypeLang, Vec<Interpretation>>,
	cache: RefCell<HashMap<String, HashMap<SourceArgs, CandidateStream>>>,
}

impl InputName {
	/// Creates a request context.
	///
	/// The normalized form is the trimmed, lowercased input.
	pub fn new(input_name: &str, params: RequestParams) -> Self {
		Self {
			input_name: input_name.to_owned(),
			normalized: input_name.trim().to_lowercase(),
			params,
			type_lang_weights: BTreeMap::new(),
			interpretations: BTreeMap::new(),
			cache: RefCell::new(HashMap::new()),
		}
	}

	pub fn input_name(&self) -> &str {
		&self.input_name
	}

	pub fn normalized(&self) -> &str {
		&self.normalized
	}

	pub fn params(&self) -> &RequestParams {
		&self.params
	}

	/// Adds an interpretation to its `(type, lang)` bucket.
	///
	/// A bucket is a set keyed by tokenization: adding a tokenization already
	/// present returns `false` and keeps the existing interpretation. A bucket
	/// without an explicit weight gets weight `1.0`.
	pub fn add_interpretation(&mut self, interpretation: Interpretation) -> bool {
		let key = interpretation.type_lang();
		let bucket = self.interpretations.entry(key.clone()).or_default();
		if bucket.iter().any(|i| i.tokenization == interpretation.tokenization) {
			return false;
		}
		bucket.push(interpretation);
		self.type_lang_weights.entry(key).or_insert(1.0);
		true
	}

	/// Sets the weight of a `(type, lang)` bucket.
	pub fn set_type_lang_weight(&mut self, kind: &str, lang: &str, weight: f64) {
		self.type_lang_weights.insert((kind.to_owned(), lang.to_owned()), weight);
	}

	pub fn type_lang_weights(&self) -> &BTreeMap<TypeLang, f64> {
		&self.type_lang_weights
	}

	pub fn interpretations(&self) -> &BTreeMap<TypeLang, Vec<Interpretation>> {
		&self.interpretations
	}

	/// Seed of the request random generator.
	///
	/// Uses the explicit seed of the parameters, or a hash of the normalized input.
	pub fn seed(&self) -> u64 {
		match self.params.seed {
			Some(seed) => seed,
			None => {
				let mut hasher = DefaultHasher::new();
				self.normalized.hash(&mut hasher);
				hasher.finish()
			}
		}
	}

	/// Returns the cached stream for `(pipeline, args)`, creating it with `create` on a miss.
	pub(crate) fn stream_or_insert_with<F>(&self, pipeline: &str, args: &SourceArgs, create: F) -> CandidateStream
	where
		F: FnOnce() -> CandidateStream,
	{
		let mut cache = self.cache.borrow_mut();
		let streams = cache.entry(pipeline.to_owned()).or_default();
		if let Some(stream) = streams.get(args) {
			return stream.clone();
		}
		let stream = create();
		streams.insert(args.clone(), stream.clone());
		stream
	}

	/// Number of streams held by the memoization cache.
	pub fn cached_streams(&self) -> usize {
		self.cache.borrow().values().map(HashMap::len).sum()
	}
}
