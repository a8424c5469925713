//! Reference candidate sources.
//!
//! These are deliberately simple strategies (no linguistic resources). They
//! cover the shapes the scheduler has to deal with: a fixed list, a
//! factorial enumeration, affix joins, and a bounded Cartesian product.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::SourceError;
use crate::model::input_name::Interpretation;
use crate::model::request_params::RequestParams;
use crate::pipeline::limiter::limit_combinations;
use crate::pipeline::source::{CandidateSource, SourceArgs, TokenTuples};

/// Emits a fixed list of token tuples, whatever the interpretation.
///
/// All interpretations reduce to the same (empty) arguments, so a request
/// holds a single stream of this source per pipeline.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct StaticSource {
	#[serde(default)]
	pub names: Vec<Vec<String>>,
}

impl StaticSource {
	pub fn new(names: Vec<Vec<String>>) -> Self {
		Self { names }
	}
}

impl CandidateSource for StaticSource {
	fn name(&self) -> &str {
		"static"
	}

	fn prepare_arguments(&self, _interpretation: &Interpretation) -> SourceArgs {
		SourceArgs { tokens: Vec::new(), lang: None }
	}

	fn generate(&self, _args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
		Ok(Box::new(self.names.clone().into_iter().map(Ok)))
	}
}

/// Emits every reordering of the tokens, original order excluded.
#[derive(Debug, Clone, Default)]
pub struct PermuteSource;

impl CandidateSource for PermuteSource {
	fn name(&self) -> &str {
		"permute"
	}

	fn generate(&self, args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
		let mut permutations = Permutations::new(args.tokens.clone());
		// The first permutation is the input itself.
		permutations.next();
		Ok(Box::new(permutations.map(Ok)))
	}
}

/// Lazy lexicographic permutations of token positions.
struct Permutations {
	tokens: Vec<String>,
	indices: Vec<usize>,
	done: bool,
}

impl Permutations {
	fn new(tokens: Vec<String>) -> Self {
		let indices = (0..tokens.len()).collect();
		let done = tokens.is_empty();
		Self { tokens, indices, done }
	}

	/// Advances `indices` to the next permutation, returns `false` after the last one.
	fn step(&mut self) -> bool {
		let n = self.indices.len();
		if n < 2 {
			return false;
		}
		let mut i = n - 1;
		while i > 0 && self.indices[i - 1] >= self.indices[i] {
			i -= 1;
		}
		if i == 0 {
			return false;
		}
		let mut j = n - 1;
		while self.indices[j] <= self.indices[i - 1] {
			j -= 1;
		}
		self.indices.swap(i - 1, j);
		self.indices[i..].reverse();
		true
	}
}

impl Iterator for Permutations {
	type Item = Vec<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		let current = self.indices.iter().map(|&i| self.tokens[i].clone()).collect();
		self.done = !self.step();
		Some(current)
	}
}

/// Where an affix goes.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AffixPosition {
	Prefix,
	Suffix,
}

/// Joins each configured affix before or after the tokens.
#[derive(Debug, Clone)]
pub struct AffixSource {
	position: AffixPosition,
	affixes: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AffixOptions {
	#[serde(default)]
	pub affixes: Vec<String>,
}

impl AffixSource {
	pub fn new(position: AffixPosition, affixes: Vec<String>) -> Self {
		Self { position, affixes }
	}
}

impl CandidateSource for AffixSource {
	fn name(&self) -> &str {
		match self.position {
			AffixPosition::Prefix => "prefix",
			AffixPosition::Suffix => "suffix",
		}
	}

	fn generate(&self, args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
		let tokens = args.tokens.clone();
		let position = self.position;
		let tuples = self.affixes.clone().into_iter().map(move |affix| {
			let mut tuple = Vec::with_capacity(tokens.len() + 1);
			match position {
				AffixPosition::Prefix => {
					tuple.push(affix);
					tuple.extend(tokens.iter().cloned());
				}
				AffixPosition::Suffix => {
					tuple.extend(tokens.iter().cloned());
					tuple.push(affix);
				}
			}
			Ok(tuple)
		});
		Ok(Box::new(tuples))
	}
}

/// Joins multi-token interpretations with hyphens.
#[derive(Debug, Clone, Default)]
pub struct HyphenateSource;

impl CandidateSource for HyphenateSource {
	fn name(&self) -> &str {
		"hyphenate"
	}

	fn generate(&self, args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
		if args.tokens.len() < 2 {
			return Ok(Box::new(std::iter::empty()));
		}
		let mut tuple = Vec::with_capacity(args.tokens.len() * 2 - 1);
		for (i, token) in args.tokens.iter().enumerate() {
			if i > 0 {
				tuple.push("-".to_owned());
			}
			tuple.push(token.clone());
		}
		Ok(Box::new(std::iter::once(Ok(tuple))))
	}
}

#[derive(Deserialize, Debug)]
pub struct SubstituteOptions {
	/// `token -> alternatives`, best first.
	#[serde(default)]
	pub table: HashMap<String, Vec<String>>,

	/// Per-language tables, taking precedence over `table` for their language.
	#[serde(default)]
	pub by_lang: HashMap<String, HashMap<String, Vec<String>>>,

	/// Budget of the Cartesian product.
	#[serde(default = "default_max_combinations")]
	pub max_combinations: usize,
}

impl Default for SubstituteOptions {
	fn default() -> Self {
		Self { table: HashMap::new(), by_lang: HashMap::new(), max_combinations: default_max_combinations() }
	}
}

fn default_max_combinations() -> usize {
	1000
}

/// Replaces tokens by their alternatives.
///
/// Each token gets the list `[token, alternatives...]`. The list sizes are
/// bounded by the combination limiter, then the product is enumerated lazily
/// in odometer order (best alternatives first). The tuple made only of
/// original tokens is skipped.
///
/// Interpretations only carry their language into the arguments when a
/// per-language table exists for it, so other languages share one stream.
#[derive(Debug, Clone)]
pub struct SubstituteSource {
	table: HashMap<String, Vec<String>>,
	by_lang: HashMap<String, HashMap<String, Vec<String>>>,
	max_combinations: usize,
}

impl SubstituteSource {
	pub fn new(options: SubstituteOptions) -> Self {
		Self { table: options.table, by_lang: options.by_lang, max_combinations: options.max_combinations }
	}

	fn alternatives(&self, lang: Option<&str>, token: &str) -> Option<&Vec<String>> {
		lang.and_then(|lang| self.by_lang.get(lang))
			.and_then(|table| table.get(token))
			.or_else(|| self.table.get(token))
	}
}

impl CandidateSource for SubstituteSource {
	fn name(&self) -> &str {
		"substitute"
	}

	fn prepare_arguments(&self, interpretation: &Interpretation) -> SourceArgs {
		let lang = self.by_lang.contains_key(&interpretation.lang).then(|| interpretation.lang.clone());
		SourceArgs { tokens: interpretation.tokenization.clone(), lang }
	}

	fn generate(&self, args: &SourceArgs, _params: &RequestParams) -> Result<TokenTuples, SourceError> {
		let lists: Vec<Vec<String>> = args
			.tokens
			.iter()
			.map(|token| {
				let mut list = vec![token.clone()];
				if let Some(alternatives) = self.alternatives(args.lang.as_deref(), token) {
					list.extend(alternatives.iter().filter(|a| *a != token).cloned());
				}
				list
			})
			.collect();

		let sizes: Vec<usize> = lists.iter().map(Vec::len).collect();
		let limited = limit_combinations(&sizes, self.max_combinations);
		let lists: Vec<Vec<String>> = lists.into_iter().zip(limited).map(|(mut list, size)| {
			list.truncate(size);
			list
		}).collect();

		let mut product = CartesianProduct::new(lists);
		// The first tuple only holds original tokens.
		product.next();
		Ok(Box::new(product.map(Ok)))
	}
}

/// Lazy odometer over a list of lists, last list turning fastest.
struct CartesianProduct {
	lists: Vec<Vec<String>>,
	indices: Vec<usize>,
	done: bool,
}

impl CartesianProduct {
	fn new(lists: Vec<Vec<String>>) -> Self {
		let done = lists.is_empty() || lists.iter().any(Vec::is_empty);
		let indices = vec![0; lists.len()];
		Self { lists, indices, done }
	}
}

impl Iterator for CartesianProduct {
	type Item = Vec<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		let current = self.indices.iter().zip(&self.lists).map(|(&i, list)| list[i].clone()).collect();

		let mut position = self.lists.len();
		loop {
			if position == 0 {
				self.done = true;
				break;
			}
			position -= 1;
			self.indices[position] += 1;
			if self.indices[position] < self.lists[position].len() {
				break;
			}
			self.indices[position] = 0;
		}
		Some(current)
	}
}
