use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::domains::Domains;

/// Registry status of a rendered name.
///
/// `Unknown` is the state of a candidate whose status has not been resolved
/// yet, and the neutral answer of a degraded classifier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
	Available,
	OnSale,
	Taken,
	#[default]
	Unknown,
}

/// One generated alternative name.
///
/// A `GeneratedName` is identified by its rendered string, the concatenation
/// of its tokens. Two names with different token splits but the same
/// rendering are equal.
///
/// # Invariants
/// - `provenance` always holds at least one chain
/// - `rendered` is always `tokens.concat()`
/// - only `provenance` and `status` change after construction
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeneratedName {
	tokens: Vec<String>,
	rendered: String,
	source_pipeline: Option<String>,
	interpretation: Option<(String, String)>,
	status: Status,
	provenance: BTreeSet<Vec<String>>,
}

impl GeneratedName {
	/// Creates a name from its tokens and the chain of strategies that produced it.
	///
	/// An empty chain is replaced by `["unknown"]` so that provenance is never empty.
	pub fn new(tokens: Vec<String>, chain: Vec<String>) -> Self {
		let rendered = tokens.concat();
		let chain = if chain.is_empty() { vec!["unknown".to_owned()] } else { chain };
		Self {
			tokens,
			rendered,
			source_pipeline: None,
			interpretation: None,
			status: Status::Unknown,
			provenance: BTreeSet::from([chain]),
		}
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	/// Returns the rendered identity of the name.
	pub fn rendered(&self) -> &str {
		&self.rendered
	}

	pub fn source_pipeline(&self) -> Option<&str> {
		self.source_pipeline.as_deref()
	}

	/// Returns the `(type, lang)` of the interpretation the name was generated from.
	pub fn interpretation(&self) -> Option<(&str, &str)> {
		self.interpretation.as_ref().map(|(t, l)| (t.as_str(), l.as_str()))
	}

	pub fn status(&self) -> Status {
		self.status
	}

	pub fn provenance(&self) -> &BTreeSet<Vec<String>> {
		&self.provenance
	}

	/// Tags the name with the pipeline and the interpretation it came from.
	pub(crate) fn tag(mut self, pipeline: &str, kind: &str, lang: &str) -> Self {
		self.source_pipeline = Some(pipeline.to_owned());
		self.interpretation = Some((kind.to_owned(), lang.to_owned()));
		self
	}

	/// Replaces the tokens of the name, keeping its provenance.
	///
	/// Used by filters that augment candidates.
	pub fn with_tokens(mut self, tokens: Vec<String>) -> Self {
		self.rendered = tokens.concat();
		self.tokens = tokens;
		self
	}

	/// Adds a provenance chain.
	///
	/// Returns `true` if the chain was new. Adding a chain already present
	/// leaves the provenance unchanged.
	pub fn add_chain(&mut self, chain: Vec<String>) -> bool {
		self.provenance.insert(chain)
	}

	/// Merges the provenance of an equivalent name into this one (set union).
	pub fn merge(&mut self, other: &GeneratedName) {
		self.provenance.extend(other.provenance.iter().cloned());
	}

	/// Resolves the status through the classifier.
	///
	/// Resolution happens once: a name whose status is already known keeps it.
	pub fn resolve_status(&mut self, domains: &Domains) -> Status {
		if self.status == Status::Unknown {
			self.status = domains.status_of(&self.rendered);
		}
		self.status
	}
}

impl PartialEq for GeneratedName {
	fn eq(&self, other: &Self) -> bool {
		self.rendered == other.rendered
	}
}

impl Eq for GeneratedName {}

impl Hash for GeneratedName {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.rendered.hash(state);
	}
}

impl fmt::Display for GeneratedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.rendered)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	fn tokens(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn equality_uses_rendered_string() {
		let a = GeneratedName::new(tokens(&["c", "cc"]), chain(&["x"]));
		let b = GeneratedName::new(tokens(&["cc", "c"]), chain(&["y"]));
		let c = GeneratedName::new(tokens(&["ccc"]), chain(&["z"]));
		assert_eq!(a, b);
		assert_eq!(a, c);
		assert_eq!(a.rendered(), "ccc");
	}

	#[test]
	fn empty_chain_still_gives_provenance() {
		let name = GeneratedName::new(tokens(&["a"]), Vec::new());
		assert_eq!(name.provenance().len(), 1);
	}

	#[test]
	fn re_adding_chain_is_noop() {
		let mut name = GeneratedName::new(tokens(&["a"]), chain(&["permute", "ascii"]));
		assert!(!name.add_chain(chain(&["permute", "ascii"])));
		assert_eq!(name.provenance().len(), 1);
		assert!(name.add_chain(chain(&["suffix"])));
		assert_eq!(name.provenance().len(), 2);
	}

	#[test]
	fn merge_is_set_union() {
		let mut a = GeneratedName::new(tokens(&["ab"]), chain(&["one"]));
		let mut b = GeneratedName::new(tokens(&["a", "b"]), chain(&["one"]));
		a.merge(&b);
		assert_eq!(a.provenance().len(), 1);

		b.add_chain(chain(&["two"]));
		a.merge(&b);
		a.merge(&b);
		assert_eq!(a.provenance().len(), 2);
	}

	#[test]
	fn status_is_resolved_once() {
		let domains = Domains::from_entries([("taken".to_owned(), Status::Taken, 1.0)]);
		let mut name = GeneratedName::new(tokens(&["taken"]), chain(&["p"]));
		assert_eq!(name.status(), Status::Unknown);
		assert_eq!(name.resolve_status(&domains), Status::Taken);

		let other = Domains::from_entries(Vec::new());
		assert_eq!(name.resolve_status(&other), Status::Taken);
	}
}
