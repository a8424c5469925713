use std::collections::HashMap;
use std::thread;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::model::input_name::InputName;
use crate::ranking::diversity::{diversify, Diversifiable, DiversityConstraints};

/// Number of searches issued concurrently by one lookup.
pub const LOOKUP_WORKERS: usize = 2;

/// A collection of names returned by the remote search index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Collection {
	pub id: String,
	pub title: String,
	pub names: Vec<String>,
	pub types: Vec<String>,
	pub score: f64,
}

impl Diversifiable for Collection {
	fn member_names(&self) -> &[String] {
		&self.names
	}

	fn category_types(&self) -> &[String] {
		&self.types
	}

	fn score(&self) -> f64 {
		self.score
	}
}

/// Remote text-search collaborator.
///
/// Returns collections ranked best first. Errors are reported, not raised:
/// the lookup turns them into empty results.
pub trait CollectionSearch: Send + Sync {
	fn search(&self, query: &str, limit: usize) -> Result<Vec<Collection>, SearchError>;
}

/// Composite collection lookup for a request.
///
/// # Behavior
/// - Searches by the normalized input and by the most probable tokenization
///   (space-joined), on a scoped pool of `LOOKUP_WORKERS` threads joined
///   before use.
/// - Merges both rankings by id, keeping the better score, best first.
/// - Applies the diversity constraints to the merged ranking.
/// - Fails closed: a failing or panicking search contributes nothing, and a
///   closed lookup returns an empty list.
pub struct CollectionLookup<S: CollectionSearch> {
	backend: Option<S>,
	constraints: DiversityConstraints,
	fetch_limit: usize,
}

impl<S: CollectionSearch> CollectionLookup<S> {
	pub fn init(backend: S, constraints: DiversityConstraints, fetch_limit: usize) -> Self {
		Self { backend: Some(backend), constraints, fetch_limit }
	}

	pub fn close(&mut self) {
		self.backend = None;
	}

	pub fn is_open(&self) -> bool {
		self.backend.is_some()
	}

	/// Looks up at most `max_limit` diverse collections related to the input.
	pub fn lookup(&self, input: &InputName, max_limit: usize) -> Vec<Collection> {
		let Some(backend) = &self.backend else {
			warn!("collection lookup is closed");
			return Vec::new();
		};

		let queries = Self::queries(input);
		let fetch_limit = self.fetch_limit.max(max_limit);
		let rankings: Vec<Vec<Collection>> = thread::scope(|scope| {
			let handles: Vec<_> = queries
				.iter()
				.take(LOOKUP_WORKERS)
				.map(|query| scope.spawn(move || backend.search(query, fetch_limit)))
				.collect();

			handles
				.into_iter()
				.zip(&queries)
				.map(|(handle, query)| match handle.join() {
					Ok(Ok(collections)) => collections,
					Ok(Err(e)) => {
						warn!("collection search for `{}` failed: {}", query, e);
						Vec::new()
					}
					Err(_) => {
						warn!("collection search for `{}` panicked", query);
						Vec::new()
					}
				})
				.collect()
		});

		diversify(merge_rankings(rankings), max_limit, self.constraints)
	}

	/// Search queries of a request: the normalized input, then the best tokenization.
	fn queries(input: &InputName) -> Vec<String> {
		let mut queries = vec![input.normalized().to_owned()];
		let best = input
			.interpretations()
			.values()
			.flatten()
			.max_by(|a, b| a.in_type_probability.total_cmp(&b.in_type_probability));
		if let Some(interpretation) = best {
			let joined = interpretation.tokenization.join(" ");
			if !joined.is_empty() && !queries.contains(&joined) {
				queries.push(joined);
			}
		}
		queries
	}
}

/// Merges rankings by id, keeping the best score, sorted best first.
fn merge_rankings(rankings: Vec<Vec<Collection>>) -> Vec<Collection> {
	let mut merged: Vec<Collection> = Vec::new();
	let mut positions: HashMap<String, usize> = HashMap::new();
	for collection in rankings.into_iter().flatten() {
		match positions.get(&collection.id) {
			Some(&position) => {
				if collection.score > merged[position].score {
					merged[position] = collection;
				}
			}
			None => {
				positions.insert(collection.id.clone(), merged.len());
				merged.push(collection);
			}
		}
	}
	merged.sort_by(|a, b| b.score.total_cmp(&a.score));
	merged
}
