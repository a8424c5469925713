use std::collections::{HashMap, HashSet};

/// Score multiplier applied to items demoted for overlapping names.
pub const NAME_OVERLAP_DECAY: f64 = 0.8;

/// An item of a ranked result set the diversity selector can reason about.
pub trait Diversifiable {
	/// Names the item contains.
	fn member_names(&self) -> &[String];

	/// Categories the item belongs to.
	fn category_types(&self) -> &[String];

	/// Ranking score, used to order the backfill.
	fn score(&self) -> f64;
}

/// Soft constraints of the diversity selector. `None` disables a constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiversityConstraints {
	/// Demote an item when this fraction (or more) of its names is already used.
	pub name_diversity_ratio: Option<f64>,

	/// Demote an item that would push one of its types past this count.
	pub max_per_type: Option<usize>,
}

/// Greedy top-k selection with soft penalties and backfill.
///
/// # Behavior
/// - Walks the ranked `items` once, accepting items that pass both
///   constraints and returning as soon as `max_limit` are accepted.
/// - Name overlap: `|names ∩ used| / |names| >= ratio` demotes the item with
///   its score multiplied by `NAME_OVERLAP_DECAY`.
/// - Type cap: an item whose acceptance would push a type count past
///   `max_per_type` is demoted with its score unchanged.
/// - An item passing the name check adds its names to the used set, even
///   if the type cap then demotes it. Only accepted items bump the type
///   counters.
/// - If the input runs out first, the demoted items fill the remaining
///   slots, best (possibly decayed) score first.
///
/// # Notes
/// - With both constraints disabled this is `items[..max_limit]`.
/// - Items without member names never overlap.
pub fn diversify<T: Diversifiable>(items: Vec<T>, max_limit: usize, constraints: DiversityConstraints) -> Vec<T> {
	let mut accepted = Vec::with_capacity(max_limit.min(items.len()));
	if max_limit == 0 {
		return accepted;
	}

	let mut penalized: Vec<(f64, T)> = Vec::new();
	let mut used_names: HashSet<String> = HashSet::new();
	let mut used_types: HashMap<String, usize> = HashMap::new();

	for item in items {
		if let Some(ratio) = constraints.name_diversity_ratio {
			let names = item.member_names();
			if !names.is_empty() {
				let unique: HashSet<&String> = names.iter().collect();
				let overlap = unique.iter().filter(|name| used_names.contains(name.as_str())).count();
				if overlap as f64 / unique.len() as f64 >= ratio {
					penalized.push((item.score() * NAME_OVERLAP_DECAY, item));
					continue;
				}
				used_names.extend(names.iter().cloned());
			}
		}

		if let Some(max_per_type) = constraints.max_per_type {
			let exceeds = item
				.category_types()
				.iter()
				.any(|kind| used_types.get(kind).copied().unwrap_or(0) + 1 > max_per_type);
			if exceeds {
				penalized.push((item.score(), item));
				continue;
			}
			for kind in item.category_types() {
				*used_types.entry(kind.clone()).or_insert(0) += 1;
			}
		}

		accepted.push(item);
		if accepted.len() == max_limit {
			return accepted;
		}
	}

	// Stable: equal scores keep their ranked order.
	penalized.sort_by(|a, b| b.0.total_cmp(&a.0));
	let remaining = max_limit - accepted.len();
	accepted.extend(penalized.into_iter().take(remaining).map(|(_, item)| item));
	accepted
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct Item {
		id: &'static str,
		names: Vec<String>,
		types: Vec<String>,
		score: f64,
	}

	impl Diversifiable for Item {
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

	fn item(id: &'static str, names: &[&str], types: &[&str], score: f64) -> Item {
		Item {
			id,
			names: names.iter().map(|s| s.to_string()).collect(),
			types: types.iter().map(|s| s.to_string()).collect(),
			score,
		}
	}

	fn ids(items: &[Item]) -> Vec<&str> {
		items.iter().map(|i| i.id).collect()
	}

	fn ranked() -> Vec<Item> {
		vec![
			item("a", &["x", "y"], &["animals"], 10.0),
			item("b", &["x", "y"], &["animals"], 9.0),
			item("c", &["z"], &["animals"], 8.0),
			item("d", &["w"], &["places"], 7.0),
			item("e", &["x", "v"], &["places"], 6.0),
		]
	}

	#[test]
	fn no_constraints_is_truncation() {
		let items = ranked();
		let selected = diversify(items.clone(), 3, DiversityConstraints::default());
		assert_eq!(selected, items[..3].to_vec());
		assert_eq!(diversify(items.clone(), 10, DiversityConstraints::default()), items);
		assert!(diversify(items, 0, DiversityConstraints::default()).is_empty());
	}

	#[test]
	fn name_overlap_demotes() {
		let constraints = DiversityConstraints { name_diversity_ratio: Some(0.5), max_per_type: None };
		// b fully overlaps a, e half overlaps: both demoted.
		assert_eq!(ids(&diversify(ranked(), 3, constraints)), vec!["a", "c", "d"]);
		// Backfill orders by decayed score: b (7.2) before e (4.8).
		assert_eq!(ids(&diversify(ranked(), 5, constraints)), vec!["a", "c", "d", "b", "e"]);
	}

	#[test]
	fn type_cap_demotes() {
		let constraints = DiversityConstraints { name_diversity_ratio: None, max_per_type: Some(1) };
		assert_eq!(ids(&diversify(ranked(), 2, constraints)), vec!["a", "d"]);
		assert_eq!(ids(&diversify(ranked(), 4, constraints)), vec!["a", "d", "b", "c"]);
	}

	#[test]
	fn names_are_used_once_past_the_overlap_check() {
		// c passes the name check, claims "z", then hits the type cap:
		// f overlaps on "z" and both end up in the backfill.
		let items = vec![
			item("a", &["x"], &["t"], 3.0),
			item("c", &["z"], &["t"], 2.0),
			item("f", &["z"], &["u"], 1.0),
		];
		let constraints = DiversityConstraints { name_diversity_ratio: Some(1.0), max_per_type: Some(1) };
		assert_eq!(ids(&diversify(items, 2, constraints)), vec!["a", "c"]);
	}

	#[test]
	fn type_demoted_items_do_not_bump_type_counts() {
		let items = vec![
			item("a", &["x"], &["t"], 3.0),
			item("b", &["y"], &["t", "u"], 2.0),
			item("c", &["z"], &["u"], 1.0),
		];
		let constraints = DiversityConstraints { name_diversity_ratio: None, max_per_type: Some(1) };
		assert_eq!(ids(&diversify(items, 2, constraints)), vec!["a", "c"]);
	}

	#[test]
	fn accepted_items_respect_constraints() {
		let constraints = DiversityConstraints { name_diversity_ratio: Some(0.5), max_per_type: Some(2) };
		let selected = diversify(ranked(), 3, constraints);
		assert!(selected.len() <= 3);
		let mut per_type: HashMap<&str, usize> = HashMap::new();
		for item in &selected {
			for kind in &item.types {
				*per_type.entry(kind).or_default() += 1;
			}
		}
		assert!(per_type.values().all(|count| *count <= 2));
	}
}
