use rand::Rng;

/// Draws an index with probability proportional to its weight.
///
/// This performs:
/// - an O(n) scan to compute the total
/// - a cumulative subtraction to select a bucket
///
/// Negative and NaN weights count as zero. When every weight is zero the
/// draw is uniform. Returns `None` for an empty slice.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
	if weights.is_empty() {
		return None;
	}

	let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
	let total: f64 = weights.iter().map(|w| clean(*w)).sum();
	if total <= 0.0 {
		return Some(rng.random_range(0..weights.len()));
	}

	let mut r = rng.random_range(0.0..total);
	let mut fallback = None;
	for (index, weight) in weights.iter().enumerate() {
		let weight = clean(*weight);
		if weight <= 0.0 {
			continue;
		}
		if r < weight {
			return Some(index);
		}
		r -= weight;
		fallback = Some(index);
	}

	// Rounding can leave `r` marginally above the last bucket.
	fallback
}
