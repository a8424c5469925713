/// Bounds the size of a Cartesian product of per-token candidate lists.
///
/// Given the sizes `counts` of independent lists (each sorted best-first)
/// and a budget `max_combinations`, returns new sizes, one per list and in
/// the same order, so that their product stays within the budget. Large
/// lists are shrunk before small ones, then a single growth pass hands
/// leftover budget back, larger lists first.
///
/// # Behavior
/// - Lists are processed by decreasing size. At step `i` every list of the
///   processed prefix is clamped to the largest of: the size of the next
///   list, `floor(M^(1/n))`, and `floor((M / rest)^(1/(i+1)))` where `rest`
///   is the product of the unprocessed lists. Processing stops as soon as
///   the product fits.
/// - Growth tries `+1` on each list in processing order and stops at the
///   first increment that would exceed the budget.
///
/// # Notes
/// - Pure and deterministic: the limiter only truncates, it never reorders.
/// - An empty input gives an empty output; a zero size propagates.
/// - A budget of `0` is treated as `1`.
pub fn limit_combinations(counts: &[usize], max_combinations: usize) -> Vec<usize> {
	let n = counts.len();
	if n == 0 {
		return Vec::new();
	}
	let budget = max_combinations.max(1) as u128;

	// Stable sort: equal sizes keep their original order.
	let mut order: Vec<(usize, usize)> = counts.iter().copied().enumerate().map(|(i, c)| (c, i)).collect();
	order.sort_by(|a, b| b.0.cmp(&a.0));

	let mut current: Vec<usize> = order.iter().map(|(count, _)| *count).collect();
	let even = fitting_root(budget, 1, n as u32);

	for i in 0..n {
		if product(&current) <= budget {
			break;
		}
		let next = current.get(i + 1).copied().unwrap_or(0);
		let fitted = fitting_root(budget, product(&current[i + 1..]), (i + 1) as u32);
		let cap = next.max(even).max(fitted);
		for count in current[..=i].iter_mut() {
			*count = (*count).min(cap);
		}
	}

	for i in 0..n {
		if current[i] >= order[i].0 {
			continue;
		}
		current[i] += 1;
		if product(&current) > budget {
			current[i] -= 1;
			break;
		}
	}

	let mut limited = vec![0; n];
	for (count, (_, index)) in current.into_iter().zip(order) {
		limited[index] = count;
	}
	limited
}

fn product(counts: &[usize]) -> u128 {
	counts.iter().fold(1u128, |acc, &c| acc.saturating_mul(c as u128))
}

/// Largest `r` such that `r^k * rest <= budget`.
fn fitting_root(budget: u128, rest: u128, k: u32) -> usize {
	if rest == 0 {
		return usize::MAX;
	}
	let fits = |r: u128| -> bool {
		let mut acc = rest;
		for _ in 0..k {
			acc = match acc.checked_mul(r) {
				Some(acc) => acc,
				None => return false,
			};
			if acc > budget {
				return false;
			}
		}
		acc <= budget
	};

	let estimate = (budget as f64 / rest as f64).powf(1.0 / k as f64).floor();
	let mut root = if estimate.is_finite() && estimate > 0.0 { estimate as u128 } else { 0 };
	while root > 0 && !fits(root) {
		root -= 1;
	}
	while fits(root + 1) {
		root += 1;
	}
	usize::try_from(root).unwrap_or(usize::MAX)
}
