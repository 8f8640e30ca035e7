use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};

/// Default row cap for scatter-style consumers.
pub const DEFAULT_SAMPLE_CAP: usize = 5000;

/// Pick at most `cap` row indices out of `len`, uniformly without
/// replacement.
///
/// When `len <= cap` every index comes back in order (identity). A fixed
/// `seed` makes the pick reproducible across calls and platforms; `None`
/// seeds from OS entropy, which is the deliberate "fresh scatter every
/// refresh" behavior.
pub fn sample_indices(len: usize, cap: usize, seed: Option<u64>) -> Vec<usize> {
    if len <= cap {
        return (0..len).collect();
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    index::sample(&mut rng, len, cap).into_vec()
}

/// Clone-out convenience over [`sample_indices`] for prepared rows.
pub fn sample<T: Clone>(rows: &[T], cap: usize, seed: Option<u64>) -> Vec<T> {
    sample_indices(rows.len(), cap, seed)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn under_cap_is_identity_in_order() {
        let rows: Vec<u32> = (0..4000).collect();
        let out = sample(&rows, DEFAULT_SAMPLE_CAP, Some(42));
        assert_eq!(out, rows);
    }

    #[test]
    fn over_cap_returns_exactly_cap_distinct_members() {
        let rows: Vec<u32> = (0..10_000).collect();
        let out = sample(&rows, DEFAULT_SAMPLE_CAP, Some(42));
        assert_eq!(out.len(), DEFAULT_SAMPLE_CAP);

        let distinct: BTreeSet<u32> = out.iter().copied().collect();
        assert_eq!(distinct.len(), DEFAULT_SAMPLE_CAP, "no duplicate rows");
        assert!(out.iter().all(|v| (*v as usize) < rows.len()));
    }

    #[test]
    fn fixed_seed_reproduces_the_pick() {
        let a = sample_indices(10_000, 500, Some(7));
        let b = sample_indices(10_000, 500, Some(7));
        assert_eq!(a, b);

        let c = sample_indices(10_000, 500, Some(8));
        assert_ne!(a, c, "different seed, different subset");
    }

    #[test]
    fn cap_equal_to_len_keeps_everything() {
        let out = sample_indices(500, 500, Some(1));
        assert_eq!(out, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(sample_indices(0, DEFAULT_SAMPLE_CAP, None).is_empty());
    }
}
