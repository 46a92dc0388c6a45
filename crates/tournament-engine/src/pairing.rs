//! Round-robin pairing in canonical order
//!
//! Pairs are `(i, j)` with `i < j`, enumerated in ascending lexicographic
//! order: `(0,1), (0,2), .., (0,n-1), (1,2), ..`. The position of a pair in
//! that order is its pair index, which also seeds the match's random streams.

/// Number of matches in a full round-robin: n(n-1)/2
pub fn calculate_match_count(participant_count: usize) -> usize {
    if participant_count < 2 {
        return 0;
    }
    participant_count * (participant_count - 1) / 2
}

/// Every unordered pair of roster indices, each exactly once.
pub fn generate_all_pairings(participant_count: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(calculate_match_count(participant_count));
    for i in 0..participant_count {
        for j in (i + 1)..participant_count {
            pairs.push((i, j));
        }
    }
    pairs
}

/// Pair at `match_index` without materialising the whole list.
pub fn get_pairing_for_match(participant_count: usize, match_index: usize) -> Option<(usize, usize)> {
    if match_index >= calculate_match_count(participant_count) {
        return None;
    }

    // Row i holds n-1-i pairs; walk rows until the index lands in one.
    let mut remaining = match_index;
    for i in 0..participant_count {
        let row = participant_count - 1 - i;
        if remaining < row {
            return Some((i, i + 1 + remaining));
        }
        remaining -= row;
    }
    None
}

/// Inverse of [`get_pairing_for_match`]; order of `a` and `b` does not matter.
pub fn match_index_of(participant_count: usize, a: usize, b: usize) -> Option<usize> {
    let (i, j) = if a < b { (a, b) } else { (b, a) };
    if i == j || j >= participant_count {
        return None;
    }
    // pairs in rows before i: sum of (n-1-k) for k < i
    let before = i * (2 * participant_count - i - 1) / 2;
    Some(before + (j - i - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_and_single() {
        assert!(generate_all_pairings(0).is_empty());
        assert!(generate_all_pairings(1).is_empty());
        assert_eq!(calculate_match_count(0), 0);
        assert_eq!(calculate_match_count(1), 0);
        assert_eq!(get_pairing_for_match(1, 0), None);
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(
            generate_all_pairings(4),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn test_get_pairing_for_match() {
        let pairings = generate_all_pairings(10);
        for (i, expected) in pairings.iter().enumerate() {
            assert_eq!(get_pairing_for_match(10, i), Some(*expected));
            assert_eq!(match_index_of(10, expected.1, expected.0), Some(i));
        }
        assert_eq!(get_pairing_for_match(10, pairings.len()), None);
    }

    #[test]
    fn test_match_index_of_rejects_bad_pairs() {
        assert_eq!(match_index_of(5, 2, 2), None);
        assert_eq!(match_index_of(5, 1, 5), None);
    }

    proptest! {
        #[test]
        fn prop_every_pair_exactly_once(n in 0usize..40) {
            let pairs = generate_all_pairings(n);
            prop_assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
            prop_assert_eq!(pairs.len(), calculate_match_count(n));

            let unique: HashSet<_> = pairs.iter().copied().collect();
            prop_assert_eq!(unique.len(), pairs.len());

            for &(i, j) in &pairs {
                prop_assert!(i < j && j < n);
            }

            // each participant plays n-1 matches
            for p in 0..n {
                let played = pairs.iter().filter(|&&(i, j)| i == p || j == p).count();
                prop_assert_eq!(played, n - 1);
            }
        }

        #[test]
        fn prop_index_lookup_round_trips(n in 2usize..60, seed in any::<usize>()) {
            let index = seed % calculate_match_count(n);
            let (i, j) = get_pairing_for_match(n, index).unwrap();
            prop_assert_eq!(match_index_of(n, i, j), Some(index));
        }
    }
}
