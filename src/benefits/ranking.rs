//! Slot ranking used by the general drop-out and the supplementary components

use std::cmp::Ordering;

/// Percent of contributable months removed by the general drop-out
pub const DROPOUT_PERCENT: u32 = 15;

/// Best years retained by each supplementary component
pub const SUPPLEMENTARY_BEST_YEARS: usize = 40;

/// What a slot is ranked on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankKey {
    pub value: f64,
    pub months: u32,
    pub year: i32,
}

/// Lowest earnings first; slots without contributable months always sort last
fn low_earnings_first(a: &RankKey, b: &RankKey) -> Ordering {
    (a.months == 0)
        .cmp(&(b.months == 0))
        .then_with(|| a.value.total_cmp(&b.value))
        .then_with(|| a.months.cmp(&b.months))
        .then_with(|| a.year.cmp(&b.year))
}

/// Highest value first, then more months, then later years
fn best_first(a: &RankKey, b: &RankKey) -> Ordering {
    b.value
        .total_cmp(&a.value)
        .then_with(|| b.months.cmp(&a.months))
        .then_with(|| b.year.cmp(&a.year))
}

/// 1-based rank of every slot, lowest earnings ratio first
///
/// The result is always a permutation of `1..=keys.len()`: remaining ties fall
/// back to the slot index.
pub fn rank_slots(keys: &[RankKey]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| low_earnings_first(&keys[a], &keys[b]).then(a.cmp(&b)));

    let mut ranks = vec![0; keys.len()];
    for (position, &slot) in order.iter().enumerate() {
        ranks[slot] = position + 1;
    }
    ranks
}

/// Months excluded by the drop-out: 15% of the total, rounded up
pub fn dropout_quota(total_months: u32) -> u32 {
    (DROPOUT_PERCENT * total_months).div_ceil(100)
}

/// Excluded months per slot, walking the ranks upward until the quota is used
///
/// The last slot touched may only lose part of its months.
pub fn apportion_dropout(months: &[u32], ranks: &[usize], quota: u32) -> Vec<u32> {
    let mut by_rank: Vec<usize> = (0..months.len()).collect();
    by_rank.sort_by_key(|&slot| ranks.get(slot).copied().unwrap_or(usize::MAX));

    let mut excluded = vec![0; months.len()];
    let mut remaining = quota;

    for slot in by_rank {
        if remaining == 0 {
            break;
        }
        let taken = months[slot].min(remaining);
        excluded[slot] = taken;
        remaining -= taken;
    }

    excluded
}

/// Flags the `count` best slots among `eligible` ones
pub fn best_slots(keys: &[RankKey], eligible: &[bool], count: usize) -> Vec<bool> {
    let mut candidates: Vec<usize> = (0..keys.len())
        .filter(|&slot| eligible.get(slot).copied().unwrap_or(false))
        .collect();
    candidates.sort_by(|&a, &b| best_first(&keys[a], &keys[b]).then(a.cmp(&b)));

    let mut kept = vec![false; keys.len()];
    for slot in candidates.into_iter().take(count) {
        kept[slot] = true;
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(value: f64, months: u32, year: i32) -> RankKey {
        RankKey { value, months, year }
    }

    #[test]
    fn test_empty_slots_rank_last() {
        let keys = vec![key(0.0, 0, 2000), key(500.0, 12, 2001), key(100.0, 12, 2002)];
        assert_eq!(rank_slots(&keys), vec![3, 2, 1]);
    }

    #[test]
    fn test_ties_break_on_months_then_year() {
        let keys = vec![key(100.0, 12, 2002), key(100.0, 6, 2003), key(100.0, 12, 2001)];
        assert_eq!(rank_slots(&keys), vec![3, 1, 2]);
    }

    #[test]
    fn test_dropout_quota_rounds_up() {
        assert_eq!(dropout_quota(0), 0);
        assert_eq!(dropout_quota(100), 15);
        // 15% of 517 = 77.55
        assert_eq!(dropout_quota(517), 78);
    }

    #[test]
    fn test_partial_exclusion_of_last_slot() {
        let months = vec![12, 12, 12, 5];
        let ranks = vec![2, 3, 4, 1];
        let excluded = apportion_dropout(&months, &ranks, 10);
        assert_eq!(excluded, vec![5, 0, 0, 5]);
    }

    #[test]
    fn test_best_slots_respects_eligibility() {
        let keys = vec![key(9.0, 12, 2018), key(1.0, 12, 2019), key(5.0, 12, 2020), key(3.0, 12, 2021)];
        let eligible = vec![false, true, true, true];
        let kept = best_slots(&keys, &eligible, 2);
        assert_eq!(kept, vec![false, false, true, true]);
    }

    proptest! {
        #[test]
        fn prop_ranks_are_a_permutation(
            values in proptest::collection::vec((0.0f64..1000.0, 0u32..=12, 1960i32..2100), 55)
        ) {
            let keys: Vec<RankKey> = values.iter().map(|&(v, m, y)| key(v, m, y)).collect();
            let mut ranks = rank_slots(&keys);
            ranks.sort_unstable();
            prop_assert_eq!(ranks, (1..=55).collect::<Vec<_>>());
        }

        #[test]
        fn prop_dropout_conserves_months(
            values in proptest::collection::vec((0.0f64..1000.0, 0u32..=12), 55)
        ) {
            let keys: Vec<RankKey> = values
                .iter()
                .enumerate()
                .map(|(i, &(v, m))| key(v, m, 1970 + i as i32))
                .collect();
            let months: Vec<u32> = keys.iter().map(|k| k.months).collect();
            let total: u32 = months.iter().sum();
            let quota = dropout_quota(total);

            let excluded = apportion_dropout(&months, &rank_slots(&keys), quota);
            let excluded_total: u32 = excluded.iter().sum();

            prop_assert_eq!(excluded_total, quota);
            prop_assert!(excluded_total <= total);
            prop_assert!(excluded.iter().zip(&months).all(|(e, m)| e <= m));
        }
    }
}
