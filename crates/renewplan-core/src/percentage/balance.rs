//! Integer redistribution of percentage points.
//!
//! Both functions return whole percentages that sum exactly to the amount
//! being distributed.

/// Split `total` evenly over `n` slots; the first `total % n` slots get one extra.
pub fn even_split(total: u32, n: usize) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }
    let n32 = n as u32;
    let share = total / n32;
    let extra = (total % n32) as usize;
    (0..n).map(|i| share + u32::from(i < extra)).collect()
}

/// Distribute `amount` over slots in proportion to their `current` values.
///
/// Each slot gets `amount * current_i / sum(current)` rounded so that the
/// results sum to `amount` exactly: slots are floored, then the points lost
/// to flooring go to the slots with the largest fractional parts (earlier
/// slots win ties). Falls back to `even_split` when every slot is zero.
pub fn proportional_split(amount: u32, current: &[u32]) -> Vec<u32> {
    let total: u64 = current.iter().map(|&v| u64::from(v)).sum();
    if total == 0 {
        return even_split(amount, current.len());
    }

    let amount64 = u64::from(amount);
    let mut result = Vec::with_capacity(current.len());
    let mut fractions = Vec::with_capacity(current.len());
    for (i, &value) in current.iter().enumerate() {
        let scaled = amount64 * u64::from(value);
        result.push((scaled / total) as u32);
        fractions.push((scaled % total, i));
    }

    let assigned: u64 = result.iter().map(|&v| u64::from(v)).sum();
    let leftover = (amount64 - assigned) as usize;

    // Largest fractional part first, index order on ties
    fractions.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in fractions.iter().take(leftover) {
        result[i] += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_three_ways() {
        assert_eq!(even_split(100, 3), vec![34, 33, 33]);
    }

    #[test]
    fn test_even_split_remainder_goes_first() {
        assert_eq!(even_split(100, 6), vec![17, 17, 17, 17, 16, 16]);
        assert_eq!(even_split(60, 1), vec![60]);
        assert_eq!(even_split(2, 4), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_even_split_empty() {
        assert!(even_split(100, 0).is_empty());
    }

    #[test]
    fn test_proportional_keeps_ratio() {
        assert_eq!(proportional_split(30, &[30, 20]), vec![18, 12]);
        assert_eq!(proportional_split(50, &[25, 25, 50]), vec![13, 12, 25]);
    }

    #[test]
    fn test_proportional_sums_exactly() {
        let cases: &[(u32, &[u32])] = &[
            (100, &[1, 1, 1]),
            (67, &[33, 33, 34]),
            (7, &[10, 10, 10, 10, 10, 10]),
            (99, &[3, 5, 7, 11, 13]),
            (0, &[40, 60]),
        ];
        for &(amount, current) in cases {
            let split = proportional_split(amount, current);
            assert_eq!(split.len(), current.len());
            assert_eq!(split.iter().sum::<u32>(), amount, "split of {} over {:?}", amount, current);
        }
    }

    #[test]
    fn test_proportional_zero_siblings_fall_back_to_even() {
        assert_eq!(proportional_split(60, &[0]), vec![60]);
        assert_eq!(proportional_split(61, &[0, 0]), vec![31, 30]);
    }

    #[test]
    fn test_proportional_zero_share_stays_zero_when_exact() {
        assert_eq!(proportional_split(40, &[0, 20, 20]), vec![0, 20, 20]);
    }
}
