//! Checked share/value arithmetic.
//!
//! Amounts are `u64` in the smallest unit. Every product is formed in
//! `u128`, so `a * b` never overflows; only the final narrowing back to
//! `u64` can fail.

use crate::config::TOTAL_BASIS_POINTS;

/// `floor(a * b / d)` computed without intermediate overflow.
///
/// Returns `None` when `d == 0` or the quotient does not fit in `u64`.
pub fn mul_div(a: u64, b: u64, d: u64) -> Option<u64> {
    if d == 0 {
        return None;
    }
    let q = (a as u128) * (b as u128) / (d as u128);
    u64::try_from(q).ok()
}

/// `floor(amount * bp / 10_000)`. Cannot fail for `bp <= 10_000`.
pub fn bp_of(amount: u64, bp: u64) -> Option<u64> {
    mul_div(amount, bp, TOTAL_BASIS_POINTS)
}

/// Returns `true` if `liability` respects the reserve ratio against
/// `total_value`, i.e. `liability * reserve_ratio_bp <= total_value * 10_000`.
///
/// A negative `total_value` admits no liability at all unless the reserve
/// ratio is zero.
pub fn within_reserve(liability: u64, reserve_ratio_bp: u64, total_value: i64) -> bool {
    let lhs = (liability as i128) * (reserve_ratio_bp as i128);
    let rhs = (total_value as i128) * (TOTAL_BASIS_POINTS as i128);
    lhs <= rhs
}

/// Largest liability the reserve ratio admits against `total_value`:
/// `floor(total_value * 10_000 / reserve_ratio_bp)`, clamped to `u64`.
/// `None` means unbounded (zero reserve ratio).
pub fn reserve_capacity(reserve_ratio_bp: u64, total_value: i64) -> Option<u64> {
    if reserve_ratio_bp == 0 {
        return None;
    }
    if total_value <= 0 {
        return Some(0);
    }
    let cap = (total_value as u128) * (TOTAL_BASIS_POINTS as u128) / (reserve_ratio_bp as u128);
    Some(u64::try_from(cap).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(100, 220, 200), Some(110));
        assert_eq!(mul_div(1, 1, 3), Some(0));
        assert_eq!(mul_div(7, 3, 2), Some(10));
    }

    #[test]
    fn mul_div_handles_wide_products() {
        assert_eq!(mul_div(u64::MAX, u64::MAX, u64::MAX), Some(u64::MAX));
        assert_eq!(mul_div(u64::MAX, 2, 1), None);
    }

    #[test]
    fn mul_div_rejects_zero_divisor() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn bp_of_takes_fraction() {
        assert_eq!(bp_of(1_000, 250), Some(25));
        assert_eq!(bp_of(39, 250), Some(0));
        assert_eq!(bp_of(1_000, 10_000), Some(1_000));
    }

    #[test]
    fn reserve_bound_matches_capacity() {
        // 5000 bp against 500 value admits exactly 1000.
        assert!(within_reserve(1_000, 5_000, 500));
        assert!(!within_reserve(1_001, 5_000, 500));
        assert_eq!(reserve_capacity(5_000, 500), Some(1_000));
    }

    #[test]
    fn negative_value_admits_nothing() {
        assert!(within_reserve(0, 5_000, -10));
        assert!(!within_reserve(1, 5_000, -10));
        assert_eq!(reserve_capacity(5_000, -10), Some(0));
    }

    #[test]
    fn zero_ratio_is_unbounded() {
        assert!(within_reserve(u64::MAX, 0, 0));
        assert_eq!(reserve_capacity(0, 100), None);
    }
}
