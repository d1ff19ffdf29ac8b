//! Basis-point deviation arithmetic.
//!
//! Deviation is the relative discrepancy between an observed and a
//! reference supply figure, floored to basis points:
//!
//! ```text
//! deviation_bps = |observed - reference| * 10_000 / reference
//! ```
//!
//! The global check compares the aggregate actual supply against the
//! configured expected supply; the per-chain check compares a newly
//! finalized total against the chain's prior recorded total. Both use the
//! same arithmetic and are evaluated independently.

use veris_types::{Amount, BPS_SCALE};

/// Outcome of a deviation evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deviation {
    /// Floored deviation in basis points.
    pub bps: u64,
    /// Whether `bps` meets or exceeds the configured threshold.
    pub breached: bool,
}

/// Compute the deviation of `observed` from `reference` in basis points.
///
/// The result is floored. A zero reference with a nonzero observed value
/// saturates to `u64::MAX` so it sits above any configured threshold;
/// zero against zero is zero deviation.
pub fn deviation_bps(observed: Amount, reference: Amount) -> u64 {
    if reference == 0 {
        return if observed == 0 { 0 } else { u64::MAX };
    }
    let diff = u128::from(observed.abs_diff(reference));
    let bps = diff * u128::from(BPS_SCALE) / u128::from(reference);
    u64::try_from(bps).unwrap_or(u64::MAX)
}

/// Evaluate a deviation against a threshold.
pub fn evaluate(observed: Amount, reference: Amount, threshold_bps: u64) -> Deviation {
    let bps = deviation_bps(observed, reference);
    Deviation {
        bps,
        breached: bps >= threshold_bps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_zero() {
        assert_eq!(deviation_bps(900, 900), 0);
    }

    #[test]
    fn test_flooring() {
        // |300 - 900| * 10000 / 900 = 6666.67 -> 6666
        assert_eq!(deviation_bps(300, 900), 6666);
        // |310 - 300| * 10000 / 300 = 333.33 -> 333
        assert_eq!(deviation_bps(310, 300), 333);
        // |910 - 900| * 10000 / 900 = 111.11 -> 111
        assert_eq!(deviation_bps(910, 900), 111);
    }

    #[test]
    fn test_symmetric_in_magnitude() {
        assert_eq!(deviation_bps(1100, 1000), 1000);
        assert_eq!(deviation_bps(900, 1000), 1000);
    }

    #[test]
    fn test_zero_reference_saturates() {
        assert_eq!(deviation_bps(1, 0), u64::MAX);
        assert_eq!(deviation_bps(0, 0), 0);
    }

    #[test]
    fn test_large_values_no_overflow() {
        // Widening through u128 keeps u64::MAX inputs exact.
        assert_eq!(deviation_bps(Amount::MAX, Amount::MAX), 0);
        assert_eq!(deviation_bps(Amount::MAX / 2, Amount::MAX), 5000);
    }

    #[test]
    fn test_threshold_boundary() {
        // Breach is >=, not >.
        let dev = evaluate(1010, 1000, 100);
        assert_eq!(dev.bps, 100);
        assert!(dev.breached);

        let dev = evaluate(1009, 1000, 100);
        assert_eq!(dev.bps, 90);
        assert!(!dev.breached);
    }

    #[test]
    fn test_zero_threshold_always_breaches() {
        assert!(evaluate(1000, 1000, 0).breached);
    }
}
