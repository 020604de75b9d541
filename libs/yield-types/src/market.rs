use soroban_sdk::contracttype;

use crate::{G1_DEFAULT, G2_DEFAULT, K_DEFAULT};

/// Immutable parameters of a fixed-yield market
///
/// `k`, `g1` and `g2` are binary 64.64 fixed-point constants; reserves and
/// amounts are not part of the market - callers re-supply them on every
/// pricing call.
#[contracttype]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Market {
    /// Unix timestamp at which principal redeems 1:1 for base
    pub maturity: u64,
    /// Per-second decay constant of the time exponent (64.64)
    pub k: u128,
    /// Spread applied when base flows into the pool (64.64, < 1)
    pub g1: u128,
    /// Spread applied when base flows out of the pool (64.64, > 1)
    pub g2: u128,
}

impl Market {
    /// Market with the canonical four-year decay and 950/1000 spread
    pub fn with_defaults(maturity: u64) -> Self {
        Self {
            maturity,
            k: K_DEFAULT,
            g1: G1_DEFAULT,
            g2: G2_DEFAULT,
        }
    }

    /// Seconds until maturity, zero once matured
    pub fn time_till_maturity(&self, now: u64) -> u32 {
        let remaining = self.maturity.saturating_sub(now);
        if remaining > u32::MAX as u64 {
            u32::MAX
        } else {
            remaining as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ONE_64X64;

    #[test]
    fn test_defaults_bracket_one() {
        let market = Market::with_defaults(1_000_000);
        assert!(market.g1 < ONE_64X64, "g1 must sit below 1.0");
        assert!(market.g2 > ONE_64X64, "g2 must sit above 1.0");
        assert!(market.k > 0);
    }

    #[test]
    fn test_spreads_are_reciprocal() {
        // g1 * g2 == 1 up to 64.64 truncation
        let market = Market::with_defaults(0);
        let product = market.g1 * market.g2 / ONE_64X64;
        let diff = if product > ONE_64X64 {
            product - ONE_64X64
        } else {
            ONE_64X64 - product
        };
        assert!(diff <= 4, "g1*g2 should be 1 within rounding");
    }

    #[test]
    fn test_time_till_maturity() {
        let market = Market::with_defaults(1_000);
        assert_eq!(market.time_till_maturity(0), 1_000);
        assert_eq!(market.time_till_maturity(999), 1);
        assert_eq!(market.time_till_maturity(1_000), 0);
        assert_eq!(market.time_till_maturity(2_000), 0);
    }

    #[test]
    fn test_time_till_maturity_saturates_at_u32() {
        let market = Market::with_defaults(u64::MAX);
        assert_eq!(market.time_till_maturity(0), u32::MAX);
    }
}
