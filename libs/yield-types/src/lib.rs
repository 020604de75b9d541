#![no_std]

mod error;
mod market;

pub use error::*;
pub use market::*;

/// WAD constant (10^18) - external 18-decimal integer convention
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// One in binary 64.64 fixed point (2^64)
pub const ONE_64X64: u128 = 1 << 64;

/// Canonical maturity window: four years of seconds
pub const SECONDS_IN_FOUR_YEARS: u64 = 126_144_000;

/// Default per-second decay constant `k = 1 / fourYears` in 64.64
/// Scales seconds-till-maturity into the unit time exponent `t`
pub const K_DEFAULT: u128 = ONE_64X64 / SECONDS_IN_FOUR_YEARS as u128;

/// Default spread for quotes where the trader names a base amount (g1 < 1)
pub const G1_DEFAULT: u128 = ONE_64X64 * 950 / 1000;

/// Default spread for quotes where the trader names a principal amount (g2 > 1)
pub const G2_DEFAULT: u128 = ONE_64X64 * 1000 / 950;

/// Largest reserve/amount the engine accepts (2^110 raw units)
/// Keeps every intermediate power strictly inside the u128 range
pub const MAX_RESERVE: u128 = 1 << 110;
