//! Binary 64.64 fixed-point primitives with 128-bit fractional accumulators.
//!
//! Same interface as `binary64`, but the logarithm mantissa and the exponent
//! accumulator keep a full 127 fractional bits, so truncation noise sits at
//! 2^-127 per step instead of 2^-63. Multiply and divide go through the
//! 256-bit `wide` layer; this is the path the trade functions use.

use soroban_sdk::Env;
use yield_types::{MathError, ONE_64X64};

use crate::binary64::full_mul;
use crate::wide;

const FRAC_MASK: u128 = ONE_64X64 - 1;

/// Ladder of constants `2^(1/2), 2^(1/4), ..., 2^(1/2^64)` in Q0.127,
/// derived at compile time by successive integer square roots of 2
const LADDER: [u128; 64] = build_ladder();

const fn build_ladder() -> [u128; 64] {
    let mut table = [0u128; 64];
    // 2^(1/2) in Q0.127 = floor(sqrt(2^255))
    let mut c = sqrt_wide(1u128 << 127, 0);
    let mut i = 0;
    while i < 64 {
        table[i] = c;
        // sqrt of the Q0.127 value c, as Q0.127: floor(sqrt(c * 2^127))
        c = sqrt_wide(c >> 1, (c & 1) << 127);
        i += 1;
    }
    table
}

/// Floor square root of a 256-bit (hi, lo) pair by Newton's method
///
/// Only called with hi >= 2^126, so the root exceeds hi and the inner
/// division always fits 128 bits.
const fn sqrt_wide(hi: u128, lo: u128) -> u128 {
    let mut x0 = u128::MAX;
    let mut x1 = avg_floor(x0, div_wide(hi, lo, x0));
    while x1 < x0 {
        x0 = x1;
        x1 = avg_floor(x0, div_wide(hi, lo, x0));
    }
    x0
}

const fn avg_floor(a: u128, b: u128) -> u128 {
    (a >> 1) + (b >> 1) + (a & b & 1)
}

/// Restoring binary long division of (hi, lo) by d; requires hi < d
const fn div_wide(hi: u128, lo: u128, d: u128) -> u128 {
    let mut rem = hi;
    let mut quotient = 0u128;
    let mut i = 128;
    while i > 0 {
        i -= 1;
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry != 0 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    quotient
}

/// Base-2 logarithm of a raw positive integer, as unsigned 64.64 (rounds down)
///
/// The mantissa is carried at full width: each square-and-test step keeps
/// 127 fractional bits, truncating only below 2^-127.
pub fn log2_round_down(x: u128) -> Result<u128, MathError> {
    if x == 0 {
        return Err(MathError::DivisionByZero);
    }

    let msb = 127 - x.leading_zeros();
    let mut result = (msb as u128) << 64;

    // Mantissa normalized into [2^127, 2^128)
    let mut m = x << (127 - msb);

    for bit in (0..64).rev() {
        let (hi, lo) = full_mul(m, m);
        if hi >= 1u128 << 127 {
            // Square reached 2.0; halve it and set the bit
            m = hi;
            result += 1u128 << bit;
        } else {
            m = (hi << 1) | (lo >> 127);
        }
    }

    Ok(result)
}

/// Base-2 logarithm, rounded up by one ulp unless exact
pub fn log2_round_up(x: u128) -> Result<u128, MathError> {
    let down = log2_round_down(x)?;
    if x.is_power_of_two() {
        Ok(down)
    } else {
        Ok(down + 1)
    }
}

/// Two to the power of an unsigned 64.64 exponent, as a raw integer (rounds down)
///
/// Square-and-multiply over the fractional bits with a Q0.127 accumulator.
/// Signals `Overflow` once the integer part reaches 128.
pub fn exp2_round_down(x: u128) -> Result<u128, MathError> {
    let int = (x >> 64) as u32;
    if int >= 128 {
        return Err(MathError::Overflow);
    }
    let frac = x & FRAC_MASK;

    // Mantissa accumulator in Q0.127; partial products stay below 2.0
    let mut acc: u128 = 1 << 127;
    for (i, c) in LADDER.iter().enumerate() {
        if frac & (1u128 << (63 - i)) != 0 {
            let (hi, lo) = full_mul(acc, *c);
            acc = (hi << 1) | (lo >> 127);
        }
    }

    Ok(acc >> (127 - int))
}

/// Two to the power of an unsigned 64.64 exponent, rounded up by one ulp unless exact
pub fn exp2_round_up(x: u128) -> Result<u128, MathError> {
    let down = exp2_round_down(x)?;
    if x & FRAC_MASK == 0 {
        Ok(down)
    } else {
        Ok(down + 1)
    }
}

/// 64.64 fixed-point multiply (rounds down)
pub fn mul_round_down(env: &Env, a: u128, b: u128) -> Result<u128, MathError> {
    wide::mul_div(env, a, b, ONE_64X64)
}

/// 64.64 fixed-point multiply (rounds up)
pub fn mul_round_up(env: &Env, a: u128, b: u128) -> Result<u128, MathError> {
    wide::mul_div_rounding_up(env, a, b, ONE_64X64)
}

/// 64.64 fixed-point divide (rounds down)
pub fn div_round_down(env: &Env, a: u128, b: u128) -> Result<u128, MathError> {
    wide::mul_div(env, a, ONE_64X64, b)
}

/// 64.64 fixed-point divide (rounds up)
pub fn div_round_up(env: &Env, a: u128, b: u128) -> Result<u128, MathError> {
    wide::mul_div_rounding_up(env, a, ONE_64X64, b)
}

/// `x^(y/z)` for raw `x` and 64.64 `y`, `z`, every inner step rounded down
pub fn pow_round_down(env: &Env, x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    if z == 0 {
        return Err(MathError::DivisionByZero);
    }
    if x == 0 {
        return if y == 0 { Ok(1) } else { Ok(0) };
    }
    if y == 0 {
        return Ok(1);
    }
    if y == z {
        return Ok(x);
    }
    let l = log2_round_down(x)?;
    let e = wide::mul_div(env, l, y, z)?;
    exp2_round_down(e)
}

/// `x^(y/z)` for raw `x` and 64.64 `y`, `z`, every inner step rounded up
pub fn pow_round_up(env: &Env, x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    if z == 0 {
        return Err(MathError::DivisionByZero);
    }
    if x == 0 {
        return if y == 0 { Ok(1) } else { Ok(0) };
    }
    if y == 0 {
        return Ok(1);
    }
    if y == z {
        return Ok(x);
    }
    let l = log2_round_up(x)?;
    let e = wide::mul_div_rounding_up(env, l, y, z)?;
    exp2_round_up(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary64;
    use soroban_sdk::Env;

    const WAD: u128 = 1_000_000_000_000_000_000;

    // === ladder tests ===

    #[test]
    fn test_ladder_head_is_sqrt_two() {
        // floor(sqrt(2) * 2^127), cross-checked against the 63-bit ladder
        let coarse = binary64::isqrt(1u128 << 127); // Q0.63
        assert_eq!(LADDER[0] >> 64, coarse);
    }

    #[test]
    fn test_ladder_is_decreasing_toward_one() {
        let one_q127 = 1u128 << 127;
        for pair in LADDER.windows(2) {
            assert!(pair[0] > pair[1]);
            assert!(pair[1] > one_q127);
        }
    }

    // === log2 tests ===

    #[test]
    fn test_log2_powers_of_two_are_exact() {
        assert_eq!(log2_round_down(1), Ok(0));
        assert_eq!(log2_round_down(2), Ok(1u128 << 64));
        assert_eq!(log2_round_down(1 << 10), Ok(10u128 << 64));
        assert_eq!(log2_round_down(1 << 100), Ok(100u128 << 64));
        assert_eq!(log2_round_up(1 << 100), Ok(100u128 << 64));
    }

    #[test]
    fn test_log2_zero() {
        assert_eq!(log2_round_down(0), Err(MathError::DivisionByZero));
        assert_eq!(log2_round_up(0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_log2_wad_integer_part() {
        // log2(10^18) = 59.79...
        let l = log2_round_down(WAD).unwrap();
        assert_eq!(l >> 64, 59);
        let frac = l & ((1u128 << 64) - 1);
        assert!(frac > (1u128 << 64) / 100 * 79);
        assert!(frac < (1u128 << 64) / 100 * 80);
    }

    #[test]
    fn test_log2_matches_coarse_path() {
        for x in [3u128, 1_000_000, WAD, WAD * 12345 + 67, (1 << 110) - 1] {
            let fine = log2_round_down(x).unwrap();
            let coarse = binary64::log2_round_down(x).unwrap();
            let diff = if fine > coarse { fine - coarse } else { coarse - fine };
            assert!(diff <= 8, "precisions disagree by {} at x={}", diff, x);
            // The full-width mantissa never loses bits the coarse one kept
            assert!(fine >= coarse);
        }
    }

    #[test]
    fn test_log2_monotone() {
        let mut x = 3u128;
        let mut prev = log2_round_down(x).unwrap();
        for _ in 0..60 {
            x = x * 3 / 2 + 1;
            let l = log2_round_down(x).unwrap();
            assert!(l >= prev, "log2 must be monotone non-decreasing");
            prev = l;
        }
    }

    // === exp2 tests ===

    #[test]
    fn test_exp2_integer_exponents_are_exact() {
        assert_eq!(exp2_round_down(0), Ok(1));
        assert_eq!(exp2_round_down(1u128 << 64), Ok(2));
        assert_eq!(exp2_round_down(10u128 << 64), Ok(1 << 10));
        assert_eq!(exp2_round_down(127u128 << 64), Ok(1 << 127));
        assert_eq!(exp2_round_up(127u128 << 64), Ok(1 << 127));
    }

    #[test]
    fn test_exp2_overflow_at_128() {
        assert_eq!(exp2_round_down(128u128 << 64), Err(MathError::Overflow));
        assert_eq!(exp2_round_up(u128::MAX), Err(MathError::Overflow));
    }

    #[test]
    fn test_exp2_sixty_four_and_a_half() {
        // 2^64.5 = 26087635650665564424.7...
        let r = exp2_round_down((64u128 << 64) + (1u128 << 63)).unwrap();
        let expected = 26_087_635_650_665_564_424u128;
        let diff = if r > expected { r - expected } else { expected - r };
        assert!(diff <= 1, "2^64.5 should be accurate to one unit, got {}", r);
    }

    #[test]
    fn test_exp2_monotone() {
        let step = (1u128 << 64) / 7 + 12345;
        let mut e = 1u128 << 62;
        let mut prev = exp2_round_down(e).unwrap();
        for _ in 0..100 {
            e += step;
            let r = exp2_round_down(e).unwrap();
            assert!(r >= prev, "exp2 must be monotone non-decreasing");
            prev = r;
        }
    }

    #[test]
    fn test_exp2_inverts_log2_within_tolerance() {
        for x in [
            3u128,
            1_000_000,
            WAD,
            12_345_678_901_234_567_890,
            1 << 96,
            (1 << 110) - 987_654_321,
        ] {
            let down = exp2_round_down(log2_round_down(x).unwrap()).unwrap();
            assert!(down <= x, "round-down composition must not exceed x");
            // Residual error is dominated by the 2^-64 exponent quantization
            assert!(down >= x - x / 1_000_000_000_000_000_000 - 1);

            let up = exp2_round_up(log2_round_up(x).unwrap()).unwrap();
            assert!(up >= down);
            assert!(up <= x + x / 1_000_000_000_000_000_000 + 2);
        }
    }

    // === fixed multiply / divide tests ===

    #[test]
    fn test_mul_identity() {
        let env = Env::default();
        assert_eq!(mul_round_down(&env, ONE_64X64, ONE_64X64), Ok(ONE_64X64));
        assert_eq!(mul_round_up(&env, ONE_64X64, ONE_64X64), Ok(ONE_64X64));
    }

    #[test]
    fn test_mul_rounding_pair() {
        let env = Env::default();
        let third = ONE_64X64 / 3;
        let down = mul_round_down(&env, third, third).unwrap();
        let up = mul_round_up(&env, third, third).unwrap();
        assert_eq!(up - down, 1);
    }

    #[test]
    fn test_div_simple() {
        let env = Env::default();
        let ten = ONE_64X64 * 10;
        let four = ONE_64X64 * 4;
        assert_eq!(div_round_down(&env, ten, four), Ok(ONE_64X64 * 5 / 2));
    }

    #[test]
    fn test_div_by_zero() {
        let env = Env::default();
        assert_eq!(
            div_round_down(&env, ONE_64X64, 0),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(
            div_round_up(&env, ONE_64X64, 0),
            Err(MathError::DivisionByZero)
        );
    }

    // === pow tests ===

    #[test]
    fn test_pow_unit_exponent_is_identity() {
        let env = Env::default();
        for x in [1u128, 7, WAD, (1 << 110) - 1] {
            assert_eq!(pow_round_down(&env, x, ONE_64X64, ONE_64X64), Ok(x));
            assert_eq!(pow_round_up(&env, x, ONE_64X64, ONE_64X64), Ok(x));
            assert_eq!(pow_round_down(&env, x, 12345, 12345), Ok(x));
        }
    }

    #[test]
    fn test_pow_zero_cases() {
        let env = Env::default();
        assert_eq!(pow_round_down(&env, 0, ONE_64X64, ONE_64X64 * 2), Ok(0));
        assert_eq!(pow_round_down(&env, WAD, 0, ONE_64X64), Ok(1));
        assert_eq!(
            pow_round_down(&env, WAD, ONE_64X64, 0),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_pow_square_root() {
        let env = Env::default();
        // 1000000^(1/2) = 1000
        let r = pow_round_down(&env, 1_000_000, ONE_64X64, ONE_64X64 * 2).unwrap();
        assert!(r >= 999 && r <= 1000, "expected ~1000, got {}", r);
        let r_up = pow_round_up(&env, 1_000_000, ONE_64X64, ONE_64X64 * 2).unwrap();
        assert!(r_up >= 1000 && r_up <= 1001);
    }

    #[test]
    fn test_pow_matches_coarse_path() {
        let env = Env::default();
        let y = ONE_64X64 * 9 / 10;
        for x in [12345u128, WAD, WAD * 1_000_000] {
            let fine = pow_round_down(&env, x, y, ONE_64X64).unwrap();
            let coarse = binary64::pow_round_down(x, y, ONE_64X64).unwrap();
            let diff = if fine > coarse { fine - coarse } else { coarse - fine };
            assert!(
                diff <= 2 + fine / 1_000_000_000_000_000,
                "precisions disagree by {} at x={}",
                diff,
                x
            );
        }
    }

    #[test]
    fn test_pow_rounding_order() {
        let env = Env::default();
        for x in [12345u128, WAD, WAD * 37] {
            let y = ONE_64X64 * 9 / 10;
            let down = pow_round_down(&env, x, y, ONE_64X64).unwrap();
            let up = pow_round_up(&env, x, y, ONE_64X64).unwrap();
            assert!(up >= down);
            assert!(up - down <= 2 + x / 1_000_000_000_000_000);
        }
    }

    #[test]
    fn test_pow_overflow_on_huge_inverse_exponent() {
        let env = Env::default();
        assert_eq!(
            pow_round_down(&env, 1 << 100, ONE_64X64, 1),
            Err(MathError::Overflow)
        );
    }
}
