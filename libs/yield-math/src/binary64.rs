//! Binary 64.64 fixed-point primitives with 64-bit fractional accumulators.
//!
//! Raw reserve quantities are plain integers; logarithms and exponents are
//! unsigned 64.64 fixed point (one = 2^64). Every operation carries an
//! explicit rounding direction so the trade layer can bias results toward
//! the pool. The legacy 64-bit accumulator keeps all arithmetic in native
//! u128; see `binary128` for the full-width variant.

use yield_types::{MathError, ONE_64X64};

const FRAC_MASK: u128 = ONE_64X64 - 1;

/// Ladder of constants `2^(1/2), 2^(1/4), ..., 2^(1/2^64)` in Q0.63,
/// derived at compile time by successive integer square roots of 2
const LADDER: [u128; 64] = build_ladder();

const fn build_ladder() -> [u128; 64] {
    let mut table = [0u128; 64];
    let mut c = isqrt(1u128 << 127); // 2^(1/2)
    let mut i = 0;
    while i < 64 {
        table[i] = c;
        c = isqrt(c << 63);
        i += 1;
    }
    table
}

/// Base-2 logarithm of a raw positive integer, as unsigned 64.64 (rounds down)
///
/// Bit-scan for the integer part, then 64 square-and-test iterations on a
/// 64-bit mantissa for the fraction. Monotone non-decreasing in `x`; the
/// result never exceeds the true logarithm.
pub fn log2_round_down(x: u128) -> Result<u128, MathError> {
    if x == 0 {
        return Err(MathError::DivisionByZero);
    }

    let msb = 127 - x.leading_zeros();
    let mut result = (msb as u128) << 64;

    // Mantissa normalized into [2^63, 2^64), truncated to 64 bits
    let mut m = if msb >= 63 {
        x >> (msb - 63)
    } else {
        x << (63 - msb)
    };

    for bit in (0..64).rev() {
        m = (m * m) >> 63;
        if m >= ONE_64X64 {
            m >>= 1;
            result += 1u128 << bit;
        }
    }

    Ok(result)
}

/// Base-2 logarithm, rounded up by one ulp unless exact
///
/// Advisory on this path: mantissa truncation can leave the round-down
/// result a few ulps short, so `down + 1` need not reach the true value.
/// `binary128::log2_round_up` gives the directional bound.
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
/// Square-and-multiply over the fractional bits against the ladder
/// `2^(1/2), 2^(1/4), ...`. Signals `Overflow` once the integer part
/// reaches 128.
pub fn exp2_round_down(x: u128) -> Result<u128, MathError> {
    let int = (x >> 64) as u32;
    if int >= 128 {
        return Err(MathError::Overflow);
    }
    let frac = x & FRAC_MASK;

    // Mantissa accumulator in Q0.63; partial products stay below 2.0
    let mut acc: u128 = 1 << 63;
    for (i, c) in LADDER.iter().enumerate() {
        if frac & (1u128 << (63 - i)) != 0 {
            acc = (acc * c) >> 63;
        }
    }

    let raw = if int >= 63 {
        acc << (int - 63)
    } else {
        acc >> (63 - int)
    };
    Ok(raw)
}

/// Two to the power of an unsigned 64.64 exponent, rounded up by one ulp unless exact
///
/// The one-ulp bump is advisory on this path: Q0.63 truncation across the
/// 64 ladder steps can drop more than one raw unit at large magnitudes, so
/// the result is not a guaranteed upper bound on the true power. Callers
/// needing a directional bound use `binary128::exp2_round_up`.
pub fn exp2_round_up(x: u128) -> Result<u128, MathError> {
    let down = exp2_round_down(x)?;
    if x & FRAC_MASK == 0 {
        Ok(down)
    } else {
        Ok(down + 1)
    }
}

/// 64.64 fixed-point multiply (rounds down)
pub fn mul_round_down(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, b, ONE_64X64, false)
}

/// 64.64 fixed-point multiply (rounds up)
pub fn mul_round_up(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, b, ONE_64X64, true)
}

/// 64.64 fixed-point divide (rounds down)
pub fn div_round_down(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, ONE_64X64, b, false)
}

/// 64.64 fixed-point divide (rounds up)
pub fn div_round_up(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, ONE_64X64, b, true)
}

/// `x^(y/z)` for raw `x` and 64.64 `y`, `z`, every inner step rounded down
pub fn pow_round_down(x: u128, y: u128, z: u128) -> Result<u128, MathError> {
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
    let e = mul_div(l, y, z, false)?;
    exp2_round_down(e)
}

/// `x^(y/z)` for raw `x` and 64.64 `y`, `z`, every inner step rounded up
pub fn pow_round_up(x: u128, y: u128, z: u128) -> Result<u128, MathError> {
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
    let e = mul_div(l, y, z, true)?;
    exp2_round_up(e)
}

/// Integer square root (floor) by Newton's method
pub(crate) const fn isqrt(x: u128) -> u128 {
    if x < 2 {
        return x;
    }
    let bits = 128 - x.leading_zeros();
    // Seed above the true root so the iteration descends monotonically
    let mut x0 = 1u128 << ((bits + 1) / 2);
    let mut x1 = (x0 + x / x0) >> 1;
    while x1 < x0 {
        x0 = x1;
        x1 = (x0 + x / x0) >> 1;
    }
    x0
}

/// Full-width multiply-divide over u128 with a 256-bit intermediate product
fn mul_div(a: u128, b: u128, denominator: u128, round_up: bool) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }

    let (hi, lo) = full_mul(a, b);
    if hi >= denominator {
        // Quotient would need more than 128 bits
        return Err(MathError::Overflow);
    }

    // Restoring binary long division of (hi, lo) by denominator
    let mut rem = hi;
    let mut quotient = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry != 0 || rem >= denominator {
            rem = rem.wrapping_sub(denominator);
            quotient |= 1;
        }
    }

    if round_up && rem != 0 {
        quotient.checked_add(1).ok_or(MathError::Overflow)
    } else {
        Ok(quotient)
    }
}

/// 128x128 -> 256 bit multiply as a (hi, lo) pair
pub(crate) const fn full_mul(a: u128, b: u128) -> (u128, u128) {
    let ah = a >> 64;
    let al = a & FRAC_MASK;
    let bh = b >> 64;
    let bl = b & FRAC_MASK;

    let ll = al * bl;
    let lh = al * bh;
    let hl = ah * bl;
    let hh = ah * bh;

    let mid = (ll >> 64) + (lh & FRAC_MASK) + (hl & FRAC_MASK);
    let lo = (mid << 64) | (ll & FRAC_MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}
