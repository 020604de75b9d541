//! Constant-power invariant and trade layer.
//!
//! A pool holds `base_reserves` (Z) and `principal_reserves` (Y) and prices
//! trades on the curve `Z^a + Y^a = const`, where `a = 1 - g*k*ttm` decays
//! toward 1 as maturity approaches. The four trade functions solve the
//! invariant for the unknown leg; the spread `g` and the rounding of every
//! inner power both bias the result toward the pool. A quote and its inverse
//! use the same spread: g1 (below 1) when the trader names a base amount,
//! g2 (above 1) when they name a principal amount, so a sell immediately
//! reversed by a buy can never come out ahead.

use soroban_sdk::Env;
use yield_types::{MathError, MAX_RESERVE, ONE_64X64};

use crate::{binary128, binary64};

/// Internal accumulator width for the shared trade algebra
#[derive(Clone, Copy)]
enum Precision {
    Bits64,
    Bits128,
}

/// Per-unit pool value `((Z^(1-t) + Y^(1-t)) / 2)^(1/(1-t))` with
/// `t = k*ttm`, rounded down
///
/// Degenerates to `(Z + Y) / 2` at maturity. Callers use it as a solvency
/// oracle: it must never decrease across a trade. The power mean is taken
/// per unit; the raw sum `Z^a + Y^a` raised to `1/a` shrinks as `a` grows
/// toward 1 even on an untouched pool, so only the normalized form is
/// monotone through time.
pub fn reserves_value(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    time_till_maturity: u32,
    k: u128,
) -> Result<u128, MathError> {
    reserves_value_inner(
        env,
        Precision::Bits128,
        base_reserves,
        principal_reserves,
        time_till_maturity,
        k,
    )
}

/// `reserves_value` on the legacy 64-bit accumulators
pub fn reserves_value_64(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    time_till_maturity: u32,
    k: u128,
) -> Result<u128, MathError> {
    reserves_value_inner(
        env,
        Precision::Bits64,
        base_reserves,
        principal_reserves,
        time_till_maturity,
        k,
    )
}

/// Principal received for selling `base_in` into the pool; `g` is the
/// market's g1
pub fn principal_out_for_base_in(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    base_in: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if base_in == 0 {
        return Ok(0);
    }
    let p = Precision::Bits128;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    sell(env, p, base_reserves, principal_reserves, base_in, a)
}

/// `principal_out_for_base_in` on the legacy 64-bit accumulators
pub fn principal_out_for_base_in_64(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    base_in: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if base_in == 0 {
        return Ok(0);
    }
    let p = Precision::Bits64;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    sell(env, p, base_reserves, principal_reserves, base_in, a)
}

/// Base received for selling `principal_in` into the pool; `g` is the
/// market's g2
pub fn base_out_for_principal_in(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    principal_in: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if principal_in == 0 {
        return Ok(0);
    }
    let p = Precision::Bits128;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    sell(env, p, principal_reserves, base_reserves, principal_in, a)
}

/// `base_out_for_principal_in` on the legacy 64-bit accumulators
pub fn base_out_for_principal_in_64(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    principal_in: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if principal_in == 0 {
        return Ok(0);
    }
    let p = Precision::Bits64;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    sell(env, p, principal_reserves, base_reserves, principal_in, a)
}

/// Base required to buy `principal_out` from the pool; `g` is the market's g2
pub fn base_in_for_principal_out(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    principal_out: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if principal_out == 0 {
        return Ok(0);
    }
    let p = Precision::Bits128;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    buy(env, p, base_reserves, principal_reserves, principal_out, a)
}

/// `base_in_for_principal_out` on the legacy 64-bit accumulators
pub fn base_in_for_principal_out_64(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    principal_out: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if principal_out == 0 {
        return Ok(0);
    }
    let p = Precision::Bits64;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    buy(env, p, base_reserves, principal_reserves, principal_out, a)
}

/// Principal required to buy `base_out` from the pool; `g` is the market's g1
pub fn principal_in_for_base_out(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    base_out: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if base_out == 0 {
        return Ok(0);
    }
    let p = Precision::Bits128;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    buy(env, p, principal_reserves, base_reserves, base_out, a)
}

/// `principal_in_for_base_out` on the legacy 64-bit accumulators
pub fn principal_in_for_base_out_64(
    env: &Env,
    base_reserves: u128,
    principal_reserves: u128,
    base_out: u128,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    if base_out == 0 {
        return Ok(0);
    }
    let p = Precision::Bits64;
    let a = time_exponent(env, p, time_till_maturity, k, g)?;
    buy(env, p, principal_reserves, base_reserves, base_out, a)
}

fn check_reserves(base_reserves: u128, principal_reserves: u128) -> Result<(), MathError> {
    if base_reserves == 0 || principal_reserves == 0 {
        return Err(MathError::DivisionByZero);
    }
    if base_reserves > MAX_RESERVE || principal_reserves > MAX_RESERVE {
        return Err(MathError::Overflow);
    }
    Ok(())
}

/// `a = 1 - g*k*ttm` in 64.64; errors once the decayed exponent leaves (0, 1]
fn time_exponent(
    env: &Env,
    p: Precision,
    time_till_maturity: u32,
    k: u128,
    g: u128,
) -> Result<u128, MathError> {
    let t = k
        .checked_mul(time_till_maturity as u128)
        .ok_or(MathError::Overflow)?;
    if t >= ONE_64X64 {
        return Err(MathError::ExponentOutOfRange);
    }
    let gt = mul_up(env, p, g, t)?;
    if gt >= ONE_64X64 {
        return Err(MathError::ExponentOutOfRange);
    }
    Ok(ONE_64X64 - gt)
}

fn reserves_value_inner(
    env: &Env,
    p: Precision,
    base_reserves: u128,
    principal_reserves: u128,
    time_till_maturity: u32,
    k: u128,
) -> Result<u128, MathError> {
    check_reserves(base_reserves, principal_reserves)?;
    let a = time_exponent(env, p, time_till_maturity, k, ONE_64X64)?;
    let base_term = pow_down(env, p, base_reserves, a, ONE_64X64)?;
    let principal_term = pow_down(env, p, principal_reserves, a, ONE_64X64)?;
    let sum = base_term
        .checked_add(principal_term)
        .ok_or(MathError::Overflow)?;
    pow_down(env, p, sum / 2, ONE_64X64, a)
}

/// Amount the trader receives when `amount_in` flows into `in_reserve`
///
/// Solves `in^a + out^a = (in + amount)^a + (out - result)^a` for `result`.
/// Kept-side powers round up and the grown side rounds down, so the root
/// lands high and the payout lands low.
fn sell(
    env: &Env,
    p: Precision,
    in_reserve: u128,
    out_reserve: u128,
    amount_in: u128,
    a: u128,
) -> Result<u128, MathError> {
    let in_term = pow_up(env, p, in_reserve, a, ONE_64X64)?;
    let out_term = pow_up(env, p, out_reserve, a, ONE_64X64)?;
    let grown = in_reserve
        .checked_add(amount_in)
        .ok_or(MathError::Overflow)?;
    let grown_term = pow_down(env, p, grown, a, ONE_64X64)?;

    let sum = in_term.checked_add(out_term).ok_or(MathError::Overflow)?;
    let remainder = sum
        .checked_sub(grown_term)
        .ok_or(MathError::InsufficientReserves)?;
    let new_out_reserve = pow_up(env, p, remainder, ONE_64X64, a)?;
    if new_out_reserve == 0 {
        return Err(MathError::InsufficientReserves);
    }

    out_reserve
        .checked_sub(new_out_reserve)
        .ok_or(MathError::InsufficientReserves)
}

/// Amount the trader pays when `amount_out` leaves `out_reserve`
///
/// Solves `pay^a + out^a = (pay + result)^a + (out - amount)^a` for `result`.
/// Kept-side powers round up and the shrunk side rounds down, so the root
/// lands high and the charge lands high.
fn buy(
    env: &Env,
    p: Precision,
    pay_reserve: u128,
    out_reserve: u128,
    amount_out: u128,
    a: u128,
) -> Result<u128, MathError> {
    let shrunk = out_reserve
        .checked_sub(amount_out)
        .ok_or(MathError::InsufficientReserves)?;
    if shrunk == 0 {
        return Err(MathError::InsufficientReserves);
    }

    let pay_term = pow_up(env, p, pay_reserve, a, ONE_64X64)?;
    let out_term = pow_up(env, p, out_reserve, a, ONE_64X64)?;
    let shrunk_term = pow_down(env, p, shrunk, a, ONE_64X64)?;

    let sum = pay_term.checked_add(out_term).ok_or(MathError::Overflow)?;
    let remainder = sum.checked_sub(shrunk_term).ok_or(MathError::Overflow)?;
    let root = pow_up(env, p, remainder, ONE_64X64, a)?;

    // Upward inner rounding keeps the root at or above the untouched reserve
    Ok(root.saturating_sub(pay_reserve))
}

fn pow_down(env: &Env, p: Precision, x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    match p {
        Precision::Bits64 => binary64::pow_round_down(x, y, z),
        Precision::Bits128 => binary128::pow_round_down(env, x, y, z),
    }
}

fn pow_up(env: &Env, p: Precision, x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    match p {
        Precision::Bits64 => binary64::pow_round_up(x, y, z),
        Precision::Bits128 => binary128::pow_round_up(env, x, y, z),
    }
}

fn mul_up(env: &Env, p: Precision, a: u128, b: u128) -> Result<u128, MathError> {
    match p {
        Precision::Bits64 => binary64::mul_round_up(a, b),
        Precision::Bits128 => binary128::mul_round_up(env, a, b),
    }
}
