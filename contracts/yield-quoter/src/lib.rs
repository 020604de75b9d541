#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, Env};
use yield_math::{
    base_in_for_principal_out, base_out_for_principal_in, principal_in_for_base_out,
    principal_out_for_base_in, reserves_value,
};
use yield_types::{Market, MathError};

#[contract]
pub struct YieldQuoter;

/// Storage keys
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Market,
}

#[contractimpl]
impl YieldQuoter {
    /// Initialize the quoter with its market parameters
    pub fn initialize(env: Env, market: Market) {
        if env.storage().instance().has(&DataKey::Market) {
            panic!("Already initialized");
        }
        env.storage().instance().set(&DataKey::Market, &market);
    }

    /// Get the stored market parameters
    pub fn market(env: Env) -> Market {
        get_market(&env)
    }

    /// Principal received for selling `base_in`, at the current ledger time
    pub fn preview_sell_base(
        env: Env,
        base_reserves: u128,
        principal_reserves: u128,
        base_in: u128,
    ) -> u128 {
        let market = get_market(&env);
        let ttm = market.time_till_maturity(env.ledger().timestamp());
        unwrap_quote(principal_out_for_base_in(
            &env,
            base_reserves,
            principal_reserves,
            base_in,
            ttm,
            market.k,
            market.g1,
        ))
    }

    /// Base received for selling `principal_in`
    pub fn preview_sell_principal(
        env: Env,
        base_reserves: u128,
        principal_reserves: u128,
        principal_in: u128,
    ) -> u128 {
        let market = get_market(&env);
        let ttm = market.time_till_maturity(env.ledger().timestamp());
        unwrap_quote(base_out_for_principal_in(
            &env,
            base_reserves,
            principal_reserves,
            principal_in,
            ttm,
            market.k,
            market.g2,
        ))
    }

    /// Base required to buy `principal_out`
    pub fn preview_buy_principal(
        env: Env,
        base_reserves: u128,
        principal_reserves: u128,
        principal_out: u128,
    ) -> u128 {
        let market = get_market(&env);
        let ttm = market.time_till_maturity(env.ledger().timestamp());
        unwrap_quote(base_in_for_principal_out(
            &env,
            base_reserves,
            principal_reserves,
            principal_out,
            ttm,
            market.k,
            market.g2,
        ))
    }

    /// Principal required to buy `base_out`
    pub fn preview_buy_base(
        env: Env,
        base_reserves: u128,
        principal_reserves: u128,
        base_out: u128,
    ) -> u128 {
        let market = get_market(&env);
        let ttm = market.time_till_maturity(env.ledger().timestamp());
        unwrap_quote(principal_in_for_base_out(
            &env,
            base_reserves,
            principal_reserves,
            base_out,
            ttm,
            market.k,
            market.g1,
        ))
    }

    /// Per-unit pool value under the constant-power invariant, at the
    /// current ledger time
    pub fn pool_value(env: Env, base_reserves: u128, principal_reserves: u128) -> u128 {
        let market = get_market(&env);
        let ttm = market.time_till_maturity(env.ledger().timestamp());
        unwrap_quote(reserves_value(
            &env,
            base_reserves,
            principal_reserves,
            ttm,
            market.k,
        ))
    }
}

fn get_market(env: &Env) -> Market {
    env.storage()
        .instance()
        .get(&DataKey::Market)
        .expect("Not initialized")
}

fn unwrap_quote(result: Result<u128, MathError>) -> u128 {
    match result {
        Ok(amount) => amount,
        Err(MathError::Overflow) => panic!("Overflow"),
        Err(MathError::DivisionByZero) => panic!("Division by zero"),
        Err(MathError::ExponentOutOfRange) => panic!("Exponent out of range"),
        Err(MathError::InsufficientReserves) => panic!("Insufficient reserves"),
    }
}
