//! Deposit and withdrawal fee computation
//!
//! `fee = floor(amount * pct / 10_000) + flat * 10^decimals`
//!
//! The flat component is configured in whole units of the underlying token and is
//! scaled to the token's smallest unit here.

use alloy_primitives::U256;

use crate::{
    config::VaultConfiguration,
    constants::fee_denominator,
    utils::{
        common::mul_div,
        error::{arithmetic_err, VaultError, VaultResult},
    },
};

/// Fee charged on a deposit of `amount`
pub fn calc_deposit_fee(
    amount: U256,
    configuration: &VaultConfiguration,
    decimals: u8,
) -> VaultResult<U256> {
    calc_fee(
        amount,
        configuration.deposit_fee_pct,
        configuration.deposit_fee_flat_ut,
        decimals,
    )
}

/// Fee charged on a withdrawal of `amount`
pub fn calc_withdrawal_fee(
    amount: U256,
    configuration: &VaultConfiguration,
    decimals: u8,
) -> VaultResult<U256> {
    calc_fee(
        amount,
        configuration.withdrawal_fee_pct,
        configuration.withdrawal_fee_flat_ut,
        decimals,
    )
}

/// Amount left after the fee. A fee larger than the amount is an error, never clamped.
pub fn net_of_fee(amount: U256, fee: U256) -> VaultResult<U256> {
    amount
        .checked_sub(fee)
        .ok_or(VaultError::FeeExceedsAmount)
}

fn calc_fee(amount: U256, pct: u16, flat: u16, decimals: u8) -> VaultResult<U256> {
    let proportional = mul_div(amount, U256::from(pct), fee_denominator())?;
    let flat = U256::from(flat)
        .checked_mul(U256::from(10).pow(U256::from(decimals)))
        .ok_or(arithmetic_err("Flat fee overflow."))?;
    proportional
        .checked_add(flat)
        .ok_or(arithmetic_err("Fee overflow."))
}
