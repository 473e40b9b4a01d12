//! Share ledger and share/price accounting
//!
//! Shares are minted against the vault value before the deposit and burned against
//! the vault value before the withdrawal. All divisions floor, so rounding never moves
//! value from the pool to the account on either side.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::{
    constants::scale,
    utils::{
        common::mul_div,
        error::{arithmetic_err, VaultError, VaultResult},
    },
};

/// Account balances of vault shares
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareLedger {
    balances: BTreeMap<Address, U256>,
    total_supply: U256,
    /// Underlying deposited per account, net of withdrawals. Reporting and user caps only.
    total_deposits: BTreeMap<Address, U256>,
}

impl ShareLedger {
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn total_deposits(&self, account: &Address) -> U256 {
        self.total_deposits.get(account).copied().unwrap_or_default()
    }

    /// Credits freshly minted shares
    pub fn mint(&mut self, account: Address, shares: U256) -> VaultResult<()> {
        let supply = self
            .total_supply
            .checked_add(shares)
            .ok_or(arithmetic_err("Total supply overflow."))?;
        let balance = self.balance_of(&account) + shares; // bounded by the supply
        self.total_supply = supply;
        self.set_balance(account, balance);
        Ok(())
    }

    /// Destroys shares owned by `account`
    pub fn burn(&mut self, account: Address, shares: U256) -> VaultResult<()> {
        let balance = self
            .balance_of(&account)
            .checked_sub(shares)
            .ok_or(VaultError::InsufficientShares)?;
        self.total_supply -= shares; // the balance is part of the supply
        self.set_balance(account, balance);
        Ok(())
    }

    /// Moves shares between accounts. Destination checks belong to the caller.
    pub fn transfer(&mut self, from: Address, to: Address, shares: U256) -> VaultResult<()> {
        let from_balance = self
            .balance_of(&from)
            .checked_sub(shares)
            .ok_or(VaultError::InsufficientShares)?;
        self.set_balance(from, from_balance);
        let to_balance = self.balance_of(&to) + shares;
        self.set_balance(to, to_balance);
        Ok(())
    }

    /// Records underlying deposited on behalf of `account`
    pub fn record_deposit(&mut self, account: Address, amount: U256) {
        let deposits = self.total_deposits(&account).saturating_add(amount);
        self.total_deposits.insert(account, deposits);
    }

    /// Reduces the deposits of `account`, never below zero
    pub fn record_withdrawal(&mut self, account: Address, amount: U256) {
        let deposits = self.total_deposits(&account).saturating_sub(amount);
        if deposits.is_zero() {
            self.total_deposits.remove(&account);
        } else {
            self.total_deposits.insert(account, deposits);
        }
    }

    /// Sum of every balance. Equal to `total_supply` at all times.
    pub fn sum_of_balances(&self) -> U256 {
        self.balances.values().fold(U256::ZERO, |sum, balance| sum + *balance)
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

/// Shares minted for a net deposit.
///
/// 1:1 when nothing has been minted yet. A pool holding residual value with no supply
/// mints 1:1 as well: the first depositor absorbs the dust. Outstanding shares over a
/// worthless pool cannot be priced, so the deposit is refused.
pub fn shares_for_deposit(net_amount: U256, total_supply: U256, vault_value: U256) -> VaultResult<U256> {
    if total_supply.is_zero() {
        return Ok(net_amount);
    }
    if vault_value.is_zero() {
        return Err(VaultError::ZeroVaultValue);
    }
    mul_div(net_amount, total_supply, vault_value)
}

/// Underlying owed for burning `shares`, before fees
pub fn amount_for_shares(shares: U256, total_supply: U256, vault_value: U256) -> VaultResult<U256> {
    if shares > total_supply {
        return Err(VaultError::InsufficientShares);
    }
    if total_supply.is_zero() {
        return Ok(U256::ZERO);
    }
    mul_div(shares, vault_value, total_supply)
}

/// `vault_value * 1e18 / total_supply`, zero for an empty supply
pub fn price_per_share(vault_value: U256, total_supply: U256) -> VaultResult<U256> {
    if total_supply.is_zero() {
        return Ok(U256::ZERO);
    }
    mul_div(vault_value, scale(), total_supply)
}
