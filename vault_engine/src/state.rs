//! Mutable vault state
//!
//! Everything an operation may change lives in [`VaultState`], owned by the vault and
//! handed out by exclusive reference. Operations run against a copy and the copy
//! replaces the state only when the operation succeeds, so a failure at any step
//! leaves no partial effect.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::{
    config::VaultConfiguration,
    constants::fee_denominator,
    ledger::ShareLedger,
    status::ValueControls,
    strategy::descriptor::Strategy,
    utils::{
        common::mul_div,
        error::{arithmetic_err, VaultError, VaultResult},
    },
    whitelist::WhitelistRoots,
};

#[derive(Clone, Debug, Default)]
pub struct VaultState {
    pub configuration: VaultConfiguration,
    pub controls: ValueControls,
    pub whitelist: WhitelistRoots,
    pub ledger: ShareLedger,
    /// Tokens held by the vault: idle underlying, strategy positions and rewards
    pub holdings: Holdings,
    /// Strategy the vault capital is deployed in
    pub current_strategy: Option<Strategy>,
    /// Strategy designated by the strategy operator for the next rebalance
    pub next_strategy: Option<Strategy>,
    pub value_window: BlockValueWindow,
    pub rebalance_phase: RebalancePhase,
}

/// Token balances held by the vault
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Holdings(BTreeMap<Address, U256>);

impl Holdings {
    pub fn balance(&self, token: &Address) -> U256 {
        self.0.get(token).copied().unwrap_or_default()
    }

    pub fn credit(&mut self, token: Address, amount: U256) -> VaultResult<()> {
        let balance = self
            .balance(&token)
            .checked_add(amount)
            .ok_or(arithmetic_err("Holdings overflow."))?;
        self.set(token, balance);
        Ok(())
    }

    pub fn debit(&mut self, token: Address, amount: U256) -> VaultResult<()> {
        let balance = self
            .balance(&token)
            .checked_sub(amount)
            .ok_or(arithmetic_err("Insufficient holdings."))?;
        self.set(token, balance);
        Ok(())
    }

    fn set(&mut self, token: Address, balance: U256) {
        if balance.is_zero() {
            self.0.remove(&token);
        } else {
            self.0.insert(token, balance);
        }
    }
}

/// Range of share prices observed within the current block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockValueWindow {
    block: Option<u64>,
    low: U256,
    high: U256,
}

impl BlockValueWindow {
    /// Records `price` for `block` and fails when the spread of the block exceeds
    /// `max_jump_pct` basis points of `price`. A new block starts a new window.
    pub fn observe(&mut self, block: u64, price: U256, max_jump_pct: u16) -> VaultResult<()> {
        if self.block != Some(block) {
            self.block = Some(block);
            self.low = price;
            self.high = price;
            return Ok(());
        }

        self.low = self.low.min(price);
        self.high = self.high.max(price);
        if price.is_zero() {
            return Ok(());
        }

        let spread = mul_div(self.high - self.low, fee_denominator(), price)?;
        if spread > U256::from(max_jump_pct) {
            return Err(VaultError::VaultValueJumpExceeded);
        }
        Ok(())
    }
}

/// Rebalance progress
///
/// ```plain
///        current strategy set
///   Idle ────────────────────► WithdrawingOld
///    ▲  │                            │
///    │  │ no current strategy        ▼
///    │  └───────────────────► DepositingNew
///    │                               │
///    └───────────────────────────────┘
/// ```
///
/// A failed rebalance discards the whole attempt, so the committed state is always `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RebalancePhase {
    #[default]
    Idle,
    WithdrawingOld,
    DepositingNew,
}

/// Runs `operation` on a copy of `state` and commits the copy only on success
pub fn transact<T, F>(state: &mut VaultState, operation: F) -> VaultResult<T>
where
    F: FnOnce(&mut VaultState) -> VaultResult<T>,
{
    let mut draft = state.clone();
    let output = operation(&mut draft)?;
    *state = draft;
    Ok(output)
}
