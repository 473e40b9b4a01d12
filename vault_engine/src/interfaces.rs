//! Collaborators the vault talks to
//!
//! The vault never moves tokens or touches pools itself. Every external effect goes
//! through one of these traits, which keeps the accounting testable against fakes
//! and mocks.

use alloy_primitives::{Address, Bytes, U256};

use crate::{registry::Registry, strategy::descriptor::StrategyStep, utils::error::VaultResult};

/// The vault's underlying token
pub trait UnderlyingToken {
    /// Pulls `amount` from `from` into the vault
    fn transfer_from(&mut self, from: Address, amount: U256) -> VaultResult<()>;

    /// Sends `amount` from the vault to `to`
    fn transfer(&mut self, to: Address, amount: U256) -> VaultResult<()>;

    /// Grants the vault an allowance on behalf of `owner`. An invalid signature is
    /// reported as `InvalidAuthorizationSignature`.
    fn permit(
        &mut self,
        owner: Address,
        value: U256,
        deadline: u64,
        signature: &Bytes,
    ) -> VaultResult<()>;
}

/// Protocol-specific adapter for a pool
pub trait Adapter {
    /// Supplies `amount` of `input_token` to the step's pool and returns the amount of
    /// the step's output token received
    fn deposit(&mut self, step: &StrategyStep, input_token: Address, amount: U256) -> VaultResult<U256>;

    /// Redeems `amount` of the step's output token and returns the amount of
    /// `input_token` received
    fn withdraw(&mut self, step: &StrategyStep, input_token: Address, amount: U256) -> VaultResult<U256>;

    /// Current value of `amount` of the step's output token, in `input_token`
    fn amount_in_input_token(
        &self,
        step: &StrategyStep,
        input_token: Address,
        amount: U256,
    ) -> VaultResult<U256>;

    /// Claims the pool's pending `reward_token` for the vault and returns the amount
    fn claim_rewards(&mut self, step: &StrategyStep, reward_token: Address) -> VaultResult<U256>;
}

/// DEX router used to convert harvested rewards
#[cfg_attr(test, mockall::automock)]
pub trait SwapRouter {
    fn swap_exact_tokens_for_tokens(
        &mut self,
        amount_in: U256,
        min_out: U256,
        path: &[Address],
        recipient: Address,
        deadline: u64,
    ) -> VaultResult<U256>;
}

/// Executes raw calls on behalf of the vault
#[cfg_attr(test, mockall::automock)]
pub trait LowLevelCaller {
    fn call(&mut self, target: Address, data: &Bytes) -> VaultResult<Bytes>;
}

/// Block context and collaborator lookup for one operation
pub trait Environment {
    /// Unix timestamp (seconds) of the current block
    fn now(&self) -> u64;

    fn block_number(&self) -> u64;

    fn registry(&self) -> &Registry;

    fn token(&mut self) -> &mut dyn UnderlyingToken;

    /// Adapter registered for `pool`, `UnknownAdapter` otherwise
    fn adapter(&self, pool: &Address) -> VaultResult<&dyn Adapter>;

    fn adapter_mut(&mut self, pool: &Address) -> VaultResult<&mut dyn Adapter>;

    /// Router deployed at `router`, `UnknownAdapter` otherwise
    fn router(&mut self, router: &Address) -> VaultResult<&mut dyn SwapRouter>;

    fn low_level_caller(&mut self) -> &mut dyn LowLevelCaller;
}
