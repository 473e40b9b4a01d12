//! Strategy execution
//!
//! Moves vault capital through the steps of a strategy. Deploying supplies each step
//! the full output of the previous one, in order. Unwinding walks the steps backwards.
//!
//! ```plain
//! deploy:  underlying ─► step 0 ─► token 0 ─► step 1 ─► … ─► position token
//! unwind:  position token ─► step n ─► … ─► step 0 ─► underlying
//! ```
//!
//! Holdings are debited before an adapter is called and credited with what the adapter
//! reports afterwards. The executor only ever works on a draft of the vault state, so
//! a failure anywhere leaves the committed state untouched.

use alloy_primitives::{Address, B256, U256};

use crate::{
    interfaces::Environment,
    settings::VaultSettings,
    state::{Holdings, RebalancePhase, VaultState},
    status::VaultStatus,
    utils::{
        common::mul_div,
        error::{arithmetic_err, VaultError, VaultResult},
    },
};

use super::descriptor::Strategy;

/// Inputs of a harvest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestRequest {
    /// Hash of the strategy the caller expects to be current
    pub strategy_hash: B256,
    pub reward_token: Address,
    pub router: Address,
    /// Least amount of underlying the swap must return
    pub min_out: U256,
    /// Unix timestamp (seconds) after which the harvest is stale
    pub deadline: u64,
    /// Swap path from the reward token to the underlying token
    pub path: Vec<Address>,
}

pub struct StrategyExecutor<'a, E: Environment + ?Sized> {
    settings: &'a VaultSettings,
    state: &'a mut VaultState,
    env: &'a mut E,
}

impl<'a, E: Environment + ?Sized> StrategyExecutor<'a, E> {
    pub fn new(settings: &'a VaultSettings, state: &'a mut VaultState, env: &'a mut E) -> Self {
        Self {
            settings,
            state,
            env,
        }
    }

    pub fn vault_value(&self) -> VaultResult<U256> {
        vault_value(self.settings, self.state, &*self.env)
    }

    /// Deploys `amount` of idle underlying into the current strategy.
    /// Returns the amount of position token received.
    pub fn deposit_to_strategy(&mut self, strategy_hash: B256, amount: U256) -> VaultResult<U256> {
        let strategy = self.current_strategy(strategy_hash)?;
        self.deploy(&strategy, amount)
    }

    /// Unwinds the share of the position that corresponds to `shares` out of
    /// `total_supply`. Returns the underlying received.
    pub fn withdraw_from_strategy(&mut self, shares: U256, total_supply: U256) -> VaultResult<U256> {
        let strategy = match &self.state.current_strategy {
            Some(strategy) => strategy.clone(),
            None => return Ok(U256::ZERO),
        };
        let position = self.state.holdings.balance(&strategy.position_token());
        let amount = mul_div(position, shares, total_supply)?;
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }
        self.unwind(&strategy, amount)
    }

    /// Unwinds the whole position and leaves the vault without a current strategy.
    /// Returns the underlying received.
    pub fn withdraw_all_from_strategy(&mut self) -> VaultResult<U256> {
        let strategy = match self.state.current_strategy.take() {
            Some(strategy) => strategy,
            None => return Ok(U256::ZERO),
        };
        let position = self.state.holdings.balance(&strategy.position_token());
        if position.is_zero() {
            return Ok(U256::ZERO);
        }
        self.unwind(&strategy, position)
    }

    /// Claims `reward_token` from every step of the current strategy and swaps what was
    /// claimed into underlying. Returns the underlying received.
    ///
    /// Only freshly claimed rewards are swapped. The reward token may be neither the
    /// underlying nor a token the strategy holds as a position.
    pub fn harvest(&mut self, request: &HarvestRequest) -> VaultResult<U256> {
        if self.env.now() > request.deadline {
            return Err(VaultError::DeadlineExpired);
        }
        let strategy = self.current_strategy(request.strategy_hash)?;

        let underlying = self.settings.underlying_token;
        if request.reward_token == underlying
            || strategy
                .steps()
                .iter()
                .any(|step| step.output_token == request.reward_token)
        {
            return Err(VaultError::InvalidRewardToken);
        }
        if request.path.len() < 2
            || request.path.first() != Some(&request.reward_token)
            || request.path.last() != Some(&underlying)
        {
            return Err(VaultError::InvalidSwapPath);
        }

        let mut amount_in = U256::ZERO;
        for step in strategy.steps() {
            let claimed = self
                .env
                .adapter_mut(&step.pool)?
                .claim_rewards(step, request.reward_token)?;
            amount_in = amount_in
                .checked_add(claimed)
                .ok_or(arithmetic_err("Claimed rewards overflow."))?;
        }
        if amount_in.is_zero() {
            return Ok(U256::ZERO);
        }

        let vault = self.settings.vault;
        let amount_out = self.env.router(&request.router)?.swap_exact_tokens_for_tokens(
            amount_in,
            request.min_out,
            &request.path,
            vault,
            request.deadline,
        )?;
        if amount_out < request.min_out {
            return Err(VaultError::SlippageExceeded);
        }

        self.state.holdings.credit(underlying, amount_out)?;
        Ok(amount_out)
    }

    /// Moves all capital into the designated next strategy:
    /// unwind the current strategy if any, then deploy every idle unit of underlying.
    /// Returns the amount of underlying deployed.
    pub fn rebalance(&mut self) -> VaultResult<U256> {
        let next = self
            .state
            .next_strategy
            .clone()
            .ok_or(VaultError::NoStrategyDesignated)?;
        VaultStatus::of(&self.state.configuration).ensure_deposits_open()?;
        self.env
            .registry()
            .check_strategy(self.state.configuration.risk_profile_code, &next)?;

        if self.state.current_strategy.is_some() {
            self.state.rebalance_phase = RebalancePhase::WithdrawingOld;
            self.withdraw_all_from_strategy()?;
        }

        self.state.rebalance_phase = RebalancePhase::DepositingNew;
        let idle = self.state.holdings.balance(&self.settings.underlying_token);
        if !idle.is_zero() {
            self.deploy(&next, idle)?;
        }

        self.state.current_strategy = Some(next);
        self.state.next_strategy = None;
        self.state.rebalance_phase = RebalancePhase::Idle;
        Ok(idle)
    }

    fn current_strategy(&self, strategy_hash: B256) -> VaultResult<Strategy> {
        match &self.state.current_strategy {
            Some(strategy) if strategy.hash() == strategy_hash => Ok(strategy.clone()),
            _ => Err(VaultError::StrategyMismatch),
        }
    }

    fn deploy(&mut self, strategy: &Strategy, amount: U256) -> VaultResult<U256> {
        let underlying = self.settings.underlying_token;
        let mut amount = amount;
        for (index, step) in strategy.steps().iter().enumerate() {
            let input_token = strategy.input_token(underlying, index);
            self.state.holdings.debit(input_token, amount)?;
            let received = self
                .env
                .adapter_mut(&step.pool)?
                .deposit(step, input_token, amount)?;
            self.state.holdings.credit(step.output_token, received)?;
            amount = received;
        }
        Ok(amount)
    }

    fn unwind(&mut self, strategy: &Strategy, amount: U256) -> VaultResult<U256> {
        let underlying = self.settings.underlying_token;
        let mut amount = amount;
        for (index, step) in strategy.steps().iter().enumerate().rev() {
            let input_token = strategy.input_token(underlying, index);
            self.state.holdings.debit(step.output_token, amount)?;
            let returned = self
                .env
                .adapter_mut(&step.pool)?
                .withdraw(step, input_token, amount)?;
            self.state.holdings.credit(input_token, returned)?;
            amount = returned;
        }
        Ok(amount)
    }
}

/// Idle underlying plus the value of the current position, in underlying
pub fn vault_value<E: Environment + ?Sized>(
    settings: &VaultSettings,
    state: &VaultState,
    env: &E,
) -> VaultResult<U256> {
    let idle = state.holdings.balance(&settings.underlying_token);
    let position = match &state.current_strategy {
        Some(strategy) => position_value(settings, strategy, &state.holdings, env)?,
        None => U256::ZERO,
    };
    idle.checked_add(position)
        .ok_or(arithmetic_err("Vault value overflow."))
}

/// Value of the position held in `strategy`, converted back through every step
pub fn position_value<E: Environment + ?Sized>(
    settings: &VaultSettings,
    strategy: &Strategy,
    holdings: &Holdings,
    env: &E,
) -> VaultResult<U256> {
    let mut amount = holdings.balance(&strategy.position_token());
    if amount.is_zero() {
        return Ok(U256::ZERO);
    }
    for (index, step) in strategy.steps().iter().enumerate().rev() {
        let input_token = strategy.input_token(settings.underlying_token, index);
        amount = env
            .adapter(&step.pool)?
            .amount_in_input_token(step, input_token, amount)?;
    }
    Ok(amount)
}
