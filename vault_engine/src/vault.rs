//! The vault
//!
//! Every state-changing operation follows the same shape:
//!
//! ```plain
//! ┌────────┐   ┌─────────┐   ┌──────────────┐   ┌────────┐   ┌─────────┐
//! │ checks ├──►│ effects ├──►│ interactions ├──►│ commit ├──►│ journal │
//! └────────┘   └─────────┘   └──────────────┘   └────────┘   └─────────┘
//! ```
//!
//! Checks and effects run against a draft of the state. External calls come last and
//! the draft replaces the state only when every call succeeded. The journal records
//! the outcome either way.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    config::VaultConfiguration,
    fees::{calc_deposit_fee, calc_withdrawal_fee, net_of_fee},
    interfaces::Environment,
    journal::{Journal, JournalEntry, LogType},
    ledger::{amount_for_shares, price_per_share, shares_for_deposit},
    registry::Role,
    settings::VaultSettings,
    state::{transact, VaultState},
    status::{check_deposit_admission, check_withdraw_admission, DepositRequest, ValueControls, VaultStatus},
    strategy::{
        descriptor::{Strategy, StrategyStep},
        executor::{vault_value, HarvestRequest, StrategyExecutor},
    },
    types::{executeCall, Authorization, Caller, FeeParams, VaultInitArgs, VaultQueryData},
    utils::{
        common::u256_to_nat,
        error::{VaultError, VaultResult},
    },
};

pub struct Vault {
    settings: VaultSettings,
    state: VaultState,
    journal: Journal,
}

impl Vault {
    pub fn new(settings: VaultSettings, state: VaultState) -> VaultResult<Self> {
        Ok(Self {
            settings,
            state,
            journal: Journal::new()?,
        })
    }

    pub fn from_init_args(args: VaultInitArgs) -> VaultResult<Self> {
        let (settings, state) = <(VaultSettings, VaultState)>::try_from(args)?;
        Self::new(settings, state)
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Deposits `amount` of underlying from the caller and mints shares to `beneficiary`.
    /// Returns the shares minted.
    pub fn deposit<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Caller,
        beneficiary: Address,
        amount: U256,
        authorization: Option<&Authorization>,
        proof: &[B256],
    ) -> VaultResult<U256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            let value = vault_value(settings, state, &*env)?;
            check_deposit_admission(
                &state.configuration,
                &state.controls,
                &state.whitelist,
                &DepositRequest {
                    caller,
                    proof,
                    amount,
                    existing_deposits: state.ledger.total_deposits(&beneficiary),
                    vault_value: value,
                },
            )?;
            if let Some(authorization) = authorization {
                if env.now() > authorization.deadline {
                    return Err(VaultError::ExpiredAuthorization);
                }
            }

            let supply = state.ledger.total_supply();
            observe_price(state, env.block_number(), value, supply)?;

            let fee = calc_deposit_fee(amount, &state.configuration, settings.decimals)?;
            let net = net_of_fee(amount, fee)?;
            let shares = shares_for_deposit(net, supply, value)?;
            if shares.is_zero() {
                return Err(VaultError::BelowMinimumDeposit);
            }

            state.ledger.mint(beneficiary, shares)?;
            state.ledger.record_deposit(beneficiary, amount);
            state.holdings.credit(settings.underlying_token, net)?;

            let collector = state.configuration.vault_fee_collector;
            let token = env.token();
            if let Some(authorization) = authorization {
                token.permit(
                    caller.address,
                    amount,
                    authorization.deadline,
                    &authorization.signature,
                )?;
            }
            token.transfer_from(caller.address, amount)?;
            if !fee.is_zero() {
                token.transfer(collector, fee)?;
            }
            Ok(shares)
        });

        let note = result
            .as_ref()
            .ok()
            .map(|shares| format!("Minted {} shares for {} underlying.", shares, amount));
        self.log(env.now(), LogType::Operation, "deposit", &beneficiary, &result, note);
        result
    }

    /// Burns `shares` of the caller and sends the underlying, net of fees, to
    /// `beneficiary`. Returns the amount sent.
    pub fn withdraw<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Caller,
        beneficiary: Address,
        shares: U256,
        proof: &[B256],
    ) -> VaultResult<U256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            check_withdraw_admission(&state.configuration, &state.whitelist, caller, proof)?;
            let owner = caller.address;
            if shares > state.ledger.balance_of(&owner) {
                return Err(VaultError::InsufficientShares);
            }

            let supply = state.ledger.total_supply();
            let value = vault_value(settings, state, &*env)?;
            observe_price(state, env.block_number(), value, supply)?;
            let gross = amount_for_shares(shares, supply, value)?;

            state.ledger.burn(owner, shares)?;
            state.ledger.record_withdrawal(owner, gross);

            let underlying = settings.underlying_token;
            if state.holdings.balance(&underlying) < gross {
                StrategyExecutor::new(settings, state, &mut *env)
                    .withdraw_from_strategy(shares, supply)?;
            }
            let payable = gross.min(state.holdings.balance(&underlying));
            let fee = calc_withdrawal_fee(payable, &state.configuration, settings.decimals)?;
            let net = net_of_fee(payable, fee)?;
            state.holdings.debit(underlying, payable)?;

            let collector = state.configuration.vault_fee_collector;
            let token = env.token();
            token.transfer(beneficiary, net)?;
            if !fee.is_zero() {
                token.transfer(collector, fee)?;
            }
            Ok(net)
        });

        let note = result
            .as_ref()
            .ok()
            .map(|amount| format!("Burned {} shares for {} underlying.", shares, amount));
        self.log(env.now(), LogType::Operation, "withdraw", &caller.address, &result, note);
        result
    }

    /// Moves shares between accounts
    pub fn transfer<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        to: Address,
        shares: U256,
    ) -> VaultResult<()> {
        let vault = self.settings.vault;
        let result = transact(&mut self.state, |state| {
            if to == vault {
                return Err(VaultError::TransferToVaultItself);
            }
            state.ledger.transfer(*caller, to, shares)
        });
        self.log(env.now(), LogType::Operation, "transfer", caller, &result, None);
        result
    }

    /// Designates the strategy the next rebalance moves the capital into.
    /// Strategy operator only. Returns the strategy hash.
    pub fn set_next_strategy<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        steps: Vec<StrategyStep>,
    ) -> VaultResult<B256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::StrategyOperator)?;
            match env.registry().tokens(&settings.underlying_tokens_hash) {
                Some(tokens) if tokens.contains(&settings.underlying_token) => {}
                _ => return Err(VaultError::UnknownTokensHash),
            }
            let strategy = Strategy::new(settings.underlying_tokens_hash, steps)?;
            env.registry()
                .check_strategy(state.configuration.risk_profile_code, &strategy)?;
            let hash = strategy.hash();
            state.next_strategy = Some(strategy);
            Ok(hash)
        });
        let note = result.as_ref().ok().map(|hash| format!("Next strategy {}.", hash));
        self.log(env.now(), LogType::Configuration, "set_next_strategy", caller, &result, note);
        result
    }

    /// Moves the capital into the designated next strategy. Open to anyone.
    /// Returns the amount of underlying deployed.
    pub fn rebalance<E: Environment + ?Sized>(&mut self, env: &mut E, caller: &Address) -> VaultResult<U256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            StrategyExecutor::new(settings, state, &mut *env).rebalance()
        });
        let note = result.as_ref().ok().map(|amount| format!("Deployed {} underlying.", amount));
        self.log(env.now(), LogType::Operation, "rebalance", caller, &result, note);
        result
    }

    /// Deploys idle underlying into the current strategy. Strategy operator only.
    pub fn deposit_to_strategy<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        strategy_hash: B256,
        amount: U256,
    ) -> VaultResult<U256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::StrategyOperator)?;
            VaultStatus::of(&state.configuration).ensure_deposits_open()?;
            StrategyExecutor::new(settings, state, &mut *env).deposit_to_strategy(strategy_hash, amount)
        });
        self.log(env.now(), LogType::Operation, "deposit_to_strategy", caller, &result, None);
        result
    }

    /// Claims and swaps strategy rewards into underlying. Strategy operator only.
    pub fn harvest<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        request: &HarvestRequest,
    ) -> VaultResult<U256> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::StrategyOperator)?;
            StrategyExecutor::new(settings, state, &mut *env).harvest(request)
        });
        let note = result.as_ref().ok().map(|amount| format!("Harvested {} underlying.", amount));
        self.log(env.now(), LogType::Operation, "harvest", caller, &result, note);
        result
    }

    /// Finance operator only
    pub fn set_fee_params<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        params: &FeeParams,
    ) -> VaultResult<()> {
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::FinanceOperator)?;
            state.configuration = params.apply(&state.configuration)?;
            Ok(())
        });
        self.log(env.now(), LogType::Configuration, "set_fee_params", caller, &result, None);
        result
    }

    /// Finance operator only
    pub fn set_value_control_params<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        controls: ValueControls,
    ) -> VaultResult<()> {
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::FinanceOperator)?;
            state.controls = controls;
            Ok(())
        });
        self.log(env.now(), LogType::Configuration, "set_value_control_params", caller, &result, None);
        result
    }

    /// Replaces the whole configuration with a packed word. Governance only.
    pub fn set_vault_configuration<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        word: U256,
    ) -> VaultResult<()> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            let configuration = VaultConfiguration::unpack(word)?;
            if configuration.risk_profile_code != state.configuration.risk_profile_code {
                env.registry().risk_profile(configuration.risk_profile_code)?;
            }
            apply_configuration(settings, state, &mut *env, configuration)
        });
        let note = Some(format!("Configuration word {}.", word));
        self.log(env.now(), LogType::Configuration, "set_vault_configuration", caller, &result, note);
        result
    }

    /// Governance only. Proofs issued against the previous root stop working.
    pub fn set_whitelisted_accounts_root<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        root: B256,
    ) -> VaultResult<()> {
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            state.whitelist.accounts_root = root;
            Ok(())
        });
        self.log(env.now(), LogType::Configuration, "set_whitelisted_accounts_root", caller, &result, None);
        result
    }

    /// Governance only. Proofs issued against the previous root stop working.
    pub fn set_whitelisted_codes_root<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        root: B256,
    ) -> VaultResult<()> {
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            state.whitelist.codes_root = root;
            Ok(())
        });
        self.log(env.now(), LogType::Configuration, "set_whitelisted_codes_root", caller, &result, None);
        result
    }

    /// Governance only. The code must be registered.
    pub fn set_risk_profile_code<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        caller: &Address,
        code: u8,
    ) -> VaultResult<()> {
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            env.registry().risk_profile(code)?;
            state.configuration.risk_profile_code(u64::from(code))?;
            Ok(())
        });
        self.log(env.now(), LogType::Configuration, "set_risk_profile_code", caller, &result, None);
        result
    }

    /// Governance only. Pausing pulls the capital out of the current strategy.
    pub fn set_unpaused<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        unpaused: bool,
    ) -> VaultResult<()> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            let mut configuration = state.configuration;
            configuration.unpaused(unpaused);
            apply_configuration(settings, state, &mut *env, configuration)
        });
        let note = Some(format!("unpaused = {}", unpaused));
        self.log(env.now(), LogType::Configuration, "set_unpaused", caller, &result, note);
        result
    }

    /// Governance only. Entering shutdown pulls the capital out of the current strategy.
    pub fn set_emergency_shutdown<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        emergency_shutdown: bool,
    ) -> VaultResult<()> {
        let settings = &self.settings;
        let result = transact(&mut self.state, |state| {
            env.registry().require_role(caller, Role::Governance)?;
            let mut configuration = state.configuration;
            configuration.emergency_shutdown(emergency_shutdown);
            apply_configuration(settings, state, &mut *env, configuration)
        });
        let note = Some(format!("emergency_shutdown = {}", emergency_shutdown));
        self.log(env.now(), LogType::Configuration, "set_emergency_shutdown", caller, &result, note);
        result
    }

    /// Executes ABI-encoded `execute(address,bytes)` commands in order. Governance only.
    /// Every command is decoded before the first one runs.
    pub fn admin_call<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        commands: &[Bytes],
    ) -> VaultResult<Vec<Bytes>> {
        let result = transact(&mut self.state, |_| {
            env.registry().require_role(caller, Role::Governance)?;
            let calls = commands
                .iter()
                .map(|command| {
                    executeCall::abi_decode(command, true)
                        .map_err(|err| VaultError::DecodingError(err.to_string()))
                })
                .collect::<VaultResult<Vec<_>>>()?;

            let low_level = env.low_level_caller();
            calls
                .into_iter()
                .map(|call| low_level.call(call.target, &call.data))
                .collect()
        });
        let note = Some(format!("{} commands.", commands.len()));
        self.log(env.now(), LogType::Configuration, "admin_call", caller, &result, note);
        result
    }

    pub fn status(&self) -> VaultStatus {
        VaultStatus::of(&self.state.configuration)
    }

    pub fn configuration_word(&self) -> U256 {
        self.state.configuration.pack()
    }

    pub fn vault_value<E: Environment + ?Sized>(&self, env: &E) -> VaultResult<U256> {
        vault_value(&self.settings, &self.state, env)
    }

    /// Underlying per share, scaled by 1e18
    pub fn price_per_share<E: Environment + ?Sized>(&self, env: &E) -> VaultResult<U256> {
        price_per_share(self.vault_value(env)?, self.total_supply())
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.state.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> U256 {
        self.state.ledger.total_supply()
    }

    pub fn total_deposits(&self, account: &Address) -> U256 {
        self.state.ledger.total_deposits(account)
    }

    pub fn current_strategy_hash(&self) -> Option<B256> {
        self.state.current_strategy.as_ref().map(Strategy::hash)
    }

    pub fn next_strategy_hash(&self) -> Option<B256> {
        self.state.next_strategy.as_ref().map(Strategy::hash)
    }

    pub fn query_data<E: Environment + ?Sized>(&self, env: &E) -> VaultResult<VaultQueryData> {
        let value = self.vault_value(env)?;
        let supply = self.total_supply();
        Ok(VaultQueryData {
            vault: self.settings.vault.to_checksum(None),
            underlying_token: self.settings.underlying_token.to_checksum(None),
            name: self.settings.name.clone(),
            symbol: self.settings.symbol.clone(),
            configuration: self.state.configuration.into(),
            configuration_word: u256_to_nat(&self.configuration_word()),
            total_supply: u256_to_nat(&supply),
            vault_value: u256_to_nat(&value),
            price_per_share: u256_to_nat(&price_per_share(value, supply)?),
            idle_underlying: u256_to_nat(&self.state.holdings.balance(&self.settings.underlying_token)),
            current_strategy_hash: self.current_strategy_hash().map(|hash| hash.to_string()),
            next_strategy_hash: self.next_strategy_hash().map(|hash| hash.to_string()),
        })
    }

    fn log<T>(
        &self,
        timestamp: u64,
        log_type: LogType,
        operation: &str,
        account: &Address,
        result: &VaultResult<T>,
        note: Option<String>,
    ) {
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        let mut entry = JournalEntry::new(outcome, log_type, timestamp);
        entry.operation(operation).account(account);
        if let Some(note) = note {
            entry.note(note);
        }
        entry.commit(&self.journal);
    }
}

/// Feeds the pre-operation share price to the intra-block jump guard
fn observe_price(state: &mut VaultState, block: u64, value: U256, supply: U256) -> VaultResult<()> {
    if supply.is_zero() {
        return Ok(());
    }
    let price = price_per_share(value, supply)?;
    let max_jump_pct = state.configuration.max_vault_value_jump_pct;
    state.value_window.observe(block, price, max_jump_pct)
}

/// Installs `configuration`. Leaving the active status pulls all capital back to idle.
fn apply_configuration<E: Environment + ?Sized>(
    settings: &VaultSettings,
    state: &mut VaultState,
    env: &mut E,
    configuration: VaultConfiguration,
) -> VaultResult<()> {
    state.configuration = configuration;
    if VaultStatus::of(&configuration) != VaultStatus::Active && state.current_strategy.is_some() {
        StrategyExecutor::new(settings, state, env).withdraw_all_from_strategy()?;
    }
    Ok(())
}
