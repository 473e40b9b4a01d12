use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::sol;
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::{
    config::{ConfigurationQuery, VaultConfiguration},
    settings::VaultSettings,
    state::VaultState,
    status::ValueControls,
    utils::{
        common::{string_to_address, string_to_b256, string_to_u256},
        error::{VaultError, VaultResult},
    },
    whitelist::WhitelistRoots,
};

/// Identity of the party invoking an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub address: Address,
    /// Code fingerprint when the caller is a contract
    pub code_hash: Option<B256>,
}

impl Caller {
    /// An externally owned account
    pub fn account(address: Address) -> Self {
        Self {
            address,
            code_hash: None,
        }
    }

    /// A contract identified by its code hash
    pub fn contract(address: Address, code_hash: B256) -> Self {
        Self {
            address,
            code_hash: Some(code_hash),
        }
    }
}

/// Permit-style authorization attached to a deposit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    /// Unix timestamp (seconds) after which the authorization is void
    pub deadline: u64,
    /// Signature checked by the underlying token
    pub signature: Bytes,
}

/// Fee parameters set by the finance role. Each value is range checked against its
/// configuration field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeParams {
    pub deposit_fee_flat_ut: u64,
    pub deposit_fee_pct: u64,
    pub withdrawal_fee_flat_ut: u64,
    pub withdrawal_fee_pct: u64,
    pub vault_fee_collector: Address,
}

impl FeeParams {
    /// Writes the fee fields into `configuration`, leaving it untouched on failure
    pub fn apply(&self, configuration: &VaultConfiguration) -> VaultResult<VaultConfiguration> {
        let mut updated = *configuration;
        updated
            .deposit_fee_flat_ut(self.deposit_fee_flat_ut)?
            .deposit_fee_pct(self.deposit_fee_pct)?
            .withdrawal_fee_flat_ut(self.withdrawal_fee_flat_ut)?
            .withdrawal_fee_pct(self.withdrawal_fee_pct)?
            .vault_fee_collector(self.vault_fee_collector);
        Ok(updated)
    }
}

#[derive(CandidType, Clone, Debug, Deserialize)]
pub struct FeeParamsInput {
    pub deposit_fee_flat_ut: u64,
    pub deposit_fee_pct: u64,
    pub withdrawal_fee_flat_ut: u64,
    pub withdrawal_fee_pct: u64,
    pub vault_fee_collector: String,
}

impl TryFrom<FeeParamsInput> for FeeParams {
    type Error = VaultError;

    fn try_from(value: FeeParamsInput) -> Result<Self, Self::Error> {
        Ok(Self {
            deposit_fee_flat_ut: value.deposit_fee_flat_ut,
            deposit_fee_pct: value.deposit_fee_pct,
            withdrawal_fee_flat_ut: value.withdrawal_fee_flat_ut,
            withdrawal_fee_pct: value.withdrawal_fee_pct,
            vault_fee_collector: string_to_address(&value.vault_fee_collector)?,
        })
    }
}

/// Value controls as decimal strings
#[derive(CandidType, Clone, Debug, Deserialize)]
pub struct ValueControlsInput {
    pub user_deposit_cap_ut: String,
    pub minimum_deposit_value_ut: String,
    pub total_value_locked_limit_ut: String,
}

impl TryFrom<ValueControlsInput> for ValueControls {
    type Error = VaultError;

    fn try_from(value: ValueControlsInput) -> Result<Self, Self::Error> {
        Ok(Self {
            user_deposit_cap_ut: string_to_u256(&value.user_deposit_cap_ut)?,
            minimum_deposit_value_ut: string_to_u256(&value.minimum_deposit_value_ut)?,
            total_value_locked_limit_ut: string_to_u256(&value.total_value_locked_limit_ut)?,
        })
    }
}

/// Vault initialization payload
#[derive(CandidType, Clone, Debug, Deserialize)]
pub struct VaultInitArgs {
    pub vault: String,
    pub underlying_token: String,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    pub fee_params: FeeParamsInput,
    pub value_controls: ValueControlsInput,
    pub max_vault_value_jump_pct: u64,
    pub risk_profile_code: u64,
    pub allow_whitelisted_state: bool,
    pub whitelisted_accounts_root: Option<String>,
    pub whitelisted_codes_root: Option<String>,
}

impl VaultInitArgs {
    /// Reads the payload from JSON
    pub fn from_json(json: &str) -> VaultResult<Self> {
        serde_json::from_str(json).map_err(|err| VaultError::DecodingError(err.to_string()))
    }
}

impl TryFrom<VaultInitArgs> for (VaultSettings, VaultState) {
    type Error = VaultError;

    /// New vaults start paused, outside emergency shutdown and without a strategy.
    fn try_from(value: VaultInitArgs) -> Result<Self, Self::Error> {
        let mut settings = VaultSettings::default();
        settings
            .vault(string_to_address(&value.vault)?)
            .underlying_token(string_to_address(&value.underlying_token)?)
            .decimals(value.decimals)
            .name(&value.name)
            .symbol(&value.symbol);

        let fee_params = FeeParams::try_from(value.fee_params)?;
        let mut configuration = fee_params.apply(&VaultConfiguration::default())?;
        configuration
            .max_vault_value_jump_pct(value.max_vault_value_jump_pct)?
            .risk_profile_code(value.risk_profile_code)?
            .allow_whitelisted_state(value.allow_whitelisted_state);

        let root = |input: Option<String>| -> VaultResult<B256> {
            input.as_deref().map_or(Ok(B256::ZERO), string_to_b256)
        };
        let whitelist = WhitelistRoots {
            accounts_root: root(value.whitelisted_accounts_root)?,
            codes_root: root(value.whitelisted_codes_root)?,
        };

        let state = VaultState {
            configuration,
            controls: ValueControls::try_from(value.value_controls)?,
            whitelist,
            ..Default::default()
        };
        Ok((settings, state))
    }
}

/// Snapshot of the vault for queries
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct VaultQueryData {
    pub vault: String,
    pub underlying_token: String,
    pub name: String,
    pub symbol: String,
    pub configuration: ConfigurationQuery,
    pub configuration_word: Nat,
    pub total_supply: Nat,
    pub vault_value: Nat,
    pub price_per_share: Nat,
    pub idle_underlying: Nat,
    pub current_strategy_hash: Option<String>,
    pub next_strategy_hash: Option<String>,
}

sol!(
    // Administrative command: an arbitrary call forwarded by governance
    function execute(address target, bytes data) external;
);
