//! Packed vault configuration register
//!
//! The configuration is persisted as a single 256-bit word. Field offsets are a wire
//! contract shared with already stored values and must never move.
//!
//! ```plain
//!  255   251 250 249 248 247   240 239                      80 79   64 63   48 47   32 31   16 15    0
//! ┌───────┬───┬───┬───┬─────────┬──────────────────────────┬───────┬───────┬───────┬───────┬───────┐
//! │reserved│ W │ U │ E │  risk   │     vault fee collector   │ jump  │ w.pct │ w.flat│ d.pct │ d.flat│
//! └───────┴───┴───┴───┴─────────┴──────────────────────────┴───────┴───────┴───────┴───────┴───────┘
//!   W = allow whitelisted state, U = unpaused, E = emergency shutdown
//! ```

use alloy_primitives::{Address, U256};
use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::utils::error::{field_overflow, VaultResult};

/// Named region of the configuration word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigField {
    DepositFeeFlatUt,
    DepositFeePct,
    WithdrawalFeeFlatUt,
    WithdrawalFeePct,
    MaxVaultValueJumpPct,
    VaultFeeCollector,
    RiskProfileCode,
    EmergencyShutdown,
    Unpaused,
    AllowWhitelistedState,
}

impl ConfigField {
    pub const ALL: [ConfigField; 10] = [
        ConfigField::DepositFeeFlatUt,
        ConfigField::DepositFeePct,
        ConfigField::WithdrawalFeeFlatUt,
        ConfigField::WithdrawalFeePct,
        ConfigField::MaxVaultValueJumpPct,
        ConfigField::VaultFeeCollector,
        ConfigField::RiskProfileCode,
        ConfigField::EmergencyShutdown,
        ConfigField::Unpaused,
        ConfigField::AllowWhitelistedState,
    ];

    /// First bit of the field
    pub const fn offset(self) -> usize {
        match self {
            ConfigField::DepositFeeFlatUt => 0,
            ConfigField::DepositFeePct => 16,
            ConfigField::WithdrawalFeeFlatUt => 32,
            ConfigField::WithdrawalFeePct => 48,
            ConfigField::MaxVaultValueJumpPct => 64,
            ConfigField::VaultFeeCollector => 80,
            ConfigField::RiskProfileCode => 240,
            ConfigField::EmergencyShutdown => 248,
            ConfigField::Unpaused => 249,
            ConfigField::AllowWhitelistedState => 250,
        }
    }

    /// Number of bits owned by the field
    pub const fn width(self) -> usize {
        match self {
            ConfigField::VaultFeeCollector => 160,
            ConfigField::RiskProfileCode => 8,
            ConfigField::EmergencyShutdown
            | ConfigField::Unpaused
            | ConfigField::AllowWhitelistedState => 1,
            _ => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ConfigField::DepositFeeFlatUt => "depositFeeFlatUT",
            ConfigField::DepositFeePct => "depositFeePct",
            ConfigField::WithdrawalFeeFlatUt => "withdrawalFeeFlatUT",
            ConfigField::WithdrawalFeePct => "withdrawalFeePct",
            ConfigField::MaxVaultValueJumpPct => "maxVaultValueJumpPct",
            ConfigField::VaultFeeCollector => "vaultFeeCollector",
            ConfigField::RiskProfileCode => "riskProfileCode",
            ConfigField::EmergencyShutdown => "emergencyShutdown",
            ConfigField::Unpaused => "unpaused",
            ConfigField::AllowWhitelistedState => "allowWhitelistedState",
        }
    }

    /// Mask of the field's value, before shifting into position
    fn value_mask(self) -> U256 {
        (U256::from(1) << self.width()) - U256::from(1)
    }

    /// Reads the field out of a word. Bits outside the field are never observed.
    pub fn read(self, word: U256) -> U256 {
        (word >> self.offset()) & self.value_mask()
    }
}

/// Bits above the last field. They must stay zero.
const RESERVED_OFFSET: usize = 251;

/// Decoded vault configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VaultConfiguration {
    /// Flat deposit fee, in whole units of the underlying token
    pub deposit_fee_flat_ut: u16,
    /// Deposit fee in basis points
    pub deposit_fee_pct: u16,
    /// Flat withdrawal fee, in whole units of the underlying token
    pub withdrawal_fee_flat_ut: u16,
    /// Withdrawal fee in basis points
    pub withdrawal_fee_pct: u16,
    /// Largest tolerated intra-block vault value spread, in basis points
    pub max_vault_value_jump_pct: u16,
    pub vault_fee_collector: Address,
    pub risk_profile_code: u8,
    pub emergency_shutdown: bool,
    pub unpaused: bool,
    pub allow_whitelisted_state: bool,
}

impl VaultConfiguration {
    /// Encodes the configuration into its packed word
    pub fn pack(&self) -> U256 {
        let mut word = U256::ZERO;
        for field in ConfigField::ALL {
            // every typed field fits its region
            word |= self.raw_field(field) << field.offset();
        }
        word
    }

    /// Decodes a packed word. Words with reserved bits set are rejected.
    pub fn unpack(word: U256) -> VaultResult<Self> {
        if word >> RESERVED_OFFSET != U256::ZERO {
            return Err(field_overflow("reserved"));
        }

        let narrow = |field: ConfigField| field.read(word).to::<u64>();
        let collector = ConfigField::VaultFeeCollector.read(word).to_be_bytes::<32>();

        Ok(Self {
            deposit_fee_flat_ut: narrow(ConfigField::DepositFeeFlatUt) as u16,
            deposit_fee_pct: narrow(ConfigField::DepositFeePct) as u16,
            withdrawal_fee_flat_ut: narrow(ConfigField::WithdrawalFeeFlatUt) as u16,
            withdrawal_fee_pct: narrow(ConfigField::WithdrawalFeePct) as u16,
            max_vault_value_jump_pct: narrow(ConfigField::MaxVaultValueJumpPct) as u16,
            vault_fee_collector: Address::from_slice(&collector[12..]),
            risk_profile_code: narrow(ConfigField::RiskProfileCode) as u8,
            emergency_shutdown: narrow(ConfigField::EmergencyShutdown) == 1,
            unpaused: narrow(ConfigField::Unpaused) == 1,
            allow_whitelisted_state: narrow(ConfigField::AllowWhitelistedState) == 1,
        })
    }

    /// Raw value of a field, right-aligned
    pub fn raw_field(&self, field: ConfigField) -> U256 {
        match field {
            ConfigField::DepositFeeFlatUt => U256::from(self.deposit_fee_flat_ut),
            ConfigField::DepositFeePct => U256::from(self.deposit_fee_pct),
            ConfigField::WithdrawalFeeFlatUt => U256::from(self.withdrawal_fee_flat_ut),
            ConfigField::WithdrawalFeePct => U256::from(self.withdrawal_fee_pct),
            ConfigField::MaxVaultValueJumpPct => U256::from(self.max_vault_value_jump_pct),
            ConfigField::VaultFeeCollector => U256::from_be_slice(self.vault_fee_collector.as_slice()),
            ConfigField::RiskProfileCode => U256::from(self.risk_profile_code),
            ConfigField::EmergencyShutdown => U256::from(self.emergency_shutdown as u8),
            ConfigField::Unpaused => U256::from(self.unpaused as u8),
            ConfigField::AllowWhitelistedState => U256::from(self.allow_whitelisted_state as u8),
        }
    }

    // Builder-style setters. Numeric inputs are range checked against the field width.

    /// Sets the flat deposit fee
    pub fn deposit_fee_flat_ut(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.deposit_fee_flat_ut = fit(ConfigField::DepositFeeFlatUt, value)? as u16;
        Ok(self)
    }

    /// Sets the deposit fee percentage in basis points
    pub fn deposit_fee_pct(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.deposit_fee_pct = fit(ConfigField::DepositFeePct, value)? as u16;
        Ok(self)
    }

    /// Sets the flat withdrawal fee
    pub fn withdrawal_fee_flat_ut(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.withdrawal_fee_flat_ut = fit(ConfigField::WithdrawalFeeFlatUt, value)? as u16;
        Ok(self)
    }

    /// Sets the withdrawal fee percentage in basis points
    pub fn withdrawal_fee_pct(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.withdrawal_fee_pct = fit(ConfigField::WithdrawalFeePct, value)? as u16;
        Ok(self)
    }

    /// Sets the maximum intra-block vault value jump in basis points
    pub fn max_vault_value_jump_pct(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.max_vault_value_jump_pct = fit(ConfigField::MaxVaultValueJumpPct, value)? as u16;
        Ok(self)
    }

    /// Sets the risk profile code
    pub fn risk_profile_code(&mut self, value: u64) -> VaultResult<&mut Self> {
        self.risk_profile_code = fit(ConfigField::RiskProfileCode, value)? as u8;
        Ok(self)
    }

    /// Sets the fee collector
    pub fn vault_fee_collector(&mut self, collector: Address) -> &mut Self {
        self.vault_fee_collector = collector;
        self
    }

    /// Sets the emergency shutdown bit
    pub fn emergency_shutdown(&mut self, value: bool) -> &mut Self {
        self.emergency_shutdown = value;
        self
    }

    /// Sets the unpaused bit
    pub fn unpaused(&mut self, value: bool) -> &mut Self {
        self.unpaused = value;
        self
    }

    /// Sets the whitelist enforcement bit
    pub fn allow_whitelisted_state(&mut self, value: bool) -> &mut Self {
        self.allow_whitelisted_state = value;
        self
    }
}

fn fit(field: ConfigField, value: u64) -> VaultResult<u64> {
    if field.width() < 64 && value >> field.width() != 0 {
        return Err(field_overflow(field.name()));
    }
    Ok(value)
}

/// Human readable view of a configuration word
#[derive(Clone, Debug, CandidType, Serialize, Deserialize, PartialEq)]
pub struct ConfigurationQuery {
    pub deposit_fee_flat_ut: u16,
    pub deposit_fee_pct: u16,
    pub withdrawal_fee_flat_ut: u16,
    pub withdrawal_fee_pct: u16,
    pub max_vault_value_jump_pct: u16,
    pub vault_fee_collector: String,
    pub risk_profile_code: u8,
    pub emergency_shutdown: bool,
    pub unpaused: bool,
    pub allow_whitelisted_state: bool,
}

impl From<VaultConfiguration> for ConfigurationQuery {
    fn from(value: VaultConfiguration) -> Self {
        Self {
            deposit_fee_flat_ut: value.deposit_fee_flat_ut,
            deposit_fee_pct: value.deposit_fee_pct,
            withdrawal_fee_flat_ut: value.withdrawal_fee_flat_ut,
            withdrawal_fee_pct: value.withdrawal_fee_pct,
            max_vault_value_jump_pct: value.max_vault_value_jump_pct,
            vault_fee_collector: value.vault_fee_collector.to_checksum(None),
            risk_profile_code: value.risk_profile_code,
            emergency_shutdown: value.emergency_shutdown,
            unpaused: value.unpaused,
            allow_whitelisted_state: value.allow_whitelisted_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::VaultError;
    use proptest::prelude::*;
    use std::str::FromStr;

    const OBSERVED_WORD: &str =
        "2715822034072518811744046181093660912122076772552892442457464397795247259658";

    fn observed_configuration() -> VaultConfiguration {
        VaultConfiguration {
            deposit_fee_flat_ut: 10,
            deposit_fee_pct: 500,
            withdrawal_fee_flat_ut: 0,
            withdrawal_fee_pct: 0,
            max_vault_value_jump_pct: 100,
            vault_fee_collector: Address::from_str("0x19cDeDF678aBE15a921a2AB26C9Bc8867fc35cE5")
                .unwrap(),
            risk_profile_code: 1,
            emergency_shutdown: false,
            unpaused: true,
            allow_whitelisted_state: true,
        }
    }

    #[test]
    fn test_unpack_observed_word() {
        let word = U256::from_str(OBSERVED_WORD).unwrap();
        assert_eq!(VaultConfiguration::unpack(word).unwrap(), observed_configuration());
    }

    #[test]
    fn test_pack_observed_configuration() {
        assert_eq!(
            observed_configuration().pack(),
            U256::from_str(OBSERVED_WORD).unwrap()
        );
    }

    #[test]
    fn test_regions_do_not_overlap() {
        let mut covered = U256::ZERO;
        for field in ConfigField::ALL {
            let region = field.value_mask() << field.offset();
            assert_eq!(covered & region, U256::ZERO, "{} overlaps", field.name());
            covered |= region;
        }
        assert_eq!(covered, (U256::from(1) << RESERVED_OFFSET) - U256::from(1));
    }

    #[test]
    fn test_reserved_bits_are_rejected() {
        let word = observed_configuration().pack() | (U256::from(1) << 255);
        assert_eq!(
            VaultConfiguration::unpack(word),
            Err(VaultError::FieldOverflow("reserved".to_string()))
        );
    }

    #[test]
    fn test_setters_fail_fast_on_overflow() {
        let mut configuration = VaultConfiguration::default();
        assert_eq!(
            configuration.deposit_fee_pct(70_000).err(),
            Some(VaultError::FieldOverflow("depositFeePct".to_string()))
        );
        assert_eq!(
            configuration.risk_profile_code(256).err(),
            Some(VaultError::FieldOverflow("riskProfileCode".to_string()))
        );
        assert_eq!(configuration, VaultConfiguration::default());

        configuration
            .deposit_fee_pct(u16::MAX as u64)
            .unwrap()
            .risk_profile_code(255)
            .unwrap()
            .unpaused(true);
        assert_eq!(configuration.deposit_fee_pct, u16::MAX);
        assert_eq!(configuration.risk_profile_code, 255);
        assert!(configuration.unpaused);
    }

    #[test]
    fn test_setter_touches_only_its_region() {
        let mut configuration = observed_configuration();
        configuration.withdrawal_fee_pct(25).unwrap();
        let decoded = VaultConfiguration::unpack(configuration.pack()).unwrap();
        assert_eq!(decoded.withdrawal_fee_pct, 25);
        assert_eq!(
            VaultConfiguration {
                withdrawal_fee_pct: 0,
                ..decoded
            },
            observed_configuration()
        );
        assert_eq!(
            configuration.max_vault_value_jump_pct(1 << 16).err(),
            Some(VaultError::FieldOverflow("maxVaultValueJumpPct".to_string()))
        );
    }

    proptest! {
        #[test]
        fn test_pack_unpack_roundtrip(
            deposit_fee_flat_ut in any::<u16>(),
            deposit_fee_pct in any::<u16>(),
            withdrawal_fee_flat_ut in any::<u16>(),
            withdrawal_fee_pct in any::<u16>(),
            max_vault_value_jump_pct in any::<u16>(),
            collector in any::<[u8; 20]>(),
            risk_profile_code in any::<u8>(),
            emergency_shutdown in any::<bool>(),
            unpaused in any::<bool>(),
            allow_whitelisted_state in any::<bool>(),
        ) {
            let configuration = VaultConfiguration {
                deposit_fee_flat_ut,
                deposit_fee_pct,
                withdrawal_fee_flat_ut,
                withdrawal_fee_pct,
                max_vault_value_jump_pct,
                vault_fee_collector: Address::from_slice(&collector),
                risk_profile_code,
                emergency_shutdown,
                unpaused,
                allow_whitelisted_state,
            };

            let word = configuration.pack();
            prop_assert!(word >> RESERVED_OFFSET == U256::ZERO);
            prop_assert_eq!(VaultConfiguration::unpack(word).unwrap(), configuration);
        }

        #[test]
        fn test_unpack_pack_roundtrip(limbs in any::<[u64; 4]>()) {
            let word = U256::from_limbs(limbs) & ((U256::from(1) << RESERVED_OFFSET) - U256::from(1));
            prop_assert_eq!(VaultConfiguration::unpack(word).unwrap().pack(), word);
        }
    }
}
