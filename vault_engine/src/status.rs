//! Vault operability and deposit admission
//!
//! `unpaused` and `emergencyShutdown` are independent bits of the configuration word.
//! Their composition gives the effective status:
//!
//! ```plain
//!                 emergencyShutdown = 0     emergencyShutdown = 1
//! unpaused = 1    Active                    EmergencyShutdown
//! unpaused = 0    Paused                    Paused
//! ```
//!
//! Deposits require `Active`. Withdrawals only require `unpaused`, so they stay open
//! during an emergency shutdown.

use alloy_primitives::{B256, U256};

use crate::{
    config::VaultConfiguration,
    types::Caller,
    utils::error::{VaultError, VaultResult},
    whitelist::WhitelistRoots,
};

/// Effective vault status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultStatus {
    Active,
    Paused,
    EmergencyShutdown,
}

impl VaultStatus {
    pub fn of(configuration: &VaultConfiguration) -> Self {
        match (configuration.unpaused, configuration.emergency_shutdown) {
            (false, _) => VaultStatus::Paused,
            (true, true) => VaultStatus::EmergencyShutdown,
            (true, false) => VaultStatus::Active,
        }
    }

    pub fn can_withdraw(self) -> bool {
        self != VaultStatus::Paused
    }

    /// Fails unless new capital can be committed
    pub fn ensure_deposits_open(self) -> VaultResult<()> {
        match self {
            VaultStatus::Active => Ok(()),
            VaultStatus::Paused => Err(VaultError::VaultPaused),
            VaultStatus::EmergencyShutdown => Err(VaultError::VaultEmergencyShutdown),
        }
    }

    /// Fails unless capital can leave the vault
    pub fn ensure_withdrawals_open(self) -> VaultResult<()> {
        if self.can_withdraw() {
            Ok(())
        } else {
            Err(VaultError::VaultPaused)
        }
    }
}

/// Scalar deposit thresholds owned by the finance role
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueControls {
    pub user_deposit_cap_ut: U256,
    pub minimum_deposit_value_ut: U256,
    pub total_value_locked_limit_ut: U256,
}

impl Default for ValueControls {
    /// No caps until the finance role sets them
    fn default() -> Self {
        Self {
            user_deposit_cap_ut: U256::MAX,
            minimum_deposit_value_ut: U256::ZERO,
            total_value_locked_limit_ut: U256::MAX,
        }
    }
}

/// Inputs of the deposit admission predicate
pub struct DepositRequest<'a> {
    pub caller: &'a Caller,
    pub proof: &'a [B256],
    pub amount: U256,
    /// Deposits already recorded for the beneficiary
    pub existing_deposits: U256,
    /// Vault value before the deposit
    pub vault_value: U256,
}

/// Runs the admission checks in a fixed order and reports the first failure:
/// status, whitelist, minimum deposit, TVL limit, user cap.
pub fn check_deposit_admission(
    configuration: &VaultConfiguration,
    controls: &ValueControls,
    whitelist: &WhitelistRoots,
    request: &DepositRequest,
) -> VaultResult<()> {
    VaultStatus::of(configuration).ensure_deposits_open()?;

    if !whitelist.admits(
        configuration.allow_whitelisted_state,
        request.caller,
        request.proof,
    ) {
        return Err(VaultError::NotWhitelisted);
    }

    if request.amount < controls.minimum_deposit_value_ut {
        return Err(VaultError::BelowMinimumDeposit);
    }

    // Overflowing sums are over any limit
    let value_after = request.vault_value.checked_add(request.amount);
    if value_after.map_or(true, |value| value > controls.total_value_locked_limit_ut) {
        return Err(VaultError::ExceedsTotalValueLockedLimit);
    }

    let deposits_after = request.existing_deposits.checked_add(request.amount);
    if deposits_after.map_or(true, |deposits| deposits > controls.user_deposit_cap_ut) {
        return Err(VaultError::ExceedsUserDepositCap);
    }

    Ok(())
}

/// Checks that a withdrawal can proceed: status then whitelist
pub fn check_withdraw_admission(
    configuration: &VaultConfiguration,
    whitelist: &WhitelistRoots,
    caller: &Caller,
    proof: &[B256],
) -> VaultResult<()> {
    VaultStatus::of(configuration).ensure_withdrawals_open()?;

    if !whitelist.admits(configuration.allow_whitelisted_state, caller, proof) {
        return Err(VaultError::NotWhitelisted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whitelist::{account_leaf, MerkleTree};
    use alloy_primitives::Address;

    fn active() -> VaultConfiguration {
        VaultConfiguration {
            unpaused: true,
            ..Default::default()
        }
    }

    fn controls(cap: u64, minimum: u64, limit: u64) -> ValueControls {
        ValueControls {
            user_deposit_cap_ut: U256::from(cap),
            minimum_deposit_value_ut: U256::from(minimum),
            total_value_locked_limit_ut: U256::from(limit),
        }
    }

    #[test]
    fn test_status_composition() {
        let mut configuration = VaultConfiguration::default();
        assert_eq!(VaultStatus::of(&configuration), VaultStatus::Paused);

        configuration.emergency_shutdown(true);
        assert_eq!(VaultStatus::of(&configuration), VaultStatus::Paused);

        configuration.unpaused(true);
        assert_eq!(VaultStatus::of(&configuration), VaultStatus::EmergencyShutdown);
        assert!(VaultStatus::EmergencyShutdown.ensure_deposits_open().is_err());
        assert!(VaultStatus::EmergencyShutdown.can_withdraw());

        configuration.emergency_shutdown(false);
        assert_eq!(VaultStatus::of(&configuration), VaultStatus::Active);
    }

    #[test]
    fn test_status_errors() {
        assert_eq!(
            VaultStatus::Paused.ensure_deposits_open(),
            Err(VaultError::VaultPaused)
        );
        assert_eq!(
            VaultStatus::EmergencyShutdown.ensure_deposits_open(),
            Err(VaultError::VaultEmergencyShutdown)
        );
        assert_eq!(
            VaultStatus::Paused.ensure_withdrawals_open(),
            Err(VaultError::VaultPaused)
        );
        assert!(VaultStatus::EmergencyShutdown.ensure_withdrawals_open().is_ok());
    }

    #[test]
    fn test_cap_is_enforced_not_truncated() {
        let caller = Caller::account(Address::repeat_byte(1));
        let request = DepositRequest {
            caller: &caller,
            proof: &[],
            amount: U256::from(4_000_000_000_u64),
            existing_deposits: U256::ZERO,
            vault_value: U256::ZERO,
        };
        let result = check_deposit_admission(
            &active(),
            &controls(2_000_000_000, 0, u64::MAX),
            &WhitelistRoots::default(),
            &request,
        );
        assert_eq!(result, Err(VaultError::ExceedsUserDepositCap));
    }

    #[test]
    fn test_first_failing_check_is_reported() {
        let caller = Caller::account(Address::repeat_byte(1));
        let mut configuration = active();
        configuration.allow_whitelisted_state(true);
        // everything fails: whitelist wins
        let request = DepositRequest {
            caller: &caller,
            proof: &[],
            amount: U256::from(5),
            existing_deposits: U256::from(100),
            vault_value: U256::from(1_000),
        };
        let tight = controls(10, 50, 100);
        let whitelist = WhitelistRoots::default();
        assert_eq!(
            check_deposit_admission(&configuration, &tight, &whitelist, &request),
            Err(VaultError::NotWhitelisted)
        );

        // whitelisted: minimum wins
        let tree = MerkleTree::from_accounts(&[caller.address, Address::repeat_byte(2)]);
        let proof = tree.proof(&account_leaf(&caller.address)).unwrap();
        let whitelist = WhitelistRoots {
            accounts_root: tree.root(),
            ..Default::default()
        };
        let request = DepositRequest {
            proof: &proof,
            ..request
        };
        assert_eq!(
            check_deposit_admission(&configuration, &tight, &whitelist, &request),
            Err(VaultError::BelowMinimumDeposit)
        );

        // above minimum: TVL limit wins over user cap
        let request = DepositRequest {
            amount: U256::from(60),
            ..request
        };
        assert_eq!(
            check_deposit_admission(&configuration, &tight, &whitelist, &request),
            Err(VaultError::ExceedsTotalValueLockedLimit)
        );

        // within TVL: user cap
        let request = DepositRequest {
            vault_value: U256::ZERO,
            ..request
        };
        assert_eq!(
            check_deposit_admission(&configuration, &tight, &whitelist, &request),
            Err(VaultError::ExceedsUserDepositCap)
        );

        let request = DepositRequest {
            existing_deposits: U256::ZERO,
            amount: U256::from(50),
            ..request
        };
        let roomy = controls(50, 50, 100);
        assert!(check_deposit_admission(&configuration, &roomy, &whitelist, &request).is_ok());
    }

    #[test]
    fn test_status_is_checked_before_whitelist() {
        let caller = Caller::account(Address::repeat_byte(1));
        let mut configuration = active();
        configuration.allow_whitelisted_state(true).emergency_shutdown(true);
        let request = DepositRequest {
            caller: &caller,
            proof: &[],
            amount: U256::from(1),
            existing_deposits: U256::ZERO,
            vault_value: U256::ZERO,
        };
        assert_eq!(
            check_deposit_admission(
                &configuration,
                &ValueControls::default(),
                &WhitelistRoots::default(),
                &request
            ),
            Err(VaultError::VaultEmergencyShutdown)
        );
        // withdrawals are still gated by the whitelist only
        assert_eq!(
            check_withdraw_admission(&configuration, &WhitelistRoots::default(), &caller, &[]),
            Err(VaultError::NotWhitelisted)
        );
    }

    #[test]
    fn test_default_controls_are_unbounded() {
        let caller = Caller::account(Address::repeat_byte(1));
        let request = DepositRequest {
            caller: &caller,
            proof: &[],
            amount: U256::MAX,
            existing_deposits: U256::ZERO,
            vault_value: U256::ZERO,
        };
        assert!(check_deposit_admission(
            &active(),
            &ValueControls::default(),
            &WhitelistRoots::default(),
            &request
        )
        .is_ok());
    }
}
