//! Registry view consumed by the vault
//!
//! Holds the role assignments, the risk profiles with their pool rating ranges, the
//! pool ratings and the tokens-hash mapping. Every mutation is role gated.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};
use candid::CandidType;
use serde::Deserialize;

use crate::{
    strategy::descriptor::{tokens_hash, Strategy},
    utils::error::{VaultError, VaultResult},
};

/// Roles recognised by the vault
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Configuration, whitelist roots, pause and shutdown, admin calls
    Governance,
    /// Fees and value controls
    FinanceOperator,
    /// Strategy selection, strategy deposits and harvests
    StrategyOperator,
    /// Risk profiles and pool ratings
    RiskOperator,
}

/// Inclusive range of pool ratings a risk profile accepts
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq)]
pub struct PoolRatingRange {
    pub lower: u8,
    pub upper: u8,
}

impl PoolRatingRange {
    pub fn contains(&self, rating: u8) -> bool {
        self.lower <= rating && rating <= self.upper
    }
}

/// Named bucket constraining which strategies a vault may run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskProfile {
    pub name: String,
    pub can_borrow: bool,
    pub pool_rating_range: PoolRatingRange,
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    roles: BTreeMap<Role, Address>,
    risk_profiles: BTreeMap<u8, RiskProfile>,
    pool_ratings: BTreeMap<Address, u8>,
    tokens_hashes: BTreeMap<B256, Vec<Address>>,
}

impl Registry {
    /// Creates a registry whose governance is `governance`
    pub fn new(governance: Address) -> Self {
        let mut registry = Self::default();
        registry.roles.insert(Role::Governance, governance);
        registry
    }

    pub fn role_holder(&self, role: Role) -> Option<Address> {
        self.roles.get(&role).copied()
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.role_holder(role).as_ref() == Some(account)
    }

    /// Fails with `PermissionDenied` unless `account` holds `role`
    pub fn require_role(&self, account: &Address, role: Role) -> VaultResult<()> {
        if self.has_role(account, role) {
            Ok(())
        } else {
            Err(VaultError::PermissionDenied)
        }
    }

    /// Assigns a role. Governance only.
    pub fn set_role(&mut self, caller: &Address, role: Role, holder: Address) -> VaultResult<()> {
        self.require_role(caller, Role::Governance)?;
        self.roles.insert(role, holder);
        Ok(())
    }

    pub fn risk_profile(&self, code: u8) -> VaultResult<&RiskProfile> {
        self.risk_profiles
            .get(&code)
            .ok_or(VaultError::UnknownRiskProfileCode)
    }

    /// Registers risk profiles from paired arrays. Risk operator only.
    /// Existing codes cannot be redefined.
    pub fn add_risk_profiles(
        &mut self,
        caller: &Address,
        codes: &[u8],
        names: &[String],
        can_borrow: &[bool],
        ranges: &[PoolRatingRange],
    ) -> VaultResult<()> {
        self.require_role(caller, Role::RiskOperator)?;
        let count = codes.len();
        if names.len() != count || can_borrow.len() != count || ranges.len() != count {
            return Err(VaultError::LengthMismatch);
        }
        if codes
            .iter()
            .enumerate()
            .any(|(i, code)| self.risk_profiles.contains_key(code) || codes[..i].contains(code))
        {
            return Err(VaultError::RiskProfileAlreadyExists);
        }

        for i in 0..count {
            self.risk_profiles.insert(
                codes[i],
                RiskProfile {
                    name: names[i].clone(),
                    can_borrow: can_borrow[i],
                    pool_rating_range: ranges[i],
                },
            );
        }
        Ok(())
    }

    pub fn pool_rating(&self, pool: &Address) -> u8 {
        self.pool_ratings.get(pool).copied().unwrap_or_default()
    }

    /// Rates pools from paired arrays. Risk operator only.
    pub fn rate_pools(&mut self, caller: &Address, pools: &[Address], ratings: &[u8]) -> VaultResult<()> {
        self.require_role(caller, Role::RiskOperator)?;
        if pools.len() != ratings.len() {
            return Err(VaultError::LengthMismatch);
        }
        for (pool, rating) in pools.iter().zip(ratings) {
            self.pool_ratings.insert(*pool, *rating);
        }
        Ok(())
    }

    /// Maps the hash of `tokens` to the token list. Governance only.
    pub fn add_tokens_hash(&mut self, caller: &Address, tokens: Vec<Address>) -> VaultResult<B256> {
        self.require_role(caller, Role::Governance)?;
        let hash = tokens_hash(&tokens);
        if self.tokens_hashes.contains_key(&hash) {
            return Err(VaultError::TokenHashAlreadyMapped);
        }
        self.tokens_hashes.insert(hash, tokens);
        Ok(hash)
    }

    pub fn tokens(&self, hash: &B256) -> Option<&[Address]> {
        self.tokens_hashes.get(hash).map(Vec::as_slice)
    }

    /// Checks that every step of `strategy` is admissible under the risk profile `code`
    pub fn check_strategy(&self, code: u8, strategy: &Strategy) -> VaultResult<()> {
        let profile = self.risk_profile(code)?;
        let admissible = strategy.steps().iter().all(|step| {
            (profile.can_borrow || !step.is_borrow)
                && profile.pool_rating_range.contains(self.pool_rating(&step.pool))
        });
        if admissible {
            Ok(())
        } else {
            Err(VaultError::RiskProfileViolation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::descriptor::StrategyStep;

    const GOVERNANCE: Address = Address::repeat_byte(0x90);
    const RISK: Address = Address::repeat_byte(0x91);

    fn registry() -> Registry {
        let mut registry = Registry::new(GOVERNANCE);
        registry.set_role(&GOVERNANCE, Role::RiskOperator, RISK).unwrap();
        registry
    }

    fn profiles(registry: &mut Registry) {
        registry
            .add_risk_profiles(
                &RISK,
                &[1, 2],
                &["basic".to_string(), "aggressive".to_string()],
                &[false, true],
                &[
                    PoolRatingRange { lower: 50, upper: 100 },
                    PoolRatingRange { lower: 10, upper: 100 },
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_roles_are_gated_by_governance() {
        let mut registry = registry();
        assert_eq!(
            registry.set_role(&RISK, Role::FinanceOperator, RISK),
            Err(VaultError::PermissionDenied)
        );
        assert!(registry.has_role(&RISK, Role::RiskOperator));
        assert_eq!(
            registry.require_role(&RISK, Role::Governance),
            Err(VaultError::PermissionDenied)
        );
    }

    #[test]
    fn test_paired_arrays_must_match() {
        let mut registry = registry();
        assert_eq!(
            registry.rate_pools(&RISK, &[Address::repeat_byte(1)], &[1, 2]),
            Err(VaultError::LengthMismatch)
        );
        assert_eq!(
            registry.add_risk_profiles(&RISK, &[1], &[], &[true], &[PoolRatingRange { lower: 0, upper: 1 }]),
            Err(VaultError::LengthMismatch)
        );
    }

    #[test]
    fn test_risk_profiles() {
        let mut registry = registry();
        profiles(&mut registry);
        assert_eq!(registry.risk_profile(1).unwrap().name, "basic");
        assert_eq!(registry.risk_profile(3).err(), Some(VaultError::UnknownRiskProfileCode));
        assert_eq!(
            registry.add_risk_profiles(&RISK, &[2], &["again".to_string()], &[true], &[PoolRatingRange { lower: 0, upper: 1 }]),
            Err(VaultError::RiskProfileAlreadyExists)
        );
        // duplicates within one batch
        assert_eq!(
            registry.add_risk_profiles(
                &RISK,
                &[7, 7],
                &["a".to_string(), "b".to_string()],
                &[false, false],
                &[PoolRatingRange { lower: 0, upper: 1 }; 2],
            ),
            Err(VaultError::RiskProfileAlreadyExists)
        );
        assert!(registry.risk_profile(7).is_err());
    }

    #[test]
    fn test_tokens_hash_is_mapped_once() {
        let mut registry = registry();
        let tokens = vec![Address::repeat_byte(0xaa)];
        let hash = registry.add_tokens_hash(&GOVERNANCE, tokens.clone()).unwrap();
        assert_eq!(hash, tokens_hash(&tokens));
        assert_eq!(registry.tokens(&hash), Some(tokens.as_slice()));
        assert_eq!(
            registry.add_tokens_hash(&GOVERNANCE, tokens),
            Err(VaultError::TokenHashAlreadyMapped)
        );
    }

    #[test]
    fn test_strategy_admissibility() {
        let mut registry = registry();
        profiles(&mut registry);
        let safe_pool = Address::repeat_byte(1);
        let risky_pool = Address::repeat_byte(2);
        registry.rate_pools(&RISK, &[safe_pool, risky_pool], &[80, 20]).unwrap();

        let underlying = tokens_hash(&[Address::repeat_byte(0xaa)]);
        let lend = StrategyStep::new(safe_pool, Address::repeat_byte(0xb1), false);
        let borrow = StrategyStep::new(safe_pool, Address::repeat_byte(0xb2), true);
        let risky = StrategyStep::new(risky_pool, Address::repeat_byte(0xb3), false);

        let plain = Strategy::new(underlying, vec![lend.clone()]).unwrap();
        let leveraged = Strategy::new(underlying, vec![lend.clone(), borrow]).unwrap();
        let low_rated = Strategy::new(underlying, vec![risky]).unwrap();

        assert!(registry.check_strategy(1, &plain).is_ok());
        assert_eq!(registry.check_strategy(1, &leveraged), Err(VaultError::RiskProfileViolation));
        assert_eq!(registry.check_strategy(1, &low_rated), Err(VaultError::RiskProfileViolation));
        assert!(registry.check_strategy(2, &leveraged).is_ok());
        assert!(registry.check_strategy(2, &low_rated).is_ok());
        assert_eq!(registry.check_strategy(9, &plain), Err(VaultError::UnknownRiskProfileCode));
    }
}
