//! In-memory collaborators for vault scenarios

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, U256};

use crate::{
    interfaces::{Adapter, Environment, LowLevelCaller, SwapRouter, UnderlyingToken},
    registry::{PoolRatingRange, Registry, Role},
    strategy::descriptor::StrategyStep,
    utils::{
        common::mul_div,
        error::{VaultError, VaultResult},
    },
};

pub const GOVERNANCE: Address = Address::repeat_byte(0x90);
pub const FINANCE: Address = Address::repeat_byte(0x91);
pub const STRATEGIST: Address = Address::repeat_byte(0x92);
pub const RISK: Address = Address::repeat_byte(0x93);

pub const UNDERLYING: Address = Address::repeat_byte(0xaa);
pub const TOKEN_A: Address = Address::repeat_byte(0xa1);
pub const TOKEN_B: Address = Address::repeat_byte(0xb1);
pub const REWARD: Address = Address::repeat_byte(0xcc);
pub const POOL_A: Address = Address::repeat_byte(0x0a);
pub const POOL_B: Address = Address::repeat_byte(0x0b);

/// Signature accepted by [`FakeToken::permit`]
pub const VALID_SIGNATURE: [u8; 2] = [0x5a, 0x5a];

/// Token ledger of everyone but the vault
#[derive(Debug, Default)]
pub struct FakeToken {
    balances: BTreeMap<Address, U256>,
    /// Permits granted, by owner
    pub permits: BTreeMap<Address, U256>,
}

impl FakeToken {
    pub fn mint(&mut self, account: Address, amount: U256) {
        let balance = self.balance_of(&account) + amount;
        self.balances.insert(account, balance);
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

impl UnderlyingToken for FakeToken {
    fn transfer_from(&mut self, from: Address, amount: U256) -> VaultResult<()> {
        let balance = self
            .balance_of(&from)
            .checked_sub(amount)
            .ok_or(VaultError::TokenTransferFailed("Insufficient balance.".to_string()))?;
        self.balances.insert(from, balance);
        Ok(())
    }

    fn transfer(&mut self, to: Address, amount: U256) -> VaultResult<()> {
        self.mint(to, amount);
        Ok(())
    }

    fn permit(
        &mut self,
        owner: Address,
        value: U256,
        _deadline: u64,
        signature: &Bytes,
    ) -> VaultResult<()> {
        if signature.as_ref() != VALID_SIGNATURE {
            return Err(VaultError::InvalidAuthorizationSignature);
        }
        self.permits.insert(owner, value);
        Ok(())
    }
}

/// Share-based pool: mints its output token against the assets supplied.
/// Output per input starts 1:1 and moves with [`FakePool::set_rate`].
#[derive(Debug, Default)]
pub struct FakePool {
    assets: U256,
    shares: U256,
    rewards: BTreeMap<Address, U256>,
    pub fail: bool,
}

impl FakePool {
    /// Scales the pool's assets by `numerator / denominator`
    pub fn set_rate(&mut self, numerator: u64, denominator: u64) {
        self.assets = self.assets * U256::from(numerator) / U256::from(denominator);
    }

    pub fn add_rewards(&mut self, token: Address, amount: U256) {
        *self.rewards.entry(token).or_default() += amount;
    }

    pub fn assets(&self) -> U256 {
        self.assets
    }

    fn check(&self) -> VaultResult<()> {
        if self.fail {
            return Err(VaultError::AdapterFailure("Pool is failing.".to_string()));
        }
        Ok(())
    }
}

impl Adapter for FakePool {
    fn deposit(&mut self, _step: &StrategyStep, _input_token: Address, amount: U256) -> VaultResult<U256> {
        self.check()?;
        let minted = if self.shares.is_zero() || self.assets.is_zero() {
            amount
        } else {
            mul_div(amount, self.shares, self.assets)?
        };
        self.assets += amount;
        self.shares += minted;
        Ok(minted)
    }

    fn withdraw(&mut self, step: &StrategyStep, input_token: Address, amount: U256) -> VaultResult<U256> {
        self.check()?;
        let returned = self.amount_in_input_token(step, input_token, amount)?;
        self.assets -= returned;
        self.shares -= amount;
        Ok(returned)
    }

    fn amount_in_input_token(
        &self,
        _step: &StrategyStep,
        _input_token: Address,
        amount: U256,
    ) -> VaultResult<U256> {
        if amount > self.shares {
            return Err(VaultError::AdapterFailure("Not enough shares.".to_string()));
        }
        mul_div(amount, self.assets, self.shares)
    }

    fn claim_rewards(&mut self, _step: &StrategyStep, reward_token: Address) -> VaultResult<U256> {
        self.check()?;
        Ok(self.rewards.remove(&reward_token).unwrap_or_default())
    }
}

/// Records every admin call
#[derive(Debug, Default)]
pub struct RecordingCaller {
    pub calls: Vec<(Address, Bytes)>,
}

impl LowLevelCaller for RecordingCaller {
    fn call(&mut self, target: Address, data: &Bytes) -> VaultResult<Bytes> {
        self.calls.push((target, data.clone()));
        Ok(Bytes::new())
    }
}

/// Block context, registry and collaborators of a test vault.
///
/// Roles are held by the constants above. Risk profile 1 forbids borrowing and accepts
/// pools rated 1 to 3; profile 2 allows borrowing and accepts ratings 1 to 5.
/// `POOL_A` and `POOL_B` are rated 2, and the hash of `[UNDERLYING]` is mapped.
pub struct TestEnv {
    pub now: u64,
    pub block: u64,
    pub token: FakeToken,
    registry: Registry,
    pools: BTreeMap<Address, FakePool>,
    routers: BTreeMap<Address, Box<dyn SwapRouter>>,
    caller: Box<dyn LowLevelCaller>,
}

impl TestEnv {
    pub fn new() -> Self {
        let mut registry = Registry::new(GOVERNANCE);
        for (role, holder) in [
            (Role::FinanceOperator, FINANCE),
            (Role::StrategyOperator, STRATEGIST),
            (Role::RiskOperator, RISK),
        ] {
            registry.set_role(&GOVERNANCE, role, holder).unwrap();
        }
        registry
            .add_risk_profiles(
                &RISK,
                &[1, 2],
                &["conservative".to_string(), "aggressive".to_string()],
                &[false, true],
                &[
                    PoolRatingRange { lower: 1, upper: 3 },
                    PoolRatingRange { lower: 1, upper: 5 },
                ],
            )
            .unwrap();
        registry.rate_pools(&RISK, &[POOL_A, POOL_B], &[2, 2]).unwrap();
        registry.add_tokens_hash(&GOVERNANCE, vec![UNDERLYING]).unwrap();

        let pools = BTreeMap::from([(POOL_A, FakePool::default()), (POOL_B, FakePool::default())]);

        Self {
            now: 1_000,
            block: 1,
            token: FakeToken::default(),
            registry,
            pools,
            routers: BTreeMap::new(),
            caller: Box::<RecordingCaller>::default(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn pool(&self, pool: &Address) -> &FakePool {
        &self.pools[pool]
    }

    pub fn pool_mut(&mut self, pool: &Address) -> &mut FakePool {
        self.pools.get_mut(pool).unwrap()
    }

    pub fn set_router(&mut self, address: Address, router: Box<dyn SwapRouter>) {
        self.routers.insert(address, router);
    }

    pub fn set_low_level_caller(&mut self, caller: Box<dyn LowLevelCaller>) {
        self.caller = caller;
    }

    /// Moves to the next block, `seconds` later
    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
        self.block += 1;
    }
}

impl Environment for TestEnv {
    fn now(&self) -> u64 {
        self.now
    }

    fn block_number(&self) -> u64 {
        self.block
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn token(&mut self) -> &mut dyn UnderlyingToken {
        &mut self.token
    }

    fn adapter(&self, pool: &Address) -> VaultResult<&dyn Adapter> {
        match self.pools.get(pool) {
            Some(pool) => Ok(pool),
            None => Err(VaultError::UnknownAdapter),
        }
    }

    fn adapter_mut(&mut self, pool: &Address) -> VaultResult<&mut dyn Adapter> {
        match self.pools.get_mut(pool) {
            Some(pool) => Ok(pool),
            None => Err(VaultError::UnknownAdapter),
        }
    }

    fn router(&mut self, router: &Address) -> VaultResult<&mut dyn SwapRouter> {
        match self.routers.get_mut(router) {
            Some(router) => {
                let router: &mut dyn SwapRouter = router.as_mut();
                Ok(router)
            }
            None => Err(VaultError::UnknownAdapter),
        }
    }

    fn low_level_caller(&mut self) -> &mut dyn LowLevelCaller {
        self.caller.as_mut()
    }
}
