//! Strategy descriptors and their content hash
//!
//! A strategy is addressed by its hash only:
//!
//! ```plain
//! step_hash     = keccak256(pool ‖ output_token ‖ is_borrow)         (20 + 20 + 1 bytes)
//! strategy_hash = keccak256(tokens_hash ‖ step_hash_0 ‖ … ‖ step_hash_n)
//! tokens_hash   = keccak256(word(token_0) ‖ … ‖ word(token_m))        (32-byte words)
//! ```
//!
//! Identity is structural. The same steps in the same order always hash the same, and
//! reordering steps changes the hash.

use alloy_primitives::{keccak256, Address, B256};

use crate::utils::error::{VaultError, VaultResult};

/// One hop of a strategy: supply the previous hop's token to `pool` and hold `output_token`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyStep {
    pub pool: Address,
    pub output_token: Address,
    pub is_borrow: bool,
}

impl StrategyStep {
    pub fn new(pool: Address, output_token: Address, is_borrow: bool) -> Self {
        Self {
            pool,
            output_token,
            is_borrow,
        }
    }

    pub fn hash(&self) -> B256 {
        keccak256(
            [
                self.pool.as_slice(),
                self.output_token.as_slice(),
                &[self.is_borrow as u8],
            ]
            .concat(),
        )
    }
}

/// Hash of an ordered token list
pub fn tokens_hash(tokens: &[Address]) -> B256 {
    let packed: Vec<u8> = tokens
        .iter()
        .flat_map(|token| token.into_word().0)
        .collect();
    keccak256(packed)
}

/// Content hash of a strategy. Empty step sequences are rejected.
pub fn compute_hash(underlying_tokens_hash: B256, steps: &[StrategyStep]) -> VaultResult<B256> {
    if steps.is_empty() {
        return Err(VaultError::EmptyStrategy);
    }

    let mut packed = Vec::with_capacity(32 * (steps.len() + 1));
    packed.extend_from_slice(underlying_tokens_hash.as_slice());
    for step in steps {
        packed.extend_from_slice(step.hash().as_slice());
    }
    Ok(keccak256(packed))
}

/// An ordered, non-empty step sequence together with its hash.
/// Strategies are replaced, never edited, so the hash is computed once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Strategy {
    hash: B256,
    steps: Vec<StrategyStep>,
}

impl Strategy {
    pub fn new(underlying_tokens_hash: B256, steps: Vec<StrategyStep>) -> VaultResult<Self> {
        let hash = compute_hash(underlying_tokens_hash, &steps)?;
        Ok(Self { hash, steps })
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn steps(&self) -> &[StrategyStep] {
        &self.steps
    }

    /// Token held by the vault once capital is fully deployed
    pub fn position_token(&self) -> Address {
        // non-empty by construction
        self.steps[self.steps.len() - 1].output_token
    }

    /// Token supplied to step `index`
    pub fn input_token(&self, underlying_token: Address, index: usize) -> Address {
        if index == 0 {
            underlying_token
        } else {
            self.steps[index - 1].output_token
        }
    }
}
