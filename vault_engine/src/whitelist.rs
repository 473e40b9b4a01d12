//! Merkle whitelist gate
//!
//! Accounts are admitted by proving membership of `keccak256(address)` in the accounts
//! root. Contract callers prove membership of `keccak256(code_hash)` in the codes root
//! instead. Pairs are hashed in sorted order, so proofs carry no left/right flags.
//!
//! Roots are replaced wholesale. Verification always runs against the root stored at the
//! time of the call, so a proof built for a previous root stops verifying as soon as the
//! root changes.

use alloy_primitives::{keccak256, Address, B256};

use crate::{constants::MAX_PROOF_DEPTH, types::Caller};

/// Leaf of an externally owned account
pub fn account_leaf(account: &Address) -> B256 {
    keccak256(account.as_slice())
}

/// Leaf of a contract caller, derived from its code fingerprint
pub fn code_leaf(code_hash: &B256) -> B256 {
    keccak256(code_hash.as_slice())
}

/// Hashes two nodes in ascending order
pub fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    keccak256([low.as_slice(), high.as_slice()].concat())
}

/// Standard sorted-pair merkle inclusion check
pub fn verify(proof: &[B256], leaf: B256, root: B256) -> bool {
    if proof.len() > MAX_PROOF_DEPTH {
        return false;
    }

    let computed = proof
        .iter()
        .fold(leaf, |node, sibling| hash_pair(&node, sibling));
    computed == root
}

/// Current whitelist roots of a vault
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhitelistRoots {
    pub accounts_root: B256,
    pub codes_root: B256,
}

impl WhitelistRoots {
    /// Checks the caller against the root that matches its kind.
    /// The check is bypassed entirely when whitelisting is disabled.
    pub fn admits(&self, enabled: bool, caller: &Caller, proof: &[B256]) -> bool {
        if !enabled {
            return true;
        }

        match caller.code_hash {
            Some(code_hash) => verify(proof, code_leaf(&code_hash), self.codes_root),
            None => verify(proof, account_leaf(&caller.address), self.accounts_root),
        }
    }
}

/// Sorted-pair merkle tree used by operators to publish roots and hand out proofs.
/// An odd node at the end of a layer is promoted unchanged.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<B256>) -> Self {
        let mut layers = vec![leaves];
        while let Some(layer) = layers.last().filter(|layer| layer.len() > 1) {
            let next = layer
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    /// Tree over account leaves
    pub fn from_accounts(accounts: &[Address]) -> Self {
        Self::new(accounts.iter().map(account_leaf).collect())
    }

    /// Tree over code fingerprint leaves
    pub fn from_code_hashes(code_hashes: &[B256]) -> Self {
        Self::new(code_hashes.iter().map(code_leaf).collect())
    }

    /// Root of the tree. An empty tree has the zero root, which no proof resolves to.
    pub fn root(&self) -> B256 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(B256::ZERO)
    }

    /// Inclusion proof of `leaf`, if present
    pub fn proof(&self, leaf: &B256) -> Option<Vec<B256>> {
        let mut index = self.layers.first()?.iter().position(|node| node == leaf)?;
        let mut proof = vec![];
        for layer in &self.layers[..self.layers.len() - 1] {
            if let Some(sibling) = layer.get(index ^ 1) {
                proof.push(*sibling);
            }
            index /= 2;
        }
        Some(proof)
    }
}
