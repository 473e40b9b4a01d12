//! Immutable vault settings
//! These settings are set once when the vault is created

use alloy_primitives::{Address, B256};

use crate::strategy::descriptor::tokens_hash;

/// Settings fixed at creation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultSettings {
    /// Address of the vault itself. Shares cannot be transferred to it.
    pub vault: Address,
    /// The single asset the vault accepts and returns
    pub underlying_token: Address,
    /// Hash of `[underlying_token]`, the prefix of every strategy hash of this vault
    pub underlying_tokens_hash: B256,
    /// Decimals of the underlying token. Scales the flat fee components.
    pub decimals: u8,
    /// Share token name
    pub name: String,
    /// Share token symbol
    pub symbol: String,
}

impl VaultSettings {
    /// Sets the vault address.
    pub fn vault(&mut self, vault: Address) -> &mut Self {
        self.vault = vault;
        self
    }

    /// Sets the underlying token and derives its tokens hash.
    pub fn underlying_token(&mut self, underlying_token: Address) -> &mut Self {
        self.underlying_token = underlying_token;
        self.underlying_tokens_hash = tokens_hash(&[underlying_token]);
        self
    }

    /// Sets the decimals of the underlying token.
    pub fn decimals(&mut self, decimals: u8) -> &mut Self {
        self.decimals = decimals;
        self
    }

    /// Sets the share token name.
    pub fn name<S: AsRef<str>>(&mut self, name: S) -> &mut Self {
        self.name = name.as_ref().to_string();
        self
    }

    /// Sets the share token symbol.
    pub fn symbol<S: AsRef<str>>(&mut self, symbol: S) -> &mut Self {
        self.symbol = symbol.as_ref().to_string();
        self
    }
}
