//! Vault Engine's Constants

use alloy_primitives::U256;

/// Scale used for fixed point arithmetic
pub const SCALE: u128 = 1_000_000_000_000_000_000; // e18
pub fn scale() -> U256 {
    U256::from(SCALE)
}

/// Denominator of every percentage field in the configuration word (basis points)
pub const FEE_DENOMINATOR: u64 = 10_000; // 100%
pub fn fee_denominator() -> U256 {
    U256::from(FEE_DENOMINATOR)
}

/// Maximum merkle proof depth accepted by the whitelist gate (2^32 leaves)
pub const MAX_PROOF_DEPTH: usize = 32;

/// Maximum length of free-form text stored in a journal entry
pub const MAX_JOURNAL_NOTE_LENGTH: usize = 256;

/// Upper bound of an encoded journal entry in bytes
pub const MAX_JOURNAL_ENTRY_SIZE: u32 = 2_048;

/// Entries kept by the journal before the oldest ones are overwritten
pub const MAX_JOURNAL_ENTRIES: u64 = 10_000;
