//! Operation journal
//!
//! Every caller-facing operation and every role-gated setter appends one entry with its
//! outcome. The journal sits outside the vault's transactional state, so an operation
//! that fails and reverts still leaves a trace of the attempt.
//!
//! The journal holds at most [`MAX_JOURNAL_ENTRIES`] entries. Once full it wraps
//! around and each new entry overwrites the oldest one.

use std::{borrow::Cow, cell::Cell};

use alloy_primitives::Address;
use candid::{CandidType, Decode, Encode};
use ic_stable_structures::{storable::Bound, DefaultMemoryImpl, Storable, Vec as StableVec};
use serde::Deserialize;

use crate::{
    constants::{MAX_JOURNAL_ENTRIES, MAX_JOURNAL_ENTRY_SIZE, MAX_JOURNAL_NOTE_LENGTH},
    utils::error::{VaultError, VaultResult},
};

/// Kind of journal entry
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq)]
pub enum LogType {
    /// Free-form information
    Info,
    /// Deposits, withdrawals, transfers, rebalances and harvests
    Operation,
    /// Role-gated configuration changes
    Configuration,
}

/// Journal entry
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub timestamp: u64,
    pub entry: VaultResult<()>,
    pub log_type: LogType,
    pub operation: Option<String>,
    pub account: Option<String>,
    pub note: Option<String>,
}

/// Builder for journal entries
impl JournalEntry {
    /// Create a new instance of a journal entry
    /// Fills the `timestamp`, `entry` and `log_type` fields
    pub fn new(entry: VaultResult<()>, log_type: LogType, timestamp: u64) -> Self {
        Self {
            timestamp,
            entry: entry.map_err(clip_error),
            log_type,
            operation: None,
            account: None,
            note: None,
        }
    }

    /// Fills the `operation` field of the entry
    pub fn operation(&mut self, name: &str) -> &mut Self {
        self.operation = Some(name.to_string());
        self
    }

    /// Fills the `account` field of the entry
    pub fn account(&mut self, account: &Address) -> &mut Self {
        self.account = Some(account.to_checksum(None));
        self
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        self.note = Some(clip(text.as_ref()));
        self
    }

    /// Appends the entry to the journal
    pub fn commit(&mut self, journal: &Journal) {
        journal.append(self);
    }
}

impl Storable for JournalEntry {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(Encode!(self).unwrap())
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        Decode!(bytes.as_ref(), Self).unwrap()
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: MAX_JOURNAL_ENTRY_SIZE,
        is_fixed_size: false,
    };
}

/// Bounded log of journal entries
pub struct Journal {
    entries: StableVec<JournalEntry, DefaultMemoryImpl>,
    /// Slot of the oldest entry once the journal has wrapped
    oldest: Cell<u64>,
    capacity: u64,
}

impl Journal {
    pub fn new() -> VaultResult<Self> {
        Self::with_capacity(MAX_JOURNAL_ENTRIES)
    }

    pub fn with_capacity(capacity: u64) -> VaultResult<Self> {
        let entries = StableVec::new(DefaultMemoryImpl::default())
            .map_err(|err| VaultError::Custom(format!("{:?}", err)))?;
        Ok(Self {
            entries,
            oldest: Cell::new(0),
            capacity: capacity.max(1),
        })
    }

    pub fn len(&self) -> u64 {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, counted from the oldest retained entry
    pub fn get(&self, index: u64) -> Option<JournalEntry> {
        let len = self.len();
        if index >= len {
            return None;
        }
        self.entries.get((self.oldest.get() + index) % len)
    }

    pub fn last(&self) -> Option<JournalEntry> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        (0..self.len()).filter_map(|index| self.get(index)).collect()
    }

    fn append(&self, entry: &JournalEntry) {
        let len = self.len();
        if len < self.capacity {
            // A full memory drops the entry; the journal never aborts an operation.
            let _ = self.entries.push(entry);
            return;
        }
        let slot = self.oldest.get();
        self.entries.set(slot, entry);
        self.oldest.set((slot + 1) % len);
    }
}

fn clip(text: &str) -> String {
    text.chars().take(MAX_JOURNAL_NOTE_LENGTH).collect()
}

/// Keeps error payloads within the entry bound
fn clip_error(err: VaultError) -> VaultError {
    match err {
        VaultError::FieldOverflow(text) => VaultError::FieldOverflow(clip(&text)),
        VaultError::AdapterFailure(text) => VaultError::AdapterFailure(clip(&text)),
        VaultError::TokenTransferFailed(text) => VaultError::TokenTransferFailed(clip(&text)),
        VaultError::CallFailed(text) => VaultError::CallFailed(clip(&text)),
        VaultError::DecodingError(text) => VaultError::DecodingError(clip(&text)),
        VaultError::Arithmetic(text) => VaultError::Arithmetic(clip(&text)),
        VaultError::Custom(text) => VaultError::Custom(clip(&text)),
        other => other,
    }
}
