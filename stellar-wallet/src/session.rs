//! Wallet Session
//!
//! The account chosen at startup, together with every record loaded from the
//! config file so that new accounts can be appended without reloading it.
//!
//! Nothing in here prompts the user. When the active account cannot sign,
//! `signing_keys` reports why and the shell decides how to ask for a seed.

use thiserror::Error;

use crate::keys::{is_valid_seed, keys_match, StellarKeys};
use crate::storage::{AccountRecord, ConfigStore, StorageError};

/// Why the active account cannot sign
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No secret seed is stored for this account")]
    Missing,

    #[error("The given secret seed is invalid")]
    Invalid,

    #[error("The given secret seed does not match the address of the current account")]
    Mismatch,
}

pub struct Session {
    store: ConfigStore,
    records: Vec<AccountRecord>,
    active: usize,
}

impl Session {
    /// Start a session on an existing record.
    ///
    /// Returns `None` when `active` is out of range.
    pub fn new(store: ConfigStore, records: Vec<AccountRecord>, active: usize) -> Option<Self> {
        if active >= records.len() {
            return None;
        }

        Some(Self {
            store,
            records,
            active,
        })
    }

    /// Generate a new keypair, append it as a record named `name` and persist
    /// the config file right away.
    pub fn create(
        store: ConfigStore,
        records: Vec<AccountRecord>,
        name: &str,
    ) -> Result<Self, StorageError> {
        let keys = StellarKeys::generate();
        let record = AccountRecord::new(name, keys.address(), Some(keys.seed().to_string()));

        let mut session = Self {
            store,
            records,
            active: 0,
        };
        session.append_and_persist(record)?;
        Ok(session)
    }

    /// Append a record, make it the active account and rewrite the config file
    pub fn append_and_persist(&mut self, record: AccountRecord) -> Result<(), StorageError> {
        self.records.push(record);
        self.active = self.records.len() - 1;
        self.store.save(&self.records)
    }

    /// The active account
    pub fn account(&self) -> &AccountRecord {
        &self.records[self.active]
    }

    pub fn address(&self) -> &str {
        &self.account().address
    }

    pub fn records(&self) -> &[AccountRecord] {
        &self.records
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Keys of the active account, when its stored seed is usable
    pub fn signing_keys(&self) -> Result<StellarKeys, CredentialError> {
        match self.account().seed.as_deref() {
            Some(seed) => self.check_seed(seed),
            None => Err(CredentialError::Missing),
        }
    }

    /// Validate a seed supplied by the user for the active account.
    ///
    /// With `persist`, the seed is stored in the account record and the config
    /// file is rewritten. A failed save is logged; the keys are still usable
    /// for the current operation.
    pub fn accept_seed(&mut self, seed: &str, persist: bool) -> Result<StellarKeys, CredentialError> {
        let keys = self.check_seed(seed)?;

        if persist {
            self.records[self.active].seed = Some(keys.seed().to_string());
            if let Err(e) = self.store.save(&self.records) {
                tracing::warn!("Failed to save seed to config file: {}", e);
            }
        }

        Ok(keys)
    }

    fn check_seed(&self, seed: &str) -> Result<StellarKeys, CredentialError> {
        if !is_valid_seed(Some(seed)) {
            return Err(CredentialError::Invalid);
        }
        if !keys_match(Some(seed), Some(self.address())) {
            return Err(CredentialError::Mismatch);
        }

        StellarKeys::from_seed(seed).map_err(|_| CredentialError::Invalid)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.store.path())
            .field("accounts", &self.records.len())
            .field("address", &self.address())
            .finish()
    }
}
