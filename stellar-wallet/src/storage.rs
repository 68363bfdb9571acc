//! Account Config Storage
//!
//! Stores the wallet's known accounts as a JSON document:
//!
//! ```json
//! {"accounts": [{"account_name": "...", "account_address": "G...", "account_seed": "S..." | null}]}
//! ```
//!
//! Older config files used `public_key`/`private_key` for the last two fields;
//! both spellings are accepted when reading.
//!
//! Entries are decoded one at a time so that a single malformed record is
//! reported and skipped instead of making the whole file unreadable. Skipped
//! entries stay in the file: `save` writes them back unchanged after the
//! records it was given.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::keys::is_valid_address;

/// Default config file name, placed in the user's home directory
pub const CONFIG_FILE_NAME: &str = ".stellar-wallet.config";

/// Errors raised while writing the config file
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named Stellar account known to the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "account_name")]
    pub name: String,

    #[serde(rename = "account_address", alias = "public_key")]
    pub address: String,

    /// Secret seed; validated lazily when the account has to sign
    #[serde(rename = "account_seed", alias = "private_key", default)]
    pub seed: Option<String>,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>, seed: Option<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            seed,
        }
    }
}

impl std::fmt::Display for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Account Name: {}, Account Address: {}",
            self.name, self.address
        )
    }
}

/// On-disk layout, written by `save`
#[derive(Serialize)]
struct ConfigFile<'a> {
    accounts: Vec<ConfigEntry<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ConfigEntry<'a> {
    Record(&'a AccountRecord),
    /// An entry `load` skipped, carried over verbatim
    Kept(&'a Value),
}

/// On-disk layout, as read by `load`
#[derive(Deserialize)]
struct RawConfigFile {
    accounts: Vec<Value>,
}

/// JSON file holding the account records
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.stellar-wallet.config`, or the working directory when there is no
    /// home directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all well-formed records.
    ///
    /// A missing or undecodable file yields an empty list; the reason is
    /// logged, never returned.
    pub fn load(&self) -> Vec<AccountRecord> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read config file {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match decode_records(&json) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "Config file {} could not be decoded as JSON: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the config file with `records`.
    ///
    /// Entries of the current file that `load` skipped are appended unchanged.
    /// A file that is not a config document at all is copied to `<name>.bak`
    /// before being replaced.
    pub fn save(&self, records: &[AccountRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let kept = self.skipped_entries()?;
        let mut accounts: Vec<ConfigEntry<'_>> = records.iter().map(ConfigEntry::Record).collect();
        accounts.extend(kept.iter().map(ConfigEntry::Kept));
        let json = serde_json::to_string_pretty(&ConfigFile { accounts })?;

        // Seeds live in this file, keep it private to the user
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?;
            // `mode` only applies to a newly created file
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
            file.write_all(json.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, json)?;
        }

        debug!(
            "Saved {} account(s) to {} ({} skipped entries kept)",
            records.len(),
            self.path.display(),
            kept.len()
        );
        Ok(())
    }

    /// Raw entries of the current file that do not decode to a usable record
    fn skipped_entries(&self) -> Result<Vec<Value>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<RawConfigFile>(&bytes) {
            Ok(raw) => Ok(raw
                .accounts
                .into_iter()
                .filter(|entry| decode_entry(entry).is_err())
                .collect()),
            Err(_) => {
                let backup = self.backup_path();
                fs::copy(&self.path, &backup)?;
                warn!(
                    "Replacing undecodable config file {}, previous content kept in {}",
                    self.path.display(),
                    backup.display()
                );
                Ok(Vec::new())
            }
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".bak");
        self.path.with_file_name(name)
    }
}

/// Decode the document, dropping entries that do not match the record schema
fn decode_records(json: &str) -> Result<Vec<AccountRecord>, serde_json::Error> {
    let raw: RawConfigFile = serde_json::from_str(json)?;

    let mut records = Vec::with_capacity(raw.accounts.len());
    for (i, entry) in raw.accounts.iter().enumerate() {
        match decode_entry(entry) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("Skipping config entry #{}: {}", i + 1, reason),
        }
    }

    Ok(records)
}

fn decode_entry(entry: &Value) -> Result<AccountRecord, String> {
    let record = AccountRecord::deserialize(entry).map_err(|e| e.to_string())?;
    if !is_valid_address(Some(&record.address)) {
        return Err(format!("{}: invalid account address", record.name));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADDRESS_1: &str = "GB3I37MLME4LC5LVAKRTKSKE2K7X5VR4MEBVG3EVHMB2C6V6J5A3XC6L";
    const SEED_1: &str = "SADGEOC6FE5KQJMC7O65HNURFZTB6SLJDM5JB665NSWOGVBEGRRGC3KK";
    const ADDRESS_2: &str = "GA6S6WSZVDBJQFEGYPZO7D5HWQINTIOSCKR5PAJRGZ4ZI2H7HED6V5RX";

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("wallet.config"))
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        assert!(!store.exists());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_garbage_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "not json at all {").unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let records = vec![
            AccountRecord::new("main", ADDRESS_1, Some(SEED_1.to_string())),
            AccountRecord::new("watch-only", ADDRESS_2, None),
        ];
        store.save(&records).unwrap();

        assert_eq!(store.load(), records);
    }

    #[test]
    fn test_save_load_round_trip_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store
            .save(&[
                AccountRecord::new("Account 1", ADDRESS_1, Some(SEED_1.to_string())),
                AccountRecord::new("Account 2", ADDRESS_2, None),
            ])
            .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        store.save(&store.load()).unwrap();
        let after = fs::read_to_string(store.path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_wire_format() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store
            .save(&[AccountRecord::new("main", ADDRESS_1, None)])
            .unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let account = &value["accounts"][0];
        assert_eq!(account["account_name"], "main");
        assert_eq!(account["account_address"], ADDRESS_1);
        assert!(account["account_seed"].is_null());
    }

    #[test]
    fn test_load_accepts_legacy_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        let json = serde_json::json!({
            "accounts": [
                { "account_name": "old", "public_key": ADDRESS_1, "private_key": SEED_1 },
                { "account_name": "no-seed", "public_key": ADDRESS_2 }
            ]
        });
        fs::write(store.path(), json.to_string()).unwrap();

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, ADDRESS_1);
        assert_eq!(records[0].seed.as_deref(), Some(SEED_1));
        assert_eq!(records[1].seed, None);
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        let json = serde_json::json!({
            "accounts": [
                { "account_name": "missing address" },
                { "account_name": "bad address", "account_address": "GNOTANADDRESS" },
                { "account_name": "good", "account_address": ADDRESS_1, "account_seed": null },
                42
            ]
        });
        fs::write(store.path(), json.to_string()).unwrap();

        let records = store.load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "good");
    }

    #[test]
    fn test_load_keeps_unusable_seed() {
        // Seeds are checked when signing, not when loading
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store
            .save(&[AccountRecord::new("main", ADDRESS_1, Some("garbage".to_string()))])
            .unwrap();

        assert_eq!(store.load()[0].seed.as_deref(), Some("garbage"));
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("nested").join("wallet.config"));

        store
            .save(&[AccountRecord::new("main", ADDRESS_1, None)])
            .unwrap();
        assert!(store.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store
            .save(&[AccountRecord::new("main", ADDRESS_1, None)])
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), r#"{"accounts": []}"#).unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store
            .save(&[AccountRecord::new("main", ADDRESS_1, Some(SEED_1.to_string()))])
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_keeps_skipped_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        let json = serde_json::json!({
            "accounts": [
                { "account_name": "good", "account_address": ADDRESS_1, "account_seed": null },
                // One character off from ADDRESS_2
                {
                    "account_name": "typo",
                    "account_address": "GA6S6WSZVDBJQFEGYPZO7D5HWQINTIOSCKR5PAJRGZ4ZI2H7HED6V5RY",
                    "account_seed": SEED_1
                },
                { "account_name": "missing address" }
            ]
        });
        fs::write(store.path(), json.to_string()).unwrap();

        let mut records = store.load();
        assert_eq!(records.len(), 1);
        records.push(AccountRecord::new("new", ADDRESS_2, None));
        store.save(&records).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let accounts = value["accounts"].as_array().unwrap();
        assert_eq!(accounts.len(), 4);
        assert_eq!(accounts[0]["account_name"], "good");
        assert_eq!(accounts[1]["account_name"], "new");
        assert_eq!(accounts[2], json["accounts"][1]);
        assert_eq!(accounts[2]["account_seed"], SEED_1);
        assert_eq!(accounts[3], json["accounts"][2]);

        // Still skipped, and not duplicated by a second save
        assert_eq!(store.load(), records);
        store.save(&store.load()).unwrap();
        let again: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(again, value);
    }

    #[test]
    fn test_save_backs_up_undecodable_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "not json at all {").unwrap();

        store
            .save(&[AccountRecord::new("main", ADDRESS_1, None)])
            .unwrap();

        let backup = temp_dir.path().join("wallet.config.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "not json at all {");
        assert_eq!(store.load().len(), 1);
    }
}
