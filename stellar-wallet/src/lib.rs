//! Stellar Testnet Wallet
//!
//! An interactive command-line wallet for the Stellar test network. Accounts
//! are kept in a local JSON config file; balances, history and submissions go
//! through Horizon.
//!
//! ## Security Model
//!
//! - Secret seeds never leave the machine; transactions are signed locally
//! - The config file is written with owner-only permissions
//! - A seed is checked against the account address before it is used or saved

pub mod horizon;
pub mod keys;
pub mod session;
pub mod storage;
pub mod transaction;

pub mod commands;

pub use horizon::{FundResult, HorizonClient, HorizonError, SubmitError};
pub use keys::StellarKeys;
pub use session::{CredentialError, Session};
pub use storage::{AccountRecord, ConfigStore};
pub use transaction::{AssetSpec, OperationRequest};
