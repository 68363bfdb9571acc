//! Key Management
//!
//! Validation of Stellar strkeys (`G…` account addresses and `S…` secret
//! seeds) and ed25519 keypair handling for the wallet.
//!
//! The validators are total: they accept `Option<&str>` so that a missing
//! value from the config file or the shell is simply "not valid" rather than
//! an error path of its own.
//!
//! Security: the secret seed is stored in a `Zeroizing<String>` wrapper that
//! overwrites the memory when dropped, and the `Debug` implementation never
//! prints it.

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use stellar_strkey::ed25519::{PrivateKey, PublicKey};
use thiserror::Error;
use zeroize::Zeroizing;

/// Maximum size of a text memo, in bytes
pub const MEMO_TEXT_MAX_BYTES: usize = 28;

/// Errors raised while turning strings into keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret seed")]
    InvalidSeed,

    #[error("invalid account address: {0}")]
    InvalidAddress(String),
}

/// Check that `address` is a well-formed account strkey.
///
/// This only checks the encoding and checksum. It does not tell whether the
/// account exists on the network.
pub fn is_valid_address(address: Option<&str>) -> bool {
    match address {
        Some(address) => PublicKey::from_string(address).is_ok(),
        None => false,
    }
}

/// Check that `seed` is a well-formed secret seed strkey.
pub fn is_valid_seed(seed: Option<&str>) -> bool {
    match seed {
        Some(seed) => PrivateKey::from_string(seed).is_ok(),
        None => false,
    }
}

/// Check that the public key derived from `seed` is `address`.
pub fn keys_match(seed: Option<&str>, address: Option<&str>) -> bool {
    let (Some(seed), Some(address)) = (seed, address) else {
        return false;
    };
    let Ok(address) = PublicKey::from_string(address) else {
        return false;
    };

    match StellarKeys::from_seed(seed) {
        Ok(keys) => keys.public_key_bytes() == address.0,
        Err(_) => false,
    }
}

/// Check that `text` fits in a text memo.
pub fn is_valid_memo(text: Option<&str>) -> bool {
    match text {
        Some(text) => text.len() <= MEMO_TEXT_MAX_BYTES,
        None => false,
    }
}

/// Decode an account address into its raw ed25519 public key.
pub fn decode_address(address: &str) -> Result<[u8; 32], KeyError> {
    PublicKey::from_string(address)
        .map(|key| key.0)
        .map_err(|_| KeyError::InvalidAddress(address.to_string()))
}

/// An ed25519 keypair together with its strkey encodings.
#[derive(Clone)]
pub struct StellarKeys {
    signing_key: SigningKey,

    /// Secret seed (`S…`), zeroized on drop
    seed: Zeroizing<String>,

    /// Account address (`G…`)
    address: String,
}

impl StellarKeys {
    /// Generate a fresh random keypair
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut secret[..]);
        Self::from_secret_bytes(&secret)
    }

    /// Restore a keypair from a secret seed strkey
    pub fn from_seed(seed: &str) -> Result<Self, KeyError> {
        let private = PrivateKey::from_string(seed).map_err(|_| KeyError::InvalidSeed)?;
        let secret = Zeroizing::new(private.0);
        Ok(Self::from_secret_bytes(&secret))
    }

    fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let public = signing_key.verifying_key().to_bytes();

        Self {
            seed: Zeroizing::new(PrivateKey(*secret).to_string()),
            address: PublicKey(public).to_string(),
            signing_key,
        }
    }

    /// Account address (`G…`), safe to share
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Secret seed (`S…`)
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Raw ed25519 public key
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signature hint: the last four bytes of the public key
    pub fn hint(&self) -> [u8; 4] {
        let public = self.public_key_bytes();
        [public[28], public[29], public[30], public[31]]
    }

    /// Sign a message (a transaction hash, for the wallet's purposes)
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for StellarKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StellarKeys")
            .field("address", &self.address)
            .field("seed", &"[REDACTED]")
            .finish()
    }
}
