//! Transaction Building and Signing
//!
//! Turns a single wallet operation (payment, trustline, account creation)
//! into a signed v1 transaction envelope. All signing happens locally; Horizon
//! only ever sees the signed envelope.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, AlphaNum12, AlphaNum4, Asset, AssetCode12, AssetCode4, ChangeTrustAsset,
    ChangeTrustOp, CreateAccountOp, DecoratedSignature, Hash, Limits, Memo, MuxedAccount,
    Operation, OperationBody, PaymentOp, Preconditions, PublicKey, ReadXdr, SequenceNumber,
    Signature, SignatureHint, Transaction, TransactionEnvelope, TransactionExt, TransactionResult,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, Uint256, WriteXdr,
};
use thiserror::Error;

use crate::keys::{decode_address, is_valid_address, is_valid_memo, KeyError, StellarKeys};

/// Stroops per lumen (amounts carry seven decimal places)
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Fee per operation, in stroops
pub const BASE_FEE: u32 = 100;

/// Code shown for the native asset
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Longest asset code the network accepts
const MAX_ASSET_CODE_LEN: usize = 12;

/// Errors raised while parsing an amount typed by the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount format")]
    Invalid,

    #[error("amount cannot be negative")]
    Negative,

    #[error("amount must be greater than 0")]
    Zero,

    #[error("amount has more than 7 decimal places")]
    TooPrecise,

    #[error("amount is too large")]
    Overflow,
}

/// Why an operation request was refused before anything was sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The given destination address is invalid")]
    InvalidDestination,

    #[error("The destination is the address of the current account. This is not allowed")]
    OwnAddress,

    #[error("The given asset issuer address is invalid")]
    InvalidIssuer,

    #[error("Invalid asset code '{0}': expected 1 to 12 letters or digits")]
    InvalidAssetCode(String),

    #[error("The maximum size of the text memo is 28 bytes")]
    MemoTooLong,
}

/// Errors raised while encoding a transaction
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid asset code: {0}")]
    AssetCode(String),

    #[error("XDR encoding failed: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

/// Parse a decimal amount into stroops.
///
/// Accepts `,` as the decimal separator.
pub fn parse_amount(amount: &str) -> Result<i64, AmountError> {
    let amount = amount.trim().replace(',', ".");
    if amount.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount.as_str(), ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid);
    }
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid);
    }
    if fraction.len() > 7 {
        return Err(AmountError::TooPrecise);
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let fraction: i64 = format!("{:0<7}", fraction)
        .parse()
        .map_err(|_| AmountError::Invalid)?;

    let stroops = whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|v| v.checked_add(fraction))
        .ok_or(AmountError::Overflow)?;

    if stroops == 0 {
        return Err(AmountError::Zero);
    }
    Ok(stroops)
}

/// Format stroops as a decimal amount without trailing zeros
pub fn format_amount(stroops: i64) -> String {
    let whole = stroops / STROOPS_PER_UNIT;
    let fraction = (stroops % STROOPS_PER_UNIT).abs();
    if fraction == 0 {
        return whole.to_string();
    }

    let fraction = format!("{:07}", fraction);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Check an asset code: 1 to 12 ASCII letters or digits
pub fn is_valid_asset_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_ASSET_CODE_LEN
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// The asset moved by a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSpec {
    Native,
    Credit { code: String, issuer: String },
}

impl AssetSpec {
    pub fn credit(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self::Credit {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    /// Display code ("XLM" for the native asset)
    pub fn code(&self) -> &str {
        match self {
            Self::Native => NATIVE_ASSET_CODE,
            Self::Credit { code, .. } => code.as_str(),
        }
    }

    fn to_xdr(&self) -> Result<Asset, BuildError> {
        match self {
            Self::Native => Ok(Asset::Native),
            Self::Credit { code, issuer } => match credit_asset(code, issuer)? {
                CreditAsset::Four(asset) => Ok(Asset::CreditAlphanum4(asset)),
                CreditAsset::Twelve(asset) => Ok(Asset::CreditAlphanum12(asset)),
            },
        }
    }
}

/// A single operation the wallet can submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Payment {
        destination: String,
        asset: AssetSpec,
        /// In stroops
        amount: i64,
        memo: String,
    },
    Trustline {
        /// Account issuing the asset
        issuer: String,
        code: String,
        /// In stroops
        limit: i64,
        memo: String,
    },
    CreateAccount {
        destination: String,
        /// In stroops
        starting_balance: i64,
        memo: String,
    },
}

impl OperationRequest {
    /// The account the operation points at
    pub fn destination(&self) -> &str {
        match self {
            Self::Payment { destination, .. } => destination.as_str(),
            Self::Trustline { issuer, .. } => issuer.as_str(),
            Self::CreateAccount { destination, .. } => destination.as_str(),
        }
    }

    pub fn memo(&self) -> &str {
        match self {
            Self::Payment { memo, .. }
            | Self::Trustline { memo, .. }
            | Self::CreateAccount { memo, .. } => memo.as_str(),
        }
    }

    /// Check the request against the submitting account, in order: the
    /// destination is well formed, it is not `own_address`, the asset is well
    /// formed, the memo fits.
    pub fn validate(&self, own_address: &str) -> Result<(), ValidationError> {
        let destination = self.destination();
        if !is_valid_address(Some(destination)) {
            return Err(ValidationError::InvalidDestination);
        }
        if destination == own_address {
            return Err(ValidationError::OwnAddress);
        }

        match self {
            Self::Payment {
                asset: AssetSpec::Credit { code, issuer },
                ..
            } => {
                if !is_valid_address(Some(issuer)) {
                    return Err(ValidationError::InvalidIssuer);
                }
                if !is_valid_asset_code(code) {
                    return Err(ValidationError::InvalidAssetCode(code.clone()));
                }
            }
            Self::Trustline { code, .. } => {
                if !is_valid_asset_code(code) {
                    return Err(ValidationError::InvalidAssetCode(code.clone()));
                }
            }
            _ => {}
        }

        if !is_valid_memo(Some(self.memo())) {
            return Err(ValidationError::MemoTooLong);
        }
        Ok(())
    }

    /// Question asked before the operation is signed
    pub fn confirmation_message(&self) -> String {
        match self {
            Self::Payment {
                destination,
                asset,
                amount,
                ..
            } => format!(
                "A payment of {} {} will be made to the following address {}. Are you sure you want to proceed?",
                format_amount(*amount),
                asset.code(),
                destination
            ),
            Self::Trustline {
                issuer,
                code,
                limit,
                ..
            } => format!(
                "A trustline for {} issued by {} will be established with a limit of {}. Are you sure you want to proceed?",
                code,
                issuer,
                format_amount(*limit)
            ),
            Self::CreateAccount {
                destination,
                starting_balance,
                ..
            } => format!(
                "The account {} will be created with a starting balance of {} {}. Are you sure you want to proceed?",
                destination,
                format_amount(*starting_balance),
                NATIVE_ASSET_CODE
            ),
        }
    }

    fn to_operation(&self) -> Result<Operation, BuildError> {
        let body = match self {
            Self::Payment {
                destination,
                asset,
                amount,
                ..
            } => OperationBody::Payment(PaymentOp {
                destination: muxed_account(destination)?,
                asset: asset.to_xdr()?,
                amount: *amount,
            }),
            Self::Trustline {
                issuer,
                code,
                limit,
                ..
            } => {
                let line = match credit_asset(code, issuer)? {
                    CreditAsset::Four(asset) => ChangeTrustAsset::CreditAlphanum4(asset),
                    CreditAsset::Twelve(asset) => ChangeTrustAsset::CreditAlphanum12(asset),
                };
                OperationBody::ChangeTrust(ChangeTrustOp {
                    line,
                    limit: *limit,
                })
            }
            Self::CreateAccount {
                destination,
                starting_balance,
                ..
            } => OperationBody::CreateAccount(CreateAccountOp {
                destination: account_id(destination)?,
                starting_balance: *starting_balance,
            }),
        };

        Ok(Operation {
            source_account: None,
            body,
        })
    }
}

/// Network id: SHA-256 of the network passphrase
pub fn network_id(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Hash that gets signed for `tx` on the network named by `passphrase`
pub fn transaction_hash(tx: &Transaction, passphrase: &str) -> Result<[u8; 32], BuildError> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network_id(passphrase)),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload.to_xdr(Limits::none())?;
    Ok(Sha256::digest(&bytes).into())
}

/// Build and sign a one-operation transaction.
///
/// `sequence` is the sequence number of the new transaction, i.e. the
/// account's current sequence plus one.
pub fn build_envelope(
    keys: &StellarKeys,
    sequence: i64,
    request: &OperationRequest,
    passphrase: &str,
) -> Result<TransactionEnvelope, BuildError> {
    let memo = match request.memo() {
        "" => Memo::None,
        text => Memo::Text(text.as_bytes().to_vec().try_into()?),
    };

    let tx = Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(keys.public_key_bytes())),
        fee: BASE_FEE,
        seq_num: SequenceNumber(sequence),
        cond: Preconditions::None,
        memo,
        operations: vec![request.to_operation()?].try_into()?,
        ext: TransactionExt::V0,
    };

    let hash = transaction_hash(&tx, passphrase)?;
    let signature = DecoratedSignature {
        hint: SignatureHint(keys.hint()),
        signature: Signature(keys.sign(&hash).to_vec().try_into()?),
    };

    Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: vec![signature].try_into()?,
    }))
}

/// Base64 XDR form of an envelope, as Horizon expects it
pub fn encode_envelope(envelope: &TransactionEnvelope) -> Result<String, BuildError> {
    Ok(envelope.to_xdr_base64(Limits::none())?)
}

/// Decode a `TransactionResult` and return its code the way Horizon spells
/// it, e.g. `tx_bad_seq`.
pub fn decode_result_code(result_xdr: &str) -> Result<String, stellar_xdr::curr::Error> {
    let result = TransactionResult::from_xdr_base64(result_xdr, Limits::none())?;
    Ok(snake_case(result.result.name()))
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

enum CreditAsset {
    Four(AlphaNum4),
    Twelve(AlphaNum12),
}

fn credit_asset(code: &str, issuer: &str) -> Result<CreditAsset, BuildError> {
    if !is_valid_asset_code(code) {
        return Err(BuildError::AssetCode(code.to_string()));
    }
    let issuer = account_id(issuer)?;

    // Codes are right-padded with zero bytes
    if code.len() <= 4 {
        let mut bytes = [0u8; 4];
        bytes[..code.len()].copy_from_slice(code.as_bytes());
        Ok(CreditAsset::Four(AlphaNum4 {
            asset_code: AssetCode4(bytes),
            issuer,
        }))
    } else {
        let mut bytes = [0u8; 12];
        bytes[..code.len()].copy_from_slice(code.as_bytes());
        Ok(CreditAsset::Twelve(AlphaNum12 {
            asset_code: AssetCode12(bytes),
            issuer,
        }))
    }
}

fn account_id(address: &str) -> Result<AccountId, BuildError> {
    Ok(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(
        decode_address(address)?,
    ))))
}

fn muxed_account(address: &str) -> Result<MuxedAccount, BuildError> {
    Ok(MuxedAccount::Ed25519(Uint256(decode_address(address)?)))
}
