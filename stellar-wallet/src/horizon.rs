//! Horizon Client
//!
//! Thin async client over the Horizon REST API of the Stellar test network:
//! account lookups, payment and transaction history, Friendbot funding and
//! transaction submission.
//!
//! Every call is a single awaited round trip. Submission is the exception: it
//! first looks up the account to learn its sequence number.

use serde::{de::DeserializeOwned, Deserialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::keys::StellarKeys;
use crate::transaction::{
    build_envelope, decode_result_code, encode_envelope, BuildError, OperationRequest,
    NATIVE_ASSET_CODE,
};

/// Horizon instance for the test network
pub const TESTNET_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";

/// Passphrase of the test network, hashed into every signature
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Records fetched by the history commands when no limit is given
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Largest page Horizon serves
const MAX_HISTORY_LIMIT: u32 = 200;

/// Errors raised by Horizon lookups
#[derive(Error, Debug)]
pub enum HorizonError {
    #[error("A connection error occurred (Please check your Internet connection): {0}")]
    Network(#[from] reqwest::Error),

    #[error("The specified account does not exist")]
    AccountNotFound,

    #[error("Horizon returned HTTP status {0}")]
    Status(u16),

    #[error("Unexpected response from Horizon: {0}")]
    MalformedResponse(String),
}

/// Horizon's verdict on a refused transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub title: String,
    pub detail: Option<String>,
    /// Transaction result code, e.g. `tx_bad_seq`
    pub result_code: Option<String>,
    /// Per-operation result codes, when Horizon reports them
    pub operation_codes: Vec<String>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction rejected ({} {})", self.status, self.title)?;
        if let Some(code) = &self.result_code {
            write!(f, ": {}", code)?;
        }
        if !self.operation_codes.is_empty() {
            write!(f, " [{}]", self.operation_codes.join(", "))?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ". {}", detail)?;
        }
        Ok(())
    }
}

/// Why a transaction did not make it into the ledger
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("A connection error occurred (Please check your Internet connection): {0}")]
    Network(reqwest::Error),

    #[error("The account does not exist on the network (fund it first)")]
    AccountNotFound,

    #[error("{0}")]
    Rejected(Rejection),

    #[error("Unexpected response from Horizon: {0}")]
    MalformedResponse(String),

    #[error("Failed to build transaction: {0}")]
    Build(String),
}

impl From<HorizonError> for SubmitError {
    fn from(e: HorizonError) -> Self {
        match e {
            HorizonError::Network(e) => SubmitError::Network(e),
            HorizonError::AccountNotFound => SubmitError::AccountNotFound,
            HorizonError::Status(status) => {
                SubmitError::MalformedResponse(format!("account lookup returned HTTP {}", status))
            }
            HorizonError::MalformedResponse(msg) => SubmitError::MalformedResponse(msg),
        }
    }
}

impl From<BuildError> for SubmitError {
    fn from(e: BuildError) -> Self {
        SubmitError::Build(e.to_string())
    }
}

/// Outcome of a Friendbot request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundResult {
    Funded,
    /// Friendbot answered with a non-2xx status
    Rejected(u16),
    Unreachable,
}

impl fmt::Display for FundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundResult::Funded => write!(f, "Successful transaction request"),
            FundResult::Rejected(status) => write!(
                f,
                "Failed transaction request (Maybe this account was already funded by Friendbot). Status code {}",
                status
            ),
            FundResult::Unreachable => write!(
                f,
                "A connection error occurred (Please check your Internet connection)"
            ),
        }
    }
}

/// A transaction accepted into the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub hash: String,
    pub ledger: Option<u64>,
    pub result_code: Option<String>,
}

/// One balance line of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// "XLM" for the native asset, the asset code otherwise
    pub asset: String,
    pub issuer: Option<String>,
    /// Decimal string as reported by Horizon
    pub amount: String,
}

impl Balance {
    pub fn is_native(&self) -> bool {
        self.issuer.is_none() && self.asset == NATIVE_ASSET_CODE
    }
}

/// The fields of an account the wallet cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: String,
    pub sequence: i64,
    pub balances: Vec<Balance>,
}

/// A payment-like operation from the account's history
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    /// Set on `create_account` operations
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub funder: Option<String>,
    #[serde(default)]
    pub starting_balance: Option<String>,
}

impl PaymentRecord {
    /// Asset code of the amount moved ("XLM" for native)
    pub fn asset(&self) -> &str {
        self.asset_code.as_deref().unwrap_or(NATIVE_ASSET_CODE)
    }
}

/// A transaction from the account's history
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub ledger: u64,
    pub created_at: String,
    pub source_account: String,
    pub operation_count: u32,
    pub successful: bool,
    #[serde(default)]
    pub memo_type: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Deserialize)]
struct RawAccount {
    id: String,
    sequence: String,
    balances: Vec<RawBalance>,
}

#[derive(Deserialize)]
struct RawBalance {
    balance: String,
    asset_type: String,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<String>,
}

impl From<RawBalance> for Balance {
    fn from(raw: RawBalance) -> Self {
        let asset = match (raw.asset_type.as_str(), raw.asset_code) {
            ("native", _) => NATIVE_ASSET_CODE.to_string(),
            (_, Some(code)) => code,
            // Liquidity pool shares carry no code
            (kind, None) => kind.to_string(),
        };

        Balance {
            asset,
            issuer: raw.asset_issuer,
            amount: raw.balance,
        }
    }
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(rename = "_embedded")]
    embedded: Embedded<T>,
}

#[derive(Deserialize)]
struct Embedded<T> {
    records: Vec<T>,
}

/// Body of a `POST /transactions` answer, success or problem document
#[derive(Deserialize, Default)]
struct SubmitResponse {
    hash: Option<String>,
    ledger: Option<u64>,
    result_xdr: Option<String>,
    status: Option<u16>,
    title: Option<String>,
    detail: Option<String>,
    extras: Option<SubmitExtras>,
}

#[derive(Deserialize, Default)]
struct SubmitExtras {
    result_xdr: Option<String>,
    result_codes: Option<ResultCodes>,
}

#[derive(Deserialize, Default)]
struct ResultCodes {
    transaction: Option<String>,
    #[serde(default)]
    operations: Vec<String>,
}

/// Horizon REST client
#[derive(Debug, Clone)]
pub struct HorizonClient {
    client: reqwest::Client,
    base_url: String,
    passphrase: String,
}

impl HorizonClient {
    /// Client for the public test network
    pub fn testnet() -> Result<Self, HorizonError> {
        Self::new(TESTNET_HORIZON_URL, TESTNET_PASSPHRASE)
    }

    /// Client for the Horizon instance at `base_url`, signing for the network
    /// named by `passphrase`
    pub fn new(base_url: &str, passphrase: &str) -> Result<Self, HorizonError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stellar-wallet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            passphrase: passphrase.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Look up an account
    pub async fn account(&self, address: &str) -> Result<AccountInfo, HorizonError> {
        let raw: RawAccount = self.get_json(&format!("/accounts/{}", address), &[]).await?;

        let sequence = raw.sequence.parse().map_err(|_| {
            HorizonError::MalformedResponse(format!("invalid sequence number '{}'", raw.sequence))
        })?;

        Ok(AccountInfo {
            id: raw.id,
            sequence,
            balances: raw.balances.into_iter().map(Balance::from).collect(),
        })
    }

    /// All balance lines of an account
    pub async fn get_balances(&self, address: &str) -> Result<Vec<Balance>, HorizonError> {
        Ok(self.account(address).await?.balances)
    }

    /// Most recent payment operations, newest first
    pub async fn payments(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, HorizonError> {
        self.history(&format!("/accounts/{}/payments", address), limit)
            .await
    }

    /// Most recent transactions, newest first
    pub async fn transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<TransactionRecord>, HorizonError> {
        self.history(&format!("/accounts/{}/transactions", address), limit)
            .await
    }

    /// Ask Friendbot to fund `address`
    pub async fn fund_via_friendbot(&self, address: &str) -> FundResult {
        let url = format!("{}/friendbot", self.base_url);
        debug!("Requesting Friendbot funding for {}", address);

        match self.client.get(&url).query(&[("addr", address)]).send().await {
            Ok(response) if response.status().is_success() => FundResult::Funded,
            Ok(response) => {
                let status = response.status().as_u16();
                warn!("Friendbot refused funding with HTTP {}", status);
                FundResult::Rejected(status)
            }
            Err(e) => {
                warn!("Friendbot request failed: {}", e);
                FundResult::Unreachable
            }
        }
    }

    /// Sign `request` with `keys` and submit it.
    ///
    /// Nothing is retried. A `tx_bad_seq` rejection, for example, is reported
    /// as is.
    pub async fn submit(
        &self,
        keys: &StellarKeys,
        request: &OperationRequest,
    ) -> Result<SubmitOutcome, SubmitError> {
        let account = self.account(keys.address()).await?;
        let sequence = account.sequence.checked_add(1).ok_or_else(|| {
            SubmitError::MalformedResponse("sequence number overflow".to_string())
        })?;

        let envelope = build_envelope(keys, sequence, request, &self.passphrase)?;
        let tx = encode_envelope(&envelope)?;

        let url = format!("{}/transactions", self.base_url);
        debug!("Submitting transaction from {} (sequence {})", keys.address(), sequence);

        let response = self
            .client
            .post(&url)
            .form(&[("tx", tx.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!("Transaction submission failed: {}", e);
                SubmitError::Network(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(SubmitError::Network)?;
        interpret_submit_response(status, &body)
    }

    async fn history<T: DeserializeOwned>(
        &self,
        path: &str,
        limit: u32,
    ) -> Result<Vec<T>, HorizonError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT).to_string();
        let page: Page<T> = self
            .get_json(path, &[("limit", limit.as_str()), ("order", "desc")])
            .await?;
        Ok(page.embedded.records)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HorizonError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                HorizonError::Network(e)
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            warn!("Account not found: {}", url);
            return Err(HorizonError::AccountNotFound);
        }
        if !status.is_success() {
            warn!("HTTP error from {}: {}", url, status);
            return Err(HorizonError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| HorizonError::MalformedResponse(e.to_string()))
    }
}

/// Turn the answer to `POST /transactions` into an outcome
fn interpret_submit_response(status: u16, body: &str) -> Result<SubmitOutcome, SubmitError> {
    let response: SubmitResponse = serde_json::from_str(body).map_err(|e| {
        SubmitError::MalformedResponse(format!("HTTP {}: {}", status, e))
    })?;
    let extras = response.extras.unwrap_or_default();

    let result_xdr = response.result_xdr.or(extras.result_xdr);
    let decoded = result_xdr.as_deref().and_then(|xdr| match decode_result_code(xdr) {
        Ok(code) => Some(code),
        Err(e) => {
            warn!("Could not decode transaction result: {}", e);
            None
        }
    });

    if (200..=299).contains(&status) {
        let hash = response.hash.ok_or_else(|| {
            SubmitError::MalformedResponse("missing transaction hash".to_string())
        })?;
        return Ok(SubmitOutcome {
            hash,
            ledger: response.ledger,
            result_code: decoded,
        });
    }

    let codes = extras.result_codes.unwrap_or_default();
    let rejection = Rejection {
        status: response.status.unwrap_or(status),
        title: response
            .title
            .unwrap_or_else(|| "Transaction Failed".to_string()),
        detail: response.detail,
        result_code: decoded.or(codes.transaction),
        operation_codes: codes.operations,
    };
    warn!("{}", rejection);
    Err(SubmitError::Rejected(rejection))
}
