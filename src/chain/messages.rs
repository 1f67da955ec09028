//! Domain messages for the fungible token (`asset/ft`) module.
//!
//! # Responsibilities
//! - Validate decoded request payloads
//! - Build exactly one [`DomainMessage`] per request
//! - Encode messages as protobuf `Any` for the transaction body
//!
//! Building is pure: no I/O, no clock, no randomness. The signer address is
//! always supplied by the caller from a resolved identity, never read from
//! the request.

use cosmrs::Any;
use primitive_types::U256;
use prost::Message;
use serde::Deserialize;
use thiserror::Error;

/// Highest precision accepted by the ft module.
pub const MAX_PRECISION: u32 = 20;

pub const MSG_ISSUE_TYPE_URL: &str = "/coreum.asset.ft.v1.MsgIssue";
pub const MSG_TRANSFER_ADMIN_TYPE_URL: &str = "/coreum.asset.ft.v1.MsgTransferAdmin";
pub const MSG_CLEAR_ADMIN_TYPE_URL: &str = "/coreum.asset.ft.v1.MsgClearAdmin";

/// Errors raised while validating a request or building a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field '{field}' must be a non-negative integer{range}")]
    MalformedAmount { field: &'static str, range: String },

    #[error("field '{0}' is required")]
    MissingField(&'static str),

    #[error("unsupported operation '{0}'")]
    InvalidOperation(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("message signer {message_signer} does not match identity {identity}")]
    SignerMismatch {
        message_signer: String,
        identity: String,
    },
}

/// Optional capabilities of an issued token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Feature {
    Minting = 0,
    Burning = 1,
    Freezing = 2,
    Whitelisting = 3,
    Ibc = 4,
    BlockSmartContracts = 5,
    Clawback = 6,
    Extension = 7,
}

/// Features every issued token carries. Not configurable by callers.
pub const ISSUE_FEATURES: [Feature; 1] = [Feature::Freezing];

/// Wire form of `coreum.asset.ft.v1.MsgIssue`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgIssue {
    #[prost(string, tag = "1")]
    pub issuer: String,
    #[prost(string, tag = "2")]
    pub symbol: String,
    #[prost(string, tag = "3")]
    pub subunit: String,
    #[prost(uint32, tag = "4")]
    pub precision: u32,
    #[prost(string, tag = "5")]
    pub initial_amount: String,
    #[prost(string, tag = "6")]
    pub description: String,
    #[prost(enumeration = "Feature", repeated, tag = "7")]
    pub features: Vec<i32>,
    #[prost(string, tag = "8")]
    pub burn_rate: String,
    #[prost(string, tag = "9")]
    pub send_commission_rate: String,
    #[prost(string, tag = "10")]
    pub uri: String,
    #[prost(string, tag = "11")]
    pub uri_hash: String,
}

/// Wire form of `coreum.asset.ft.v1.MsgTransferAdmin`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgTransferAdmin {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub account: String,
    #[prost(string, tag = "3")]
    pub denom: String,
}

/// Wire form of `coreum.asset.ft.v1.MsgClearAdmin`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgClearAdmin {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub denom: String,
}

/// Operation tags accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    IssueToken,
    TransferAdmin,
    ClearAdmin,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::IssueToken => "issue-token",
            Operation::TransferAdmin => "transfer-admin",
            Operation::ClearAdmin => "clear-admin",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = ValidationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "issue-token" => Ok(Operation::IssueToken),
            "transfer-admin" => Ok(Operation::TransferAdmin),
            "clear-admin" => Ok(Operation::ClearAdmin),
            other => Err(ValidationError::InvalidOperation(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON integer given either as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntegerInput {
    Number(serde_json::Number),
    Text(String),
}

impl Default for IntegerInput {
    fn default() -> Self {
        IntegerInput::Text(String::new())
    }
}

impl From<u32> for IntegerInput {
    fn from(value: u32) -> Self {
        IntegerInput::Number(value.into())
    }
}

/// Decoded `issue-token` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueTokenRequest {
    pub symbol: String,
    pub subunit: String,
    pub precision: IntegerInput,
    pub initial_amount: String,
    pub description: String,
}

/// Decoded `transfer-admin` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransferAdminRequest {
    pub denom: String,
    pub new_admin: String,
}

/// Decoded `clear-admin` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearAdminRequest {
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueToken {
    pub issuer: String,
    pub symbol: String,
    pub subunit: String,
    pub precision: u32,
    pub initial_amount: U256,
    pub description: String,
    pub features: Vec<Feature>,
}

impl IssueToken {
    /// Canonical denom of the issued token: `<subunit>-<issuer>`.
    pub fn denom(&self) -> String {
        derive_denom(&self.subunit, &self.issuer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAdmin {
    pub sender: String,
    pub account: String,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearAdmin {
    pub sender: String,
    pub denom: String,
}

/// One ledger message, ready to be placed in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainMessage {
    IssueToken(IssueToken),
    TransferAdmin(TransferAdmin),
    ClearAdmin(ClearAdmin),
}

impl DomainMessage {
    /// Address that must sign this message.
    pub fn signer(&self) -> &str {
        match self {
            DomainMessage::IssueToken(m) => &m.issuer,
            DomainMessage::TransferAdmin(m) => &m.sender,
            DomainMessage::ClearAdmin(m) => &m.sender,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            DomainMessage::IssueToken(_) => Operation::IssueToken,
            DomainMessage::TransferAdmin(_) => Operation::TransferAdmin,
            DomainMessage::ClearAdmin(_) => Operation::ClearAdmin,
        }
    }

    /// Denom the message acts on.
    pub fn denom(&self) -> String {
        match self {
            DomainMessage::IssueToken(m) => m.denom(),
            DomainMessage::TransferAdmin(m) => m.denom.clone(),
            DomainMessage::ClearAdmin(m) => m.denom.clone(),
        }
    }

    /// Protobuf encoding wrapped in `Any`.
    pub fn to_any(&self) -> Any {
        match self {
            DomainMessage::IssueToken(m) => Any {
                type_url: MSG_ISSUE_TYPE_URL.to_string(),
                value: MsgIssue {
                    issuer: m.issuer.clone(),
                    symbol: m.symbol.clone(),
                    subunit: m.subunit.clone(),
                    precision: m.precision,
                    initial_amount: m.initial_amount.to_string(),
                    description: m.description.clone(),
                    features: m.features.iter().map(|f| *f as i32).collect(),
                    // Dec fields are non-nullable on the node
                    burn_rate: "0".to_string(),
                    send_commission_rate: "0".to_string(),
                    uri: String::new(),
                    uri_hash: String::new(),
                }
                .encode_to_vec(),
            },
            DomainMessage::TransferAdmin(m) => Any {
                type_url: MSG_TRANSFER_ADMIN_TYPE_URL.to_string(),
                value: MsgTransferAdmin {
                    sender: m.sender.clone(),
                    account: m.account.clone(),
                    denom: m.denom.clone(),
                }
                .encode_to_vec(),
            },
            DomainMessage::ClearAdmin(m) => Any {
                type_url: MSG_CLEAR_ADMIN_TYPE_URL.to_string(),
                value: MsgClearAdmin {
                    sender: m.sender.clone(),
                    denom: m.denom.clone(),
                }
                .encode_to_vec(),
            },
        }
    }
}

/// Denom rule of the ft module: subunit and issuer joined by one hyphen.
pub fn derive_denom(subunit: &str, issuer: &str) -> String {
    format!("{}-{}", subunit, issuer)
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Parse an arbitrary-size non-negative decimal integer.
pub fn parse_amount(field: &'static str, value: &str) -> Result<U256, ValidationError> {
    let malformed = || ValidationError::MalformedAmount {
        field,
        range: String::new(),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    U256::from_dec_str(trimmed).map_err(|_| malformed())
}

fn parse_precision(input: &IntegerInput) -> Result<u32, ValidationError> {
    let malformed = || ValidationError::MalformedAmount {
        field: "precision",
        range: format!(" in 0..={}", MAX_PRECISION),
    };
    let value = match input {
        IntegerInput::Number(n) => n.as_u64().ok_or_else(malformed)?,
        IntegerInput::Text(s) => s.trim().parse::<u64>().map_err(|_| malformed())?,
    };
    u32::try_from(value)
        .ok()
        .filter(|p| *p <= MAX_PRECISION)
        .ok_or_else(malformed)
}

/// Build an issuance message signed by `issuer`.
pub fn build_issue(req: &IssueTokenRequest, issuer: &str) -> Result<DomainMessage, ValidationError> {
    let symbol = required("symbol", &req.symbol)?;
    let subunit = required("subunit", &req.subunit)?;
    let precision = parse_precision(&req.precision)?;
    let initial_amount = parse_amount("initial_amount", &req.initial_amount)?;

    Ok(DomainMessage::IssueToken(IssueToken {
        issuer: required("issuer", issuer)?,
        symbol,
        subunit,
        precision,
        initial_amount,
        description: req.description.trim().to_string(),
        features: ISSUE_FEATURES.to_vec(),
    }))
}

/// Build an admin transfer signed by `sender`.
pub fn build_transfer_admin(
    req: &TransferAdminRequest,
    sender: &str,
) -> Result<DomainMessage, ValidationError> {
    Ok(DomainMessage::TransferAdmin(TransferAdmin {
        sender: required("sender", sender)?,
        account: required("new_admin", &req.new_admin)?,
        denom: required("denom", &req.denom)?,
    }))
}

/// Build an admin clear signed by `sender`.
pub fn build_clear_admin(req: &ClearAdminRequest, sender: &str) -> Result<DomainMessage, ValidationError> {
    Ok(DomainMessage::ClearAdmin(ClearAdmin {
        sender: required("sender", sender)?,
        denom: required("denom", &req.denom)?,
    }))
}

/// Build a message from an operation tag and a raw JSON payload.
pub fn build(
    tag: &str,
    payload: serde_json::Value,
    signer: &str,
) -> Result<DomainMessage, ValidationError> {
    let decode_err = |e: serde_json::Error| ValidationError::MalformedRequest(e.to_string());
    match tag.parse::<Operation>()? {
        Operation::IssueToken => build_issue(&serde_json::from_value(payload).map_err(decode_err)?, signer),
        Operation::TransferAdmin => {
            build_transfer_admin(&serde_json::from_value(payload).map_err(decode_err)?, signer)
        }
        Operation::ClearAdmin => {
            build_clear_admin(&serde_json::from_value(payload).map_err(decode_err)?, signer)
        }
    }
}
