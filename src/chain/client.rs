//! Ledger node client over the REST gateway.
//!
//! # Responsibilities
//! - Open an HTTPS-only session (TLS 1.2 minimum, no plaintext fallback)
//! - Verify the node serves the configured chain
//! - Query account numbers and gas prices
//! - Simulate, broadcast and look up transactions
//!
//! No call here is retried. A broadcast is issued exactly once per call;
//! callers decide what to do with ambiguous failures.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::types::{
    AccountInfo, ChainConfig, ChainError, ChainResult, NodeInfo, SubmissionReceipt,
    TransactionOutcome,
};

/// Capabilities of an open session with a ledger node.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Chain identifier the session is bound to.
    fn chain_id(&self) -> &str;

    /// Identity of the connected node.
    async fn node_info(&self) -> ChainResult<NodeInfo>;

    /// Account number and next sequence of `address`.
    async fn account(&self, address: &str) -> ChainResult<AccountInfo>;

    /// Price of one unit of gas in the fee denom.
    async fn gas_price(&self) -> ChainResult<Decimal>;

    /// Dry-run a transaction and return the gas it used.
    async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<u64>;

    /// Broadcast a signed transaction. Never retried.
    async fn submit(&self, tx_bytes: &[u8]) -> ChainResult<SubmissionReceipt>;

    /// Look up a transaction. `None` while it is not yet included.
    async fn tx_status(&self, hash: &str) -> ChainResult<Option<TransactionOutcome>>;
}

/// Opens sessions. One session is opened per request.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> ChainResult<Arc<dyn ChainConnector>>;
}

/// Opens [`RestConnector`] sessions from a fixed configuration.
#[derive(Debug, Clone)]
pub struct RestConnect {
    config: ChainConfig,
}

impl RestConnect {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connect for RestConnect {
    async fn connect(&self) -> ChainResult<Arc<dyn ChainConnector>> {
        let connector = RestConnector::connect(&self.config).await?;
        Ok(Arc::new(connector))
    }
}

/// Session with a node's REST gateway.
#[derive(Clone)]
pub struct RestConnector {
    http: Client,
    base: url::Url,
    chain_id: String,
    fixed_gas_price: Option<Decimal>,
    gas_price_adjustment: Decimal,
}

/// gRPC `NotFound`, as reported by the gateway for unknown hashes.
const GATEWAY_NOT_FOUND: i64 = 5;

/// Error body produced by the gRPC gateway.
#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    raw_log: String,
    #[serde(default)]
    height: String,
}

#[derive(Debug, Deserialize)]
struct TxEnvelope {
    tx_response: TxResponse,
}

impl RestConnector {
    /// Open a session and verify the node's chain id.
    ///
    /// Fails with [`ChainError::Connection`] when the endpoint is not
    /// `https`, the TLS handshake fails, or the node reports another chain.
    pub async fn connect(config: &ChainConfig) -> ChainResult<Self> {
        let mut base: url::Url = config.endpoint.parse().map_err(|e| {
            ChainError::Connection(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        if base.scheme() != "https" {
            return Err(ChainError::Connection(format!(
                "endpoint '{}' is not https",
                config.endpoint
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let http = Client::builder()
            .use_rustls_tls()
            .https_only(true)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Connection(format!("failed to build TLS client: {}", e)))?;

        let connector = Self {
            http,
            base,
            chain_id: config.chain_id.clone(),
            fixed_gas_price: config.gas_price,
            gas_price_adjustment: config.gas_price_adjustment,
        };

        let info = connector.node_info().await.map_err(|e| match e {
            ChainError::Connection(_) => e,
            other => ChainError::Connection(other.to_string()),
        })?;
        if info.network != connector.chain_id {
            return Err(ChainError::Connection(format!(
                "chain id mismatch: expected {}, node serves {}",
                connector.chain_id, info.network
            )));
        }

        tracing::debug!(
            endpoint = %connector.base,
            chain_id = %connector.chain_id,
            node_version = %info.version,
            "Chain session established"
        );
        Ok(connector)
    }

    fn url(&self, path: &str) -> ChainResult<url::Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ChainError::Connection(format!("invalid path '{}': {}", path, e)))
    }

    /// GET a JSON document. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ChainResult<Option<T>> {
        let response = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(node_error(status, &body));
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ChainError::NodeInternal(format!("unexpected response from {}: {}", path, e)))
    }

    async fn min_gas_price(&self) -> ChainResult<Decimal> {
        let body: Value = self
            .get_json("/coreum/feemodel/v1/min_gas_price")
            .await?
            .ok_or_else(|| ChainError::NodeInternal("fee model not available".to_string()))?;
        body.pointer("/min_gas_price/amount")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| ChainError::NodeInternal("malformed min gas price".to_string()))
    }
}

#[async_trait]
impl ChainConnector for RestConnector {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn node_info(&self) -> ChainResult<NodeInfo> {
        let body: Value = self
            .get_json("/cosmos/base/tendermint/v1beta1/node_info")
            .await?
            .ok_or_else(|| ChainError::Connection("node info endpoint not found".to_string()))?;
        let field = |pointer: &str| {
            body.pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(NodeInfo {
            network: field("/default_node_info/network"),
            version: field("/application_version/version"),
        })
    }

    async fn account(&self, address: &str) -> ChainResult<AccountInfo> {
        let body: Value = self
            .get_json(&format!("/cosmos/auth/v1beta1/accounts/{}", address))
            .await?
            .ok_or_else(|| {
                ChainError::SimulationRejected(format!("account {} not found on chain", address))
            })?;
        parse_account(&body).ok_or_else(|| {
            ChainError::NodeInternal(format!("unrecognised account format for {}", address))
        })
    }

    async fn gas_price(&self) -> ChainResult<Decimal> {
        match self.fixed_gas_price {
            Some(price) => Ok(price),
            None => Ok(self.min_gas_price().await? * self.gas_price_adjustment),
        }
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<u64> {
        let response = self
            .http
            .post(self.url("/cosmos/tx/v1beta1/simulate")?)
            .json(&json!({ "tx_bytes": BASE64.encode(tx_bytes) }))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        classify_simulate(status, &body)
    }

    async fn submit(&self, tx_bytes: &[u8]) -> ChainResult<SubmissionReceipt> {
        let response = self
            .http
            .post(self.url("/cosmos/tx/v1beta1/txs")?)
            .json(&json!({
                "tx_bytes": BASE64.encode(tx_bytes),
                "mode": "BROADCAST_MODE_SYNC",
            }))
            .send()
            .await
            .map_err(|e| broadcast_send_error(e.is_connect(), e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ChainError::SubmissionRejected {
            detail: format!("broadcast response lost: {}", e),
            outcome_unknown: true,
        })?;
        classify_broadcast(status, &body)
    }

    async fn tx_status(&self, hash: &str) -> ChainResult<Option<TransactionOutcome>> {
        let path = format!("/cosmos/tx/v1beta1/txs/{}", hash);
        let response = self
            .http
            .get(self.url(&path)?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        classify_tx_status(status, &body)
    }
}

impl std::fmt::Debug for RestConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("endpoint", &self.base.as_str())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

fn transport_error(e: reqwest::Error) -> ChainError {
    if e.is_timeout() {
        ChainError::Connection(format!("request timed out: {}", e))
    } else {
        ChainError::Connection(e.to_string())
    }
}

fn node_error(status: StatusCode, body: &str) -> ChainError {
    match gateway_error(body) {
        Some(err) if !err.message.is_empty() => {
            ChainError::NodeInternal(format!("HTTP {} (code {}): {}", status, err.code, err.message))
        }
        _ => ChainError::NodeInternal(format!("HTTP {}", status)),
    }
}

fn gateway_error(body: &str) -> Option<GatewayError> {
    serde_json::from_str(body).ok()
}

/// Gas used by a simulation, or why the node refused it.
fn classify_simulate(status: StatusCode, body: &str) -> ChainResult<u64> {
    if !status.is_success() {
        return Err(match gateway_error(body) {
            Some(err) if !err.message.is_empty() => ChainError::SimulationRejected(err.message),
            _ => node_error(status, body),
        });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ChainError::NodeInternal(format!("malformed simulate response: {}", e)))?;
    value
        .pointer("/gas_info/gas_used")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| ChainError::NodeInternal("simulate response lacks gas_used".to_string()))
}

/// A broadcast that failed before any reply arrived.
///
/// Only a failed connect proves nothing was sent.
fn broadcast_send_error(connect_failed: bool, cause: impl Display) -> ChainError {
    if connect_failed {
        ChainError::Connection(cause.to_string())
    } else {
        ChainError::SubmissionRejected {
            detail: format!("broadcast interrupted: {}", cause),
            outcome_unknown: true,
        }
    }
}

/// Receipt of a sync broadcast, or the rejection it carries.
fn classify_broadcast(status: StatusCode, body: &str) -> ChainResult<SubmissionReceipt> {
    if !status.is_success() {
        let detail = gateway_error(body)
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));
        // A 5xx may have been produced after the node accepted the tx.
        return Err(ChainError::SubmissionRejected {
            detail,
            outcome_unknown: status.is_server_error(),
        });
    }

    let envelope: TxEnvelope =
        serde_json::from_str(body).map_err(|e| ChainError::SubmissionRejected {
            detail: format!("malformed broadcast response: {}", e),
            outcome_unknown: true,
        })?;
    let tx = envelope.tx_response;
    if tx.code != 0 {
        return Err(ChainError::SubmissionRejected {
            detail: format!("{} code {}: {}", tx.codespace, tx.code, tx.raw_log),
            outcome_unknown: false,
        });
    }
    if tx.txhash.is_empty() {
        return Err(ChainError::SubmissionRejected {
            detail: "broadcast response lacks a hash".to_string(),
            outcome_unknown: true,
        });
    }
    Ok(SubmissionReceipt { hash: tx.txhash })
}

/// Inclusion result of a lookup. `None` only for a genuine not-found.
fn classify_tx_status(status: StatusCode, body: &str) -> ChainResult<Option<TransactionOutcome>> {
    if !status.is_success() {
        let not_found = status == StatusCode::NOT_FOUND
            || gateway_error(body).is_some_and(|e| e.code == GATEWAY_NOT_FOUND);
        if not_found {
            return Ok(None);
        }
        return Err(node_error(status, body));
    }

    let envelope: TxEnvelope = serde_json::from_str(body)
        .map_err(|e| ChainError::NodeInternal(format!("malformed tx response: {}", e)))?;
    Ok(Some(outcome_from(envelope.tx_response)))
}

fn outcome_from(tx: TxResponse) -> TransactionOutcome {
    let height = tx.height.parse::<u64>().ok();
    if tx.code == 0 {
        TransactionOutcome::committed(tx.txhash, height.unwrap_or_default())
    } else {
        TransactionOutcome::failed(
            tx.txhash,
            height,
            format!("{} code {}: {}", tx.codespace, tx.code, tx.raw_log),
        )
    }
}

/// Extract account number and sequence from a `QueryAccountResponse`.
///
/// Handles plain and vesting accounts.
fn parse_account(body: &Value) -> Option<AccountInfo> {
    let account = body.get("account")?;
    let base = [
        "",
        "/base_account",
        "/base_vesting_account/base_account",
    ]
    .iter()
    .filter_map(|p| account.pointer(p))
    .find(|v| v.get("account_number").is_some())?;

    let number = |key: &str| -> Option<u64> {
        match base.get(key)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    };
    Some(AccountInfo {
        account_number: number("account_number")?,
        sequence: number("sequence").unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_account() {
        let body = json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "testcore1abc",
                "account_number": "42",
                "sequence": "7"
            }
        });
        assert_eq!(
            parse_account(&body),
            Some(AccountInfo {
                account_number: 42,
                sequence: 7
            })
        );
    }

    #[test]
    fn test_parse_vesting_account() {
        let body = json!({
            "account": {
                "@type": "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
                "base_vesting_account": {
                    "base_account": { "account_number": "3", "sequence": "0" }
                }
            }
        });
        assert_eq!(
            parse_account(&body),
            Some(AccountInfo {
                account_number: 3,
                sequence: 0
            })
        );
    }

    #[test]
    fn test_parse_unknown_account() {
        assert_eq!(parse_account(&json!({ "account": { "@type": "x" } })), None);
    }

    #[test]
    fn test_outcome_from_response() {
        let ok = outcome_from(TxResponse {
            txhash: "AA".into(),
            code: 0,
            codespace: String::new(),
            raw_log: String::new(),
            height: "120".into(),
        });
        assert_eq!(ok, TransactionOutcome::committed("AA", 120));

        let failed = outcome_from(TxResponse {
            txhash: "BB".into(),
            code: 11,
            codespace: "sdk".into(),
            raw_log: "out of gas".into(),
            height: "121".into(),
        });
        assert_eq!(failed.status, crate::chain::types::TxStatus::Failed);
        assert!(failed.detail.unwrap().contains("out of gas"));
    }

    fn rejection(err: ChainError) -> (String, bool) {
        match err {
            ChainError::SubmissionRejected {
                detail,
                outcome_unknown,
            } => (detail, outcome_unknown),
            other => panic!("expected a submission rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_simulate_gas_used() {
        let body = json!({ "gas_info": { "gas_wanted": "0", "gas_used": "81234" } }).to_string();
        assert_eq!(classify_simulate(StatusCode::OK, &body).unwrap(), 81234);

        let err = classify_simulate(StatusCode::OK, "{}").unwrap_err();
        assert_eq!(err.kind(), "node_internal");
    }

    #[test]
    fn test_simulate_refusal_is_a_rejection() {
        let body = json!({
            "code": 2,
            "message": "insufficient funds: 10ucore is smaller than 20ucore",
            "details": []
        })
        .to_string();
        let err = classify_simulate(StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert!(matches!(&err, ChainError::SimulationRejected(m) if m.contains("insufficient funds")));
        assert!(err.is_retry_safe());

        // No gateway message: the node itself misbehaved.
        let err = classify_simulate(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.kind(), "node_internal");
    }

    #[test]
    fn test_broadcast_send_errors() {
        let err = broadcast_send_error(true, "connection refused");
        assert!(matches!(err, ChainError::Connection(_)));
        assert!(err.is_retry_safe());

        let (detail, unknown) = rejection(broadcast_send_error(false, "operation timed out"));
        assert!(detail.contains("operation timed out"));
        assert!(unknown);
    }

    #[test]
    fn test_broadcast_http_errors() {
        let body = json!({ "code": 3, "message": "invalid tx bytes" }).to_string();
        let (detail, unknown) = rejection(classify_broadcast(StatusCode::BAD_REQUEST, &body).unwrap_err());
        assert_eq!(detail, "invalid tx bytes");
        assert!(!unknown);

        let (detail, unknown) =
            rejection(classify_broadcast(StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err());
        assert_eq!(detail, "HTTP 503 Service Unavailable");
        assert!(unknown);
    }

    #[test]
    fn test_broadcast_check_tx_failure() {
        let body = json!({
            "tx_response": {
                "txhash": "ABCD",
                "code": 32,
                "codespace": "sdk",
                "raw_log": "account sequence mismatch, expected 5, got 4"
            }
        })
        .to_string();
        let (detail, unknown) = rejection(classify_broadcast(StatusCode::OK, &body).unwrap_err());
        assert!(detail.starts_with("sdk code 32"));
        assert!(!unknown);
    }

    #[test]
    fn test_broadcast_without_hash_is_ambiguous() {
        let body = json!({ "tx_response": { "txhash": "", "code": 0 } }).to_string();
        let (_, unknown) = rejection(classify_broadcast(StatusCode::OK, &body).unwrap_err());
        assert!(unknown);

        let (detail, unknown) = rejection(classify_broadcast(StatusCode::OK, "not json").unwrap_err());
        assert!(detail.starts_with("malformed broadcast response"));
        assert!(unknown);
    }

    #[test]
    fn test_broadcast_accepted() {
        let body = json!({ "tx_response": { "txhash": "E3B0C442", "code": 0 } }).to_string();
        let receipt = classify_broadcast(StatusCode::OK, &body).unwrap();
        assert_eq!(receipt.hash, "E3B0C442");
    }

    #[test]
    fn test_tx_status_not_found_is_pending() {
        assert_eq!(classify_tx_status(StatusCode::NOT_FOUND, "").unwrap(), None);

        let body = json!({ "code": 5, "message": "tx not found: E3B0C442" }).to_string();
        assert_eq!(classify_tx_status(StatusCode::BAD_REQUEST, &body).unwrap(), None);
    }

    #[test]
    fn test_tx_status_server_error_is_not_pending() {
        let body = json!({ "code": 13, "message": "block 120 not found in store" }).to_string();
        let err = classify_tx_status(StatusCode::INTERNAL_SERVER_ERROR, &body).unwrap_err();
        assert_eq!(err.kind(), "node_internal");
        assert!(err.to_string().contains("code 13"));

        let err = classify_tx_status(StatusCode::INTERNAL_SERVER_ERROR, "not found").unwrap_err();
        assert_eq!(err.kind(), "node_internal");
    }

    #[test]
    fn test_tx_status_included() {
        let body = json!({
            "tx_response": { "txhash": "AA", "code": 0, "height": "77" }
        })
        .to_string();
        assert_eq!(
            classify_tx_status(StatusCode::OK, &body).unwrap(),
            Some(TransactionOutcome::committed("AA", 77))
        );
    }

    #[tokio::test]
    async fn test_broadcast_to_closed_port_is_a_connection_error() {
        let connector = RestConnector {
            http: Client::builder()
                .use_rustls_tls()
                .https_only(true)
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
            base: "https://127.0.0.1:1/".parse().unwrap(),
            chain_id: "coreum-testnet-1".to_string(),
            fixed_gas_price: None,
            gas_price_adjustment: Decimal::ONE,
        };
        let err = connector.submit(b"tx").await.unwrap_err();
        assert!(matches!(err, ChainError::Connection(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_plaintext_endpoint_refused() {
        let config = ChainConfig {
            endpoint: "http://127.0.0.1:1317".to_string(),
            ..ChainConfig::default()
        };
        let err = RestConnector::connect(&config).await.unwrap_err();
        assert!(matches!(err, ChainError::Connection(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let config = ChainConfig {
            // Port 1 on loopback refuses connections.
            endpoint: "https://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 2,
            ..ChainConfig::default()
        };
        let err = RestConnector::connect(&config).await.unwrap_err();
        assert!(matches!(err, ChainError::Connection(_)));
        assert_eq!(err.kind(), "connection");
    }
}
