//! Shared utilities for orchestrator and HTTP tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use cosmrs::Tx;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use ft_admin::chain::client::{ChainConnector, Connect};
use ft_admin::chain::identity::{KeyAlgorithm, SigningIdentity};
use ft_admin::chain::types::{
    AccountInfo, ChainConfig, ChainError, ChainResult, NodeInfo, SubmissionReceipt,
    TransactionOutcome,
};
use ft_admin::config::{AppConfig, SignerSecrets};
use ft_admin::http::{build_router, AppState};
use ft_admin::service::AdminService;

pub const PRIMARY_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const SECONDARY_PHRASE: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

pub const ACCOUNT_NUMBER: u64 = 7;
pub const CHAIN_SEQUENCE: u64 = 4;
pub const GAS_USED: u64 = 100_000;

/// How the mock node answers status queries.
#[derive(Debug, Clone)]
pub enum StatusMode {
    Committed,
    Failed(String),
    Pending,
}

/// In-memory node. Failures are one-shot: each configured error is
/// returned once, then the call succeeds again.
pub struct MockConnector {
    simulate_error: Mutex<Option<ChainError>>,
    submit_error: Mutex<Option<ChainError>>,
    status: Mutex<StatusMode>,
    account_delay: Mutex<Duration>,
    pub account_calls: AtomicUsize,
    pub simulate_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            simulate_error: Mutex::new(None),
            submit_error: Mutex::new(None),
            status: Mutex::new(StatusMode::Committed),
            account_delay: Mutex::new(Duration::ZERO),
            account_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_simulation(&self, error: ChainError) {
        *self.simulate_error.lock().unwrap() = Some(error);
    }

    pub fn fail_submission(&self, error: ChainError) {
        *self.submit_error.lock().unwrap() = Some(error);
    }

    pub fn set_status(&self, mode: StatusMode) {
        *self.status.lock().unwrap() = mode;
    }

    /// Make every account query take `delay`.
    pub fn set_account_delay(&self, delay: Duration) {
        *self.account_delay.lock().unwrap() = delay;
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Tx> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| Tx::from_bytes(bytes).unwrap())
            .collect()
    }

    pub fn last_submitted(&self) -> Tx {
        self.submitted().pop().expect("nothing submitted")
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    fn chain_id(&self) -> &str {
        "coreum-testnet-1"
    }

    async fn node_info(&self) -> ChainResult<NodeInfo> {
        Ok(NodeInfo {
            network: "coreum-testnet-1".to_string(),
            version: "v4.0.0".to_string(),
        })
    }

    async fn account(&self, _address: &str) -> ChainResult<AccountInfo> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.account_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(AccountInfo {
            account_number: ACCOUNT_NUMBER,
            sequence: CHAIN_SEQUENCE,
        })
    }

    async fn gas_price(&self) -> ChainResult<Decimal> {
        // 0.0625 per gas
        Ok(Decimal::new(625, 4))
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<u64> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Tx::from_bytes(tx_bytes).expect("draft must decode");
        match self.simulate_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(GAS_USED),
        }
    }

    async fn submit(&self, tx_bytes: &[u8]) -> ChainResult<SubmissionReceipt> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(e) = self.submit_error.lock().unwrap().take() {
            return Err(e);
        }
        self.submitted.lock().unwrap().push(tx_bytes.to_vec());
        Ok(SubmissionReceipt {
            hash: format!("{:064X}", n),
        })
    }

    async fn tx_status(&self, hash: &str) -> ChainResult<Option<TransactionOutcome>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.status.lock().unwrap().clone();
        Ok(match mode {
            StatusMode::Committed => Some(TransactionOutcome::committed(hash, 1200)),
            StatusMode::Failed(detail) => Some(TransactionOutcome::failed(hash, Some(1200), detail)),
            StatusMode::Pending => None,
        })
    }
}

/// Session factory handing out the shared mock, or failing to connect.
pub struct MockConnect {
    connector: Arc<MockConnector>,
    reachable: bool,
    pub connects: AtomicUsize,
}

impl MockConnect {
    pub fn new(connector: Arc<MockConnector>) -> Arc<Self> {
        Arc::new(Self {
            connector,
            reachable: true,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            connector: MockConnector::new(),
            reachable: false,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connect for MockConnect {
    async fn connect(&self) -> ChainResult<Arc<dyn ChainConnector>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.reachable {
            return Err(ChainError::Connection("connection refused".to_string()));
        }
        Ok(self.connector.clone())
    }
}

/// Chain settings with fast polling and a short confirmation deadline.
pub fn test_chain_config() -> ChainConfig {
    ChainConfig {
        confirmation_timeout_secs: 1,
        poll_base_ms: 5,
        poll_max_ms: 20,
        ..ChainConfig::default()
    }
}

pub fn identity(phrase: &str) -> SigningIdentity {
    let config = ChainConfig::default();
    SigningIdentity::resolve(
        "test",
        phrase,
        &config.derivation_path,
        config.coin_type,
        KeyAlgorithm::Secp256k1,
        &config.address_prefix,
    )
    .unwrap()
}

pub fn primary_address() -> String {
    identity(PRIMARY_PHRASE).address().to_string()
}

pub fn secondary_address() -> String {
    identity(SECONDARY_PHRASE).address().to_string()
}

pub fn test_secrets() -> SignerSecrets {
    SignerSecrets::new(PRIMARY_PHRASE, SECONDARY_PHRASE)
}

pub fn test_service(connect: Arc<MockConnect>) -> AdminService {
    AdminService::new(test_chain_config(), test_secrets(), connect)
}

pub fn test_router(service: AdminService) -> Router {
    build_router(&AppConfig::default(), AppState::new(service))
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send one request through the router and decode the JSON body.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
