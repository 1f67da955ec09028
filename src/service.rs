//! Administrative operations on fungible token classes.
//!
//! Each call opens its own chain session, resolves the signer it needs,
//! builds one message and runs it through the orchestrator. Sessions and
//! identities are dropped when the call returns, on every path.
//!
//! Signer policy: issuance and admin transfer are signed by the primary
//! signer; clearing admin rights is signed by the secondary signer, a
//! separate authority fixed by configuration.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::client::Connect;
use crate::chain::identity::SigningIdentity;
use crate::chain::messages::{
    self, ClearAdminRequest, DomainMessage, IssueTokenRequest, TransferAdminRequest,
};
use crate::chain::transaction::{Confirmation, SignerLocks, TxOrchestrator, TxSettings};
use crate::chain::types::{ChainConfig, ChainError, ChainResult, NodeInfo, TxStatus};
use crate::config::SignerSecrets;

/// Which configured signer authorizes an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    Primary,
    Secondary,
}

impl Signer {
    fn label(&self) -> &'static str {
        match self {
            Signer::Primary => "primary",
            Signer::Secondary => "secondary",
        }
    }
}

/// Success record returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    pub message: String,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_address: Option<String>,
}

/// Node reachability report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub reachable: bool,
    pub chain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Time kept back from the request budget to render the response.
const RESPONSE_MARGIN: Duration = Duration::from_secs(1);

/// Entry point for the three administrative operations.
pub struct AdminService {
    config: ChainConfig,
    secrets: SignerSecrets,
    connect: Arc<dyn Connect>,
    locks: SignerLocks,
    request_budget: Option<Duration>,
}

impl AdminService {
    pub fn new(config: ChainConfig, secrets: SignerSecrets, connect: Arc<dyn Connect>) -> Self {
        Self {
            config,
            secrets,
            connect,
            locks: SignerLocks::new(),
            request_budget: None,
        }
    }

    /// Bound each operation by the inbound request timeout, so a wait that
    /// outlives the HTTP deadline still reports its transaction hash.
    pub fn with_request_budget(mut self, budget: Duration) -> Self {
        self.request_budget = Some(budget);
        self
    }

    /// Derive the identity of `signer`. Never cached.
    pub fn resolve(&self, signer: Signer) -> ChainResult<SigningIdentity> {
        let phrase = match signer {
            Signer::Primary => self.secrets.primary(),
            Signer::Secondary => self.secrets.secondary(),
        };
        Ok(SigningIdentity::resolve(
            signer.label(),
            phrase,
            &self.config.derivation_path,
            self.config.coin_type,
            self.config.key_algorithm,
            &self.config.address_prefix,
        )?)
    }

    /// Issue a new token class signed by the primary signer.
    pub async fn issue_token(&self, req: &IssueTokenRequest) -> ChainResult<OperationResponse> {
        let started = Instant::now();
        let identity = self.resolve(Signer::Primary)?;
        let message = messages::build_issue(req, identity.address())?;
        let denom = message.denom();

        let hash = self.submit(&identity, &message, started).await?;
        tracing::info!(denom = %denom, tx_hash = %hash, "Token class issued");

        Ok(OperationResponse {
            message: "Fungible token class issued successfully".to_string(),
            transaction_id: hash,
            denom: Some(denom),
            issuer_address: Some(identity.address().to_string()),
        })
    }

    /// Transfer admin rights of a denom, signed by the primary signer.
    pub async fn transfer_admin(&self, req: &TransferAdminRequest) -> ChainResult<OperationResponse> {
        let started = Instant::now();
        let identity = self.resolve(Signer::Primary)?;
        let message = messages::build_transfer_admin(req, identity.address())?;

        let hash = self.submit(&identity, &message, started).await?;
        tracing::info!(denom = %req.denom.trim(), tx_hash = %hash, "Admin rights transferred");

        Ok(OperationResponse {
            message: "Admin rights transferred successfully".to_string(),
            transaction_id: hash,
            denom: None,
            issuer_address: None,
        })
    }

    /// Clear admin rights of a denom, signed by the secondary signer.
    pub async fn clear_admin(&self, req: &ClearAdminRequest) -> ChainResult<OperationResponse> {
        let started = Instant::now();
        let identity = self.resolve(Signer::Secondary)?;
        let message = messages::build_clear_admin(req, identity.address())?;
        tracing::info!(
            denom = %req.denom.trim(),
            signer = %identity.address(),
            "Clearing admin rights"
        );

        let hash = self.submit(&identity, &message, started).await?;
        tracing::info!(tx_hash = %hash, "Admin rights cleared");

        Ok(OperationResponse {
            message: "Admin rights cleared successfully".to_string(),
            transaction_id: hash,
            denom: None,
            issuer_address: None,
        })
    }

    /// Probe the node without touching any signer.
    pub async fn node_status(&self) -> NodeStatus {
        let probe = async {
            let session = self.connect.connect().await?;
            session.node_info().await
        };
        match probe.await {
            Ok(info) => NodeStatus {
                reachable: true,
                chain_id: self.config.chain_id.clone(),
                node: Some(info),
                error: None,
            },
            Err(e) => NodeStatus {
                reachable: false,
                chain_id: self.config.chain_id.clone(),
                node: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Open a session and run the message to a committed outcome.
    async fn submit(
        &self,
        identity: &SigningIdentity,
        message: &DomainMessage,
        started: Instant,
    ) -> ChainResult<String> {
        let settings = TxSettings::from_config(&self.config)?;
        let confirmation = match self.request_budget {
            Some(budget) => Confirmation::Until(started + budget.saturating_sub(RESPONSE_MARGIN)),
            None => Confirmation::Await(settings.confirmation_timeout),
        };
        let session = self.connect.connect().await?;
        let orchestrator = TxOrchestrator::new(session, settings, self.locks.clone());

        let outcome = orchestrator.execute_with(identity, message, confirmation).await?;
        match outcome.status {
            TxStatus::Committed => Ok(outcome.hash),
            TxStatus::Failed => Err(ChainError::NodeInternal(format!(
                "transaction {} failed on chain: {}",
                outcome.hash,
                outcome.detail.unwrap_or_default()
            ))),
            TxStatus::Pending => Err(ChainError::ConfirmationTimeout {
                hash: outcome.hash,
                waited_secs: self.config.confirmation_timeout_secs,
            }),
        }
    }
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("chain_id", &self.config.chain_id)
            .field("secrets", &self.secrets)
            .finish_non_exhaustive()
    }
}
