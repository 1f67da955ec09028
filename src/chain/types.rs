//! Chain-specific types and error definitions.

use serde::Serialize;
use thiserror::Error;

pub use crate::config::schema::ChainConfig;
pub use crate::chain::identity::IdentityError;
pub use crate::chain::messages::ValidationError;

/// Errors that can occur while preparing or submitting a transaction.
///
/// Variants fall in two groups: those that guarantee nothing reached the
/// ledger (see [`ChainError::is_retry_safe`]) and those whose outcome is
/// unknown until the transaction is re-queried.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Request payload or message failed client-side checks.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Signer could not be derived or could not sign.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Node unreachable, TLS handshake failed or chain mismatch.
    #[error("connection error: {0}")]
    Connection(String),

    /// The node refused the transaction during simulation.
    #[error("simulation rejected: {0}")]
    SimulationRejected(String),

    /// The node rejected the broadcast, or the broadcast was interrupted.
    #[error("submission rejected: {detail}")]
    SubmissionRejected {
        detail: String,
        /// True when the request may have reached the node.
        outcome_unknown: bool,
    },

    /// No terminal status observed before the deadline.
    #[error("transaction {hash} not confirmed after {waited_secs} seconds")]
    ConfirmationTimeout { hash: String, waited_secs: u64 },

    /// Remote failure with opaque detail.
    #[error("node error: {0}")]
    NodeInternal(String),
}

impl ChainError {
    /// Whether the caller may safely build and submit a new transaction for
    /// the same intent without first re-querying the ledger.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            ChainError::Validation(_)
            | ChainError::Identity(_)
            | ChainError::Connection(_)
            | ChainError::SimulationRejected(_) => true,
            ChainError::SubmissionRejected {
                outcome_unknown, ..
            } => !outcome_unknown,
            ChainError::ConfirmationTimeout { .. } | ChainError::NodeInternal(_) => false,
        }
    }

    /// Whether the node refused the transaction for carrying a stale
    /// sequence (`sdk` code 32).
    pub fn is_sequence_mismatch(&self) -> bool {
        let detail = match self {
            ChainError::SimulationRejected(detail) => detail,
            ChainError::SubmissionRejected { detail, .. } => detail,
            _ => return false,
        };
        let detail = detail.to_ascii_lowercase();
        detail.contains("account sequence mismatch")
            || detail.contains("incorrect account sequence")
            || detail.starts_with("sdk code 32:")
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::Validation(_) => "validation",
            ChainError::Identity(_) => "identity",
            ChainError::Connection(_) => "connection",
            ChainError::SimulationRejected(_) => "simulation_rejected",
            ChainError::SubmissionRejected { .. } => "submission_rejected",
            ChainError::ConfirmationTimeout { .. } => "confirmation_timeout",
            ChainError::NodeInternal(_) => "node_internal",
        }
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// On-chain account numbers required for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Basic facts reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub network: String,
    pub version: String,
}

/// Returned by a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub hash: String,
}

/// Transaction status as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Accepted into the mempool, not yet included.
    Pending,
    /// Included in a block and executed successfully.
    Committed,
    /// Included in a block but execution failed.
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Committed => "committed",
            TxStatus::Failed => "failed",
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub hash: String,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TransactionOutcome {
    pub fn pending(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            status: TxStatus::Pending,
            height: None,
            detail: None,
        }
    }

    pub fn committed(hash: impl Into<String>, height: u64) -> Self {
        Self {
            hash: hash.into(),
            status: TxStatus::Committed,
            height: Some(height),
            detail: None,
        }
    }

    pub fn failed(hash: impl Into<String>, height: Option<u64>, detail: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            status: TxStatus::Failed,
            height,
            detail: Some(detail.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TxStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_safety() {
        assert!(ChainError::Connection("refused".into()).is_retry_safe());
        assert!(ChainError::SimulationRejected("out of gas".into()).is_retry_safe());
        assert!(ChainError::SubmissionRejected {
            detail: "code 13".into(),
            outcome_unknown: false
        }
        .is_retry_safe());
        assert!(!ChainError::SubmissionRejected {
            detail: "connection reset".into(),
            outcome_unknown: true
        }
        .is_retry_safe());
        assert!(!ChainError::ConfirmationTimeout {
            hash: "AB".into(),
            waited_secs: 60
        }
        .is_retry_safe());
    }

    #[test]
    fn test_sequence_mismatch_detection() {
        assert!(ChainError::SimulationRejected(
            "account sequence mismatch, expected 5, got 4: incorrect account sequence".into()
        )
        .is_sequence_mismatch());
        assert!(ChainError::SubmissionRejected {
            detail: "sdk code 32: expected 9, got 8".into(),
            outcome_unknown: false
        }
        .is_sequence_mismatch());

        assert!(!ChainError::SimulationRejected("unauthorized: not the token admin".into())
            .is_sequence_mismatch());
        assert!(!ChainError::SubmissionRejected {
            detail: "wasm code 32: contract failed".into(),
            outcome_unknown: false
        }
        .is_sequence_mismatch());
        assert!(!ChainError::NodeInternal("account sequence mismatch".into()).is_sequence_mismatch());
    }

    #[test]
    fn test_error_display() {
        let err = ChainError::ConfirmationTimeout {
            hash: "ABCD".into(),
            waited_secs: 30,
        };
        assert_eq!(err.to_string(), "transaction ABCD not confirmed after 30 seconds");
        assert_eq!(err.kind(), "confirmation_timeout");
    }

    #[test]
    fn test_outcome_terminal() {
        assert!(!TransactionOutcome::pending("A").is_terminal());
        assert!(TransactionOutcome::committed("A", 10).is_terminal());
        assert!(TransactionOutcome::failed("A", Some(10), "out of gas").is_terminal());
    }
}
