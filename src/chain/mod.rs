//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (recovery phrases)
//!     → identity.rs (BIP-39/BIP-44 derivation, signing key)
//! Request payload
//!     → messages.rs (validation, asset/ft message)
//! client.rs (HTTPS session with the node)
//!     → transaction.rs (simulate, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Recovery phrases ONLY from environment variables
//! - Never log phrases, seeds or keys
//! - Node traffic is TLS 1.2+ only; no plaintext fallback
//! - Broadcasts are never retried internally

pub mod client;
pub mod identity;
pub mod messages;
pub mod transaction;
pub mod types;

pub use client::{ChainConnector, Connect, RestConnect, RestConnector};
pub use identity::{IdentityError, KeyAlgorithm, SigningIdentity};
pub use messages::{DomainMessage, Operation, ValidationError};
pub use transaction::{Confirmation, SignerLocks, TxOrchestrator, TxSettings};
pub use types::{ChainError, ChainResult, TransactionOutcome, TxStatus};
