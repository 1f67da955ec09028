//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//! Signer secrets are NOT part of the file schema; see [`SignerSecrets`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::chain::identity::KeyAlgorithm;
use crate::config::loader::ConfigError;

/// Environment variable holding the primary signer's recovery phrase.
pub const PRIMARY_MNEMONIC_ENV_VAR: &str = "FT_ADMIN_PRIMARY_MNEMONIC";

/// Environment variable holding the secondary signer's recovery phrase.
pub const SECONDARY_MNEMONIC_ENV_VAR: &str = "FT_ADMIN_SECONDARY_MNEMONIC";

/// Node round trips made before the confirmation wait starts: connect
/// probe, account, gas price, simulate, broadcast.
pub const PRE_CONFIRMATION_CALLS: u64 = 5;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Ledger node and transaction settings.
    pub chain: ChainConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Ledger node connection and transaction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// REST endpoint of the node. Must be `https://`.
    pub endpoint: String,

    /// Expected chain identifier (e.g. "coreum-testnet-1").
    pub chain_id: String,

    /// Bech32 account address prefix (e.g. "testcore").
    pub address_prefix: String,

    /// BIP-44 coin type of the network.
    pub coin_type: u32,

    /// Full derivation path used for both signers.
    pub derivation_path: String,

    /// Key algorithm used for derivation and signing.
    pub key_algorithm: KeyAlgorithm,

    /// Denom fees are paid in.
    pub fee_denom: String,

    /// Fixed gas price. When absent the node's minimum gas price is queried.
    pub gas_price: Option<Decimal>,

    /// Multiplier applied to simulated gas usage.
    pub gas_adjustment: Decimal,

    /// Multiplier applied to a queried minimum gas price.
    pub gas_price_adjustment: Decimal,

    /// Memo attached to every transaction.
    pub memo: String,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// How long to wait for a submitted transaction to be committed.
    pub confirmation_timeout_secs: u64,

    /// Initial delay between status polls in milliseconds.
    pub poll_base_ms: u64,

    /// Upper bound on the delay between status polls in milliseconds.
    pub poll_max_ms: u64,
}

impl ChainConfig {
    /// Longest a single operation can take: every pre-confirmation round
    /// trip at its timeout, then the full confirmation wait.
    pub fn pipeline_budget_secs(&self) -> u64 {
        self.rpc_timeout_secs
            .saturating_mul(PRE_CONFIRMATION_CALLS)
            .saturating_add(self.confirmation_timeout_secs)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://full-node.testnet-1.coreum.dev:1317".to_string(),
            chain_id: "coreum-testnet-1".to_string(),
            address_prefix: "testcore".to_string(),
            coin_type: 990,
            derivation_path: "m/44'/990'/0'/0/0".to_string(),
            key_algorithm: KeyAlgorithm::Secp256k1,
            fee_denom: "utestcore".to_string(),
            gas_price: None,
            gas_adjustment: Decimal::new(12, 1),
            gas_price_adjustment: Decimal::new(11, 1),
            memo: String::new(),
            rpc_timeout_secs: 10,
            confirmation_timeout_secs: 60,
            poll_base_ms: 500,
            poll_max_ms: 3000,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    ///
    /// Must exceed [`ChainConfig::pipeline_budget_secs`]; the confirmation
    /// wait is also clipped to this budget at run time.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow cross-origin requests from any origin.
    pub permissive_cors: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
            permissive_cors: true,
        }
    }
}

/// Recovery phrases of the two signers.
///
/// Loaded ONLY from the environment and zeroed on drop.
#[derive(Clone)]
pub struct SignerSecrets {
    primary: Zeroizing<String>,
    secondary: Zeroizing<String>,
}

impl SignerSecrets {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: Zeroizing::new(primary.into()),
            secondary: Zeroizing::new(secondary.into()),
        }
    }

    /// Read both phrases from `FT_ADMIN_PRIMARY_MNEMONIC` and
    /// `FT_ADMIN_SECONDARY_MNEMONIC`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let read = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingSecret(name))
        };
        Ok(Self::new(
            read(PRIMARY_MNEMONIC_ENV_VAR)?,
            read(SECONDARY_MNEMONIC_ENV_VAR)?,
        ))
    }

    /// Phrase of the signer used for issuance and admin transfer.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Phrase of the signer used to clear admin rights.
    pub fn secondary(&self) -> &str {
        &self.secondary
    }
}

impl std::fmt::Debug for SignerSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerSecrets")
            .field("primary", &"<redacted>")
            .field("secondary", &"<redacted>")
            .finish()
    }
}
