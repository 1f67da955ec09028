//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the TLS-only node endpoint
//! - Check derivation path against the network coin type
//! - Validate value ranges (timeouts > 0, multipliers >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ConfigViolation>>
//! - Runs before config is accepted into the system

use rust_decimal::Decimal;
use std::net::SocketAddr;

use crate::chain::identity::parse_derivation_path;
use crate::config::schema::{AppConfig, PRE_CONFIRMATION_CALLS};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigViolation {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Check the whole configuration and collect every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigViolation::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let chain = &config.chain;
    match url::Url::parse(&chain.endpoint) {
        Ok(url) if url.scheme() == "https" => {}
        Ok(url) => errors.push(ConfigViolation::new(
            "chain.endpoint",
            format!("scheme '{}' not allowed, only https", url.scheme()),
        )),
        Err(e) => errors.push(ConfigViolation::new("chain.endpoint", e.to_string())),
    }

    for (field, value) in [
        ("chain.chain_id", &chain.chain_id),
        ("chain.address_prefix", &chain.address_prefix),
        ("chain.fee_denom", &chain.fee_denom),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigViolation::new(field, "must not be empty"));
        }
    }

    if let Err(e) = parse_derivation_path(&chain.derivation_path, chain.coin_type) {
        errors.push(ConfigViolation::new("chain.derivation_path", e.to_string()));
    }

    if chain.gas_adjustment < Decimal::ONE {
        errors.push(ConfigViolation::new("chain.gas_adjustment", "must be >= 1"));
    }
    if chain.gas_price_adjustment < Decimal::ONE {
        errors.push(ConfigViolation::new("chain.gas_price_adjustment", "must be >= 1"));
    }
    if let Some(price) = chain.gas_price {
        if price.is_sign_negative() {
            errors.push(ConfigViolation::new("chain.gas_price", "must not be negative"));
        }
    }

    if chain.rpc_timeout_secs == 0 {
        errors.push(ConfigViolation::new("chain.rpc_timeout_secs", "must be > 0"));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ConfigViolation::new(
            "chain.confirmation_timeout_secs",
            "must be > 0",
        ));
    }
    if chain.poll_base_ms == 0 || chain.poll_max_ms < chain.poll_base_ms {
        errors.push(ConfigViolation::new(
            "chain.poll_max_ms",
            "poll bounds must satisfy 0 < poll_base_ms <= poll_max_ms",
        ));
    }

    if config.timeouts.request_secs <= chain.pipeline_budget_secs() {
        errors.push(ConfigViolation::new(
            "timeouts.request_secs",
            format!(
                "must exceed chain.confirmation_timeout_secs + {} * chain.rpc_timeout_secs ({}s)",
                PRE_CONFIRMATION_CALLS,
                chain.pipeline_budget_secs()
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ConfigViolation::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
