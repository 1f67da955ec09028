//! Transaction orchestration: build, simulate, sign, submit, confirm.
//!
//! # State Machine
//! ```text
//! Built → Simulated → Signed → Submitted → { Committed | Failed | TimedOut }
//! ```
//! Each call walks the states once. There is no internal retry loop: a
//! retry is a new `execute` call that builds and signs a fresh envelope.
//!
//! # Sequence Numbers
//! Calls sharing a signer are serialized from the account query through the
//! broadcast. The node only reports committed sequences, so the next
//! expected sequence is also tracked locally per signer (like a wallet nonce)
//! and reset whenever a simulation is rejected.

use cosmrs::proto::cosmos::tx::v1beta1::TxRaw;
use cosmrs::tendermint::chain;
use cosmrs::tx::{Body, Fee, SignDoc, SignerInfo};
use cosmrs::Coin;
use dashmap::DashMap;
use prost::Message;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use crate::chain::client::ChainConnector;
use crate::chain::identity::{IdentityError, SigningIdentity};
use crate::chain::messages::{DomainMessage, ValidationError};
use crate::chain::types::{
    AccountInfo, ChainConfig, ChainError, ChainResult, TransactionOutcome,
};
use crate::observability::metrics;
use crate::resilience::calculate_backoff;

/// Settings shared by every transaction built against one chain.
#[derive(Debug, Clone)]
pub struct TxSettings {
    pub chain_id: chain::Id,
    pub fee_denom: String,
    pub gas_adjustment: Decimal,
    pub memo: String,
    pub confirmation_timeout: Duration,
    pub poll_base_ms: u64,
    pub poll_max_ms: u64,
}

impl TxSettings {
    pub fn from_config(config: &ChainConfig) -> ChainResult<Self> {
        let chain_id = config.chain_id.parse::<chain::Id>().map_err(|e| {
            ChainError::Connection(format!("invalid chain id '{}': {}", config.chain_id, e))
        })?;
        Ok(Self {
            chain_id,
            fee_denom: config.fee_denom.clone(),
            gas_adjustment: config.gas_adjustment,
            memo: config.memo.clone(),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            poll_base_ms: config.poll_base_ms,
            poll_max_ms: config.poll_max_ms,
        })
    }
}

/// Whether `execute` waits for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Wait up to the given deadline for a terminal status.
    Await(Duration),
    /// Wait until the given instant, and never longer than the configured
    /// confirmation timeout. The clock starts before submission.
    Until(Instant),
    /// Return right after the broadcast with a `Pending` outcome.
    Skip,
}

#[derive(Debug, Default)]
struct SignerState {
    next_sequence: Option<u64>,
}

/// Per-signer submission locks, shared by all orchestrators of a service.
#[derive(Debug, Clone, Default)]
pub struct SignerLocks {
    inner: Arc<DashMap<String, Arc<Mutex<SignerState>>>>,
}

impl SignerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_signer(&self, address: &str) -> Arc<Mutex<SignerState>> {
        self.inner.entry(address.to_string()).or_default().clone()
    }
}

/// A signed transaction ready for broadcast. Never reused.
#[derive(Debug, Clone)]
pub struct TransactionEnvelope {
    pub tx_bytes: Vec<u8>,
    pub account_number: u64,
    pub sequence: u64,
    pub gas_limit: u64,
    pub fee_amount: u128,
}

/// Drives one message through the transaction pipeline.
pub struct TxOrchestrator {
    session: Arc<dyn ChainConnector>,
    settings: TxSettings,
    locks: SignerLocks,
}

impl TxOrchestrator {
    /// Create an orchestrator over an open session.
    pub fn new(session: Arc<dyn ChainConnector>, settings: TxSettings, locks: SignerLocks) -> Self {
        Self {
            session,
            settings,
            locks,
        }
    }

    /// Execute `message` signed by `identity` and wait for the configured
    /// confirmation deadline.
    pub async fn execute(
        &self,
        identity: &SigningIdentity,
        message: &DomainMessage,
    ) -> ChainResult<TransactionOutcome> {
        self.execute_with(
            identity,
            message,
            Confirmation::Await(self.settings.confirmation_timeout),
        )
        .await
    }

    /// Execute `message` signed by `identity`.
    ///
    /// Returns the terminal outcome (`Committed` or `Failed`), or `Pending`
    /// when confirmation is skipped. Timing out yields
    /// [`ChainError::ConfirmationTimeout`].
    pub async fn execute_with(
        &self,
        identity: &SigningIdentity,
        message: &DomainMessage,
        confirmation: Confirmation,
    ) -> ChainResult<TransactionOutcome> {
        if message.signer() != identity.address() {
            return Err(ValidationError::SignerMismatch {
                message_signer: message.signer().to_string(),
                identity: identity.address().to_string(),
            }
            .into());
        }

        let operation = message.operation().as_str();
        let start = Instant::now();
        let result = self.run(identity, message, confirmation).await;

        metrics::record_transaction(operation, &result, start);
        result
    }

    async fn run(
        &self,
        identity: &SigningIdentity,
        message: &DomainMessage,
        confirmation: Confirmation,
    ) -> ChainResult<TransactionOutcome> {
        let hash = self.submit_once(identity, message).await?;
        match confirmation {
            Confirmation::Skip => Ok(TransactionOutcome::pending(hash)),
            Confirmation::Await(deadline) => self.await_outcome(&hash, deadline).await,
            Confirmation::Until(at) => {
                let deadline = at
                    .saturating_duration_since(Instant::now())
                    .min(self.settings.confirmation_timeout);
                self.await_outcome(&hash, deadline).await
            }
        }
    }

    /// Built → Simulated → Signed → Submitted, under the signer's lock.
    async fn submit_once(
        &self,
        identity: &SigningIdentity,
        message: &DomainMessage,
    ) -> ChainResult<String> {
        let address = identity.address();
        let lock = self.locks.for_signer(address);
        let mut state = lock.lock().await;

        let account = self.session.account(address).await?;
        let sequence = state
            .next_sequence
            .map_or(account.sequence, |local| local.max(account.sequence));
        let body = Body::new(vec![message.to_any()], self.settings.memo.clone(), 0u32);

        // Built → Simulated: nothing is signed until the node accepts the draft.
        let gas_price = self.session.gas_price().await?;
        let draft = self.encode_draft(identity, &body, sequence)?;
        let gas_used = match self.session.simulate(&draft).await {
            Ok(gas) => gas,
            Err(e) => {
                if e.is_sequence_mismatch() {
                    state.next_sequence = None;
                }
                return Err(e);
            }
        };
        let gas_limit = gas_limit(gas_used, self.settings.gas_adjustment)?;
        let fee_amount = fee_amount(gas_limit, gas_price)?;

        // Simulated → Signed
        let envelope = self.sign(identity, &body, account, sequence, gas_limit, fee_amount)?;

        // Signed → Submitted
        let receipt = match self.session.submit(&envelope.tx_bytes).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is_sequence_mismatch() {
                    state.next_sequence = None;
                }
                return Err(e);
            }
        };
        state.next_sequence = Some(sequence + 1);

        tracing::info!(
            tx_hash = %receipt.hash,
            signer = %address,
            operation = %message.operation(),
            sequence = envelope.sequence,
            gas_limit = envelope.gas_limit,
            fee = %format!("{}{}", envelope.fee_amount, self.settings.fee_denom),
            "Transaction submitted"
        );
        Ok(receipt.hash)
    }

    /// Encode an unsigned draft for simulation.
    fn encode_draft(
        &self,
        identity: &SigningIdentity,
        body: &Body,
        sequence: u64,
    ) -> ChainResult<Vec<u8>> {
        let fee = Fee::from_amount_and_gas(self.fee_coin(0)?, 0u64);
        let auth_info = SignerInfo::single_direct(Some(identity.public_key()), sequence).auth_info(fee);
        let raw = TxRaw {
            body_bytes: body.clone().into_bytes().map_err(encoding_error)?,
            auth_info_bytes: auth_info.into_bytes().map_err(encoding_error)?,
            signatures: vec![Vec::new()],
        };
        Ok(raw.encode_to_vec())
    }

    fn sign(
        &self,
        identity: &SigningIdentity,
        body: &Body,
        account: AccountInfo,
        sequence: u64,
        gas_limit: u64,
        fee_amount: u128,
    ) -> ChainResult<TransactionEnvelope> {
        let fee = Fee::from_amount_and_gas(self.fee_coin(fee_amount)?, gas_limit);
        let auth_info = SignerInfo::single_direct(Some(identity.public_key()), sequence).auth_info(fee);
        let sign_doc = SignDoc::new(body, &auth_info, &self.settings.chain_id, account.account_number)
            .map_err(encoding_error)?;
        let raw = sign_doc
            .sign(identity.signing_key())
            .map_err(|e| IdentityError::SigningFailed(e.to_string()))?;
        let tx_bytes = raw.to_bytes().map_err(encoding_error)?;

        Ok(TransactionEnvelope {
            tx_bytes,
            account_number: account.account_number,
            sequence,
            gas_limit,
            fee_amount,
        })
    }

    fn fee_coin(&self, amount: u128) -> ChainResult<Coin> {
        Coin::new(amount, &self.settings.fee_denom).map_err(|e| {
            ChainError::Validation(ValidationError::MalformedRequest(format!(
                "invalid fee denom '{}': {}",
                self.settings.fee_denom, e
            )))
        })
    }

    /// Poll until the node reports a terminal status or `deadline` elapses.
    ///
    /// Query failures while polling are logged and polling continues; only
    /// the deadline ends the wait without an outcome.
    pub async fn await_outcome(
        &self,
        hash: &str,
        deadline: Duration,
    ) -> ChainResult<TransactionOutcome> {
        let poll = async {
            let mut attempt: u32 = 0;
            loop {
                attempt = attempt.saturating_add(1);
                sleep(calculate_backoff(
                    attempt,
                    self.settings.poll_base_ms,
                    self.settings.poll_max_ms,
                ))
                .await;

                match self.session.tx_status(hash).await {
                    Ok(Some(outcome)) if outcome.is_terminal() => return outcome,
                    Ok(_) => tracing::debug!(tx_hash = %hash, attempt, "Transaction pending"),
                    Err(e) => tracing::warn!(
                        tx_hash = %hash,
                        attempt,
                        error = %e,
                        "Status query failed, polling again"
                    ),
                }
            }
        };

        match timeout(deadline, poll).await {
            Ok(outcome) => {
                tracing::info!(
                    tx_hash = %outcome.hash,
                    status = outcome.status.as_str(),
                    height = ?outcome.height,
                    "Transaction settled"
                );
                Ok(outcome)
            }
            Err(_) => Err(ChainError::ConfirmationTimeout {
                hash: hash.to_string(),
                waited_secs: deadline.as_secs(),
            }),
        }
    }
}

fn encoding_error(e: impl std::fmt::Display) -> ChainError {
    IdentityError::SigningFailed(format!("failed to encode transaction: {}", e)).into()
}

/// Gas limit for a simulated usage: `ceil(gas_used * adjustment)`.
pub fn gas_limit(gas_used: u64, adjustment: Decimal) -> ChainResult<u64> {
    Decimal::from(gas_used)
        .checked_mul(adjustment)
        .and_then(|g| g.ceil().to_u64())
        .ok_or_else(|| ChainError::SimulationRejected(format!("gas usage {} out of range", gas_used)))
}

/// Fee owed for `gas_limit` at `gas_price`, rounded up to a whole unit.
pub fn fee_amount(gas_limit: u64, gas_price: Decimal) -> ChainResult<u128> {
    if gas_price.is_sign_negative() {
        return Err(ChainError::NodeInternal(format!("negative gas price {}", gas_price)));
    }
    Decimal::from(gas_limit)
        .checked_mul(gas_price)
        .and_then(|f| f.ceil().to_u128())
        .ok_or_else(|| ChainError::NodeInternal(format!("fee for {} gas out of range", gas_limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_limit_rounds_up() {
        assert_eq!(gas_limit(100_000, Decimal::new(12, 1)).unwrap(), 120_000);
        assert_eq!(gas_limit(99_999, Decimal::new(12, 1)).unwrap(), 119_999);
        assert_eq!(gas_limit(3, Decimal::new(15, 1)).unwrap(), 5);
        assert_eq!(gas_limit(0, Decimal::new(12, 1)).unwrap(), 0);
    }

    #[test]
    fn test_fee_amount_rounds_up() {
        // 0.0625 per gas
        let price = Decimal::new(625, 4);
        assert_eq!(fee_amount(120_000, price).unwrap(), 7_500);
        assert_eq!(fee_amount(120_001, price).unwrap(), 7_501);
        assert_eq!(fee_amount(0, price).unwrap(), 0);
    }

    #[test]
    fn test_fee_amount_rejects_negative_price() {
        assert!(fee_amount(1, Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = TxSettings::from_config(&ChainConfig::default()).unwrap();
        assert_eq!(settings.chain_id.as_str(), "coreum-testnet-1");
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_signer_locks_are_shared_per_address() {
        let locks = SignerLocks::new();
        let a = locks.for_signer("addr1");
        let b = locks.for_signer("addr1");
        let c = locks.for_signer("addr2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        let _held = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(c.try_lock().is_ok());
    }
}
