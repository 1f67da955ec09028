//! Resilience helpers.
//!
//! # Design Decisions
//! - Every external call has a deadline (enforced in the chain client)
//! - Reads (status polls) back off exponentially with jitter
//! - Writes (broadcasts) are never retried automatically: a second broadcast
//!   of the same intent could double-submit

pub mod backoff;

pub use backoff::calculate_backoff;
