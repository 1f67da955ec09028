//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! In-flight broadcasts are allowed to finish their confirmation wait
//! within the drain window; nothing is resubmitted on restart.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
