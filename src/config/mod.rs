//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by value into the service and server constructors
//!
//! Environment (FT_ADMIN_PRIMARY_MNEMONIC, FT_ADMIN_SECONDARY_MNEMONIC)
//!     → SignerSecrets (never written to the config file)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ChainConfig, ListenerConfig, ObservabilityConfig, SecurityConfig, SignerSecrets,
    TimeoutConfig, TlsConfig,
};
