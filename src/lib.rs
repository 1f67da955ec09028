//! Fungible token administration gateway.
//!
//! Issues token classes and manages their admin rights on a Cosmos-SDK
//! ledger exposing the `asset/ft` module.

pub mod chain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod service;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use service::AdminService;
