//! Network layer subsystem.
//!
//! Inbound TLS is optional. When `listener.tls` is set the gateway serves
//! HTTPS only; outbound node traffic is always TLS (see `chain::client`).

pub mod tls;
