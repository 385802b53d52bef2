//! # chatrelay_core
//!
//! Core domain logic for chatrelay: the message model, persistence backends,
//! AI provider fallback and the send/fetch orchestration.

pub mod config;
pub mod email;
pub mod migrate;
pub mod models;
pub mod provider;
pub mod relay;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
