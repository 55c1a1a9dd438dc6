//! HTTP server for the tournament platform.
//!
//! Exposes the `tourney` services over an axum router. The binary in
//! `main.rs` wires configuration, logging, metrics and the backends.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
