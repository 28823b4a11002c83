//! # keyward-server
//!
//! Axum HTTP + `WebSocket` server for license validation.
//!
//! - `/ws`: persistent text protocol — heartbeat probes multiplexed with
//!   `CHECK_KEY` lookups, per-session teardown under connect/disconnect churn
//! - `/api/*`: control-plane CRUD over license records
//! - CORS allow-listing for the fixed operator origins
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;
