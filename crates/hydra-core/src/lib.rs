//! # Hydra Core
//!
//! Core library for the hydra daemon gateway: a fault-tolerant RPC proxy
//! that fronts a set of redundant CryptoNote-style daemon nodes behind a
//! single endpoint.
//!
//! The crate provides:
//!
//! - **[`rpc`]**: typed JSON/HTTP client for a single upstream daemon, one
//!   async method per daemon operation.
//!
//! - **[`upstream`]**: per-node connection state machine with a background
//!   sync-poll loop, a deduplicating connection pool with a reaper task, and
//!   the fan-out dispatcher that races a request across all synced members.
//!
//! - **[`config`]**: layered application configuration (defaults, TOML file,
//!   environment overrides).
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌──────────────┐
//! │   Dispatcher │ ─── no synced member ──► NoSyncedUpstream
//! └──────┬───────┘
//!        │ snapshot of synced pool members
//!        ▼
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ UpstreamClient│ ∥  │ UpstreamClient│ ∥  │ UpstreamClient│   (raced)
//! └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!        └────────────────────┴────────────────────┘
//!                             │ first success wins, losers dropped
//!                             ▼
//!                    Response to Client
//! ```

pub mod config;
pub mod rpc;
pub mod types;
pub mod upstream;
