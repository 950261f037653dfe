//! Upstream daemon management and fan-out dispatch.
//!
//! This module owns the gateway's concurrency core:
//!
//! - [`client::UpstreamClient`]: one daemon's connection state machine plus a
//!   background sync-poll loop with bounded retry
//! - [`pool::UpstreamPool`]: deduplicating admission, concurrent-safe
//!   membership, and a reaper that evicts dead clients
//! - [`dispatch::Dispatcher`]: races a request across every synced member
//!   under a deadline and returns the first success
//!
//! Failure isolation: a fault inside one client never propagates to the pool
//! or to other clients, and a failed racer never aborts a dispatch. Only
//! pool-level terminal outcomes ([`errors::DispatchError`]) reach callers.

pub mod client;
pub mod dispatch;
pub mod errors;
pub mod pool;

pub use client::{ConnectionStatus, UpstreamClient};
pub use dispatch::{race_first_ok, Dispatcher};
pub use errors::{DispatchError, RpcError};
pub use pool::{PoolSettings, UpstreamPool};
