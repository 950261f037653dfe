//! Fan-out dispatch: race one request across every synced pool member.
//!
//! The gateway favors latency and availability over consistency: a request
//! goes to all synced upstreams concurrently and the first successful
//! response wins, by completion order, with no preference between members.
//! Two calls in quick succession may be served by different nodes, which is
//! acceptable because every admitted node is independently verified synced.

use std::{future::Future, sync::Arc, time::Duration};

use futures::{
    future::{select_all, BoxFuture},
    FutureExt,
};
use tracing::{debug, warn};

use crate::upstream::{
    client::UpstreamClient,
    errors::{DispatchError, RpcError},
    pool::UpstreamPool,
};

/// Races a set of fallible operations against each other and a deadline.
///
/// The first `Ok` decides the outcome; the remaining in-flight operations are
/// dropped, which aborts them (cancellation is best-effort - an upstream may
/// still do work until its own socket notices). An individual `Err` never
/// ends the race: the next completion is awaited instead.
///
/// This is the reusable select-style primitive behind every dispatched
/// operation type.
///
/// # Errors
///
/// - [`DispatchError::NoSyncedUpstream`] when `ops` is empty
/// - [`DispatchError::AllUpstreamsFailed`] when every operation failed
/// - [`DispatchError::Timeout`] when the deadline fired first
pub async fn race_first_ok<T, E>(
    ops: Vec<BoxFuture<'_, Result<T, E>>>,
    deadline: Duration,
) -> Result<T, DispatchError>
where
    E: std::fmt::Display,
{
    if ops.is_empty() {
        return Err(DispatchError::NoSyncedUpstream);
    }

    let race = async move {
        let mut remaining = ops;

        loop {
            let (outcome, _index, rest) = select_all(remaining).await;

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => debug!(error = %e, "raced upstream call failed, waiting for another"),
            }

            if rest.is_empty() {
                return Err(DispatchError::AllUpstreamsFailed);
            }
            remaining = rest;
        }
    };

    match tokio::time::timeout(deadline, race).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DispatchError::Timeout),
    }
}

/// Dispatches operations across the pool's synced members.
pub struct Dispatcher {
    pool: Arc<UpstreamPool>,
    timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(pool: Arc<UpstreamPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Snapshots the synced pool members and races `op` across all of them.
    ///
    /// With zero synced members this fails immediately and issues no network
    /// calls. The pool's membership may change while the race is in flight;
    /// an evicted member's call simply completes or fails on its own.
    ///
    /// # Errors
    ///
    /// See [`race_first_ok`].
    pub async fn dispatch<T, F, Fut>(&self, op: F) -> Result<T, DispatchError>
    where
        F: Fn(Arc<UpstreamClient>) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: Send + 'static,
    {
        let clients = self.pool.synced_clients();

        if clients.is_empty() {
            warn!("dispatch rejected, no synced upstream available");
            return Err(DispatchError::NoSyncedUpstream);
        }

        debug!(upstreams = clients.len(), "racing request across synced upstreams");

        let ops = clients.into_iter().map(|client| op(client).boxed()).collect();
        race_first_ok(ops, self.timeout).await
    }
}
