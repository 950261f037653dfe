use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, info, warn};

use crate::{
    rpc::DaemonRpc,
    types::{NodeInfo, PoolChangesLiteRequest, TransactionsRequest},
    upstream::errors::RpcError,
};

/// Connection lifecycle of an upstream daemon client.
///
/// `Connecting` is a transient sub-state of [`UpstreamClient::connect`]; a
/// client stuck mid-probe is never externally visible as `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Disconnecting,
    Connecting,
    Connected,
}

/// Client for one upstream daemon with a connection state machine and a
/// background sync-poll loop.
///
/// The poll loop runs for the lifetime of the `Connected` state, checking the
/// daemon's sync status once per interval. Consecutive poll failures are
/// counted; when the count reaches the retry threshold the client disconnects
/// itself and the loop exits. The loop is a tracked task: `disconnect(true)`
/// joins it, so teardown can guarantee no loop outlives its client.
///
/// State fields are mutated only by this client's own connect / disconnect /
/// poll-loop code; other components read them through the accessors.
pub struct UpstreamClient {
    host: String,
    port: u16,
    rpc: DaemonRpc,
    status: Mutex<ConnectionStatus>,
    is_synced: AtomicBool,
    retry_count: AtomicU32,
    poll_interval: Duration,
    retry_threshold: u32,
    shutdown: watch::Sender<bool>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl UpstreamClient {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        rpc: DaemonRpc,
        poll_interval: Duration,
        retry_threshold: u32,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);

        Self {
            host: host.into(),
            port,
            rpc,
            status: Mutex::new(ConnectionStatus::Disconnected),
            is_synced: AtomicBool::new(false),
            retry_count: AtomicU32::new(0),
            poll_interval,
            retry_threshold,
            shutdown,
            poll_task: Mutex::new(None),
        }
    }

    /// The resolved host this client was constructed with.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, used as the pool key and in log output.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock()
    }

    /// Whether the daemon reported itself synced on the most recent poll.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.is_synced.load(Ordering::Relaxed)
    }

    /// Consecutive poll failures since the last successful poll.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Connects to the daemon and starts the sync-poll loop.
    ///
    /// Idempotent: a no-op when already `Connected` or `Connecting`. Performs
    /// a single `getinfo` probe; on success the client transitions to
    /// `Connected` and the poll loop is spawned, on failure it transitions to
    /// `Disconnected` and the probe error is returned (the caller must not
    /// admit this client into the pool).
    ///
    /// # Errors
    ///
    /// Returns the probe's [`RpcError`] when the daemon is unreachable, or
    /// [`RpcError::ConnectionFailed`] when a concurrent disconnect raced the
    /// probe.
    pub async fn connect(self: &Arc<Self>) -> Result<(), RpcError> {
        {
            let mut status = self.status.lock();
            if matches!(*status, ConnectionStatus::Connected | ConnectionStatus::Connecting) {
                return Ok(());
            }
            *status = ConnectionStatus::Connecting;
        }

        debug!(upstream = %self.endpoint(), "connecting to this remote daemon");

        if let Err(e) = self.rpc.get_info().await {
            *self.status.lock() = ConnectionStatus::Disconnected;
            warn!(upstream = %self.endpoint(), error = %e, "unable to connect to this remote daemon");
            return Err(e);
        }

        {
            let mut status = self.status.lock();
            if *status != ConnectionStatus::Connecting {
                return Err(RpcError::ConnectionFailed(
                    "connection aborted by concurrent disconnect".to_string(),
                ));
            }
            *status = ConnectionStatus::Connected;
        }

        self.is_synced.store(false, Ordering::Relaxed);
        self.retry_count.store(0, Ordering::Relaxed);
        self.shutdown.send_replace(false);

        let client = Arc::clone(self);
        let shutdown_rx = self.shutdown.subscribe();
        *self.poll_task.lock() = Some(tokio::spawn(client.run_poll_loop(shutdown_rx)));

        info!(upstream = %self.endpoint(), "remote daemon connected, listening for requests");
        Ok(())
    }

    /// Disconnects from the daemon.
    ///
    /// Idempotent: a no-op when already `Disconnected` or `Disconnecting`.
    /// Signals the poll loop to stop; with `wait_for_loop_exit` the call
    /// additionally joins the loop task, guaranteeing it has exited before
    /// returning. The loop itself calls this with `false` on retry
    /// exhaustion, since it cannot join itself.
    pub async fn disconnect(&self, wait_for_loop_exit: bool) {
        {
            let mut status = self.status.lock();
            if matches!(*status, ConnectionStatus::Disconnected | ConnectionStatus::Disconnecting)
            {
                return;
            }
            *status = ConnectionStatus::Disconnecting;
        }

        self.is_synced.store(false, Ordering::Relaxed);
        let _ = self.shutdown.send(true);

        if wait_for_loop_exit {
            let task = self.poll_task.lock().take();
            if let Some(task) = task {
                if let Err(e) = task.await {
                    debug!(upstream = %self.endpoint(), error = %e, "poll task terminated abnormally");
                }
            }
        }

        *self.status.lock() = ConnectionStatus::Disconnected;
        info!(upstream = %self.endpoint(), "stopped listening to this remote daemon");
    }

    async fn run_poll_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            self.check_sync_status().await;

            if self.retry_count.load(Ordering::Relaxed) >= self.retry_threshold {
                warn!(
                    upstream = %self.endpoint(),
                    retries = self.retry_threshold,
                    "retry count exceeded, disconnecting from this remote daemon"
                );
                self.disconnect(false).await;
            }

            if self.status() != ConnectionStatus::Connected {
                break;
            }
        }

        debug!(upstream = %self.endpoint(), "sync poll loop exited");
    }

    /// One poll iteration: asks the daemon for its info and updates
    /// `is_synced` / `retry_count` accordingly. The synced transition is
    /// edge-triggered so the log only fires the first time it flips.
    async fn check_sync_status(&self) {
        match self.rpc.get_info().await {
            Ok(info) => {
                self.retry_count.store(0, Ordering::Relaxed);
                self.observe_sync_state(&info);
            }
            Err(RpcError::Timeout) => {
                self.is_synced.store(false, Ordering::Relaxed);
                let retries = self.retry_count.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    upstream = %self.endpoint(),
                    retries = retries,
                    "no response from the remote daemon, it may be stuck"
                );
            }
            Err(e) => {
                self.is_synced.store(false, Ordering::Relaxed);
                let retries = self.retry_count.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    upstream = %self.endpoint(),
                    retries = retries,
                    error = %e,
                    "lost connection to the remote daemon"
                );
            }
        }
    }

    fn observe_sync_state(&self, info: &NodeInfo) {
        if info.synced {
            if !self.is_synced.swap(true, Ordering::Relaxed) {
                info!(upstream = %self.endpoint(), "remote daemon is synced and ready to serve");
            }
        } else {
            self.is_synced.store(false, Ordering::Relaxed);
            info!(
                upstream = %self.endpoint(),
                percent_complete = %format_args!("{:.2}", info.sync_percent()),
                blocks_behind = info.blocks_behind(),
                "remote daemon is still syncing with the network"
            );
        }
    }

    // Transparent pass-through operations. Each forwards to the daemon RPC
    // client and surfaces its error unchanged; a per-call failure has no
    // effect on connection state (the poll loop tracks health independently).

    pub async fn get_info(&self) -> Result<NodeInfo, RpcError> {
        self.rpc.get_info().await
    }

    pub async fn get_height(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_height().await
    }

    pub async fn get_peers(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_peers().await
    }

    pub async fn get_fee_info(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_fee_info().await
    }

    pub async fn get_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_transactions(request).await
    }

    pub async fn get_pool_changes_lite(
        &self,
        request: &PoolChangesLiteRequest,
    ) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_pool_changes_lite(request).await
    }

    pub async fn get_block_count(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block_count().await
    }

    pub async fn get_block_hash(&self, height: u64) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block_hash(height).await
    }

    pub async fn get_block_template(
        &self,
        reserve_size: u64,
        wallet_address: &str,
    ) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block_template(reserve_size, wallet_address).await
    }

    pub async fn submit_block(&self, block_blob: &str) -> Result<serde_json::Value, RpcError> {
        self.rpc.submit_block(block_blob).await
    }

    pub async fn get_last_block_header(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_last_block_header().await
    }

    pub async fn get_block_header_by_hash(
        &self,
        hash: &str,
    ) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block_header_by_hash(hash).await
    }

    pub async fn get_block_header_by_height(
        &self,
        height: u64,
    ) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block_header_by_height(height).await
    }

    pub async fn get_currency_id(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_currency_id().await
    }

    pub async fn get_blocks(&self, height: u64) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_blocks(height).await
    }

    pub async fn get_block(&self, hash: &str) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_block(hash).await
    }

    pub async fn get_transaction(&self, hash: &str) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_transaction(hash).await
    }

    pub async fn get_transaction_pool(&self) -> Result<serde_json::Value, RpcError> {
        self.rpc.get_transaction_pool().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::HttpClient;

    fn test_client(host: &str, port: u16) -> Arc<UpstreamClient> {
        let http = Arc::new(HttpClient::new().unwrap());
        let rpc = DaemonRpc::new(host, port, http, Duration::from_millis(500));
        Arc::new(UpstreamClient::new(host, port, rpc, Duration::from_millis(50), 10))
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_new_client_starts_disconnected() {
        let client = test_client("127.0.0.1", 6969);

        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert!(!client.is_synced());
        assert_eq!(client.retry_count(), 0);
        assert_eq!(client.endpoint(), "127.0.0.1:6969");
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_client_disconnected() {
        let port = unused_port();
        let client = test_client("127.0.0.1", port);

        let result = client.connect().await;

        assert!(result.is_err());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert!(!client.is_synced());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_when_disconnected() {
        let client = test_client("127.0.0.1", unused_port());

        client.disconnect(true).await;
        client.disconnect(false).await;

        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_is_repeatable() {
        let port = unused_port();
        let client = test_client("127.0.0.1", port);

        assert!(client.connect().await.is_err());
        assert!(client.connect().await.is_err());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }
}
