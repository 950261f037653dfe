use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, info, warn};

use crate::{
    config::SeedNode,
    rpc::{DaemonRpc, HttpClient},
    upstream::{
        client::{ConnectionStatus, UpstreamClient},
        errors::RpcError,
    },
};

/// Tunables shared by every client the pool creates.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Interval between sync polls.
    pub poll_interval: Duration,
    /// Consecutive poll failures before a client disconnects itself.
    pub retry_threshold: u32,
    /// Timeout for a single upstream RPC call.
    pub request_timeout: Duration,
    /// Interval between reaper scans.
    pub reap_interval: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            retry_threshold: 10,
            request_timeout: Duration::from_secs(10),
            reap_interval: Duration::from_millis(250),
        }
    }
}

/// Pool of upstream daemon clients keyed by resolved `ip:port`.
///
/// Admission resolves hostnames and dedupes on the resolved address, so two
/// seed hostnames pointing at the same node admit exactly one client. A
/// background reaper removes clients that reached `Disconnected` (the only
/// removal path outside of shutdown). Both maps are guarded by sync locks
/// held only for the map operation itself, never across I/O; readers take a
/// snapshot and filter outside the lock.
pub struct UpstreamPool {
    members: RwLock<HashMap<String, Arc<UpstreamClient>>>,
    attempted: Mutex<HashSet<String>>,
    http: Arc<HttpClient>,
    settings: PoolSettings,
    shutdown: watch::Sender<bool>,
    reaper_task: Mutex<Option<JoinHandle<()>>>,
}

impl UpstreamPool {
    /// Creates an empty pool. The reaper is not started until
    /// [`UpstreamPool::start_reaper`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared HTTP client fails to build.
    pub fn new(settings: PoolSettings) -> Result<Self, RpcError> {
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            members: RwLock::new(HashMap::new()),
            attempted: Mutex::new(HashSet::new()),
            http: Arc::new(HttpClient::new()?),
            settings,
            shutdown,
            reaper_task: Mutex::new(None),
        })
    }

    /// Resolves `host`, admits a new client for it, and connects.
    ///
    /// Hostnames are resolved preferring the first IPv4 address; when
    /// resolution yields nothing usable the literal host is kept. Admission
    /// is deduplicated on the resolved `ip:port`: a repeated or concurrent
    /// request for the same address is a no-op returning `Ok(false)`. A
    /// failed admission leaves the address marked attempted, so it is not
    /// retried by this path; re-seeding is the only retry mechanism.
    ///
    /// # Errors
    ///
    /// Returns the resolution or connection probe error. Returns `Ok(true)`
    /// when a client was admitted, `Ok(false)` on the dedupe no-op.
    pub async fn add_node(&self, host: &str, port: u16) -> Result<bool, RpcError> {
        let resolved = resolve_preferring_ipv4(host, port).await;
        let key = format!("{resolved}:{port}");

        {
            let mut attempted = self.attempted.lock();
            if !attempted.insert(key.clone()) {
                debug!(address = %key, host = %host, "node already admitted or being admitted");
                return Ok(false);
            }
        }

        let rpc = DaemonRpc::new(&resolved, port, Arc::clone(&self.http), self.settings.request_timeout);
        let client = Arc::new(UpstreamClient::new(
            resolved,
            port,
            rpc,
            self.settings.poll_interval,
            self.settings.retry_threshold,
        ));

        match client.connect().await {
            Ok(()) => {
                self.members.write().insert(key.clone(), client);
                info!(address = %key, host = %host, "admitted upstream daemon into the pool");
                Ok(true)
            }
            Err(e) => {
                warn!(address = %key, host = %host, error = %e, "upstream daemon admission failed");
                Err(e)
            }
        }
    }

    /// Admits every seed concurrently. Individual failures are logged by
    /// `add_node` and do not affect the other seeds.
    pub async fn seed(&self, nodes: &[SeedNode]) {
        let admissions = nodes.iter().map(|node| self.add_node(&node.host, node.port));
        let results = join_all(admissions).await;

        let admitted = results.iter().filter(|r| matches!(r, Ok(true))).count();
        info!(seeds = nodes.len(), admitted = admitted, "seed admission complete");
    }

    /// Starts the background reaper that evicts `Disconnected` members.
    pub fn start_reaper(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(pool.settings.reap_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => pool.reap(),
                    _ = shutdown.changed() => break,
                }
            }

            debug!("pool reaper exited");
        });

        *self.reaper_task.lock() = Some(task);
    }

    /// Removes every member that has reached `Disconnected`. Candidates are
    /// collected under the read lock and re-checked under the write lock, so
    /// a member that reconnected in between is never removed.
    fn reap(&self) {
        let stale: Vec<String> = {
            let members = self.members.read();
            members
                .iter()
                .filter(|(_, client)| client.status() == ConnectionStatus::Disconnected)
                .map(|(key, _)| key.clone())
                .collect()
        };

        if stale.is_empty() {
            return;
        }

        let mut members = self.members.write();
        for key in stale {
            if members
                .get(&key)
                .is_some_and(|client| client.status() == ConnectionStatus::Disconnected)
            {
                members.remove(&key);
                info!(address = %key, "reaped disconnected upstream from the pool");
            }
        }
    }

    /// An immutable snapshot of the current membership.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<UpstreamClient>> {
        self.members.read().values().cloned().collect()
    }

    /// The members currently able to serve requests: connected and synced.
    /// Filtering happens outside the lock, on a snapshot.
    #[must_use]
    pub fn synced_clients(&self) -> Vec<Arc<UpstreamClient>> {
        self.snapshot()
            .into_iter()
            .filter(|client| {
                client.status() == ConnectionStatus::Connected && client.is_synced()
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Tears the pool down: stops the reaper, then disconnects every member
    /// awaiting its poll loop, so no background task survives the pool.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let reaper = self.reaper_task.lock().take();
        if let Some(reaper) = reaper {
            let _ = reaper.await;
        }

        let members: Vec<Arc<UpstreamClient>> = {
            let mut members = self.members.write();
            members.drain().map(|(_, client)| client).collect()
        };

        join_all(members.iter().map(|client| client.disconnect(true))).await;
        info!(members = members.len(), "upstream pool shut down");
    }
}

/// Resolves a hostname, preferring the first IPv4 address. DNS may map
/// several seed hostnames onto one node; resolving before admission lets the
/// pool dedupe them. Falls back to the literal host when resolution fails or
/// yields no IPv4 address.
async fn resolve_preferring_ipv4(host: &str, port: u16) -> String {
    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => addrs
            .filter(|addr| addr.is_ipv4())
            .map(|addr| addr.ip().to_string())
            .next()
            .unwrap_or_else(|| host.to_string()),
        Err(e) => {
            debug!(host = %host, error = %e, "hostname resolution failed, using literal host");
            host.to_string()
        }
    }
}
