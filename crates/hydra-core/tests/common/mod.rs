//! In-process mock daemon used by the integration tests.
//!
//! Serves the subset of the daemon RPC surface the gateway touches, with
//! switches to flip sync state and reachability mid-test.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

#[derive(Default)]
pub struct DaemonState {
    pub height: AtomicU64,
    pub network_height: AtomicU64,
    pub synced: AtomicBool,
    pub unreachable: AtomicBool,
    pub delay_ms: AtomicU64,
}

pub struct MockDaemon {
    pub addr: SocketAddr,
    pub state: Arc<DaemonState>,
    server: JoinHandle<()>,
}

impl MockDaemon {
    /// Starts a synced daemon at height 1000.
    pub async fn start() -> Self {
        Self::start_with(1000, 1000, true).await
    }

    pub async fn start_with(height: u64, network_height: u64, synced: bool) -> Self {
        let state = Arc::new(DaemonState {
            height: AtomicU64::new(height),
            network_height: AtomicU64::new(network_height),
            synced: AtomicBool::new(synced),
            unreachable: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        });

        let app = Router::new()
            .route("/getinfo", get(get_info).post(get_info))
            .route("/getheight", get(get_height).post(get_height))
            .route("/getpeers", get(get_peers).post(get_peers))
            .route("/feeinfo", get(get_fee_info).post(get_fee_info))
            .route("/gettransactions", get(get_transactions).post(get_transactions))
            .route("/json_rpc", get(json_rpc).post(json_rpc))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, server }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_synced(&self, synced: bool) {
        self.state.synced.store(synced, Ordering::Relaxed);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::Relaxed);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.server.abort();
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn apply_switches(state: &DaemonState) -> Result<(), Response> {
    let delay = state.delay_ms.load(Ordering::Relaxed);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.unreachable.load(Ordering::Relaxed) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "daemon down").into_response());
    }

    Ok(())
}

async fn get_info(State(state): State<Arc<DaemonState>>) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    Json(json!({
        "height": state.height.load(Ordering::Relaxed),
        "network_height": state.network_height.load(Ordering::Relaxed),
        "synced": state.synced.load(Ordering::Relaxed),
        "status": "OK",
    }))
    .into_response()
}

async fn get_height(State(state): State<Arc<DaemonState>>) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    Json(json!({
        "height": state.height.load(Ordering::Relaxed),
        "network_height": state.network_height.load(Ordering::Relaxed),
        "status": "OK",
    }))
    .into_response()
}

async fn get_peers(State(state): State<Arc<DaemonState>>) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    Json(json!({ "peers": ["127.0.0.1:6969"], "status": "OK" })).into_response()
}

async fn get_fee_info(State(state): State<Arc<DaemonState>>) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    Json(json!({ "address": "", "amount": 0, "status": "OK" })).into_response()
}

async fn get_transactions(State(state): State<Arc<DaemonState>>, body: Bytes) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "txs_as_hex": [],
        "missed_tx": request.get("transactions_hashes").cloned().unwrap_or(json!([])),
        "status": "OK",
    }))
    .into_response()
}

async fn json_rpc(State(state): State<Arc<DaemonState>>, body: Bytes) -> Response {
    if let Err(response) = apply_switches(&state).await {
        return response;
    }

    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return (StatusCode::BAD_REQUEST, "bad request").into_response(),
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    let result = match method {
        "getblockcount" => json!({
            "count": state.height.load(Ordering::Relaxed),
            "status": "OK",
        }),
        "on_getblockhash" => json!("ab1534c9c92a41303bdc7c9c0d1a126dad3e26c5861f08a22c5c5b9c7c3c4b5d"),
        "getlastblockheader" => json!({
            "block_header": { "height": state.height.load(Ordering::Relaxed) },
            "status": "OK",
        }),
        "getcurrencyid" => json!({
            "currency_id_blob": "7fb97df81221dd1366051b2d0bc7f49c66c22ac4431d879c895b06d66ef66f4c",
        }),
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" },
            }))
            .into_response();
        }
    };

    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
}
