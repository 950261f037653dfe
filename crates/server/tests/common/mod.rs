//! Minimal in-process daemon double for driving the gateway end to end.

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
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

#[derive(Default)]
pub struct DaemonState {
    pub height: AtomicU64,
    pub synced: AtomicBool,
    pub delay_ms: AtomicU64,
}

pub struct MockDaemon {
    pub addr: SocketAddr,
    pub state: Arc<DaemonState>,
    server: JoinHandle<()>,
}

impl MockDaemon {
    pub async fn start(height: u64) -> Self {
        let state = Arc::new(DaemonState {
            height: AtomicU64::new(height),
            synced: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
        });

        let app = Router::new()
            .route("/getinfo", get(get_info).post(get_info))
            .route("/getheight", get(get_height).post(get_height))
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

    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn pause(state: &DaemonState) {
    let delay = state.delay_ms.load(Ordering::Relaxed);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

async fn get_info(State(state): State<Arc<DaemonState>>) -> Response {
    pause(&state).await;
    Json(json!({
        "height": state.height.load(Ordering::Relaxed),
        "network_height": state.height.load(Ordering::Relaxed),
        "synced": state.synced.load(Ordering::Relaxed),
        "status": "OK",
    }))
    .into_response()
}

async fn get_height(State(state): State<Arc<DaemonState>>) -> Response {
    pause(&state).await;
    Json(json!({
        "height": state.height.load(Ordering::Relaxed),
        "network_height": state.height.load(Ordering::Relaxed),
        "status": "OK",
    }))
    .into_response()
}

async fn get_transactions(State(state): State<Arc<DaemonState>>, body: Bytes) -> Response {
    pause(&state).await;
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "txs_as_hex": [],
        "missed_tx": request.get("transactions_hashes").cloned().unwrap_or(json!([])),
        "status": "OK",
    }))
    .into_response()
}

async fn json_rpc(State(state): State<Arc<DaemonState>>, body: Bytes) -> Response {
    pause(&state).await;

    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    let result = match method {
        "getblockcount" => json!({
            "count": state.height.load(Ordering::Relaxed),
            "status": "OK",
        }),
        "on_getblockhash" => {
            json!("8a61e57447a82b0b5b1a02a215790151bbbbaf5ed6acbcbeb30f2d5c5c5d6a10")
        }
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
