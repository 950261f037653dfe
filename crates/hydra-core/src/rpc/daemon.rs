//! Typed client for one upstream daemon's RPC surface.
//!
//! The daemon exposes plain JSON-over-HTTP endpoints (`/getinfo`,
//! `/getheight`, ...) plus a JSON-RPC 2.0 endpoint at `/json_rpc` for the
//! block and transaction queries. One async method per operation; every
//! method is a transparent pass-through with no retry and no state.

use bytes::Bytes;
use serde::Serialize;
use std::{sync::Arc, time::Duration};

use crate::{
    rpc::http_client::HttpClient,
    types::{
        JsonRpcRequest, JsonRpcResponse, NodeInfo, PoolChangesLiteRequest, TransactionsRequest,
    },
    upstream::errors::RpcError,
};

/// RPC client bound to a single daemon address.
pub struct DaemonRpc {
    base_url: String,
    http: Arc<HttpClient>,
    timeout: Duration,
}

impl DaemonRpc {
    #[must_use]
    pub fn new(host: &str, port: u16, http: Arc<HttpClient>, timeout: Duration) -> Self {
        Self { base_url: format!("http://{host}:{port}"), http, timeout }
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, RpcError> {
        let url = format!("{}{path}", self.base_url);
        let bytes = self.http.get(&url, self.timeout).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::InvalidResponse(format!("invalid JSON from {path}: {e}")))
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<serde_json::Value, RpcError> {
        let url = format!("{}{path}", self.base_url);
        let body = serde_json::to_vec(body)
            .map_err(|e| RpcError::InvalidResponse(format!("failed to encode request: {e}")))?;
        let bytes = self.http.post(&url, Bytes::from(body), self.timeout).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::InvalidResponse(format!("invalid JSON from {path}: {e}")))
    }

    /// Invokes a method on the daemon's `/json_rpc` endpoint and unwraps the
    /// envelope, converting an upstream `error` member into [`RpcError::Rpc`].
    pub async fn call(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        let request = JsonRpcRequest::new(method, params, serde_json::Value::from(1));
        let body = serde_json::to_vec(&request)
            .map_err(|e| RpcError::InvalidResponse(format!("failed to encode request: {e}")))?;

        let url = format!("{}/json_rpc", self.base_url);
        let bytes = self.http.post(&url, Bytes::from(body), self.timeout).await?;

        let response: JsonRpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::InvalidResponse(format!("invalid JSON-RPC envelope: {e}")))?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc(error.code, error.message));
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Information about the daemon and its view of the network, including
    /// sync state. This is also the health probe.
    pub async fn get_info(&self) -> Result<NodeInfo, RpcError> {
        let value = self.get("/getinfo").await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidResponse(format!("malformed getinfo response: {e}")))
    }

    /// The daemon's current chain height and the network height.
    pub async fn get_height(&self) -> Result<serde_json::Value, RpcError> {
        self.get("/getheight").await
    }

    /// Peers currently connected to the daemon.
    pub async fn get_peers(&self) -> Result<serde_json::Value, RpcError> {
        self.get("/getpeers").await
    }

    /// The daemon's node fee settings.
    pub async fn get_fee_info(&self) -> Result<serde_json::Value, RpcError> {
        self.get("/feeinfo").await
    }

    /// Looks up the given transactions, reporting any that are missing.
    pub async fn get_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<serde_json::Value, RpcError> {
        self.post("/gettransactions", request).await
    }

    /// Mempool delta relative to a known tail block and known transaction set.
    pub async fn get_pool_changes_lite(
        &self,
        request: &PoolChangesLiteRequest,
    ) -> Result<serde_json::Value, RpcError> {
        self.post("/get_pool_changes_lite", request).await
    }

    /// Number of blocks in the daemon's chain.
    pub async fn get_block_count(&self) -> Result<serde_json::Value, RpcError> {
        self.call("getblockcount", None).await
    }

    /// Hash of the block preceding the given height.
    pub async fn get_block_hash(&self, height: u64) -> Result<serde_json::Value, RpcError> {
        self.call("on_getblockhash", Some(serde_json::json!([height]))).await
    }

    /// Block template with a reserved nonce hole, for miners.
    pub async fn get_block_template(
        &self,
        reserve_size: u64,
        wallet_address: &str,
    ) -> Result<serde_json::Value, RpcError> {
        self.call(
            "getblocktemplate",
            Some(serde_json::json!({
                "reserve_size": reserve_size,
                "wallet_address": wallet_address,
            })),
        )
        .await
    }

    /// Submits a mined block blob.
    pub async fn submit_block(&self, block_blob: &str) -> Result<serde_json::Value, RpcError> {
        self.call("submitblock", Some(serde_json::json!([block_blob]))).await
    }

    /// Header of the chain tip block.
    pub async fn get_last_block_header(&self) -> Result<serde_json::Value, RpcError> {
        self.call("getlastblockheader", None).await
    }

    /// Block header looked up by block hash.
    pub async fn get_block_header_by_hash(
        &self,
        hash: &str,
    ) -> Result<serde_json::Value, RpcError> {
        self.call("getblockheaderbyhash", Some(serde_json::json!({ "hash": hash }))).await
    }

    /// Block header looked up by block height.
    pub async fn get_block_header_by_height(
        &self,
        height: u64,
    ) -> Result<serde_json::Value, RpcError> {
        self.call("getblockheaderbyheight", Some(serde_json::json!({ "height": height }))).await
    }

    /// The network's unique currency identifier.
    pub async fn get_currency_id(&self) -> Result<serde_json::Value, RpcError> {
        self.call("getcurrencyid", None).await
    }

    /// The last 30 blocks up to the given height (requires explorer RPC).
    pub async fn get_blocks(&self, height: u64) -> Result<serde_json::Value, RpcError> {
        self.call("f_blocks_list_json", Some(serde_json::json!({ "height": height }))).await
    }

    /// A single block by hash (requires explorer RPC).
    pub async fn get_block(&self, hash: &str) -> Result<serde_json::Value, RpcError> {
        self.call("f_block_json", Some(serde_json::json!({ "hash": hash }))).await
    }

    /// A single transaction by hash (requires explorer RPC).
    pub async fn get_transaction(&self, hash: &str) -> Result<serde_json::Value, RpcError> {
        self.call("f_transaction_json", Some(serde_json::json!({ "hash": hash }))).await
    }

    /// Transaction hashes currently in the mempool (requires explorer RPC).
    pub async fn get_transaction_pool(&self) -> Result<serde_json::Value, RpcError> {
        self.call("f_on_transactions_pool_json", None).await
    }
}
