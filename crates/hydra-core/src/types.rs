//! Wire types shared by the gateway surface and the upstream daemon client.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: protocol conformance
//!
//! ## Daemon Wire Types
//! - [`NodeInfo`]: the `/getinfo` response with the sync fields the health
//!   poll reads, plus a flattened passthrough of everything else
//! - Request bodies for the operations that take one
//!
//! # Performance Notes
//!
//! - `jsonrpc` uses `Cow<'static, str>` so responses constructed with the
//!   static version string allocate nothing.
//! - `id` uses `Arc<serde_json::Value>` so the request id can be echoed into
//!   responses without deep-copying the JSON value.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};

/// JSON-RPC protocol version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

fn default_jsonrpc() -> Cow<'static, str> {
    JSONRPC_VERSION_COW
}

fn null_id() -> Arc<serde_json::Value> {
    Arc::new(serde_json::Value::Null)
}

/// JSON-RPC 2.0 request envelope.
///
/// Miners and older wallets occasionally omit `jsonrpc` or `id`, so both
/// default instead of failing the parse; `method` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default = "null_id")]
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }
}

/// JSON-RPC 2.0 response envelope.
///
/// Contains either a `result` (success) or an `error` (failure), never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default = "null_id")]
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Creates a successful response echoing the given request's envelope fields.
    #[must_use]
    pub fn success(result: serde_json::Value, request: &JsonRpcRequest) -> Self {
        Self {
            jsonrpc: request.jsonrpc.clone(),
            result: Some(result),
            error: None,
            id: Arc::clone(&request.id),
        }
    }

    /// Creates an error response echoing the given request's envelope fields.
    #[must_use]
    pub fn error(code: i32, message: String, request: &JsonRpcRequest) -> Self {
        Self {
            jsonrpc: request.jsonrpc.clone(),
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id: Arc::clone(&request.id),
        }
    }

    /// Creates an error response with a null id, for requests that never parsed.
    #[must_use]
    pub fn error_detached(code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id: null_id(),
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard codes: `-32700` parse error, `-32600` invalid request, `-32601`
/// method not found, `-32602` invalid params, `-32603` internal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// The `/getinfo` response of an upstream daemon.
///
/// Only the fields the sync-health poll reads are typed; everything else the
/// daemon reports is carried in `extra` so the `/getinfo` gateway path stays
/// byte-transparent when the value is serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub network_height: u64,
    #[serde(default)]
    pub synced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeInfo {
    /// Percentage of the network height this daemon has synced, for log output.
    #[must_use]
    pub fn sync_percent(&self) -> f64 {
        if self.network_height == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = self.height as f64 / self.network_height as f64 * 100.0;
        percent
    }

    /// How many blocks this daemon is behind the network.
    #[must_use]
    pub fn blocks_behind(&self) -> u64 {
        self.network_height.saturating_sub(self.height)
    }
}

/// Body of a `/gettransactions` request: the hashes to look up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionsRequest {
    #[serde(default)]
    pub transactions_hashes: Vec<String>,
}

/// Body of a `/get_pool_changes_lite` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolChangesLiteRequest {
    #[serde(default, rename = "tailBlockId", skip_serializing_if = "Option::is_none")]
    pub tail_block_id: Option<String>,
    #[serde(default, rename = "knownTxsIds")]
    pub known_txs_ids: Vec<String>,
}

/// Params of a `getblocktemplate` JSON-RPC call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTemplateParams {
    pub reserve_size: u64,
    pub wallet_address: String,
}

/// Params of the JSON-RPC calls keyed by a block or transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashParams {
    pub hash: String,
}

/// Params of the JSON-RPC calls keyed by a block height.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightParams {
    pub height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_apply_to_missing_fields() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"method": "getblockcount"})).unwrap();

        assert_eq!(request.jsonrpc, JSONRPC_VERSION);
        assert_eq!(request.method, "getblockcount");
        assert!(request.params.is_none());
        assert_eq!(*request.id, serde_json::Value::Null);
    }

    #[test]
    fn request_without_method_is_rejected() {
        let result =
            serde_json::from_value::<JsonRpcRequest>(json!({"id": 1, "jsonrpc": "2.0"}));
        assert!(result.is_err());
    }

    #[test]
    fn response_echoes_request_envelope() {
        let request = JsonRpcRequest::new("getblockcount", None, json!(7));
        let response = JsonRpcResponse::success(json!({"count": 1000}), &request);

        assert_eq!(*response.id, json!(7));
        assert_eq!(response.jsonrpc, request.jsonrpc);
        assert!(response.error.is_none());

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["result"]["count"], 1000);
        assert!(encoded.get("error").is_none(), "error must be omitted on success");
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let request = JsonRpcRequest::new("bogus", None, json!("abc"));
        let response = JsonRpcResponse::error(-32601, "Method not found".to_string(), &request);

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["error"]["code"], -32601);
        assert_eq!(encoded["error"]["message"], "Method not found");
        assert_eq!(encoded["id"], "abc");
        assert!(encoded.get("result").is_none());
    }

    #[test]
    fn node_info_passes_unknown_fields_through() {
        let raw = json!({
            "height": 950,
            "network_height": 1000,
            "synced": false,
            "status": "OK",
            "difficulty": 123_456,
            "tx_pool_size": 3,
        });

        let info: NodeInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(info.height, 950);
        assert_eq!(info.blocks_behind(), 50);
        assert!((info.sync_percent() - 95.0).abs() < f64::EPSILON);

        let round_tripped = serde_json::to_value(&info).unwrap();
        assert_eq!(round_tripped, raw);
    }

    #[test]
    fn sync_percent_handles_zero_network_height() {
        let info: NodeInfo = serde_json::from_value(json!({"height": 10})).unwrap();
        assert!((info.sync_percent() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pool_changes_request_uses_daemon_field_names() {
        let request = PoolChangesLiteRequest {
            tail_block_id: Some("aa".to_string()),
            known_txs_ids: vec!["bb".to_string()],
        };

        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["tailBlockId"], "aa");
        assert_eq!(encoded["knownTxsIds"][0], "bb");
    }
}
