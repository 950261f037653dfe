//! HTTP surface of the gateway.
//!
//! Every REST path is bound 1:1 to a fan-out dispatch; `/json_rpc` carries a
//! generic JSON-RPC 2.0 envelope whose `method` is matched case-insensitively
//! against a fixed table. GET and POST are accepted identically on every
//! path, matching the daemons' own RPC surface.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use hydra_core::{
    types::{
        BlockTemplateParams, HashParams, HeightParams, JsonRpcRequest, JsonRpcResponse,
        PoolChangesLiteRequest, TransactionsRequest,
    },
    upstream::{DispatchError, Dispatcher},
};

/// Builds the gateway router over the given dispatcher.
pub fn gateway_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/getheight", get(handle_height).post(handle_height))
        .route("/height", get(handle_height).post(handle_height))
        .route("/getinfo", get(handle_info).post(handle_info))
        .route("/info", get(handle_info).post(handle_info))
        .route("/gettransactions", get(handle_transactions).post(handle_transactions))
        .route("/getpeers", get(handle_peers).post(handle_peers))
        .route("/peers", get(handle_peers).post(handle_peers))
        .route("/feeinfo", get(handle_fee_info).post(handle_fee_info))
        .route("/fee", get(handle_fee_info).post(handle_fee_info))
        .route("/get_pool_changes_lite", get(handle_pool_changes).post(handle_pool_changes))
        .route("/json_rpc", get(handle_json_rpc).post(handle_json_rpc))
        .with_state(dispatcher)
}

/// Maps a terminal dispatch failure onto the wire: 408 for a deadline, 500
/// when no upstream could serve the call.
fn dispatch_failure(error: DispatchError) -> Response {
    let status = match error {
        DispatchError::Timeout => StatusCode::REQUEST_TIMEOUT,
        DispatchError::NoSyncedUpstream | DispatchError::AllUpstreamsFailed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, error.to_string()).into_response()
}

fn into_rest_response<T: Serialize>(outcome: Result<T, DispatchError>) -> Response {
    match outcome {
        Ok(body) => Json(body).into_response(),
        Err(e) => dispatch_failure(e),
    }
}

/// Decodes an optional JSON request body; an empty body means defaults.
fn decode_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("malformed request body: {e}")).into_response()
    })
}

async fn handle_height(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    into_rest_response(
        dispatcher.dispatch(|client| async move { client.get_height().await }).await,
    )
}

async fn handle_info(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    into_rest_response(dispatcher.dispatch(|client| async move { client.get_info().await }).await)
}

async fn handle_peers(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    into_rest_response(dispatcher.dispatch(|client| async move { client.get_peers().await }).await)
}

async fn handle_fee_info(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    into_rest_response(
        dispatcher.dispatch(|client| async move { client.get_fee_info().await }).await,
    )
}

async fn handle_transactions(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let request: TransactionsRequest = match decode_optional_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let request = Arc::new(request);
    into_rest_response(
        dispatcher
            .dispatch(move |client| {
                let request = Arc::clone(&request);
                async move { client.get_transactions(&request).await }
            })
            .await,
    )
}

async fn handle_pool_changes(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let request: PoolChangesLiteRequest = match decode_optional_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let request = Arc::new(request);
    into_rest_response(
        dispatcher
            .dispatch(move |client| {
                let request = Arc::clone(&request);
                async move { client.get_pool_changes_lite(&request).await }
            })
            .await,
    )
}

/// Decodes typed params out of a JSON-RPC request, answering `-32602` when
/// they don't fit the method's shape.
fn parse_params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, Response> {
    let params = request.params.clone().unwrap_or(serde_json::Value::Null);

    serde_json::from_value(params).map_err(|e| {
        let response = JsonRpcResponse::error(-32602, format!("Invalid params: {e}"), request);
        Json(response).into_response()
    })
}

/// The generic JSON-RPC endpoint with the fixed method dispatch table.
#[allow(clippy::too_many_lines)]
async fn handle_json_rpc(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let response = JsonRpcResponse::error_detached(-32700, format!("Parse error: {e}"));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    debug!(method = %request.method, "incoming json_rpc request");

    let outcome = match request.method.to_ascii_lowercase().as_str() {
        "getblockcount" => {
            dispatcher.dispatch(|client| async move { client.get_block_count().await }).await
        }
        "on_getblockhash" => {
            let (height,) = match parse_params::<(u64,)>(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            dispatcher
                .dispatch(move |client| async move { client.get_block_hash(height).await })
                .await
        }
        "getblocktemplate" => {
            let params: BlockTemplateParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let params = Arc::new(params);
            dispatcher
                .dispatch(move |client| {
                    let params = Arc::clone(&params);
                    async move {
                        client.get_block_template(params.reserve_size, &params.wallet_address).await
                    }
                })
                .await
        }
        "submitblock" => {
            let (block_blob,) = match parse_params::<(String,)>(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let block_blob = Arc::new(block_blob);
            dispatcher
                .dispatch(move |client| {
                    let block_blob = Arc::clone(&block_blob);
                    async move { client.submit_block(&block_blob).await }
                })
                .await
        }
        "getlastblockheader" => {
            dispatcher.dispatch(|client| async move { client.get_last_block_header().await }).await
        }
        "getblockheaderbyhash" => {
            let params: HashParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let hash = Arc::new(params.hash);
            dispatcher
                .dispatch(move |client| {
                    let hash = Arc::clone(&hash);
                    async move { client.get_block_header_by_hash(&hash).await }
                })
                .await
        }
        "getblockheaderbyheight" => {
            let params: HeightParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let height = params.height;
            dispatcher
                .dispatch(
                    move |client| async move { client.get_block_header_by_height(height).await },
                )
                .await
        }
        "getcurrencyid" => {
            dispatcher.dispatch(|client| async move { client.get_currency_id().await }).await
        }
        "f_blocks_list_json" => {
            let params: HeightParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let height = params.height;
            dispatcher
                .dispatch(move |client| async move { client.get_blocks(height).await })
                .await
        }
        "f_block_json" => {
            let params: HashParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let hash = Arc::new(params.hash);
            dispatcher
                .dispatch(move |client| {
                    let hash = Arc::clone(&hash);
                    async move { client.get_block(&hash).await }
                })
                .await
        }
        "f_transaction_json" => {
            let params: HashParams = match parse_params(&request) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let hash = Arc::new(params.hash);
            dispatcher
                .dispatch(move |client| {
                    let hash = Arc::clone(&hash);
                    async move { client.get_transaction(&hash).await }
                })
                .await
        }
        "f_on_transactions_pool_json" => {
            dispatcher.dispatch(|client| async move { client.get_transaction_pool().await }).await
        }
        _ => {
            let response = JsonRpcResponse::error(-32601, "Method not found".to_string(), &request);
            return Json(response).into_response();
        }
    };

    match outcome {
        Ok(result) => Json(JsonRpcResponse::success(result, &request)).into_response(),
        Err(e) => dispatch_failure(e),
    }
}
