use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::upstream::errors::RpcError;

/// Shared HTTP client for talking to upstream daemons.
///
/// Wraps a single [`reqwest::Client`] so all per-node clients share one
/// connection pool. Per-call timeouts are supplied by the caller; the
/// builder-level timeout is only a backstop.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, RpcError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(45))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent("hydra-gateway/0.1.0")
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                RpcError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Sanitizes network errors so upstream internals don't leak into responses.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Sends an HTTP GET request and returns the raw response body.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] if the request times out
    /// - [`RpcError::ConnectionFailed`] if the daemon is unreachable
    /// - [`RpcError::Http`] for non-success HTTP status codes
    /// - [`RpcError::Network`] for other transport failures
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Bytes, RpcError> {
        let result = self.client.get(url).timeout(timeout).send().await;
        Self::handle_response(url, result).await
    }

    /// Sends an HTTP POST request with a JSON body and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`HttpClient::get`].
    pub async fn post(&self, url: &str, body: Bytes, timeout: Duration) -> Result<Bytes, RpcError> {
        let result = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await;
        Self::handle_response(url, result).await
    }

    async fn handle_response(
        url: &str,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Bytes, RpcError> {
        match result {
            Ok(response) => {
                if response.status().is_success() {
                    return response.bytes().await.map_err(RpcError::Network);
                }

                let status = response.status().as_u16();
                let raw_text = response.text().await.unwrap_or_default();
                let sanitized_text = if raw_text.len() > 256 {
                    format!("{}... (truncated)", &raw_text[..256])
                } else {
                    raw_text
                };
                tracing::trace!(url = url, status = status, "upstream request failed");
                Err(RpcError::Http(status, sanitized_text))
            }
            Err(e) if e.is_timeout() => Err(RpcError::Timeout),
            Err(e) if e.is_connect() => {
                Err(RpcError::ConnectionFailed(Self::sanitize_network_error(&e)))
            }
            Err(e) => Err(RpcError::Network(e)),
        }
    }
}
