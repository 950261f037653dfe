use thiserror::Error;

/// Errors that can occur on a single call to an upstream daemon.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RpcError {
    /// Request exceeded the configured timeout duration.
    #[error("request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream daemon.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error (non-2xx status code).
    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    /// JSON-RPC error returned by the upstream daemon.
    #[error("RPC error {0}: {1}")]
    Rpc(i32, String),

    /// Response from the upstream could not be parsed or was malformed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network-level error from the underlying HTTP client.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl RpcError {
    /// Returns `true` if this error means the daemon stopped answering
    /// (as opposed to answering badly): timeouts, refused connections,
    /// transport failures, and 5xx responses.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) | Self::Network(_) => true,
            Self::Http(status, _) => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Terminal outcomes of a fan-out dispatch, surfaced to the gateway caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The pool snapshot contained no connected, synced upstream.
    #[error("no synced upstream available")]
    NoSyncedUpstream,

    /// Every raced upstream call failed before the deadline.
    #[error("all upstreams failed")]
    AllUpstreamsFailed,

    /// The deadline fired before any upstream answered successfully.
    #[error("dispatch timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_classification() {
        assert!(RpcError::Timeout.is_unreachable());
        assert!(RpcError::ConnectionFailed("refused".into()).is_unreachable());
        assert!(RpcError::Http(500, "Internal Server Error".into()).is_unreachable());
        assert!(RpcError::Http(503, "Service Unavailable".into()).is_unreachable());

        assert!(!RpcError::Http(404, "Not Found".into()).is_unreachable());
        assert!(!RpcError::Rpc(-32601, "Method not found".into()).is_unreachable());
        assert!(!RpcError::InvalidResponse("truncated".into()).is_unreachable());
    }

    #[test]
    fn test_dispatch_error_messages() {
        assert_eq!(DispatchError::NoSyncedUpstream.to_string(), "no synced upstream available");
        assert_eq!(DispatchError::AllUpstreamsFailed.to_string(), "all upstreams failed");
        assert_eq!(DispatchError::Timeout.to_string(), "dispatch timed out");
    }
}
