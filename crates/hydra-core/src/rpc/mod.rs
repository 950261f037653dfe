//! HTTP and JSON-RPC client plumbing for upstream daemons.

pub mod daemon;
pub mod http_client;

pub use daemon::DaemonRpc;
pub use http_client::HttpClient;
