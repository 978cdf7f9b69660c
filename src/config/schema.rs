//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the authorization service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// The gRPC listen address. A bare `:port` binds all interfaces.
    pub address: String,

    /// The authentication server address.
    pub forward_auth_address: String,

    /// A list of the headers to copy from the request to the authentication server.
    pub auth_request_headers: Vec<String>,

    /// A list of the headers to copy from the authentication server to the request.
    pub auth_response_headers: Vec<String>,

    /// Trust all the existing X-Forwarded-* headers.
    /// This is needed to work with Pomerium.
    pub trust_forward_header: bool,

    /// Timeout for each forward-auth call in seconds.
    pub forward_auth_timeout_secs: u64,

    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus endpoint bind address. Unset disables the endpoint.
    pub metrics_address: Option<String>,

    /// Build or deployment version, attached to startup logs.
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            address: ":9090".to_string(),
            forward_auth_address: String::new(),
            auth_request_headers: Vec::new(),
            auth_response_headers: Vec::new(),
            trust_forward_header: true,
            forward_auth_timeout_secs: 15,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_address: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServiceConfig {
    /// Timeout for each forward-auth call.
    pub fn forward_auth_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_auth_timeout_secs)
    }

    /// Resolve the listen address.
    pub fn listen_addr(&self) -> std::io::Result<SocketAddr> {
        resolve_addr(&self.address)
    }

    /// Resolve the metrics address, if one is configured.
    pub fn metrics_addr(&self) -> std::io::Result<Option<SocketAddr>> {
        match self.metrics_address.as_deref() {
            Some(addr) if !addr.is_empty() => resolve_addr(addr).map(Some),
            _ => Ok(None),
        }
    }
}

/// Resolve `host:port`, treating `:port` as all interfaces.
pub fn resolve_addr(addr: &str) -> std::io::Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} did not resolve to any address", addr),
        )
    })
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human readable output.
    Pretty,
}
