//! Server configuration types
//!
//! Defines the main configuration structures for the bridge.

use super::TcpConfig;
use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upstream connect timeout in seconds
fn default_connect_timeout() -> u64 {
    7
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// When the SOCKS success reply is sent relative to the upstream tunnel
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOrdering {
    /// Reply after the upstream confirmed the tunnel; failures get a failure reply
    #[default]
    Deferred,
    /// Reply before dialing the upstream; tunnel failures just close the connection
    Optimistic,
}

/// Bridge server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Local SOCKS listen address (e.g., "127.0.0.1:1080")
    #[serde(default)]
    pub bind_addr: String,

    /// HTTP CONNECT proxy address (e.g., "proxy.example.com:3128")
    #[serde(default)]
    pub upstream_addr: String,

    /// Upstream connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Client handshake timeout in seconds, 0 disables it
    #[serde(default)]
    pub handshake_timeout: u64,

    /// Success reply ordering
    #[serde(default)]
    pub reply_ordering: ReplyOrdering,

    /// Socket options for client and upstream connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: String::new(),
            upstream_addr: String::new(),
            connect_timeout: default_connect_timeout(),
            handshake_timeout: 0,
            reply_ordering: ReplyOrdering::default(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a configuration for the two addresses with every other field defaulted
    pub fn new(bind_addr: impl Into<String>, upstream_addr: impl Into<String>) -> Self {
        ServerConfig {
            bind_addr: bind_addr.into(),
            upstream_addr: upstream_addr.into(),
            ..Default::default()
        }
    }

    /// Upstream connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Client handshake timeout, if enabled
    pub fn handshake_timeout(&self) -> Option<Duration> {
        match self.handshake_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.bind_addr.trim().is_empty() {
            return Err(BridgeError::Config("bind_addr is not set".to_string()));
        }
        if self.upstream_addr.trim().is_empty() {
            return Err(BridgeError::Config("upstream_addr is not set".to_string()));
        }
        if self.connect_timeout == 0 {
            return Err(BridgeError::Config(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
