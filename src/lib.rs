//! # Socksbridge - SOCKS4a/SOCKS5 to HTTP CONNECT bridge
//!
//! Socksbridge accepts client connections speaking SOCKS4a or SOCKS5,
//! decodes the requested destination from the handshake, and tunnels the
//! connection through an upstream HTTP proxy using `CONNECT`.
//!
//! ## Features
//!
//! - **Two SOCKS dialects**: SOCKS4a (including hostname destinations) and SOCKS5
//!   (IPv4, domain and IPv6 destinations, no-auth negotiation)
//! - **HTTP CONNECT upstream**: every session gets its own upstream connection
//! - **Deferred replies**: the SOCKS success reply waits for the upstream `200`
//!   unless the legacy optimistic ordering is configured
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksbridge::config::load_config;
//! use socksbridge::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS Client -> Socksbridge -> HTTP Proxy -> Target
//! ```
//!
//! Each accepted connection runs version dispatch, the dialect's decoder,
//! the tunnel builder and finally the relay, independently of every other
//! connection.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{BridgeError, ProtocolError, Socks4ReplyCode, Socks5ReplyCode, TunnelError};
pub use server::{run_server, Server};

/// Version of the Socksbridge library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
