//! SOCKS listener
//!
//! Accepts client connections and spawns one session task per connection.

mod session;

pub use session::{handshake, run_session, SessionContext};

use crate::config::{Config, ServerConfig};
use crate::error::BridgeError;
use crate::transport::SocketOpts;
use anyhow::{Context, Result};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Bridge server bound to its listen address
pub struct Server {
    /// Listening socket
    listener: TcpListener,
    /// Shared per-session settings
    ctx: Arc<SessionContext>,
    /// Socket options for accepted clients
    socket_opts: SocketOpts,
}

impl Server {
    /// Bind the listen address from the configuration
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;

        Ok(Server {
            listener,
            ctx: Arc::new(SessionContext::from_config(config)),
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown
    ///
    /// In-flight sessions are left running when the loop stops.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!(
            "Listening on {}, forwarding to {}",
            self.local_addr()?,
            self.ctx.tunnel.upstream_addr()
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) if is_transient_accept_error(&e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                        Err(e) => {
                            error!("Listener failed: {}", e);
                            return Err(e).context("Failed to accept connection");
                        }
                    };

                    debug!("Accepted connection from {}", peer);

                    if let Err(e) = self.socket_opts.apply(&stream) {
                        warn!("Failed to apply socket options for {}: {}", peer, e);
                    }

                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = run_session(stream, peer, &ctx).await {
                            warn!("Session {} error: {:#}", peer, e);
                        }
                    });
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Errors that concern one connection rather than the listener
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Validate the configuration, bind and serve until shutdown
pub async fn run_server(config: Config, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    config.server.validate()?;

    let server = Server::bind(&config.server).await?;
    server.run(shutdown_rx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[test]
    fn test_transient_accept_errors() {
        assert!(is_transient_accept_error(&io::Error::from(
            io::ErrorKind::ConnectionAborted
        )));
        assert!(is_transient_accept_error(&io::Error::from(
            io::ErrorKind::ConnectionReset
        )));
        assert!(!is_transient_accept_error(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }

    #[tokio::test]
    async fn test_run_server_rejects_invalid_config() {
        let (_tx, rx) = broadcast::channel(1);
        let err = run_server(Config::default(), rx).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let config = ServerConfig::new(addr.to_string(), "127.0.0.1:9");
        let err = Server::bind(&config).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::Bind { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let config = ServerConfig::new("127.0.0.1:0", "127.0.0.1:9");
        let server = Server::bind(&config).await.unwrap();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(server.run(rx));
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_server_closes_unsupported_version_silently() {
        let config = ServerConfig::new("127.0.0.1:0", "127.0.0.1:9");
        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(server.run(rx));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[0x16, 0x03, 0x01]).await.unwrap();

        let mut received = Vec::new();
        let _ = tokio::time::timeout(Duration::from_secs(1), client.read_to_end(&mut received))
            .await
            .unwrap();
        assert!(received.is_empty());

        let _ = tx.send(true);
    }
}
