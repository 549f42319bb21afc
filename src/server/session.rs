//! Per-connection session pipeline
//!
//! Version dispatch, handshake decode, tunnel build and relay, run in order
//! for one accepted client.

use crate::config::{ReplyOrdering, ServerConfig};
use crate::error::{ProtocolError, Socks5ReplyCode};
use crate::relay::relay;
use crate::socks::{Destination, SocksVersion};
use crate::transport::Tunnel;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Everything a session needs, shared read-only by every session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Upstream tunnel builder
    pub tunnel: Tunnel,
    /// When the success reply is sent
    pub reply_ordering: ReplyOrdering,
    /// Bound on the client handshake, if any
    pub handshake_timeout: Option<Duration>,
}

impl SessionContext {
    /// Build the session context from the server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        SessionContext {
            tunnel: Tunnel::from_config(config),
            reply_ordering: config.reply_ordering,
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

/// Read the version byte and decode the matching handshake
pub async fn handshake<S>(stream: &mut S) -> Result<(SocksVersion, Destination), ProtocolError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let version = SocksVersion::read_from(stream).await?;
    debug!("Client speaks {}", version);
    let destination = version.decode(stream).await?;
    Ok((version, destination))
}

/// Run one client session to completion
///
/// Both sockets are closed on every return path.
pub async fn run_session(client: TcpStream, peer: SocketAddr, ctx: &SessionContext) -> Result<()> {
    let mut client = BufReader::new(client);

    let handshake_result = match ctx.handshake_timeout {
        Some(limit) => tokio::time::timeout(limit, handshake(&mut client))
            .await
            .unwrap_or(Err(ProtocolError::Timeout(limit))),
        None => handshake(&mut client).await,
    };
    let (version, destination) =
        handshake_result.with_context(|| format!("Handshake with {} failed", peer))?;

    info!("{} CONNECT {} from {}", version, destination, peer);

    let upstream = match ctx.reply_ordering {
        ReplyOrdering::Deferred => match ctx.tunnel.establish(&destination).await {
            Ok(upstream) => {
                version
                    .send_reply(&mut client, Socks5ReplyCode::Succeeded, &destination)
                    .await
                    .context("Failed to send success reply")?;
                upstream
            }
            Err(e) => {
                let code = Socks5ReplyCode::from(&e);
                if let Err(write_err) = version.send_reply(&mut client, code, &destination).await {
                    debug!("Failed to send {:?} reply to {}: {}", code, peer, write_err);
                }
                return Err(e).with_context(|| format!("Tunnel to {} failed", destination));
            }
        },
        ReplyOrdering::Optimistic => {
            version
                .send_reply(&mut client, Socks5ReplyCode::Succeeded, &destination)
                .await
                .context("Failed to send success reply")?;
            ctx.tunnel
                .establish(&destination)
                .await
                .with_context(|| format!("Tunnel to {} failed", destination))?
        }
    };

    info!("Tunnel established to {} for {}", destination, peer);

    let outcome = relay(client, upstream).await;
    match outcome.result {
        Ok(bytes) => debug!(
            "Session {} -> {} closed, {} finished first after {} bytes",
            peer, destination, outcome.direction, bytes
        ),
        Err(e) => debug!(
            "Session {} -> {} closed, {} failed: {}",
            peer, destination, outcome.direction, e
        ),
    }

    Ok(())
}
