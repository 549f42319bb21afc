//! Bidirectional relay between a client and its upstream tunnel
//!
//! Each direction runs as its own task. The session ends when the first
//! direction finishes; the other task is aborted and both streams are dropped.

use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Copy direction within a relay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes read from the client, written to the upstream
    ClientToUpstream,
    /// Bytes read from the upstream, written to the client
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => write!(f, "client->upstream"),
            Direction::UpstreamToClient => write!(f, "upstream->client"),
        }
    }
}

/// The first copy direction to finish and how it finished
#[derive(Debug)]
pub struct RelayOutcome {
    /// Which direction finished first
    pub direction: Direction,
    /// Bytes copied, or the error that stopped the copy
    pub result: io::Result<u64>,
}

/// Aborts both copy tasks when the relay returns
struct AbortOnDrop([JoinHandle<()>; 2]);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Relay bytes between `client` and `upstream` until either direction ends
///
/// Both streams are owned by the copy tasks and closed when the relay
/// returns, whichever direction finished.
pub async fn relay<C, U>(client: C, upstream: U) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    U: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    // Room for both outcomes so neither task blocks on send
    let (tx, mut rx) = mpsc::channel::<RelayOutcome>(2);

    let up_tx = tx.clone();
    let client_to_upstream = tokio::spawn(async move {
        let result = tokio::io::copy(&mut client_read, &mut upstream_write).await;
        let _ = up_tx
            .send(RelayOutcome {
                direction: Direction::ClientToUpstream,
                result,
            })
            .await;
    });

    let down_tx = tx;
    let upstream_to_client = tokio::spawn(async move {
        let result = tokio::io::copy(&mut upstream_read, &mut client_write).await;
        let _ = down_tx
            .send(RelayOutcome {
                direction: Direction::UpstreamToClient,
                result,
            })
            .await;
    });

    let _guard = AbortOnDrop([client_to_upstream, upstream_to_client]);

    let outcome = match rx.recv().await {
        Some(outcome) => outcome,
        // Both senders dropped without reporting, only possible if a task panicked
        None => RelayOutcome {
            direction: Direction::ClientToUpstream,
            result: Err(io::Error::new(
                io::ErrorKind::Other,
                "relay task ended without reporting",
            )),
        },
    };

    match &outcome.result {
        Ok(bytes) => debug!("{} finished: {} bytes", outcome.direction, bytes),
        Err(e) => debug!("{} error: {}", outcome.direction, e),
    }

    outcome
}
