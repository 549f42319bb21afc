//! SOCKS4a decoder
//!
//! Decodes a SOCKS4/4a CONNECT request into a [`Destination`] and sends
//! rejection replies for requests that cannot be served.

mod parser;
mod reply;

pub use parser::{is_domain_unresolved, parse_request, Socks4Request};
pub use reply::{send_reply, Socks4Reply};

use crate::error::{ProtocolError, Socks4ReplyCode};
use crate::socks::types::{Destination, SocksCommand};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, warn};

/// Run the SOCKS4a handshake up to (but not including) the success reply
///
/// - IO failures while reading abort without a reply.
/// - Malformed requests and non-CONNECT commands get a `91` reply.
///
/// The grant reply is left to the caller so it can be deferred until the
/// upstream tunnel is confirmed.
pub async fn handshake<S>(stream: &mut S) -> Result<Destination, ProtocolError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let request = match parse_request(stream).await {
        Ok(request) => request,
        Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
        Err(e) => {
            reject(stream, 0).await;
            return Err(e);
        }
    };

    if request.command() != Some(SocksCommand::Connect) {
        warn!("SOCKS4 command {} not supported", request.command);
        reject(stream, request.destination.port()).await;
        return Err(ProtocolError::CommandNotSupported(request.command));
    }

    Ok(request.destination)
}

async fn reject<S>(stream: &mut S, port: u16)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = send_reply(stream, Socks4ReplyCode::Rejected, port).await {
        debug!("Failed to send SOCKS4 rejection: {}", e);
    }
}
