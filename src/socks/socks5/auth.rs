//! SOCKS5 authentication negotiation
//!
//! Only "no authentication required" is offered.

use crate::error::ProtocolError;
use crate::socks::consts::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Perform the method-selection exchange
///
/// The version byte has already been consumed by the dispatcher, so this
/// starts at `NMETHODS`:
///
/// ```text
/// +----------+----------+
/// | NMETHODS | METHODS  |
/// +----------+----------+
/// |    1     | 1 to 255 |
/// +----------+----------+
/// ```
///
/// Replies `{5, 0x00}` if the client offers no-auth, otherwise replies
/// `{5, 0xFF}` and fails.
pub async fn negotiate<S>(stream: &mut S) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let num_methods = stream.read_u8().await?;

    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;

    let selected = select_method(&methods);
    stream.write_all(&[SOCKS5_VERSION, selected]).await?;
    stream.flush().await?;

    if selected == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        debug!("Client offered methods {:?}, none acceptable", methods);
        return Err(ProtocolError::NoAcceptableMethod);
    }

    Ok(())
}

/// Pick the method byte to answer with
fn select_method(methods: &[u8]) -> u8 {
    if methods.contains(&SOCKS5_AUTH_METHOD_NONE) {
        SOCKS5_AUTH_METHOD_NONE
    } else {
        SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE
    }
}
