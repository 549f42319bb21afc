//! SOCKS5 decoder
//!
//! Drives method negotiation and request parsing, sending the failure
//! replies SOCKS5 defines for requests that cannot be served.

mod auth;
mod parser;
mod reply;

pub use auth::negotiate;
pub use parser::{parse_address, parse_request, Socks5Request};
pub use reply::{send_reply, Socks5Reply};

use crate::error::{ProtocolError, Socks5ReplyCode};
use crate::socks::types::{Destination, SocksCommand};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// Run the SOCKS5 handshake up to (but not including) the success reply
///
/// # Protocol Flow
///
/// 1. Method negotiation (fatal if no-auth is not offered)
/// 2. Request parsing (any failure gets a general-failure reply)
/// 3. Command check (anything but CONNECT gets command-not-supported)
pub async fn handshake<S>(stream: &mut S) -> Result<Destination, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    negotiate(stream).await?;

    let request = match parse_request(stream).await {
        Ok(request) => request,
        Err(e) => {
            reject(stream, Socks5ReplyCode::GeneralFailure).await;
            return Err(e);
        }
    };

    if request.command() != Some(SocksCommand::Connect) {
        warn!("SOCKS5 command {} not supported", request.command);
        reject(stream, Socks5ReplyCode::CommandNotSupported).await;
        return Err(ProtocolError::CommandNotSupported(request.command));
    }

    Ok(request.destination)
}

async fn reject<S>(stream: &mut S, code: Socks5ReplyCode)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = send_reply(stream, code).await {
        debug!("Failed to send SOCKS5 {:?} reply: {}", code, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socks::consts::*;

    #[tokio::test]
    async fn test_handshake_connect_ipv4() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .read(&[5, 1, 0, 1, 93, 184, 216, 34, 0, 80])
            .build();

        let dest = handshake(&mut stream).await.unwrap();
        assert_eq!(dest.to_string(), "93.184.216.34:80");
    }

    #[tokio::test]
    async fn test_handshake_no_acceptable_method_reads_no_request() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_PASSWORD])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE])
            .build();

        let result = handshake(&mut stream).await;
        assert!(matches!(result, Err(ProtocolError::NoAcceptableMethod)));
    }

    #[tokio::test]
    async fn test_handshake_bind_is_rejected() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .read(&[5, 2, 0, 1, 10, 0, 0, 1, 0, 21])
            .write(&[5, 7, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream).await;
        assert!(matches!(result, Err(ProtocolError::CommandNotSupported(2))));
    }

    #[tokio::test]
    async fn test_handshake_udp_associate_is_rejected() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .read(&[5, 3, 0, 1, 0, 0, 0, 0, 0, 0])
            .write(&[5, 7, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream).await;
        assert!(matches!(result, Err(ProtocolError::CommandNotSupported(3))));
    }

    #[tokio::test]
    async fn test_handshake_bad_address_type_gets_general_failure() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .read(&[5, 1, 0, 7])
            .write(&[5, 1, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream).await;
        assert!(matches!(
            result,
            Err(ProtocolError::AddressTypeNotSupported(7))
        ));
    }

    #[tokio::test]
    async fn test_handshake_domain_with_crlf_gets_general_failure() {
        let host = b"evil.com:80 HTTP/1.1\r\nX-Injected: 1\r\n\r\nGET /";
        let mut request = vec![5, 1, 0, 3, host.len() as u8];
        request.extend_from_slice(host);
        request.extend_from_slice(&443u16.to_be_bytes());

        let mut stream = tokio_test::io::Builder::new()
            .read(&[1, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .read(&request)
            .write(&[5, 1, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream).await;
        assert!(matches!(result, Err(ProtocolError::InvalidDomain(_))));
    }
}
