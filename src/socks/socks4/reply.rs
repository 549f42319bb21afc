//! SOCKS4a reply encoding
//!
//! Constructs the fixed 8-byte SOCKS4 reply.

use crate::error::{ProtocolError, Socks4ReplyCode};
use crate::socks::consts::{SOCKS4_REPLY_LEN, SOCKS4_REPLY_VERSION};
use std::net::Ipv4Addr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A SOCKS4 reply
///
/// # SOCKS4 Reply Format
///
/// ```text
/// +----+----+----+----+----+----+----+----+
/// | VN | CD | DSTPORT |      DSTIP        |
/// +----+----+----+----+----+----+----+----+
///    1    1      2              4
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socks4Reply {
    /// Result code
    pub code: Socks4ReplyCode,
    /// Bound port
    pub bind_port: u16,
    /// Bound address
    pub bind_addr: Ipv4Addr,
}

impl Socks4Reply {
    /// Reply with the wildcard bound address `0.0.0.0:0`
    pub fn new(code: Socks4ReplyCode) -> Self {
        Socks4Reply {
            code,
            bind_port: 0,
            bind_addr: Ipv4Addr::UNSPECIFIED,
        }
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> [u8; SOCKS4_REPLY_LEN] {
        let port = self.bind_port.to_be_bytes();
        let addr = self.bind_addr.octets();
        [
            SOCKS4_REPLY_VERSION,
            self.code.into(),
            port[0],
            port[1],
            addr[0],
            addr[1],
            addr[2],
            addr[3],
        ]
    }

    /// Echo `port` in the reply's DSTPORT field
    ///
    /// Clients ignore the field; echoing the requested port matches what
    /// common SOCKS4a clients and servers put there.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    /// Parse a reply from wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != SOCKS4_REPLY_LEN {
            return Err(ProtocolError::InvalidReplyLength {
                expected: SOCKS4_REPLY_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != SOCKS4_REPLY_VERSION {
            return Err(ProtocolError::InvalidReplyVersion(bytes[0]));
        }

        Ok(Socks4Reply {
            code: Socks4ReplyCode::try_from(bytes[1])?,
            bind_port: u16::from_be_bytes([bytes[2], bytes[3]]),
            bind_addr: Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]),
        })
    }
}

/// Build and send a SOCKS4 reply with the wildcard address and `port`
pub async fn send_reply<S>(stream: &mut S, code: Socks4ReplyCode, port: u16) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream
        .write_all(&Socks4Reply::new(code).with_port(port).to_bytes())
        .await?;
    stream.flush().await
}
