//! SOCKS5 request parser
//!
//! Parses the request that follows a successful method negotiation.

use crate::error::ProtocolError;
use crate::socks::types::{AddressType, Destination, SocksCommand};
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// A decoded SOCKS5 request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Request {
    /// Raw command byte
    pub command: u8,
    /// Address type the destination was encoded with
    pub addr_type: AddressType,
    /// Requested destination
    pub destination: Destination,
}

impl Socks5Request {
    /// The command, if it is one SOCKS knows about
    pub fn command(&self) -> Option<SocksCommand> {
        SocksCommand::from_byte(self.command)
    }
}

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// `VER` and `RSV` are read but not checked.
pub async fn parse_request<S>(stream: &mut S) -> Result<Socks5Request, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let command = header[1];
    let addr_type = AddressType::from_byte(header[3])?;

    let destination = parse_address(stream, addr_type).await?;

    tracing::debug!(
        "Parsed SOCKS5 request: cmd={} atyp={:?} dst={}",
        command,
        addr_type,
        destination
    );

    Ok(Socks5Request {
        command,
        addr_type,
        destination,
    })
}

/// Parse `DST.ADDR DST.PORT` for the given address type
pub async fn parse_address<S>(
    stream: &mut S,
    addr_type: AddressType,
) -> Result<Destination, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        AddressType::Ipv4 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(Destination::ipv4(Ipv4Addr::from(addr), port))
        }

        AddressType::Domain => {
            let domain_len = stream.read_u8().await? as usize;

            let mut domain_buf = vec![0u8; domain_len];
            stream.read_exact(&mut domain_buf).await?;
            let port = stream.read_u16().await?;

            let domain = String::from_utf8(domain_buf)
                .map_err(|_| ProtocolError::InvalidDomain("domain name is not UTF-8".to_string()))?;

            Destination::domain(domain, port)
        }

        AddressType::Ipv6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(Destination::ipv6(Ipv6Addr::from(addr), port))
        }
    }
}
