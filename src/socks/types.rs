//! SOCKS type definitions
//!
//! Defines the core types shared by the SOCKS4a and SOCKS5 decoders.

use super::consts::*;
use crate::error::ProtocolError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not implemented)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not implemented)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// SOCKS5 address type tag (ATYP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// 4-byte IPv4 address
    Ipv4,
    /// Length-prefixed domain name
    Domain,
    /// 16-byte IPv6 address
    Ipv6,
}

impl AddressType {
    /// Parse an ATYP byte
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Ok(AddressType::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Ok(AddressType::Domain),
            SOCKS5_ADDR_TYPE_IPV6 => Ok(AddressType::Ipv6),
            other => Err(ProtocolError::AddressTypeNotSupported(other)),
        }
    }

    /// Convert to the ATYP byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddressType::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddressType::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
            AddressType::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Destination requested by a SOCKS client
///
/// Either a literal IP address or a domain name, never both. The domain is
/// passed to the upstream proxy verbatim; nothing is resolved locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl Destination {
    /// Create a destination from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        Destination::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a destination from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        Destination::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a destination from a domain name and port
    ///
    /// Rejects empty names, names longer than 255 bytes and names holding a
    /// byte that cannot appear in an HTTP request-target host. The name is
    /// written into the `CONNECT` request line, so CR, LF and spaces never
    /// get through.
    pub fn domain(domain: String, port: u16) -> Result<Self, ProtocolError> {
        if domain.is_empty() {
            return Err(ProtocolError::InvalidDomain("empty domain name".to_string()));
        }
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(ProtocolError::FieldTooLong {
                field: "domain name",
                limit: MAX_DOMAIN_LEN,
            });
        }
        if let Some(byte) = domain.bytes().find(|b| !is_host_byte(*b)) {
            return Err(ProtocolError::InvalidDomain(format!(
                "invalid byte 0x{:02x} in domain name",
                byte
            )));
        }
        Ok(Destination::Domain(domain, port))
    }

    /// The unspecified IPv4 address and port zero
    pub fn wildcard() -> Self {
        Destination::ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Textual host: dotted-decimal, IPv6 text form, or the domain name
    pub fn host(&self) -> String {
        match self {
            Destination::Ip(addr) => addr.ip().to_string(),
            Destination::Domain(domain, _) => domain.clone(),
        }
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            Destination::Ip(addr) => addr.port(),
            Destination::Domain(_, port) => *port,
        }
    }

    /// Get the SOCKS5 address type of this destination
    pub fn addr_type(&self) -> AddressType {
        match self {
            Destination::Ip(SocketAddr::V4(_)) => AddressType::Ipv4,
            Destination::Ip(SocketAddr::V6(_)) => AddressType::Ipv6,
            Destination::Domain(_, _) => AddressType::Domain,
        }
    }

    /// Append `ATYP ADDR PORT` in SOCKS5 wire form
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.addr_type().to_byte());
        match self {
            Destination::Ip(SocketAddr::V4(addr)) => {
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            Destination::Ip(SocketAddr::V6(addr)) => {
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            Destination::Domain(domain, port) => {
                if domain.len() > MAX_DOMAIN_LEN {
                    return Err(ProtocolError::FieldTooLong {
                        field: "domain name",
                        limit: MAX_DOMAIN_LEN,
                    });
                }
                buf.put_u8(domain.len() as u8);
                buf.put_slice(domain.as_bytes());
                buf.put_u16(*port);
            }
        }
        Ok(())
    }
}

/// Bytes allowed in a host: unreserved, sub-delims, `%` and `:`
fn is_host_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b'%'
                | b':'
        )
}

/// Formats as `host:port`, with IPv6 hosts in brackets
///
/// A domain holding a `:` (an IPv6 literal sent as ATYP 3) is bracketed
/// too, so the port stays unambiguous.
impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Ip(addr) => write!(f, "{}", addr),
            Destination::Domain(domain, port) if domain.contains(':') => {
                write!(f, "[{}]:{}", domain, port)
            }
            Destination::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for Destination {
    fn from(addr: SocketAddr) -> Self {
        Destination::Ip(addr)
    }
}

impl Default for Destination {
    fn default() -> Self {
        Destination::wildcard()
    }
}
