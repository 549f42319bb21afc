//! SOCKS5 reply builder
//!
//! Constructs and parses SOCKS5 reply messages.

use crate::error::{ProtocolError, Socks5ReplyCode};
use crate::socks::consts::*;
use crate::socks::types::{AddressType, Destination};
use bytes::{Buf, BufMut, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Reply {
    /// Reply code
    pub code: Socks5ReplyCode,
    /// Bound address and port
    pub bind: Destination,
}

impl Socks5Reply {
    /// Reply with the wildcard IPv4 bound address `0.0.0.0:0`
    pub fn new(code: Socks5ReplyCode) -> Self {
        Socks5Reply {
            code,
            bind: Destination::wildcard(),
        }
    }

    /// Address type of the bound address
    pub fn addr_type(&self) -> AddressType {
        self.bind.addr_type()
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Result<BytesMut, ProtocolError> {
        let mut buf = BytesMut::with_capacity(22);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.code.into());
        buf.put_u8(SOCKS5_RESERVED);
        self.bind.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Parse a reply from wire bytes
    ///
    /// `bytes` must hold exactly one reply.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 4 {
            return Err(ProtocolError::InvalidReplyLength {
                expected: 4,
                actual: bytes.len(),
            });
        }
        if bytes[0] != SOCKS5_VERSION {
            return Err(ProtocolError::InvalidReplyVersion(bytes[0]));
        }

        let code = Socks5ReplyCode::try_from(bytes[1])?;
        let addr_type = AddressType::from_byte(bytes[3])?;

        let addr_len = match addr_type {
            AddressType::Ipv4 => 4,
            AddressType::Ipv6 => 16,
            AddressType::Domain => 1 + bytes.get(4).copied().unwrap_or(0) as usize,
        };
        let expected = 4 + addr_len + 2;
        if bytes.len() != expected {
            return Err(ProtocolError::InvalidReplyLength {
                expected,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[4..];
        let bind = match addr_type {
            AddressType::Ipv4 => {
                let ip = Ipv4Addr::from(buf.get_u32());
                Destination::ipv4(ip, buf.get_u16())
            }
            AddressType::Ipv6 => {
                let ip = Ipv6Addr::from(buf.get_u128());
                Destination::ipv6(ip, buf.get_u16())
            }
            AddressType::Domain => {
                let len = buf.get_u8() as usize;
                let domain = std::str::from_utf8(&buf[..len])
                    .map_err(|_| {
                        ProtocolError::InvalidDomain("domain name is not UTF-8".to_string())
                    })?
                    .to_string();
                buf.advance(len);
                Destination::domain(domain, buf.get_u16())?
            }
        };

        Ok(Socks5Reply { code, bind })
    }
}

/// Build and send a SOCKS5 reply with the wildcard bound address
pub async fn send_reply<S>(stream: &mut S, code: Socks5ReplyCode) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let reply = Socks5Reply::new(code)
        .to_bytes()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    stream.write_all(&reply).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: [Socks5ReplyCode; 9] = [
        Socks5ReplyCode::Succeeded,
        Socks5ReplyCode::GeneralFailure,
        Socks5ReplyCode::ConnectionNotAllowed,
        Socks5ReplyCode::NetworkUnreachable,
        Socks5ReplyCode::HostUnreachable,
        Socks5ReplyCode::ConnectionRefused,
        Socks5ReplyCode::TtlExpired,
        Socks5ReplyCode::CommandNotSupported,
        Socks5ReplyCode::AddressTypeNotSupported,
    ];

    #[test]
    fn test_success_reply_bytes() {
        let reply = Socks5Reply::new(Socks5ReplyCode::Succeeded);
        assert_eq!(&reply.to_bytes().unwrap()[..], &[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reply_round_trip_codes_and_address_types() {
        let binds = [
            Destination::wildcard(),
            Destination::ipv4(Ipv4Addr::new(10, 1, 2, 3), 1080),
            Destination::domain("proxy.local".to_string(), 3128).unwrap(),
            Destination::ipv6(Ipv6Addr::UNSPECIFIED, 0),
        ];

        for code in ALL_CODES {
            for bind in &binds {
                let reply = Socks5Reply {
                    code,
                    bind: bind.clone(),
                };
                let bytes = reply.to_bytes().unwrap();
                let parsed = Socks5Reply::from_bytes(&bytes).unwrap();

                assert_eq!(parsed.code, code);
                assert_eq!(parsed.addr_type(), bind.addr_type());
                assert_eq!(parsed.bind.port(), bind.port());
            }
        }
    }

    #[test]
    fn test_reply_rejects_oversized_domain() {
        let reply = Socks5Reply {
            code: Socks5ReplyCode::Succeeded,
            bind: Destination::Domain("a".repeat(256), 80),
        };
        assert!(reply.to_bytes().is_err());
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0]),
            Err(ProtocolError::InvalidReplyLength {
                expected: 4,
                actual: 2
            })
        ));
        assert!(matches!(
            Socks5Reply::from_bytes(&[4, 0, 0, 1, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::InvalidReplyVersion(4))
        ));
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0, 0, 9, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::AddressTypeNotSupported(9))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        // IPv4 reply cut short
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0, 0, 1, 0, 0, 0, 0, 0]),
            Err(ProtocolError::InvalidReplyLength {
                expected: 10,
                actual: 9
            })
        ));
        // Trailing byte after the port
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::InvalidReplyLength { actual: 11, .. })
        ));
        // Domain length byte missing
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0, 0, 3]),
            Err(ProtocolError::InvalidReplyLength { actual: 4, .. })
        ));
        // Domain shorter than its length byte claims
        assert!(matches!(
            Socks5Reply::from_bytes(&[5, 0, 0, 3, 5, b'a', b'b', 0, 80]),
            Err(ProtocolError::InvalidReplyLength {
                expected: 12,
                actual: 9
            })
        ));
    }

    #[tokio::test]
    async fn test_send_reply() {
        let mut buffer = Vec::new();
        send_reply(&mut buffer, Socks5ReplyCode::CommandNotSupported)
            .await
            .unwrap();
        assert_eq!(buffer, vec![5, 7, 0, 1, 0, 0, 0, 0, 0, 0]);
    }
}
