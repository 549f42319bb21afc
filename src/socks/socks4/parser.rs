//! SOCKS4a request parser
//!
//! Parses the request that follows the version byte.

use crate::error::ProtocolError;
use crate::socks::consts::MAX_DOMAIN_LEN;
use crate::socks::types::{Destination, SocksCommand};
use std::io;
use std::net::Ipv4Addr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// A decoded SOCKS4/4a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Request {
    /// Raw command byte
    pub command: u8,
    /// Requested destination
    pub destination: Destination,
}

impl Socks4Request {
    /// The command, if it is one SOCKS knows about
    pub fn command(&self) -> Option<SocksCommand> {
        SocksCommand::from_byte(self.command)
    }
}

/// Parse a SOCKS4a request from the stream
///
/// The version byte has already been consumed by the dispatcher.
///
/// # SOCKS4a Request Format
///
/// ```text
/// +----+----+----+----+----+----+----+----+....+----+....+----+
/// | CD | DSTPORT |      DSTIP        | USERID  |NULL| DOMAIN  |NULL|
/// +----+----+----+----+----+----+----+----+....+----+....+----+
///    1      2              4          variable   1   variable  1
/// ```
///
/// `DOMAIN` is only present when `DSTIP` is `0.0.0.x` with `x != 0`.
/// Only IO failures surface as [`ProtocolError::Io`]; everything else is a
/// malformed request.
pub async fn parse_request<S>(stream: &mut S) -> Result<Socks4Request, ProtocolError>
where
    S: AsyncBufRead + Unpin,
{
    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await?;

    let command = header[0];
    let port = u16::from_be_bytes([header[1], header[2]]);
    let ip = [header[3], header[4], header[5], header[6]];

    // The user-id is ignored but must be drained
    skip_nul_terminated(stream).await?;

    let destination = if is_domain_unresolved(&ip) {
        let raw = read_nul_terminated(stream, MAX_DOMAIN_LEN).await?;
        let domain = String::from_utf8(raw)
            .map_err(|_| ProtocolError::InvalidDomain("domain name is not UTF-8".to_string()))?;
        Destination::domain(domain, port)?
    } else {
        Destination::ipv4(Ipv4Addr::from(ip), port)
    };

    tracing::debug!("Parsed SOCKS4a request: cmd={} dst={}", command, destination);

    Ok(Socks4Request {
        command,
        destination,
    })
}

/// Whether the address is the SOCKS4a `0.0.0.x` marker
pub fn is_domain_unresolved(ip: &[u8; 4]) -> bool {
    ip[..3] == [0, 0, 0] && ip[3] != 0
}

/// Discard bytes up to and including the next NUL
async fn skip_nul_terminated<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncBufRead + Unpin,
{
    loop {
        let buf = stream.fill_buf().await?;
        if buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "eof inside user-id",
            ));
        }
        match buf.iter().position(|&b| b == 0) {
            Some(pos) => {
                stream.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                stream.consume(len);
            }
        }
    }
}

/// Read a NUL-terminated string of at most `limit` bytes (NUL excluded)
async fn read_nul_terminated<S>(stream: &mut S, limit: usize) -> Result<Vec<u8>, ProtocolError>
where
    S: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut *stream)
        .take(limit as u64 + 1)
        .read_until(0, &mut buf)
        .await?;

    match buf.pop() {
        Some(0) => Ok(buf),
        _ if buf.len() >= limit => Err(ProtocolError::FieldTooLong {
            field: "domain name",
            limit,
        }),
        _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof inside domain name").into()),
    }
}
