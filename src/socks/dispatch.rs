//! Version dispatch
//!
//! Reads the single version byte of a fresh connection and routes the rest
//! of the handshake to the matching decoder.

use super::consts::{SOCKS4_VERSION, SOCKS5_VERSION};
use super::types::Destination;
use super::{socks4, socks5};
use crate::error::{ProtocolError, Socks4ReplyCode, Socks5ReplyCode};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite};

/// SOCKS dialects the bridge speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksVersion {
    /// SOCKS4 with the 4a domain-name extension
    V4a,
    /// SOCKS5
    V5,
}

impl SocksVersion {
    /// Map a version byte to a dialect
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            SOCKS4_VERSION => Ok(SocksVersion::V4a),
            SOCKS5_VERSION => Ok(SocksVersion::V5),
            other => Err(ProtocolError::UnsupportedVersion(other)),
        }
    }

    /// Read exactly one byte and map it to a dialect
    ///
    /// Nothing is written on failure; neither protocol defines a reply
    /// before the version is known.
    pub async fn read_from<S>(stream: &mut S) -> Result<Self, ProtocolError>
    where
        S: AsyncBufRead + Unpin,
    {
        let byte = stream.read_u8().await?;
        Self::from_byte(byte)
    }

    /// Decode the rest of the handshake into a destination
    ///
    /// Protocol-defined failure replies are sent by the decoders; the
    /// success reply is not.
    pub async fn decode<S>(self, stream: &mut S) -> Result<Destination, ProtocolError>
    where
        S: AsyncBufRead + AsyncWrite + Unpin,
    {
        match self {
            SocksVersion::V4a => socks4::handshake(stream).await,
            SocksVersion::V5 => socks5::handshake(stream).await,
        }
    }

    /// Encode the reply for an outcome in this dialect
    ///
    /// SOCKS4a collapses every failure to `91` and echoes the destination
    /// port; SOCKS5 always reports the IPv4 wildcard `0.0.0.0:0`.
    pub fn encode_reply(
        self,
        code: Socks5ReplyCode,
        destination: &Destination,
    ) -> Result<Vec<u8>, ProtocolError> {
        match self {
            SocksVersion::V4a => Ok(socks4::Socks4Reply::new(Socks4ReplyCode::from(code))
                .with_port(destination.port())
                .to_bytes()
                .to_vec()),
            SocksVersion::V5 => Ok(socks5::Socks5Reply::new(code).to_bytes()?.to_vec()),
        }
    }

    /// Send the reply for an outcome in this dialect
    pub async fn send_reply<S>(
        self,
        stream: &mut S,
        code: Socks5ReplyCode,
        destination: &Destination,
    ) -> std::io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        match self {
            SocksVersion::V4a => {
                socks4::send_reply(stream, Socks4ReplyCode::from(code), destination.port()).await
            }
            SocksVersion::V5 => socks5::send_reply(stream, code).await,
        }
    }
}

impl fmt::Display for SocksVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksVersion::V4a => write!(f, "SOCKS4a"),
            SocksVersion::V5 => write!(f, "SOCKS5"),
        }
    }
}
