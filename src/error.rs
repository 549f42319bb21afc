//! Error types for Socksbridge
//!
//! This module defines the typed errors raised by the protocol decoders and
//! the tunnel builder, plus the reply-code enumerations those errors map to.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop the server before it accepts anything
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listen address could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Configured listen address
        addr: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Errors raised while decoding a SOCKS4a or SOCKS5 handshake
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The client went away or the socket failed mid-handshake
    #[error("IO error during handshake: {0}")]
    Io(#[from] io::Error),

    /// First byte was neither 4 nor 5
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Reply carried a code outside the protocol's table
    #[error("Invalid reply code: {0}")]
    InvalidReplyCode(u8),

    /// Reply bytes did not have the length their header implies
    #[error("Reply is {actual} bytes, expected {expected}")]
    InvalidReplyLength {
        /// Length implied by the reply header
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Reply did not start with the expected version byte
    #[error("Invalid reply version: {0}")]
    InvalidReplyVersion(u8),

    /// A variable-length field exceeded its limit
    #[error("{field} exceeds {limit} bytes")]
    FieldTooLong {
        /// Name of the offending field
        field: &'static str,
        /// Maximum accepted length
        limit: usize,
    },

    /// Handshake did not complete in time
    #[error("Handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised while establishing the HTTP CONNECT tunnel
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Dialing the upstream proxy failed
    #[error("Failed to connect to upstream {addr}: {source}")]
    Connect {
        /// Upstream address
        addr: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Dialing the upstream proxy took too long
    #[error("Connection timeout to upstream {addr} after {timeout:?}")]
    ConnectTimeout {
        /// Upstream address
        addr: String,
        /// Configured dial timeout
        timeout: Duration,
    },

    /// Writing the request or reading the response failed
    #[error("IO error while talking to upstream: {0}")]
    Io(#[from] io::Error),

    /// The upstream answered with something that is not an HTTP response
    #[error("Malformed CONNECT response: {0}")]
    MalformedResponse(String),

    /// The response head did not terminate within the size limit
    #[error("CONNECT response head exceeds {0} bytes")]
    ResponseTooLarge(usize),

    /// The upstream refused the tunnel
    #[error("Upstream rejected CONNECT to {target}: {status} {reason}")]
    Rejected {
        /// Requested destination
        target: String,
        /// HTTP status code
        status: u16,
        /// HTTP reason phrase
        reason: String,
    },
}

/// Reply codes for SOCKS5 protocol
///
/// This is also the outcome vocabulary used by the session pipeline for both
/// dialects; SOCKS4a collapses it to granted/rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            _ => Err(ProtocolError::InvalidReplyCode(value)),
        }
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

impl From<&TunnelError> for Socks5ReplyCode {
    fn from(err: &TunnelError) -> Self {
        match err {
            TunnelError::Connect { source, .. } => Socks5ReplyCode::from(source),
            TunnelError::ConnectTimeout { .. } => Socks5ReplyCode::HostUnreachable,
            TunnelError::Io(e) => Socks5ReplyCode::from(e),
            TunnelError::Rejected { status, .. } if matches!(status, 403 | 407) => {
                Socks5ReplyCode::ConnectionNotAllowed
            }
            TunnelError::Rejected { .. } => Socks5ReplyCode::HostUnreachable,
            TunnelError::MalformedResponse(_) | TunnelError::ResponseTooLarge(_) => {
                Socks5ReplyCode::GeneralFailure
            }
        }
    }
}

/// Result codes for SOCKS4a replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks4ReplyCode {
    /// Request granted
    Granted = 90,
    /// Request rejected or failed
    Rejected = 91,
    /// Rejected because the server cannot reach identd on the client (never sent)
    IdentdUnreachable = 92,
    /// Rejected because identd reported a different user-id (never sent)
    IdentdMismatch = 93,
}

impl From<Socks4ReplyCode> for u8 {
    fn from(code: Socks4ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks4ReplyCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            90 => Ok(Socks4ReplyCode::Granted),
            91 => Ok(Socks4ReplyCode::Rejected),
            92 => Ok(Socks4ReplyCode::IdentdUnreachable),
            93 => Ok(Socks4ReplyCode::IdentdMismatch),
            _ => Err(ProtocolError::InvalidReplyCode(value)),
        }
    }
}

impl From<Socks5ReplyCode> for Socks4ReplyCode {
    fn from(code: Socks5ReplyCode) -> Self {
        match code {
            Socks5ReplyCode::Succeeded => Socks4ReplyCode::Granted,
            _ => Socks4ReplyCode::Rejected,
        }
    }
}
