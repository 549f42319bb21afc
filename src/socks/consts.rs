//! SOCKS protocol constants
//!
//! Wire constants for both dialects handled by the bridge.

/// SOCKS4 protocol version (first byte of a SOCKS4/4a request)
pub const SOCKS4_VERSION: u8 = 0x04;

/// Version byte of a SOCKS4 reply
pub const SOCKS4_REPLY_VERSION: u8 = 0x00;

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// GSSAPI authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_GSSAPI: u8 = 0x01;
/// Username/password authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Commands, shared by both dialects
/// TCP CONNECT command
pub const SOCKS_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (not implemented)
pub const SOCKS_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (SOCKS5 only, not implemented)
pub const SOCKS_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;

/// Length of a SOCKS4 reply
pub const SOCKS4_REPLY_LEN: usize = 8;
