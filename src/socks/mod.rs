//! SOCKS protocol module for Socksbridge
//!
//! This module decodes SOCKS4a and SOCKS5 handshakes into a [`Destination`].
//! Nothing here dials the destination; the decoded address is handed to the
//! tunnel builder verbatim.

mod consts;
mod dispatch;
pub mod socks4;
pub mod socks5;
mod types;

pub use consts::*;
pub use dispatch::SocksVersion;
pub use types::{AddressType, Destination, SocksCommand};
