//! HTTP CONNECT tunnel builder
//!
//! Dials the upstream proxy and asks it to open a byte tunnel to the
//! destination decoded from the SOCKS handshake.

use super::SocketOpts;
use crate::config::ServerConfig;
use crate::error::TunnelError;
use crate::socks::Destination;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Maximum size of the upstream's CONNECT response head
pub const MAX_RESPONSE_HEAD: usize = 8192;

/// Maximum number of response headers accepted from the upstream
const MAX_RESPONSE_HEADERS: usize = 64;

/// Default upstream connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(7);

/// Builder for tunnels through one upstream HTTP proxy
#[derive(Debug, Clone)]
pub struct Tunnel {
    /// Upstream proxy address, resolved on every dial
    upstream_addr: String,
    /// Socket options to apply to upstream connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl Tunnel {
    /// Create a tunnel builder with default options
    pub fn new(upstream_addr: impl Into<String>) -> Self {
        Tunnel {
            upstream_addr: upstream_addr.into(),
            socket_opts: SocketOpts::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a tunnel builder from the server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Tunnel::new(config.upstream_addr.clone())
            .with_socket_opts(SocketOpts::from_tcp_config(&config.tcp))
            .with_connect_timeout(config.connect_timeout())
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Upstream proxy address
    pub fn upstream_addr(&self) -> &str {
        &self.upstream_addr
    }

    /// Dial the upstream proxy
    pub async fn connect(&self) -> Result<TcpStream, TunnelError> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.upstream_addr.as_str()),
        )
        .await
        .map_err(|_| TunnelError::ConnectTimeout {
            addr: self.upstream_addr.clone(),
            timeout: self.connect_timeout,
        })?
        .map_err(|source| TunnelError::Connect {
            addr: self.upstream_addr.clone(),
            source,
        })?;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        debug!("TCP connection established to upstream {}", self.upstream_addr);

        Ok(stream)
    }

    /// Dial the upstream and open a CONNECT tunnel to `destination`
    ///
    /// The returned stream is buffered: any bytes the upstream sent right
    /// after the response head are still readable from it.
    pub async fn establish(
        &self,
        destination: &Destination,
    ) -> Result<BufReader<TcpStream>, TunnelError> {
        let mut upstream = BufReader::new(self.connect().await?);
        http_connect(&mut upstream, &destination.to_string()).await?;
        Ok(upstream)
    }
}

/// Build the CONNECT request for `target` (`host:port`)
pub fn build_connect_request(target: &str) -> String {
    format!(
        "CONNECT {target} HTTP/1.1\r\n\
         Host: {target}\r\n\
         User-Agent: {}/{}\r\n\
         Proxy-Connection: keep-alive\r\n\
         \r\n",
        crate::NAME,
        crate::VERSION,
    )
}

/// Send a CONNECT request for `target` and require a `200` response
///
/// Reads the response head only; the body is left unread.
pub async fn http_connect<S>(stream: &mut S, target: &str) -> Result<(), TunnelError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    stream
        .write_all(build_connect_request(target).as_bytes())
        .await?;
    stream.flush().await?;

    let head = read_response_head(stream).await?;

    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(&head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(TunnelError::MalformedResponse(
                "incomplete response head".to_string(),
            ))
        }
        Err(e) => return Err(TunnelError::MalformedResponse(e.to_string())),
    }

    match response.code {
        Some(200) => {
            debug!("Upstream accepted CONNECT to {}", target);
            Ok(())
        }
        Some(status) => Err(TunnelError::Rejected {
            target: target.to_string(),
            status,
            reason: response.reason.unwrap_or("").to_string(),
        }),
        None => Err(TunnelError::MalformedResponse(
            "missing status code".to_string(),
        )),
    }
}

/// Read up to and including the blank line ending the response head
async fn read_response_head<S>(stream: &mut S) -> Result<Vec<u8>, TunnelError>
where
    S: AsyncBufRead + Unpin,
{
    let mut head = Vec::with_capacity(256);

    loop {
        let remaining = (MAX_RESPONSE_HEAD - head.len()) as u64;
        let n = (&mut *stream)
            .take(remaining)
            .read_until(b'\n', &mut head)
            .await?;

        if head.ends_with(b"\r\n\r\n") || head.ends_with(b"\n\n") {
            return Ok(head);
        }
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(TunnelError::ResponseTooLarge(MAX_RESPONSE_HEAD));
        }
        if n == 0 {
            return Err(TunnelError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "upstream closed before completing the response head",
            )));
        }
    }
}
