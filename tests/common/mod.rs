//! Test utilities and mocks for Socksbridge
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksbridge::config::{ReplyOrdering, ServerConfig};
use socksbridge::server::Server;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

/// Upper bound for any single step of an integration test
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A fake HTTP CONNECT proxy
///
/// Records every CONNECT request target, answers with a fixed status and,
/// when the status is 200, echoes every byte back through the tunnel.
pub struct MockUpstream {
    /// Address the mock listens on
    pub addr: SocketAddr,
    /// Raw request heads, one per accepted connection
    pub requests: mpsc::UnboundedReceiver<String>,
}

impl MockUpstream {
    /// Start a mock proxy answering `status` to every CONNECT
    pub async fn start(status: u16) -> Self {
        let (listener, addr) = create_test_listener().await;
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut stream = BufReader::new(stream);
                    let mut head = String::new();
                    loop {
                        let mut line = String::new();
                        match stream.read_line(&mut line).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        head.push_str(&line);
                        if line == "\r\n" {
                            break;
                        }
                    }
                    let _ = tx.send(head);

                    let response = format!("HTTP/1.1 {} {}\r\n\r\n", status, reason(status));
                    if stream.get_mut().write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                    if status != 200 {
                        return;
                    }

                    let (mut reader, mut writer) = tokio::io::split(stream);
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                });
            }
        });

        MockUpstream { addr, requests }
    }

    /// Wait for the next CONNECT request and return its request target
    pub async fn next_target(&mut self) -> String {
        let head = tokio::time::timeout(STEP_TIMEOUT, self.requests.recv())
            .await
            .expect("timed out waiting for CONNECT")
            .expect("mock upstream stopped");
        connect_target(&head).to_string()
    }
}

/// Extract the request target from a CONNECT request head
pub fn connect_target(head: &str) -> &str {
    head.lines()
        .next()
        .and_then(|line| line.strip_prefix("CONNECT "))
        .and_then(|rest| rest.split(' ').next())
        .unwrap_or("")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "Connection established",
        403 => "Forbidden",
        407 => "Proxy Authentication Required",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// A running bridge server
pub struct TestBridge {
    /// SOCKS listen address
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl TestBridge {
    /// Start a bridge in front of `upstream`
    pub async fn start(upstream: SocketAddr, ordering: ReplyOrdering) -> Self {
        let mut config = ServerConfig::new("127.0.0.1:0", upstream.to_string());
        config.reply_ordering = ordering;
        config.connect_timeout = 2;

        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(server.run(shutdown_rx));

        TestBridge { addr, shutdown_tx }
    }

    /// Open a client connection to the bridge
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.unwrap()
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Read exactly `n` bytes with a timeout
pub async fn read_n(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(STEP_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("timed out reading")
        .expect("read failed");
    buf
}

/// Read until the peer closes, tolerating a reset
pub async fn read_until_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let _ = tokio::time::timeout(STEP_TIMEOUT, stream.read_to_end(&mut received))
        .await
        .expect("connection was not closed");
    received
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use socksbridge::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a password-only method selection request
    pub fn create_auth_request_password() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_PASSWORD]
    }

    /// Create a request for `cmd` to an IPv4 address
    pub fn create_request_ipv4(cmd: u8, ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut request = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED, SOCKS5_ADDR_TYPE_IPV4];
        request.extend_from_slice(&ip);
        request.extend_from_slice(&port.to_be_bytes());
        request
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        create_request_ipv4(SOCKS_CMD_TCP_CONNECT, ip, port)
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut request = vec![
            SOCKS5_VERSION,
            SOCKS_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        request.extend_from_slice(domain.as_bytes());
        request.extend_from_slice(&port.to_be_bytes());
        request
    }

    /// Create a connect command to IPv6 address
    pub fn create_connect_ipv6(ip: [u8; 16], port: u16) -> Vec<u8> {
        let mut request = vec![
            SOCKS5_VERSION,
            SOCKS_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV6,
        ];
        request.extend_from_slice(&ip);
        request.extend_from_slice(&port.to_be_bytes());
        request
    }
}

/// Mock SOCKS4a request data
pub mod socks4_mock {
    use socksbridge::socks::*;

    /// Create a SOCKS4a request with a hostname destination
    pub fn create_connect_domain(user_id: &[u8], domain: &str, port: u16) -> Vec<u8> {
        let mut request = vec![SOCKS4_VERSION, SOCKS_CMD_TCP_CONNECT];
        request.extend_from_slice(&port.to_be_bytes());
        request.extend_from_slice(&[0, 0, 0, 1]);
        request.extend_from_slice(user_id);
        request.push(0);
        request.extend_from_slice(domain.as_bytes());
        request.push(0);
        request
    }

    /// Create a SOCKS4 request for `cmd` with a literal IPv4 destination
    pub fn create_request_ipv4(cmd: u8, ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut request = vec![SOCKS4_VERSION, cmd];
        request.extend_from_slice(&port.to_be_bytes());
        request.extend_from_slice(&ip);
        request.push(0);
        request
    }
}
