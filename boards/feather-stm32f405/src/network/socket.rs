#![deny(unsafe_code)]
#![deny(warnings)]
//! TCP transport for embedded-tls
//!
//! `embedded-tls` drives its transport through the `embedded-io-async`
//! traits; `embassy_net::tcp::TcpSocket` speaks its own error type. This
//! wrapper bridges the two and funnels every socket failure into
//! `NetworkError::SocketError`.

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use embedded_io_async::{ErrorType, Read, Write};

use super::error::NetworkError;

/// Resolve `host` to its first IPv4 address
pub async fn resolve(
    stack: &Stack<'static>,
    host: &str,
    port: u16,
) -> Result<IpEndpoint, NetworkError> {
    let addr = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|_| NetworkError::DnsError)?
        .first()
        .copied()
        .ok_or(NetworkError::DnsError)?;
    Ok(IpEndpoint::new(addr, port))
}

pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> AsyncTcpSocket<'a> {
    /// Create a socket over caller-owned buffers (4 KB each is plenty for
    /// QoS 0 telemetry)
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
        }
    }

    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), NetworkError> {
        self.socket
            .connect(endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl ErrorType for AsyncTcpSocket<'_> {
    type Error = NetworkError;
}

impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}
