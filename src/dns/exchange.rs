//! DNS query/response exchanges over UDP, TCP, TLS and HTTPS.
//!
//! Each function sends an already-encoded query and returns the raw
//! response bytes. Framing differs per transport; validation of the
//! response header is left to the caller.

use super::tls::insecure_connector;
use crate::client::{probe_url, unspecified_addr};
use crate::codec::dns::{frame_stream_query, stream_response_len};
use crate::error::{AppError, Result};
use crate::types::IpFamily;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use rustls::pki_types::ServerName;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time;

pub const DNS_MESSAGE_MIME: &str = "application/dns-message";

/// Run `fut` with a deadline, mapping I/O failures through `AppError::from_io`
async fn with_timeout<T>(
    timeout: Duration,
    operation: &str,
    fut: impl std::future::Future<Output = std::io::Result<T>>,
) -> Result<T> {
    match time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AppError::from_io(operation, e)),
        Err(_) => Err(AppError::timeout(format!("{} timed out after {:?}", operation, timeout))),
    }
}

/// Plain DNS over UDP: one datagram out, one datagram (up to 512 bytes) in
pub async fn udp_exchange(server: SocketAddr, query: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    let local = SocketAddr::new(unspecified_addr(IpFamily::of(&server.ip())), 0);
    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| AppError::from_io("bind UDP socket", e))?;
    socket
        .connect(server)
        .await
        .map_err(|e| AppError::from_io(&format!("connect UDP socket to {}", server), e))?;

    with_timeout(timeout, "send DNS query", socket.send(query)).await?;

    let mut buf = vec![0u8; crate::defaults::UDP_DNS_BUFFER_SIZE];
    let n = with_timeout(timeout, "read DNS response", socket.recv(&mut buf)).await?;
    buf.truncate(n);
    Ok(buf)
}

/// Length-prefixed exchange over an established stream (TCP or TLS)
pub async fn stream_exchange<S>(stream: &mut S, query: &[u8], timeout: Duration) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let framed = frame_stream_query(query)?;
    with_timeout(timeout, "send DNS query", stream.write_all(&framed)).await?;
    with_timeout(timeout, "flush DNS query", stream.flush()).await?;

    let mut prefix = [0u8; 2];
    with_timeout(timeout, "read DNS response length", stream.read_exact(&mut prefix)).await?;
    let len = stream_response_len(prefix)?;

    let mut response = vec![0u8; len];
    with_timeout(timeout, "read DNS response", stream.read_exact(&mut response)).await?;
    Ok(response)
}

async fn connect_tcp(server: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    with_timeout(timeout, &format!("connect to {}", server), TcpStream::connect(server)).await
}

/// DNS over TCP (RFC 1035 section 4.2.2 framing)
pub async fn tcp_exchange(server: SocketAddr, query: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    let mut stream = connect_tcp(server, timeout).await?;
    stream_exchange(&mut stream, query, timeout).await
}

/// DNS over TLS. The server name sent in SNI is the target address itself.
pub async fn dot_exchange(server: SocketAddr, query: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    let connector = insecure_connector()?;
    let tcp = connect_tcp(server, timeout).await?;
    let server_name = ServerName::from(server.ip());
    let mut tls = with_timeout(timeout, "TLS handshake", connector.connect(server_name, tcp)).await?;
    stream_exchange(&mut tls, query, timeout).await
}

/// `https://<ip>:<port>/dns-query`
pub fn doh_url(ip: &IpAddr, port: u16) -> Result<Url> {
    probe_url("https", ip, port, "/dns-query")
}

/// DNS over HTTPS: POST the raw query and return the body of a 200 reply
pub async fn doh_exchange(client: &Client, url: Url, query: Vec<u8>) -> Result<Vec<u8>> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, DNS_MESSAGE_MIME)
        .header(ACCEPT, DNS_MESSAGE_MIME)
        .body(query)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AppError::http_request(format!("HTTP status {}: {}", status.as_u16(), status)));
    }

    let body = response.bytes().await?;
    Ok(body.to_vec())
}
