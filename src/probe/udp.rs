use super::Probe;
use crate::{
    client::unspecified_addr,
    defaults::{UDP_PROBE_PAYLOAD, UDP_READ_WINDOW},
    error::{AppError, Result},
    executor::{PhaseConfig, Reporter},
    types::ProbeKind,
};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time;

/// Time to send a small datagram and wait briefly for a reply.
///
/// UDP has no connection signal, so a successful write counts as success.
/// The timer covers a bounded read after the write: a reply (or an ICMP
/// port-unreachable) ends it early, silence ends it at `UDP_READ_WINDOW`.
pub struct UdpProbe;

pub async fn send_latency(addr: SocketAddr, timeout: Duration) -> Result<Duration> {
    let started = Instant::now();

    let local = SocketAddr::new(unspecified_addr(crate::types::IpFamily::of(&addr.ip())), 0);
    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| AppError::from_io("bind UDP socket", e))?;
    socket
        .connect(addr)
        .await
        .map_err(|e| AppError::from_io(&format!("connect UDP socket to {}", addr), e))?;

    match time::timeout(timeout, socket.send(UDP_PROBE_PAYLOAD)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(AppError::from_io(&format!("send to {}", addr), e)),
        Err(_) => return Err(AppError::timeout(format!("send to {} timed out after {:?}", addr, timeout))),
    }

    let mut buf = [0u8; 1024];
    // Reply, refusal and silence all still count as success
    let _ = time::timeout(UDP_READ_WINDOW, socket.recv(&mut buf)).await;

    Ok(started.elapsed())
}

#[async_trait]
impl Probe for UdpProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Udp
    }

    async fn probe(&self, phase: &PhaseConfig, _seq: u32, _reporter: &dyn Reporter) -> Result<Duration> {
        send_latency(phase.socket_addr(), phase.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_succeeds_without_reply() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let latency = send_latency(addr, Duration::from_secs(1)).await.unwrap();
        assert!(latency < Duration::from_secs(1));

        let mut buf = [0u8; 16];
        let (n, _) = silent.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], UDP_PROBE_PAYLOAD);
    }

    #[tokio::test]
    async fn test_silent_peer_waits_out_read_window() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();
        let latency = send_latency(addr, Duration::from_secs(1)).await.unwrap();
        assert!(latency >= UDP_READ_WINDOW);
    }

    #[tokio::test]
    async fn test_latency_includes_reply() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            if let Ok((n, peer)) = server.recv_from(&mut buf).await {
                tokio::time::sleep(Duration::from_millis(40)).await;
                let _ = server.send_to(&buf[..n], peer).await;
            }
        });

        let latency = send_latency(addr, Duration::from_secs(1)).await.unwrap();
        assert!(latency >= Duration::from_millis(40), "latency {:?}", latency);
        assert!(latency < UDP_READ_WINDOW);
    }
}
