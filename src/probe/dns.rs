use super::Probe;
use crate::{
    client::probe_client,
    codec::dns::{build_query, validate_response},
    dns::exchange::{doh_exchange, doh_url, dot_exchange, tcp_exchange, udp_exchange},
    error::Result,
    executor::{PhaseConfig, Reporter},
    types::{DnsProtocol, ProbeKind},
};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// One A-record query/response transaction over the configured DNS transport
pub struct DnsProbe;

/// Send a fresh query for `phase.dns_query` and validate the reply's ID.
/// The returned latency covers connection setup and the full exchange.
pub async fn query_latency(phase: &PhaseConfig) -> Result<Duration> {
    let (query, id) = build_query(&phase.dns_query)?;
    let server = phase.socket_addr();

    let started = Instant::now();
    let response = match phase.dns_protocol {
        DnsProtocol::Udp => udp_exchange(server, &query, phase.timeout).await?,
        DnsProtocol::Tcp => tcp_exchange(server, &query, phase.timeout).await?,
        DnsProtocol::Dot => dot_exchange(server, &query, phase.timeout).await?,
        DnsProtocol::Doh => {
            let client = probe_client(phase.family, phase.timeout)?;
            doh_exchange(&client, doh_url(&phase.target, phase.port)?, query).await?
        }
    };
    let latency = started.elapsed();

    validate_response(&response, id)?;
    Ok(latency)
}

#[async_trait]
impl Probe for DnsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Dns
    }

    async fn probe(&self, phase: &PhaseConfig, _seq: u32, _reporter: &dyn Reporter) -> Result<Duration> {
        query_latency(phase).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestConfig;
    use tokio::net::UdpSocket;

    fn phase_for(addr: std::net::SocketAddr) -> PhaseConfig {
        let mut config = TestConfig::default();
        config.port = addr.port();
        config.timeout = Duration::from_secs(2);
        PhaseConfig::for_target(ProbeKind::Dns, addr.ip(), &config)
    }

    #[tokio::test]
    async fn test_udp_query_with_matching_id() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            // Flip QR to make it look like a response
            buf[2] |= 0x80;
            server.send_to(&buf[..n], peer).await.unwrap();
        });

        assert!(query_latency(&phase_for(addr)).await.is_ok());
    }

    #[tokio::test]
    async fn test_udp_query_short_response() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..5], peer).await.unwrap();
        });

        let err = query_latency(&phase_for(addr)).await.unwrap_err();
        assert_eq!(err.category(), "PROTOCOL");
        assert!(err.to_string().contains("DNS response too short: 5 bytes"));
    }

    #[tokio::test]
    async fn test_invalid_query_name_fails_before_sending() {
        let mut config = TestConfig::default();
        config.dns_query = format!("{}.example", "a".repeat(64));
        let phase = PhaseConfig::for_target(ProbeKind::Dns, "127.0.0.1".parse().unwrap(), &config);
        let err = query_latency(&phase).await.unwrap_err();
        assert!(err.to_string().contains("domain label too long"));
    }
}
