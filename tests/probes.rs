//! Probe and tester integration tests against local servers
//!
//! DNS servers are small tokio tasks; HTTP and DoH endpoints are wiremock
//! servers. Nothing here leaves the loopback interface.

use prototester::{
    codec::dns::{build_query, validate_response},
    dns::{
        exchange::{doh_exchange, dot_exchange},
        StaticResolver,
    },
    executor::{LatencyTester, NullReporter},
    logging::{LogSettings, LoggerFactory},
    transport::system_transport,
    types::{DnsProtocol, IpFamily, ProbeKind, TestMode},
    TestConfig,
};
use reqwest::{Client, Url};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio_rustls::TlsAcceptor;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tester(resolver: StaticResolver) -> LatencyTester {
    LatencyTester::new(
        Arc::new(resolver),
        system_transport(),
        Arc::new(NullReporter),
        LoggerFactory::with_settings(LogSettings::default()),
    )
}

/// IPv4-only single-mode config against 127.0.0.1
fn loopback_config(port: u16, count: u32) -> TestConfig {
    TestConfig {
        target4: "127.0.0.1".to_string(),
        port,
        count,
        interval: Duration::ZERO,
        timeout: Duration::from_millis(500),
        ipv4_only: true,
        ..TestConfig::default()
    }
}

/// Answer every UDP datagram with the same bytes, optionally corrupting the id
async fn spawn_udp_dns(corrupt_id: bool) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            let mut reply = buf[..n].to_vec();
            reply[2] |= 0x80;
            if corrupt_id {
                reply[0] ^= 0xff;
            }
            let _ = socket.send_to(&reply, peer).await;
        }
    });
    addr
}

/// Length-prefixed echo server for DNS over TCP
async fn spawn_tcp_dns() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut prefix = [0u8; 2];
                if stream.read_exact(&mut prefix).await.is_err() {
                    return;
                }
                let mut query = vec![0u8; u16::from_be_bytes(prefix) as usize];
                if stream.read_exact(&mut query).await.is_err() {
                    return;
                }
                query[2] |= 0x80;
                let _ = stream.write_all(&prefix).await;
                let _ = stream.write_all(&query).await;
            });
        }
    });
    addr
}

/// DNS over TLS with a throwaway self-signed certificate
async fn spawn_dot_dns() -> SocketAddr {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.signing_key.serialize_der()));
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.cert.der().clone()], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut stream) = acceptor.accept(tcp).await else {
                    return;
                };
                let mut prefix = [0u8; 2];
                if stream.read_exact(&mut prefix).await.is_err() {
                    return;
                }
                let mut query = vec![0u8; u16::from_be_bytes(prefix) as usize];
                if stream.read_exact(&mut query).await.is_err() {
                    return;
                }
                query[2] |= 0x80;
                let _ = stream.write_all(&prefix).await;
                let _ = stream.write_all(&query).await;
                let _ = stream.flush().await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn test_closed_tcp_port_counts_every_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let tester = tester(StaticResolver::new());

    let result = tester.run(ProbeKind::Tcp, &loopback_config(port, 10)).await.unwrap();

    let v4 = result.ipv4_results.as_ref().unwrap();
    assert_eq!((v4.sent, v4.received, v4.lost), (10, 0, 10));
    assert_eq!(v4.success_rate, 0.0);
    assert_eq!(v4.avg, Duration::ZERO);
    assert!(result.all_probes_failed());

    let probes = tester.results(IpFamily::V4).await;
    assert_eq!(probes.len(), 10);
    assert!(probes.iter().all(|p| !p.success && p.error.is_some()));
}

#[tokio::test]
async fn test_udp_dns_query_succeeds() {
    let server = spawn_udp_dns(false).await;
    let tester = tester(StaticResolver::new());
    let config = TestConfig {
        dns_protocol: DnsProtocol::Udp,
        ..loopback_config(server.port(), 3)
    };

    let result = tester.run(ProbeKind::Dns, &config).await.unwrap();

    assert_eq!(result.protocol, "DNS-UDP");
    let v4 = result.ipv4_results.unwrap();
    assert_eq!((v4.sent, v4.received), (3, 3));
    assert!(v4.min <= v4.avg && v4.avg <= v4.max);
}

#[tokio::test]
async fn test_dns_id_mismatch_is_protocol_failure() {
    let server = spawn_udp_dns(true).await;
    let tester = tester(StaticResolver::new());
    let config = loopback_config(server.port(), 2);

    let result = tester.run(ProbeKind::Dns, &config).await.unwrap();

    assert_eq!(result.ipv4_results.unwrap().received, 0);
    let probes = tester.results(IpFamily::V4).await;
    assert_eq!(probes.len(), 2);
    for probe in probes {
        assert_eq!(probe.error_category.as_deref(), Some("PROTOCOL"));
        assert!(probe.error.unwrap().contains("ID mismatch"));
    }
}

#[tokio::test]
async fn test_tcp_dns_framing() {
    let server = spawn_tcp_dns().await;
    let tester = tester(StaticResolver::new());
    let config = TestConfig {
        dns_protocol: DnsProtocol::Tcp,
        ..loopback_config(server.port(), 2)
    };

    let result = tester.run(ProbeKind::Dns, &config).await.unwrap();

    assert_eq!(result.protocol, "DNS-TCP");
    assert_eq!(result.ipv4_results.unwrap().received, 2);
}

#[tokio::test]
async fn test_dot_query_over_tls() {
    let server = spawn_dot_dns().await;
    let tester = tester(StaticResolver::new());
    let config = TestConfig {
        dns_protocol: DnsProtocol::Dot,
        timeout: Duration::from_secs(2),
        ..loopback_config(server.port(), 2)
    };

    let result = tester.run(ProbeKind::Dns, &config).await.unwrap();

    assert_eq!(result.protocol, "DNS-DOT");
    let v4 = result.ipv4_results.unwrap();
    assert_eq!((v4.sent, v4.received), (2, 2));
}

#[tokio::test]
async fn test_dot_exchange_against_plain_tcp_fails() {
    // Plain DNS-over-TCP server: the TLS handshake cannot complete
    let server = spawn_tcp_dns().await;
    let (query, _) = build_query("example.com").unwrap();

    let result = dot_exchange(server, &query, Duration::from_millis(500)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_udp_latency_covers_reply() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            tokio::time::sleep(Duration::from_millis(40)).await;
            let _ = socket.send_to(&buf[..n], peer).await;
        }
    });
    let tester = tester(StaticResolver::new());

    let result = tester.run(ProbeKind::Udp, &loopback_config(addr.port(), 2)).await.unwrap();

    let v4 = result.ipv4_results.unwrap();
    assert_eq!(v4.received, 2);
    assert!(v4.min >= Duration::from_millis(40), "min {:?}", v4.min);
    assert!(v4.max < Duration::from_millis(100), "max {:?}", v4.max);
}

#[tokio::test]
async fn test_doh_exchange_posts_wire_format() {
    let server = MockServer::start().await;
    let (query, id) = build_query("dns-query.qosbox.com").unwrap();

    let mut answer = query.clone();
    answer[2] |= 0x80;
    Mock::given(method("POST"))
        .and(path("/dns-query"))
        .and(header("content-type", "application/dns-message"))
        .and(header("accept", "application/dns-message"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(answer.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/dns-query", server.uri())).unwrap();
    let response = doh_exchange(&Client::new(), url, query).await.unwrap();

    assert_eq!(response, answer);
    assert!(validate_response(&response, id).is_ok());
}

#[tokio::test]
async fn test_doh_non_200_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (query, _) = build_query("example.com").unwrap();
    let url = Url::parse(&format!("{}/dns-query", server.uri())).unwrap();
    let err = doh_exchange(&Client::new(), url, query).await.unwrap_err();

    assert_eq!(err.category(), "HTTP");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_http_probe_any_status_counts() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let port = server.address().port();
    let tester = tester(StaticResolver::new());

    let result = tester.run(ProbeKind::Http, &loopback_config(port, 2)).await.unwrap();

    assert_eq!(result.protocol, "HTTP");
    let v4 = result.ipv4_results.unwrap();
    assert_eq!((v4.sent, v4.received), (2, 2));
}

#[tokio::test]
async fn test_compare_fails_fast_without_aaaa() {
    let resolver = StaticResolver::new().with_host("v4only.test", vec!["127.0.0.1".parse().unwrap()]);
    let tester = tester(resolver);
    let config = TestConfig {
        hostname: Some("v4only.test".to_string()),
        timeout: Duration::from_millis(200),
        ..TestConfig::default()
    };

    let started = std::time::Instant::now();
    let err = tester.run(ProbeKind::Http, &config).await.unwrap_err();

    assert_eq!(err.category(), "DNS");
    assert_eq!(err.exit_code(), 2);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(tester.results(IpFamily::V4).await.is_empty());
}

#[tokio::test]
async fn test_compare_dns_over_loopback() {
    // Needs IPv6 loopback; skip where the host has none
    let Ok(socket6) = UdpSocket::bind("[::1]:0").await else {
        return;
    };
    let port = socket6.local_addr().unwrap().port();
    let Ok(socket4) = UdpSocket::bind(("127.0.0.1", port)).await else {
        return;
    };

    for socket in [socket4, socket6] {
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
                let _ = socket.send_to(&buf[..n], peer).await;
            }
        });
    }

    let resolver = StaticResolver::new().with_host(
        "dual.test",
        vec!["::1".parse().unwrap(), "127.0.0.1".parse().unwrap()],
    );
    let tester = tester(resolver);
    let config = TestConfig {
        hostname: Some("dual.test".to_string()),
        port,
        count: 2,
        interval: Duration::ZERO,
        timeout: Duration::from_millis(500),
        ..TestConfig::default()
    };

    let result = tester.run(ProbeKind::Dns, &config).await.unwrap();

    assert_eq!(result.mode, TestMode::Compare);
    let comparison = result.comparison.unwrap();
    assert_eq!(comparison.protocol, "DNS-UDP");
    assert_eq!(comparison.dns_query.as_deref(), Some("dns-query.qosbox.com"));
    let pair = comparison.dns.unwrap();
    assert_eq!(pair.ipv4.received, 2);
    assert_eq!(pair.ipv6.received, 2);
    assert!(comparison.tcp.is_none() && comparison.udp.is_none());
}
