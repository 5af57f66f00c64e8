//! Protocol Latency Tester
//!
//! Measures IPv4 and IPv6 latency to a target over TCP, UDP, ICMP, HTTP and
//! DNS (UDP, TCP, DNS-over-TLS, DNS-over-HTTPS), and compares the two
//! address families of a dual-stack hostname.

pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod stats;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{ConsoleReporter, LatencyTester, NullReporter, PhaseConfig, Reporter};
pub use models::{ComparisonResult, Config, ProbeResult, Statistics, TestConfig, TestResult};
pub use output::{ColoredFormatter, JsonFormatter, OutputCoordinator, OutputFormatter, PlainFormatter};
pub use stats::StatisticsEngine;
pub use types::{DnsProtocol, IpFamily, ProbeKind, TestMode};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TARGET_IPV4: &str = "8.8.8.8";
    pub const DEFAULT_TARGET_IPV6: &str = "2001:4860:4860::8888";
    pub const DEFAULT_PORT: u16 = 53;
    pub const DEFAULT_COUNT: u32 = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_ICMP_SIZE: usize = 64;
    pub const DEFAULT_DNS_QUERY: &str = "dns-query.qosbox.com";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// ICMP receive buffer, one Ethernet MTU
    pub const RECV_BUFFER_SIZE: usize = 1500;
    /// Classic DNS-over-UDP message limit
    pub const UDP_DNS_BUFFER_SIZE: usize = 512;
    pub const MAX_TCP_DNS_RESPONSE: usize = 4096;

    /// How long the UDP probe waits for an (optional) echo
    pub const UDP_READ_WINDOW: Duration = Duration::from_millis(100);
    pub const UDP_PROBE_PAYLOAD: &[u8] = b"test";
}
