//! Type definitions shared across probes, configuration and output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Address family a probe runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Display label used in reports ("IPv4"/"IPv6")
    pub fn label(&self) -> &'static str {
        match self {
            Self::V4 => "IPv4",
            Self::V6 => "IPv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wire protocol used by a latency probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Tcp,
    Udp,
    Icmp,
    Http,
    Dns,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Http => "HTTP",
            Self::Dns => "DNS",
        }
    }

    /// Port used when the caller did not pick one explicitly
    pub fn default_port(&self, dns_protocol: DnsProtocol) -> u16 {
        match self {
            Self::Http => 80,
            Self::Dns => dns_protocol.default_port(),
            Self::Tcp | Self::Udp | Self::Icmp => crate::defaults::DEFAULT_PORT,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport used by the DNS probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsProtocol {
    #[default]
    Udp,
    Tcp,
    Dot,
    Doh,
}

impl DnsProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Dot => "dot",
            Self::Doh => "doh",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Udp | Self::Tcp => 53,
            Self::Dot => 853,
            Self::Doh => 443,
        }
    }

    /// Protocol label used in JSON output, e.g. "DNS-UDP"
    pub fn report_label(&self) -> String {
        format!("DNS-{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for DnsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsProtocol {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "dot" => Ok(Self::Dot),
            "doh" => Ok(Self::Doh),
            _ => Err(AppError::config(format!(
                "invalid DNS protocol: {} (must be udp, tcp, dot, or doh)",
                s
            ))),
        }
    }
}

/// Whether a run probes fixed targets or compares a hostname's two families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    Single,
    Compare,
}

/// Latency classification used to color report lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    /// Under 50 ms
    Good,
    /// 50 to 150 ms
    Moderate,
    /// Over 150 ms
    Poor,
}

impl PerformanceLevel {
    pub fn from_latency(latency: Duration) -> Self {
        let ms = latency.as_secs_f64() * 1000.0;
        if ms < 50.0 {
            Self::Good
        } else if ms < 150.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_protocol_parsing() {
        assert_eq!("udp".parse::<DnsProtocol>().unwrap(), DnsProtocol::Udp);
        assert_eq!("DoT".parse::<DnsProtocol>().unwrap(), DnsProtocol::Dot);
        assert_eq!("doh".parse::<DnsProtocol>().unwrap(), DnsProtocol::Doh);

        let err = "quic".parse::<DnsProtocol>().unwrap_err();
        assert!(err.to_string().contains("invalid DNS protocol: quic"));
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(ProbeKind::Http.default_port(DnsProtocol::Udp), 80);
        assert_eq!(ProbeKind::Dns.default_port(DnsProtocol::Udp), 53);
        assert_eq!(ProbeKind::Dns.default_port(DnsProtocol::Dot), 853);
        assert_eq!(ProbeKind::Dns.default_port(DnsProtocol::Doh), 443);
        assert_eq!(ProbeKind::Tcp.default_port(DnsProtocol::Doh), 53);
    }

    #[test]
    fn test_family_of_address() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(IpFamily::of(&v4), IpFamily::V4);
        assert_eq!(IpFamily::of(&v6).label(), "IPv6");
    }

    #[test]
    fn test_report_labels() {
        assert_eq!(DnsProtocol::Doh.report_label(), "DNS-DOH");
        assert_eq!(ProbeKind::Icmp.to_string(), "ICMP");
        assert_eq!(serde_json::to_string(&TestMode::Compare).unwrap(), "\"compare\"");
    }

    #[test]
    fn test_performance_levels() {
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(10)), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(80)), PerformanceLevel::Moderate);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(400)), PerformanceLevel::Poor);
    }
}
