//! Configuration data model and validation

use crate::codec::dns::validate_domain;
use crate::types::{AppError, DnsProtocol, ProbeKind, Result, TestMode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable input to the probe engine.
///
/// Built once by the configuration layer and never mutated by the tester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// IPv4 literal (or hostname for ICMP)
    #[serde(rename = "target_ipv4", default = "default_target4")]
    pub target4: String,

    /// IPv6 literal (or hostname for ICMP)
    #[serde(rename = "target_ipv6", default = "default_target6")]
    pub target6: String,

    /// Hostname to resolve in comparison mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Probes per family
    #[serde(default = "default_count")]
    pub count: u32,

    /// Pause between consecutive probes of one family
    #[serde(rename = "interval_ms", with = "super::duration_ms", default = "default_interval")]
    pub interval: Duration,

    /// Per-probe timeout
    #[serde(rename = "timeout_ms", with = "super::duration_ms", default = "default_timeout")]
    pub timeout: Duration,

    /// ICMP payload size in bytes
    #[serde(rename = "size", default = "default_icmp_size")]
    pub icmp_size: usize,

    #[serde(default)]
    pub dns_protocol: DnsProtocol,

    #[serde(default = "default_dns_query")]
    pub dns_query: String,

    #[serde(default)]
    pub ipv4_only: bool,

    #[serde(default)]
    pub ipv6_only: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            target4: default_target4(),
            target6: default_target6(),
            hostname: None,
            port: default_port(),
            count: default_count(),
            interval: default_interval(),
            timeout: default_timeout(),
            icmp_size: default_icmp_size(),
            dns_protocol: DnsProtocol::default(),
            dns_query: default_dns_query(),
            ipv4_only: false,
            ipv6_only: false,
        }
    }
}

impl TestConfig {
    pub fn mode(&self) -> TestMode {
        if self.hostname.is_some() {
            TestMode::Compare
        } else {
            TestMode::Single
        }
    }

    /// Whether the IPv4 family takes part in a single-mode run
    pub fn tests_ipv4(&self) -> bool {
        !self.ipv6_only
    }

    /// Whether the IPv6 family takes part in a single-mode run
    pub fn tests_ipv6(&self) -> bool {
        !self.ipv4_only
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::config("Port must be between 1 and 65535"));
        }

        if self.count == 0 {
            return Err(AppError::config("Count must be at least 1"));
        }

        if self.timeout.is_zero() {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.ipv4_only && self.ipv6_only {
            return Err(AppError::config("Cannot specify both IPv4-only and IPv6-only"));
        }

        validate_domain(&self.dns_query)
            .map_err(|e| AppError::config(format!("Invalid DNS query '{}': {}", self.dns_query, e)))?;

        match &self.hostname {
            Some(hostname) if hostname.trim().is_empty() => {
                return Err(AppError::config("Comparison mode requires a hostname"));
            }
            Some(_) => {}
            None => {
                if self.tests_ipv4() {
                    check_target(&self.target4, "IPv4", |ip| ip.is_ipv4())?;
                }
                if self.tests_ipv6() {
                    check_target(&self.target6, "IPv6", |ip| ip.is_ipv6())?;
                }
            }
        }

        Ok(())
    }
}

fn check_target(target: &str, family: &str, matches_family: impl Fn(&IpAddr) -> bool) -> Result<()> {
    if target.trim().is_empty() {
        return Err(AppError::config(format!("{} target cannot be empty", family)));
    }
    // Hostnames are allowed for ICMP; literals must belong to the right family
    if let Ok(ip) = target.parse::<IpAddr>() {
        if !matches_family(&ip) {
            return Err(AppError::config(format!("{} target '{}' is not an {} address", family, target, family)));
        }
    }
    Ok(())
}

/// Main application configuration: the engine input plus presentation flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub test: TestConfig,

    #[serde(default = "default_probe")]
    pub probe: ProbeKind,

    /// Set when the port came from the CLI or environment
    #[serde(skip)]
    pub port_explicit: bool,

    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub json_output: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test: TestConfig::default(),
            probe: default_probe(),
            port_explicit: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            json_output: false,
            output_file: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.test.validate()?;

        if self.test.mode() == TestMode::Compare && (self.test.ipv4_only || self.test.ipv6_only) {
            return Err(AppError::config("Comparison mode tests both families; drop --ipv4-only/--ipv6-only"));
        }

        Ok(())
    }

    /// Use the protocol's conventional port unless one was given explicitly
    pub fn apply_port_default(&mut self) {
        if !self.port_explicit {
            self.test.port = self.probe.default_port(self.test.dns_protocol);
        }
    }

    /// A custom target for one family with the other left at its default
    /// means the caller only cares about that one family.
    pub fn apply_family_defaults(&mut self) {
        if self.test.mode() == TestMode::Compare || self.test.ipv4_only || self.test.ipv6_only {
            return;
        }
        let custom4 = self.test.target4 != crate::defaults::DEFAULT_TARGET_IPV4;
        let custom6 = self.test.target6 != crate::defaults::DEFAULT_TARGET_IPV6;
        if custom4 && !custom6 {
            self.test.ipv4_only = true;
        } else if custom6 && !custom4 {
            self.test.ipv6_only = true;
        }
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(target) = std::env::var("PROTOTESTER_TARGET_IPV4") {
            self.test.target4 = target.trim().to_string();
        }

        if let Ok(target) = std::env::var("PROTOTESTER_TARGET_IPV6") {
            self.test.target6 = target.trim().to_string();
        }

        if let Ok(port) = std::env::var("PROTOTESTER_PORT") {
            self.test.port = port.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_PORT value '{}': {}", port, e)))?;
            self.port_explicit = true;
        }

        if let Ok(count) = std::env::var("PROTOTESTER_COUNT") {
            self.test.count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(interval) = std::env::var("PROTOTESTER_INTERVAL_MS") {
            let millis: u64 = interval.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_INTERVAL_MS value '{}': {}", interval, e)))?;
            self.test.interval = Duration::from_millis(millis);
        }

        if let Ok(timeout) = std::env::var("PROTOTESTER_TIMEOUT_MS") {
            let millis: u64 = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_TIMEOUT_MS value '{}': {}", timeout, e)))?;
            self.test.timeout = Duration::from_millis(millis);
        }

        if let Ok(size) = std::env::var("PROTOTESTER_ICMP_SIZE") {
            self.test.icmp_size = size.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_ICMP_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(protocol) = std::env::var("PROTOTESTER_DNS_PROTOCOL") {
            self.test.dns_protocol = protocol.parse()?;
        }

        if let Ok(query) = std::env::var("PROTOTESTER_DNS_QUERY") {
            self.test.dns_query = query.trim().to_string();
        }

        if let Ok(enable_color) = std::env::var("PROTOTESTER_ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_target4() -> String {
    crate::defaults::DEFAULT_TARGET_IPV4.to_string()
}

fn default_target6() -> String {
    crate::defaults::DEFAULT_TARGET_IPV6.to_string()
}

fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_count() -> u32 {
    crate::defaults::DEFAULT_COUNT
}

fn default_interval() -> Duration {
    crate::defaults::DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    crate::defaults::DEFAULT_TIMEOUT
}

fn default_icmp_size() -> usize {
    crate::defaults::DEFAULT_ICMP_SIZE
}

fn default_dns_query() -> String {
    crate::defaults::DEFAULT_DNS_QUERY.to_string()
}

fn default_probe() -> ProbeKind {
    ProbeKind::Tcp
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.test.mode(), TestMode::Single);
        assert_eq!(config.test.port, 53);
        assert_eq!(config.test.count, 10);
        assert_eq!(config.test.icmp_size, 64);
    }

    #[test]
    fn test_zero_count_invalid() {
        let mut config = Config::default();
        config.test.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port_and_timeout_invalid() {
        let mut config = Config::default();
        config.test.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.test.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_both_family_restrictions_invalid() {
        let mut config = Config::default();
        config.test.ipv4_only = true;
        config.test.ipv6_only = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("both IPv4-only and IPv6-only"));
    }

    #[test]
    fn test_long_dns_label_invalid() {
        let mut config = Config::default();
        config.test.dns_query = format!("{}.example.com", "a".repeat(64));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("domain label too long"));
    }

    #[test]
    fn test_wrong_family_literal_invalid() {
        let mut config = Config::default();
        config.test.target4 = "2001:db8::1".to_string();
        assert!(config.validate().is_err());

        // Only the families under test are checked
        config.test.ipv6_only = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_comparison_mode() {
        let mut config = Config::default();
        config.test.hostname = Some("example.com".to_string());
        assert_eq!(config.test.mode(), TestMode::Compare);
        assert!(config.validate().is_ok());

        config.test.hostname = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_default_per_probe() {
        let mut config = Config::default();
        config.probe = ProbeKind::Http;
        config.apply_port_default();
        assert_eq!(config.test.port, 80);

        config.probe = ProbeKind::Dns;
        config.test.dns_protocol = DnsProtocol::Dot;
        config.apply_port_default();
        assert_eq!(config.test.port, 853);

        config.port_explicit = true;
        config.test.port = 5353;
        config.apply_port_default();
        assert_eq!(config.test.port, 5353);
    }

    #[test]
    fn test_family_defaults_from_custom_targets() {
        let mut config = Config::default();
        config.test.target4 = "1.1.1.1".to_string();
        config.apply_family_defaults();
        assert!(config.test.ipv4_only);
        assert!(!config.test.ipv6_only);

        let mut config = Config::default();
        config.test.target6 = "2606:4700:4700::1111".to_string();
        config.apply_family_defaults();
        assert!(config.test.ipv6_only);

        let mut config = Config::default();
        config.test.target4 = "1.1.1.1".to_string();
        config.test.target6 = "2606:4700:4700::1111".to_string();
        config.apply_family_defaults();
        assert!(!config.test.ipv4_only && !config.test.ipv6_only);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(TestConfig::default()).unwrap();
        assert_eq!(value["target_ipv4"], "8.8.8.8");
        assert_eq!(value["interval_ms"], 1000);
        assert_eq!(value["timeout_ms"], 3000);
        assert_eq!(value["dns_protocol"], "udp");
        assert!(value.get("hostname").is_none());

        let back: TestConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, TestConfig::default());
    }
}
