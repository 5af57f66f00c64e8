//! Command-line interface module

use crate::types::ProbeKind;
use clap::Parser;
use std::path::PathBuf;

/// Protocol Latency Tester - IPv4/IPv6 latency over TCP, UDP, ICMP, HTTP and DNS
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "prototester")]
#[command(version, about, long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// IPv4 target (address, or hostname for ICMP)
    #[arg(short = '4', value_name = "ADDR")]
    pub target4: Option<String>,

    /// IPv6 target (address, or hostname for ICMP)
    #[arg(short = '6', value_name = "ADDR")]
    pub target6: Option<String>,

    /// Compare IPv4 and IPv6 for a dual-stack hostname
    #[arg(long, value_name = "HOSTNAME")]
    pub compare: Option<String>,

    /// Target port (default depends on the probe)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Probes per address family
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Pause between probes in milliseconds
    #[arg(short, long, value_name = "MS", value_parser = parse_millis)]
    pub interval: Option<u64>,

    /// Per-probe timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_millis)]
    pub timeout: Option<u64>,

    /// ICMP payload size in bytes
    #[arg(short, long)]
    pub size: Option<usize>,

    /// Only test IPv4
    #[arg(long = "ipv4-only", alias = "4only")]
    pub ipv4_only: bool,

    /// Only test IPv6
    #[arg(long = "ipv6-only", alias = "6only")]
    pub ipv6_only: bool,

    /// TCP connect latency (default)
    #[arg(short = 't', long = "tcp")]
    pub tcp: bool,

    /// UDP send latency
    #[arg(short = 'u', long = "udp")]
    pub udp: bool,

    /// ICMP echo latency, falling back to TCP without privileges
    #[arg(long)]
    pub icmp: bool,

    /// HTTP HEAD latency
    #[arg(long)]
    pub http: bool,

    /// DNS query latency
    #[arg(long)]
    pub dns: bool,

    /// DNS transport: udp, tcp, dot or doh
    #[arg(long, value_name = "PROTOCOL")]
    pub dns_protocol: Option<String>,

    /// Name to query in DNS mode
    #[arg(long, value_name = "NAME")]
    pub dns_query: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show every probe as it completes
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

const EXAMPLES: &str = "Examples:
  prototester                              TCP to 8.8.8.8 and 2001:4860:4860::8888 on port 53
  prototester --icmp -4 1.1.1.1            ICMP echo to one IPv4 target
  prototester --dns --dns-protocol doh     DNS-over-HTTPS query latency
  prototester --compare example.com        IPv4 vs IPv6, TCP and UDP weighted
  prototester --compare example.com --http --json";

impl Cli {
    /// Selected probe flags, in declaration order
    pub fn probe_flags(&self) -> Vec<ProbeKind> {
        [
            (self.tcp, ProbeKind::Tcp),
            (self.udp, ProbeKind::Udp),
            (self.icmp, ProbeKind::Icmp),
            (self.http, ProbeKind::Http),
            (self.dns, ProbeKind::Dns),
        ]
        .into_iter()
        .filter_map(|(set, kind)| set.then_some(kind))
        .collect()
    }

    /// Probe kind to run; TCP when no flag is given
    pub fn probe_kind(&self) -> ProbeKind {
        self.probe_flags().first().copied().unwrap_or(ProbeKind::Tcp)
    }

    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.probe_flags().len() > 1 {
            return Err("Only one of -t, -u, --icmp, --http and --dns may be given".to_string());
        }

        if self.ipv4_only && self.ipv6_only {
            return Err("Cannot specify both --ipv4-only and --ipv6-only".to_string());
        }

        if self.compare.is_some() {
            if self.tcp || self.udp {
                return Err("--compare tests TCP and UDP together; drop -t/-u".to_string());
            }
            if self.ipv4_only || self.ipv6_only {
                return Err("--compare tests both families; drop --ipv4-only/--ipv6-only".to_string());
            }
        }

        if self.count == Some(0) {
            return Err("Count must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }

        if (self.dns_protocol.is_some() || self.dns_query.is_some()) && !self.dns {
            return Err("--dns-protocol and --dns-query require --dns".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Configuration Summary:\n");
        summary.push_str(&format!("  Probe: {}\n", self.probe_kind()));
        if let Some(hostname) = &self.compare {
            summary.push_str(&format!("  Compare: {}\n", hostname));
        }
        if let Some(count) = self.count {
            summary.push_str(&format!("  Count: {}\n", count));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}ms\n", timeout));
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse a millisecond count
fn parse_millis(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|ms| {
            if ms > 3_600_000 {
                Err("Duration cannot exceed one hour".to_string())
            } else {
                Ok(ms)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
