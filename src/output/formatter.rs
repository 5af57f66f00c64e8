//! Core formatting traits and implementations
//!
//! This module defines the report layout once, in [`OutputFormatter`]'s
//! provided methods. Implementations only decide how individual pieces of
//! text are styled.

use crate::{
    error::Result,
    executor::{TCP_WEIGHT, UDP_WEIGHT},
    models::{ComparisonResult, FamilyPair, Statistics, TestResult},
    stats::{StatisticsEngine, REPORT_PERCENTILES},
    types::{IpFamily, PerformanceLevel, ProbeKind, TestMode},
    utils::latency_comparator,
};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Section title
    fn heading(&self, text: &str) -> String;

    /// A latency value, styled by how good it is
    fn latency(&self, text: &str, level: PerformanceLevel) -> String;

    fn success(&self, text: &str) -> String;

    fn failure(&self, text: &str) -> String;

    fn emphasis(&self, text: &str) -> String;

    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String> {
        let rule = "=".repeat(title.len().max(40));
        Ok(format!("{}\n{}\n{}", rule, self.heading(title), rule))
    }

    /// Format a complete run
    fn format_result(&self, result: &TestResult) -> Result<String> {
        let mut output = String::new();

        if let Some(comparison) = &result.comparison {
            output.push_str(&self.format_comparison(comparison, result.test_config.dns_query.as_str())?);
        } else {
            let port = result.test_config.port;
            output.push_str(&self.format_header(&format!("{} Latency Test (port {})", result.protocol, port))?);

            let kind = kind_of(&result.protocol);
            for (family, stats) in [(IpFamily::V6, &result.ipv6_results), (IpFamily::V4, &result.ipv4_results)] {
                if let Some(stats) = stats {
                    let target = result.targets.get(family_key(family)).map(String::as_str).unwrap_or("unknown");
                    output.push_str("\n\n");
                    output.push_str(&self.format_family(family, target, kind, stats)?);
                }
            }

            if let (Some(v4), Some(v6)) = (&result.ipv4_results, &result.ipv6_results) {
                output.push_str("\n\n");
                output.push_str(&self.format_family_comparison(v4, v6, kind)?);
            }
        }

        if let Some(error) = &result.error_message {
            output.push_str("\n\n");
            output.push_str(&self.format_error(error)?);
        }

        Ok(output)
    }

    /// Counts, latency summary, jitter and percentiles of one family
    fn format_family(&self, family: IpFamily, target: &str, kind: Option<ProbeKind>, stats: &Statistics) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{}", self.heading(&format!("{} Results ({})", family, target)))?;

        let counts = if kind == Some(ProbeKind::Icmp) {
            format!(
                "{} sent, {} received, {} lost ({:.1}% loss)",
                stats.sent,
                stats.received,
                stats.lost,
                100.0 - stats.success_rate
            )
        } else {
            format!(
                "{} sent, {} successful, {} failed ({:.1}% success)",
                stats.sent, stats.received, stats.lost, stats.success_rate
            )
        };
        let counts = if stats.received == stats.sent {
            self.success(&counts)
        } else if stats.received == 0 {
            self.failure(&counts)
        } else {
            counts
        };
        writeln!(out, "  {}: {}", test_type(kind), counts)?;

        if !stats.has_successes() {
            write!(out, "  {}", self.failure("Latency: no successful probes"))?;
            return Ok(out);
        }

        writeln!(
            out,
            "  Latency: min={} avg={} max={} stddev={}",
            self.styled_ms(stats.min),
            self.styled_ms(stats.avg),
            self.styled_ms(stats.max),
            fmt_ms(stats.stddev)
        )?;
        writeln!(out, "  Jitter: {}", fmt_ms(stats.jitter))?;

        let percentiles: Vec<String> = REPORT_PERCENTILES
            .iter()
            .map(|&p| format!("P{}={}", p as u32, self.styled_ms(stats.percentile(p))))
            .collect();
        write!(out, "  Percentiles: {}", percentiles.join(" "))?;

        Ok(out)
    }

    /// Average latency difference and success rates when both families ran
    fn format_family_comparison(&self, v4: &Statistics, v6: &Statistics, kind: Option<ProbeKind>) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{}", self.heading("IPv6 vs IPv4 Comparison"))?;

        if v4.has_successes() && v6.has_successes() {
            let diff = v6.avg_ms() - v4.avg_ms();
            let faster = match latency_comparator()(v6, v4) {
                Ordering::Less => IpFamily::V6,
                _ => IpFamily::V4,
            };
            writeln!(
                out,
                "  Average latency difference: {:.3}ms ({})",
                diff.abs(),
                self.emphasis(&format!("{} is faster", faster))
            )?;
        } else {
            let silent = if v6.has_successes() { IpFamily::V4 } else { IpFamily::V6 };
            writeln!(out, "  {}", self.failure(&format!("Cannot compare latency: {} had no successful probes", silent)))?;
        }

        if kind == Some(ProbeKind::Icmp) {
            write!(
                out,
                "  Packet loss: IPv6={:.1}% IPv4={:.1}%",
                100.0 - v6.success_rate,
                100.0 - v4.success_rate
            )?;
        } else {
            write!(out, "  Success rate: IPv6={:.1}% IPv4={:.1}%", v6.success_rate, v4.success_rate)?;
        }

        Ok(out)
    }

    /// Per-protocol blocks, both scores and the winner of a comparison run
    fn format_comparison(&self, cmp: &ComparisonResult, dns_query: &str) -> Result<String> {
        let mut out = String::new();
        out.push_str(&self.format_header(&format!(
            "IPv4 vs IPv6 Comparison: {} ({}, port {})",
            cmp.hostname, cmp.protocol, cmp.port
        ))?);
        out.push('\n');
        writeln!(out, "Resolved: IPv4={} IPv6={}", cmp.resolved_ipv4, cmp.resolved_ipv6)?;
        if cmp.dns.is_some() {
            writeln!(out, "DNS query: {}", cmp.dns_query.as_deref().unwrap_or(dns_query))?;
        }

        let blocks = [
            ("TCP", &cmp.tcp),
            ("UDP", &cmp.udp),
            ("ICMP", &cmp.icmp),
            ("HTTP", &cmp.http),
            (cmp.protocol.as_str(), &cmp.dns),
        ];
        for (label, pair) in blocks {
            if let Some(pair) = pair {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
                out.push_str(&self.format_protocol_pair(label, pair, cmp)?);
            }
        }

        out.push_str("\n\n");
        writeln!(out, "IPv6 Score: {:.2}", cmp.ipv6_score)?;
        writeln!(out, "IPv4 Score: {:.2}", cmp.ipv4_score)?;

        let winner = match cmp.percent_better {
            Some(pct) if cmp.winner != "Tie" => format!("Winner: {} ({:.1}% better)", cmp.winner, pct),
            _ => format!("Winner: {}", cmp.winner),
        };
        write!(out, "{}", self.emphasis(&winner))?;

        if cmp.tcp.is_some() && cmp.udp.is_some() {
            write!(
                out,
                "\nWeighting: TCP {:.0}%, UDP {:.0}%",
                TCP_WEIGHT * 100.0,
                UDP_WEIGHT * 100.0
            )?;
        }

        Ok(out)
    }

    fn format_protocol_pair(&self, label: &str, pair: &FamilyPair, cmp: &ComparisonResult) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{}", self.heading(&format!("{} Results", label)))?;

        let families = [
            (IpFamily::V6, cmp.resolved_ipv6, &pair.ipv6),
            (IpFamily::V4, cmp.resolved_ipv4, &pair.ipv4),
        ];
        let mut lines = Vec::new();
        for (family, ip, stats) in families {
            let mut block = format!("  {} ({}):", family, endpoint(ip, cmp.port));
            if stats.has_successes() {
                write!(
                    block,
                    "\n    Success: {:.1}% ({}/{})\n    Latency: avg={} min={} max={}",
                    stats.success_rate,
                    stats.received,
                    stats.sent,
                    self.styled_ms(stats.avg),
                    self.styled_ms(stats.min),
                    self.styled_ms(stats.max)
                )?;
            } else {
                write!(block, "\n    {}", self.failure("Failed: No successful connections"))?;
            }
            lines.push(block);
        }
        write!(out, "{}", lines.join("\n"))?;

        Ok(out)
    }

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String> {
        Ok(self.failure(&format!("Error: {}", error)))
    }

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("Warning: {}", warning))
    }

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String> {
        Ok(self.success(message))
    }

    fn styled_ms(&self, value: Duration) -> String {
        self.latency(&fmt_ms(value), PerformanceLevel::from_latency(value))
    }
}

/// Plain text formatter implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn heading(&self, text: &str) -> String {
        text.to_string()
    }

    fn latency(&self, text: &str, _level: PerformanceLevel) -> String {
        text.to_string()
    }

    fn success(&self, text: &str) -> String {
        text.to_string()
    }

    fn failure(&self, text: &str) -> String {
        text.to_string()
    }

    fn emphasis(&self, text: &str) -> String {
        text.to_string()
    }
}

/// JSON report: the serde rendering of the result, pretty-printed
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn heading(&self, text: &str) -> String {
        text.to_string()
    }

    fn latency(&self, text: &str, _level: PerformanceLevel) -> String {
        text.to_string()
    }

    fn success(&self, text: &str) -> String {
        text.to_string()
    }

    fn failure(&self, text: &str) -> String {
        text.to_string()
    }

    fn emphasis(&self, text: &str) -> String {
        text.to_string()
    }

    fn format_result(&self, result: &TestResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&serde_json::json!({ "error": error }))?)
    }
}

/// Latency in milliseconds with microsecond resolution
pub fn fmt_ms(value: Duration) -> String {
    format!("{:.3}ms", value.as_nanos() as f64 / 1e6)
}

/// Word used for the probe counts line
pub fn test_type(kind: Option<ProbeKind>) -> &'static str {
    match kind {
        Some(ProbeKind::Tcp) => "Connections",
        Some(ProbeKind::Udp) => "UDP Tests",
        Some(ProbeKind::Icmp) => "Packets",
        Some(ProbeKind::Http) => "HTTP Requests",
        Some(ProbeKind::Dns) => "DNS Queries",
        None => "Probes",
    }
}

/// Probe kind back from a report protocol label ("TCP", "DNS-DOT", ...)
pub fn kind_of(protocol: &str) -> Option<ProbeKind> {
    match protocol {
        "TCP" => Some(ProbeKind::Tcp),
        "UDP" => Some(ProbeKind::Udp),
        "ICMP" => Some(ProbeKind::Icmp),
        "HTTP" => Some(ProbeKind::Http),
        p if p.starts_with("DNS") => Some(ProbeKind::Dns),
        _ => None,
    }
}

fn family_key(family: IpFamily) -> &'static str {
    match family {
        IpFamily::V4 => "ipv4",
        IpFamily::V6 => "ipv6",
    }
}

fn endpoint(ip: IpAddr, port: u16) -> String {
    SocketAddr::new(ip, port).to_string()
}

/// One-line health verdict per family, e.g. "TCP: IPv6 good, IPv4 unreachable"
pub fn summary_line(result: &TestResult) -> String {
    let engine = StatisticsEngine::with_defaults();
    let describe = |stats: &Statistics| match engine.performance_level(stats) {
        Some(PerformanceLevel::Good) => "good",
        Some(PerformanceLevel::Moderate) => "moderate",
        Some(PerformanceLevel::Poor) => "poor",
        None => "unreachable",
    };

    match result.mode {
        TestMode::Compare => match &result.comparison {
            Some(cmp) => format!("{}: winner {}", cmp.hostname, cmp.winner),
            None => "comparison: no result".to_string(),
        },
        TestMode::Single => {
            let mut parts = Vec::new();
            if let Some(v6) = &result.ipv6_results {
                parts.push(format!("IPv6 {}", describe(v6)));
            }
            if let Some(v4) = &result.ipv4_results {
                parts.push(format!("IPv4 {}", describe(v4)));
            }
            format!("{}: {}", result.protocol, parts.join(", "))
        }
    }
}
