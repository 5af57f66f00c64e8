//! Probe results, statistics and run reports

use super::config::TestConfig;
use crate::types::{AppError, TestMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// Outcome of one timed round trip.
///
/// Created once per probe iteration and consumed by the statistics reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,

    #[serde(rename = "latency_ms", with = "super::duration_ms_f64")]
    pub latency: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// `AppError::category()` of the failure, e.g. "TIMEOUT" or "PROTOCOL"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
            error: None,
            error_category: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: &AppError) -> Self {
        Self {
            success: false,
            latency: Duration::ZERO,
            error: Some(error.to_string()),
            error_category: Some(error.category().to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_nanos() as f64 / 1e6
    }
}

/// Reduction of one family's probe results.
///
/// `sent == received + lost` always holds; with no successes every
/// duration is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub sent: u32,
    pub received: u32,
    pub lost: u32,

    #[serde(rename = "min_ms", with = "super::duration_ms_f64")]
    pub min: Duration,

    #[serde(rename = "max_ms", with = "super::duration_ms_f64")]
    pub max: Duration,

    #[serde(rename = "avg_ms", with = "super::duration_ms_f64")]
    pub avg: Duration,

    #[serde(rename = "stddev_ms", with = "super::duration_ms_f64")]
    pub stddev: Duration,

    #[serde(rename = "jitter_ms", with = "super::duration_ms_f64")]
    pub jitter: Duration,

    /// Successful latencies, ascending
    #[serde(skip)]
    pub latencies: Vec<Duration>,

    /// Percentage of probes that succeeded (0.0-100.0)
    pub success_rate: f64,
}

impl Statistics {
    /// Statistics for `sent` probes that all failed
    pub fn empty(sent: u32) -> Self {
        Self {
            sent,
            lost: sent,
            ..Self::default()
        }
    }

    pub fn avg_ms(&self) -> f64 {
        self.avg.as_nanos() as f64 / 1e6
    }

    pub fn has_successes(&self) -> bool {
        self.received > 0
    }

    /// Latency at percentile `p` of the successful samples
    pub fn percentile(&self, p: f64) -> Duration {
        crate::stats::percentile(p, &self.latencies)
    }
}

/// Statistics for the same protocol over both families
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyPair {
    pub ipv4: Statistics,
    pub ipv6: Statistics,
}

/// IPv4 vs IPv6 comparison for a hostname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub hostname: String,
    pub protocol: String,
    pub port: u16,
    pub resolved_ipv4: IpAddr,
    pub resolved_ipv6: IpAddr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<FamilyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<FamilyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp: Option<FamilyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<FamilyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<FamilyPair>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_query: Option<String>,

    pub ipv4_score: f64,
    pub ipv6_score: f64,

    /// "IPv4", "IPv6" or "Tie"
    pub winner: String,

    /// How far ahead the winner is, relative to the loser's score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_better: Option<f64>,

    pub timestamp: DateTime<Utc>,
}

/// Everything a caller gets back from one tester run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub mode: TestMode,
    pub protocol: String,

    /// "ipv4"/"ipv6" (and "hostname" in compare mode) to the address probed
    pub targets: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_results: Option<Statistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_results: Option<Statistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,

    pub test_config: TestConfig,

    pub timestamp: DateTime<Utc>,

    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TestResult {
    pub fn new(mode: TestMode, protocol: impl Into<String>, test_config: TestConfig) -> Self {
        Self {
            mode,
            protocol: protocol.into(),
            targets: BTreeMap::new(),
            ipv4_results: None,
            ipv6_results: None,
            comparison: None,
            test_config,
            timestamp: Utc::now(),
            error_message: None,
        }
    }

    /// True when at least one family ran and none of its probes succeeded
    pub fn all_probes_failed(&self) -> bool {
        let families: Vec<&Statistics> = match &self.comparison {
            Some(cmp) => [&cmp.tcp, &cmp.udp, &cmp.icmp, &cmp.http, &cmp.dns]
                .into_iter()
                .flatten()
                .flat_map(|pair| [&pair.ipv4, &pair.ipv6])
                .collect(),
            None => self.ipv4_results.iter().chain(self.ipv6_results.iter()).collect(),
        };
        !families.is_empty() && families.iter().all(|s| !s.has_successes())
    }
}
