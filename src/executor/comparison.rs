//! IPv4 vs IPv6 scoring.
//!
//! A protocol score rewards reliability and speed together:
//! `received/sent * 1000 / avg_ms`. Twice as fast or twice as reliable
//! doubles the score. A run without a single success scores zero.

use crate::models::{FamilyPair, Statistics};
use crate::types::IpFamily;
use crate::utils::{percent_difference, safe_float_cmp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const TCP_WEIGHT: f64 = 0.6;
pub const UDP_WEIGHT: f64 = 0.4;

/// Score of one protocol run
pub fn protocol_score(stats: &Statistics) -> f64 {
    if !stats.has_successes() || stats.sent == 0 {
        return 0.0;
    }
    let avg_ms = stats.avg_ms();
    if avg_ms <= 0.0 {
        return 0.0;
    }
    let success_fraction = stats.received as f64 / stats.sent as f64;
    success_fraction * (1000.0 / avg_ms)
}

/// TCP weighted 60%, UDP 40%
pub fn combined_score(tcp: &Statistics, udp: &Statistics) -> f64 {
    TCP_WEIGHT * protocol_score(tcp) + UDP_WEIGHT * protocol_score(udp)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Family(IpFamily),
    Tie,
}

impl Winner {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Family(family) => family.label(),
            Self::Tie => "Tie",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of comparing two family scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub ipv4_score: f64,
    pub ipv6_score: f64,
    pub winner: Winner,
    /// `|a - b| / loser * 100`; absent on a tie or when the loser scored zero
    pub percent_better: Option<f64>,
}

impl Verdict {
    /// The strictly higher score wins; equal scores tie
    pub fn decide(ipv4_score: f64, ipv6_score: f64) -> Self {
        let (winner, loser_score) = match safe_float_cmp(ipv4_score, ipv6_score) {
            Ordering::Greater => (Winner::Family(IpFamily::V4), ipv6_score),
            Ordering::Less => (Winner::Family(IpFamily::V6), ipv4_score),
            Ordering::Equal => (Winner::Tie, 0.0),
        };

        let percent_better = match winner {
            Winner::Tie => None,
            Winner::Family(_) if loser_score > 0.0 => percent_difference(ipv4_score.max(ipv6_score), loser_score),
            Winner::Family(_) => None,
        };

        Self {
            ipv4_score,
            ipv6_score,
            winner,
            percent_better,
        }
    }

    /// Weighted TCP/UDP comparison
    pub fn from_tcp_udp(tcp: &FamilyPair, udp: &FamilyPair) -> Self {
        Self::decide(
            combined_score(&tcp.ipv4, &udp.ipv4),
            combined_score(&tcp.ipv6, &udp.ipv6),
        )
    }

    /// Unweighted comparison for single-protocol runs (ICMP, HTTP, DNS)
    pub fn from_single(pair: &FamilyPair) -> Self {
        Self::decide(protocol_score(&pair.ipv4), protocol_score(&pair.ipv6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeResult;
    use crate::stats::StatisticsEngine;
    use std::time::Duration;

    fn stats(latencies_ms: &[u64], failures: usize) -> Statistics {
        let mut results: Vec<ProbeResult> = latencies_ms
            .iter()
            .map(|&ms| ProbeResult::success(Duration::from_millis(ms)))
            .collect();
        for _ in 0..failures {
            results.push(ProbeResult::failure(&crate::error::AppError::timeout("no reply")));
        }
        StatisticsEngine::with_defaults().calculate(&results)
    }

    #[test]
    fn test_protocol_score_is_inverse_latency() {
        assert_eq!(protocol_score(&stats(&[10, 10], 0)), 100.0);
        assert_eq!(protocol_score(&stats(&[25], 0)), 40.0);
    }

    #[test]
    fn test_protocol_score_scales_with_success() {
        // Half the probes lost halves the score
        assert_eq!(protocol_score(&stats(&[10], 1)), 50.0);
        assert_eq!(protocol_score(&stats(&[], 5)), 0.0);
        assert_eq!(protocol_score(&Statistics::default()), 0.0);
    }

    #[test]
    fn test_combined_score_weights() {
        let tcp = stats(&[15], 0);
        let udp = stats(&[25], 0);
        let score = combined_score(&tcp, &udp);
        assert!((score - 56.0).abs() < 0.01, "score was {}", score);
    }

    #[test]
    fn test_winner_and_percent_better() {
        let verdict = Verdict::decide(50.0, 100.0);
        assert_eq!(verdict.winner, Winner::Family(IpFamily::V6));
        assert_eq!(verdict.winner.label(), "IPv6");
        assert_eq!(verdict.percent_better, Some(100.0));

        let verdict = Verdict::decide(75.0, 50.0);
        assert_eq!(verdict.winner.label(), "IPv4");
        assert_eq!(verdict.percent_better, Some(50.0));
    }

    #[test]
    fn test_tie() {
        let verdict = Verdict::decide(42.0, 42.0);
        assert_eq!(verdict.winner, Winner::Tie);
        assert_eq!(verdict.percent_better, None);

        let verdict = Verdict::decide(0.0, 0.0);
        assert_eq!(verdict.winner.to_string(), "Tie");
    }

    #[test]
    fn test_loser_with_zero_score() {
        let verdict = Verdict::decide(10.0, 0.0);
        assert_eq!(verdict.winner.label(), "IPv4");
        assert_eq!(verdict.percent_better, None);
    }

    #[test]
    fn test_tcp_udp_verdict() {
        let tcp = FamilyPair { ipv4: stats(&[20], 0), ipv6: stats(&[10], 0) };
        let udp = FamilyPair { ipv4: stats(&[20], 0), ipv6: stats(&[10], 0) };
        let verdict = Verdict::from_tcp_udp(&tcp, &udp);
        assert_eq!(verdict.winner.label(), "IPv6");
        assert!((verdict.ipv6_score - 100.0).abs() < 1e-9);
        assert!((verdict.ipv4_score - 50.0).abs() < 1e-9);
    }
}
