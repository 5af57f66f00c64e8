//! Reduction of probe results into latency statistics

use crate::{
    models::metrics::{ProbeResult, Statistics},
    types::PerformanceLevel,
};
use std::time::Duration;

/// Percentiles shown in reports
pub const REPORT_PERCENTILES: [f64; 3] = [50.0, 95.0, 99.0];

/// Configuration for statistical calculations
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Percentiles to calculate (e.g., 50th, 95th, 99th)
    pub percentiles: Vec<f64>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            percentiles: REPORT_PERCENTILES.to_vec(),
        }
    }
}

/// Pure reduction of an ordered sequence of probe results.
///
/// Holds no state between calls; the same input always gives the same
/// [`Statistics`].
#[derive(Debug, Clone, Default)]
pub struct StatisticsEngine {
    config: StatisticsConfig,
}

impl StatisticsEngine {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Reduce `results`.
    ///
    /// `sent` is the number of results and `lost = sent - received`. With no
    /// successes every duration is zero. Otherwise the successful latencies
    /// are sorted and:
    ///
    /// * `min`/`max` are the first and last entries
    /// * `avg` is the arithmetic mean
    /// * `stddev` is the population standard deviation (divide by N)
    /// * `jitter` is the mean absolute difference between consecutive
    ///   entries of the *sorted* sequence, not of arrival order
    pub fn calculate(&self, results: &[ProbeResult]) -> Statistics {
        let sent = results.len() as u32;
        let mut latencies: Vec<Duration> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.latency)
            .collect();

        if latencies.is_empty() {
            return Statistics::empty(sent);
        }

        latencies.sort_unstable();

        let received = latencies.len() as u32;
        let n = latencies.len();

        let total_nanos: u128 = latencies.iter().map(|d| d.as_nanos()).sum();
        let avg_nanos = total_nanos / n as u128;

        let mean = avg_nanos as f64;
        let variance = latencies
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        let jitter_nanos = if n > 1 {
            let spread: u128 = latencies
                .windows(2)
                .map(|pair| pair[1].as_nanos() - pair[0].as_nanos())
                .sum();
            spread as f64 / (n - 1) as f64
        } else {
            0.0
        };

        Statistics {
            sent,
            received,
            lost: sent - received,
            min: latencies[0],
            max: latencies[n - 1],
            avg: nanos_to_duration(avg_nanos as f64),
            stddev: nanos_to_duration(variance.sqrt()),
            jitter: nanos_to_duration(jitter_nanos),
            success_rate: success_rate(sent, received),
            latencies,
        }
    }

    /// The configured percentiles of `stats`, in order
    pub fn percentiles(&self, stats: &Statistics) -> Vec<(f64, Duration)> {
        self.config
            .percentiles
            .iter()
            .map(|&p| (p, percentile(p, &stats.latencies)))
            .collect()
    }

    /// Classify the average latency. `None` when nothing succeeded.
    pub fn performance_level(&self, stats: &Statistics) -> Option<PerformanceLevel> {
        stats
            .has_successes()
            .then(|| PerformanceLevel::from_latency(stats.avg))
    }
}

/// Nearest-rank percentile of an ascending sequence.
///
/// Index is `ceil(p/100 * n) - 1`, clamped to `[0, n-1]`. An empty
/// sequence yields zero.
pub fn percentile(p: f64, sorted: &[Duration]) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let n = sorted.len();
    let rank = (p / 100.0 * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted[index]
}

/// Percentage of successful probes; zero when nothing was sent
pub fn success_rate(sent: u32, received: u32) -> f64 {
    if sent == 0 {
        0.0
    } else {
        received as f64 / sent as f64 * 100.0
    }
}

fn nanos_to_duration(nanos: f64) -> Duration {
    if nanos.is_finite() && nanos > 0.0 {
        Duration::from_nanos(nanos.round() as u64)
    } else {
        Duration::ZERO
    }
}
