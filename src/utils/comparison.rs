use crate::models::Statistics;
use std::cmp::Ordering;

/// Safe comparison of floating point numbers, handling NaN values
pub fn safe_float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Average latency in milliseconds, or `default` when nothing succeeded
pub fn avg_ms_or(stats: &Statistics, default: f64) -> f64 {
    if stats.has_successes() {
        stats.avg_ms()
    } else {
        default
    }
}

/// Orders statistics by average latency, fastest first. Runs without a
/// single success sort last.
pub fn latency_comparator() -> impl Fn(&Statistics, &Statistics) -> Ordering {
    |a, b| safe_float_cmp(avg_ms_or(a, f64::MAX), avg_ms_or(b, f64::MAX))
}

/// Relative difference of `a` to `b` in percent, `(a - b) / b * 100`.
/// `None` when `b` is zero.
pub fn percent_difference(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 || !b.is_finite() {
        None
    } else {
        Some((a - b) / b * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatisticsEngine;
    use crate::models::ProbeResult;
    use std::time::Duration;

    #[test]
    fn test_safe_float_cmp_normal_values() {
        assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
        assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
        assert_eq!(safe_float_cmp(1.0, 1.0), Ordering::Equal);
    }

    #[test]
    fn test_safe_float_cmp_nan_handling() {
        assert_eq!(safe_float_cmp(f64::NAN, 1.0), Ordering::Equal);
        assert_eq!(safe_float_cmp(1.0, f64::NAN), Ordering::Equal);
        assert_eq!(safe_float_cmp(f64::NAN, f64::NAN), Ordering::Equal);
    }

    #[test]
    fn test_safe_float_cmp_infinity() {
        assert_eq!(safe_float_cmp(f64::INFINITY, 1.0), Ordering::Greater);
        assert_eq!(safe_float_cmp(1.0, f64::INFINITY), Ordering::Less);
        assert_eq!(safe_float_cmp(f64::NEG_INFINITY, 1.0), Ordering::Less);
    }

    #[test]
    fn test_latency_comparator() {
        let engine = StatisticsEngine::with_defaults();
        let fast = engine.calculate(&[ProbeResult::success(Duration::from_millis(5))]);
        let slow = engine.calculate(&[ProbeResult::success(Duration::from_millis(50))]);
        let dead = engine.calculate(&[ProbeResult::failure(&crate::error::AppError::timeout("x"))]);

        let mut all = vec![dead.clone(), slow.clone(), fast.clone()];
        let cmp = latency_comparator();
        all.sort_by(|a, b| cmp(a, b));
        assert_eq!(all, vec![fast, slow, dead]);
    }

    #[test]
    fn test_percent_difference() {
        assert_eq!(percent_difference(150.0, 100.0), Some(50.0));
        assert_eq!(percent_difference(50.0, 100.0), Some(-50.0));
        assert_eq!(percent_difference(1.0, 0.0), None);
    }
}
