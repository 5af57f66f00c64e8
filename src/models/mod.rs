//! Data models shared between the probe engine and its callers

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, TestConfig};
pub use metrics::{ComparisonResult, FamilyPair, ProbeResult, Statistics, TestResult};

/// Serde adapter storing a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Serde adapter storing a `Duration` as fractional milliseconds
pub(crate) mod duration_ms_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if !millis.is_finite() || millis < 0.0 {
            return Err(de::Error::custom(format!("invalid duration: {}ms", millis)));
        }
        Ok(Duration::from_secs_f64(millis / 1000.0))
    }
}
