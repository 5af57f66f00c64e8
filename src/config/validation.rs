//! Non-fatal configuration checks
//!
//! Hard errors come from `Config::validate`; this module only produces
//! warnings about settings that are legal but probably not what was meant.

use crate::{
    error::Result,
    models::Config,
    types::{DnsProtocol, ProbeKind, TestMode},
};
use std::time::Duration;

/// Settings-level warnings on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration and collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_probe_settings(config));
        warnings.extend(Self::validate_performance_settings(config));
        Ok(warnings)
    }

    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let test = &config.test;

        match config.probe {
            ProbeKind::Icmp => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    "ICMP sockets may need elevated privileges; without them the probe falls back to TCP connect"
                        .to_string(),
                ));
            }
            ProbeKind::Http if !matches!(test.port, 80 | 443 | 8443) => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("HTTP probe on port {} (usually 80, 443 or 8443)", test.port),
                ));
            }
            ProbeKind::Dns => {
                let standard = test.dns_protocol.default_port();
                let encrypted = matches!(test.dns_protocol, DnsProtocol::Dot | DnsProtocol::Doh);
                if encrypted && test.port != standard {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "{} on non-standard port {} (usually {})",
                            test.dns_protocol.as_str().to_uppercase(),
                            test.port,
                            standard
                        ),
                    ));
                }
            }
            _ => {}
        }

        warnings
    }

    /// Validate performance-related settings
    fn validate_performance_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let test = &config.test;

        if test.timeout < Duration::from_millis(100) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Timeout of {}ms may be too short for reliable measurements",
                    test.timeout.as_millis()
                ),
            ));
        }

        // Phases run back to back: two per protocol, two protocols for TCP/UDP comparisons
        let phases: u32 = match (test.mode(), config.probe) {
            (TestMode::Compare, ProbeKind::Tcp | ProbeKind::Udp) => 4,
            (TestMode::Compare, _) => 2,
            (TestMode::Single, _) => u32::from(test.tests_ipv4()) + u32::from(test.tests_ipv6()),
        };
        let estimated = test.interval.saturating_mul(test.count.saturating_sub(1)).saturating_mul(phases);

        if estimated > Duration::from_secs(300) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} probes at {}ms intervals will take at least {}s",
                    test.count,
                    test.interval.as_millis(),
                    estimated.as_secs()
                ),
            ));
        } else if estimated > Duration::from_secs(60) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Run will take at least {}s", estimated.as_secs()),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            use colored::Colorize;
            let tag = match self.level {
                ValidationLevel::Info => self.level.as_str().blue(),
                ValidationLevel::Warning => self.level.as_str().yellow(),
            };
            format!("[{}] {}", tag, self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
