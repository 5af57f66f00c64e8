//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::DnsProtocol;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Protocol Latency Tester Configuration
#
# Values here are defaults; command-line arguments override them.

# Targets for single mode (IPv4/IPv6 literal, or hostname for ICMP)
# PROTOTESTER_TARGET_IPV4=8.8.8.8
# PROTOTESTER_TARGET_IPV6=2001:4860:4860::8888

# Port (defaults per probe: 53, 80 for HTTP, 853 for DoT, 443 for DoH)
# PROTOTESTER_PORT=53

# Probes per address family
# PROTOTESTER_COUNT=10

# Pause between probes and per-probe timeout, in milliseconds
# PROTOTESTER_INTERVAL_MS=1000
# PROTOTESTER_TIMEOUT_MS=3000

# ICMP payload size in bytes
# PROTOTESTER_ICMP_SIZE=64

# DNS probe transport (udp, tcp, dot, doh) and query name
# PROTOTESTER_DNS_PROTOCOL=udp
# PROTOTESTER_DNS_QUERY=dns-query.qosbox.com

# Enable colored output (true/false)
# PROTOTESTER_ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "PROTOTESTER_TARGET_IPV4" | "PROTOTESTER_TARGET_IPV6" => {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "PROTOTESTER_PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("PROTOTESTER_PORT must be between 1 and 65535"));
                }
            }
            "PROTOTESTER_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_COUNT value '{}': {}", value, e)))?;
                if count == 0 {
                    return Err(AppError::config("PROTOTESTER_COUNT must be at least 1"));
                }
            }
            "PROTOTESTER_INTERVAL_MS" => {
                value
                    .parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_INTERVAL_MS value '{}': {}", value, e)))?;
            }
            "PROTOTESTER_TIMEOUT_MS" => {
                let timeout: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_TIMEOUT_MS value '{}': {}", value, e)))?;
                if timeout == 0 {
                    return Err(AppError::config("PROTOTESTER_TIMEOUT_MS must be greater than 0"));
                }
            }
            "PROTOTESTER_ICMP_SIZE" => {
                value
                    .parse::<usize>()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_ICMP_SIZE value '{}': {}", value, e)))?;
            }
            "PROTOTESTER_DNS_PROTOCOL" => {
                value.parse::<DnsProtocol>()?;
            }
            "PROTOTESTER_DNS_QUERY" => {
                crate::codec::dns::validate_domain(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_DNS_QUERY value '{}': {}", value, e)))?;
            }
            "PROTOTESTER_ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid PROTOTESTER_ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROTOTESTER_TARGET_IPV4", "IPv4 target for single mode", "8.8.8.8"),
            ("PROTOTESTER_TARGET_IPV6", "IPv6 target for single mode", "2001:4860:4860::8888"),
            ("PROTOTESTER_PORT", "Target port (1-65535)", "53"),
            ("PROTOTESTER_COUNT", "Probes per address family", "10"),
            ("PROTOTESTER_INTERVAL_MS", "Pause between probes in milliseconds", "1000"),
            ("PROTOTESTER_TIMEOUT_MS", "Per-probe timeout in milliseconds", "3000"),
            ("PROTOTESTER_ICMP_SIZE", "ICMP payload size in bytes", "64"),
            ("PROTOTESTER_DNS_PROTOCOL", "DNS transport: udp, tcp, dot or doh", "udp"),
            ("PROTOTESTER_DNS_QUERY", "Name queried by the DNS probe", "dns-query.qosbox.com"),
            ("PROTOTESTER_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        Ok(warnings)
    }

    /// Validate the lines of a .env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read .env file: {}", e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(var), "missing {}", var);
        }
    }

    #[test]
    fn test_save_example_env_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Protocol Latency Tester Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("PROTOTESTER_PORT", "853").is_ok());
        assert!(EnvManager::validate_env_var("PROTOTESTER_PORT", "0").is_err());
        assert!(EnvManager::validate_env_var("PROTOTESTER_PORT", "70000").is_err());

        assert!(EnvManager::validate_env_var("PROTOTESTER_COUNT", "5").is_ok());
        assert!(EnvManager::validate_env_var("PROTOTESTER_COUNT", "0").is_err());

        assert!(EnvManager::validate_env_var("PROTOTESTER_INTERVAL_MS", "0").is_ok());
        assert!(EnvManager::validate_env_var("PROTOTESTER_TIMEOUT_MS", "0").is_err());

        assert!(EnvManager::validate_env_var("PROTOTESTER_DNS_PROTOCOL", "DoH").is_ok());
        assert!(EnvManager::validate_env_var("PROTOTESTER_DNS_PROTOCOL", "quic").is_err());

        let long_label = format!("{}.com", "x".repeat(64));
        assert!(EnvManager::validate_env_var("PROTOTESTER_DNS_QUERY", &long_label).is_err());

        assert!(EnvManager::validate_env_var("PROTOTESTER_ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("PROTOTESTER_ENABLE_COLOR", "maybe").is_err());

        assert!(EnvManager::validate_env_var("UNRELATED", "anything").is_ok());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("PROTOTESTER_TIMEOUT_MS"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_check_env_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        assert!(EnvManager::check_env_file(&path).unwrap().is_none());

        std::fs::write(&path, "# comment\nPROTOTESTER_COUNT=3\nPROTOTESTER_PORT=abc\n").unwrap();
        let warnings = EnvManager::check_env_file(&path).unwrap().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("PROTOTESTER_PORT=abc"));
    }
}
