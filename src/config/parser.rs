//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
};
use std::time::Duration;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::config)?;

        // Start with default configuration
        let mut config = Config::default();

        // Load from environment file if it exists
        self.load_env_file()?;

        // Merge environment variables into config
        config.merge_from_env()?;

        // Override with CLI arguments
        self.apply_cli_overrides(&mut config)?;

        config.apply_port_default();
        config.apply_family_defaults();

        // Validate the final configuration
        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(target) = &cli.target4 {
            config.test.target4 = target.trim().to_string();
        }
        if let Some(target) = &cli.target6 {
            config.test.target6 = target.trim().to_string();
        }
        if let Some(hostname) = &cli.compare {
            config.test.hostname = Some(hostname.trim().to_string());
        }

        if let Some(port) = cli.port {
            config.test.port = port;
            config.port_explicit = true;
        }
        if let Some(count) = cli.count {
            config.test.count = count;
        }
        if let Some(interval) = cli.interval {
            config.test.interval = Duration::from_millis(interval);
        }
        if let Some(timeout) = cli.timeout {
            config.test.timeout = Duration::from_millis(timeout);
        }
        if let Some(size) = cli.size {
            config.test.icmp_size = size;
        }

        if let Some(protocol) = &cli.dns_protocol {
            config.test.dns_protocol = protocol.parse()?;
        }
        if let Some(query) = &cli.dns_query {
            config.test.dns_query = query.trim().to_string();
        }

        config.test.ipv4_only |= cli.ipv4_only;
        config.test.ipv6_only |= cli.ipv6_only;
        config.probe = cli.probe_kind();

        if cli.no_color || cli.json {
            config.enable_color = false;
        }

        // These are CLI-only
        config.verbose = cli.verbose;
        config.debug = cli.debug;
        config.json_output = cli.json;
        config.output_file = cli.output.clone();

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: probe={}, port={}, count={}, timeout={}ms, enable_color={}",
                config.probe,
                config.test.port,
                config.test.count,
                config.test.timeout.as_millis(),
                config.enable_color
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let test = &config.test;
    let mut summary = Vec::new();

    summary.push(format!("Probe: {}", config.probe));
    match &test.hostname {
        Some(hostname) => summary.push(format!("Compare: {}", hostname)),
        None => {
            if test.tests_ipv4() {
                summary.push(format!("IPv4 target: {}", test.target4));
            }
            if test.tests_ipv6() {
                summary.push(format!("IPv6 target: {}", test.target6));
            }
        }
    }
    summary.push(format!("Port: {}", test.port));
    summary.push(format!("Count: {}", test.count));
    summary.push(format!("Interval: {}ms", test.interval.as_millis()));
    summary.push(format!("Timeout: {}ms", test.timeout.as_millis()));
    if config.probe == crate::types::ProbeKind::Icmp {
        summary.push(format!("ICMP size: {} bytes", test.icmp_size));
    }
    if config.probe == crate::types::ProbeKind::Dns {
        summary.push(format!("DNS: {} query for {}", test.dns_protocol, test.dns_query));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DnsProtocol, ProbeKind, TestMode};
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<Config> {
        let mut argv = vec!["prototester"];
        argv.extend_from_slice(args);
        ConfigParser::new(Cli::parse_from(argv)).parse()
    }

    #[test]
    fn test_config_parser_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.probe, ProbeKind::Tcp);
        assert_eq!(config.test.count, 10);
        assert_eq!(config.test.port, 53);
        assert_eq!(config.test.interval, Duration::from_secs(1));
        assert!(!config.test.ipv4_only && !config.test.ipv6_only);
    }

    #[test]
    fn test_cli_overrides() {
        let config = parse(&["-c", "3", "-i", "250", "--timeout", "800", "--icmp", "-s", "32", "--no-color"]).unwrap();
        assert_eq!(config.test.count, 3);
        assert_eq!(config.test.interval, Duration::from_millis(250));
        assert_eq!(config.test.timeout, Duration::from_millis(800));
        assert_eq!(config.test.icmp_size, 32);
        assert_eq!(config.probe, ProbeKind::Icmp);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_probe_port_defaults() {
        let config = parse(&["--http"]).unwrap();
        assert_eq!(config.test.port, 80);

        let config = parse(&["--dns", "--dns-protocol", "doh"]).unwrap();
        assert_eq!(config.test.dns_protocol, DnsProtocol::Doh);
        assert_eq!(config.test.port, 443);

        let config = parse(&["--dns", "--dns-protocol", "dot", "-p", "8853"]).unwrap();
        assert_eq!(config.test.port, 8853);
    }

    #[test]
    fn test_custom_target_selects_family() {
        let config = parse(&["-4", "1.1.1.1"]).unwrap();
        assert!(config.test.ipv4_only);
        assert_eq!(config.test.target4, "1.1.1.1");
    }

    #[test]
    fn test_compare_mode() {
        let config = parse(&["--compare", "example.com", "--dns"]).unwrap();
        assert_eq!(config.test.mode(), TestMode::Compare);
        assert_eq!(config.test.hostname.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_cli_conflicts_are_config_errors() {
        let err = parse(&["-t", "-u"]).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_invalid_dns_protocol() {
        let err = parse(&["--dns", "--dns-protocol", "quic"]).unwrap_err();
        assert!(err.to_string().contains("invalid DNS protocol: quic"));
    }

    #[test]
    fn test_json_and_output_flags() {
        let config = parse(&["--json", "--output", "out.json"]).unwrap();
        assert!(config.json_output);
        assert!(!config.enable_color);
        assert_eq!(config.output_file.as_deref(), Some(std::path::Path::new("out.json")));
    }

    #[test]
    fn test_config_summary() {
        let config = parse(&["--dns", "--dns-query", "example.org"]).unwrap();
        let summary = display_config_summary(&config);
        assert!(summary.contains("Probe: DNS"));
        assert!(summary.contains("DNS: udp query for example.org"));
        assert!(summary.contains("IPv4 target: 8.8.8.8"));
    }
}
