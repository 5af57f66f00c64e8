//! Protocol Latency Tester - Main CLI Application
//!
//! Measures IPv4 and IPv6 latency to a target over TCP, UDP, ICMP, HTTP or
//! DNS, or compares both families for one dual-stack hostname.

use clap::Parser;
use prototester::{
    cli::Cli,
    config::{load_config, validate_config},
    dns::DnsManager,
    error::{AppError, ErrorReporter, Result},
    executor::{ConsoleReporter, LatencyTester},
    logging::LoggerFactory,
    models::Config,
    output::{summary_line, OutputCoordinator},
    transport::system_transport,
    PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue with the command line that triggered it");
        process::exit(1);
    }));

    // Parse command line arguments
    let cli = Cli::parse();
    let json = cli.json;
    let use_color = cli.use_colors();
    let verbose = cli.verbose;

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err((e, logs)) => {
            if let Some(logs) = logs {
                logs.create_error_logger().log_error(&e, Some("main"), None).await;
            }

            if json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            ErrorReporter::new(use_color, verbose).report_error(&e);
            print_error_suggestions(&e);

            process::exit(e.exit_code());
        }
    }
}

type RunError = (AppError, Option<LoggerFactory>);

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> std::result::Result<i32, RunError> {
    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!("Built {} for {}", env!("BUILD_TIME"), env!("TARGET_TRIPLE"));
        eprintln!("Debug mode enabled");
        eprintln!();
    }

    // Load and validate configuration
    let config = load_config(cli).map_err(|e| (e, None))?;
    let logs = LoggerFactory::from_config(&config);

    run_tests(&config, &logs).await.map_err(|e| (e, Some(logs)))
}

async fn run_tests(config: &Config, logs: &LoggerFactory) -> Result<i32> {
    for warning in validate_config(config)? {
        eprintln!("{}", warning.format(config.enable_color));
    }

    if config.debug {
        eprintln!("Configuration loaded successfully:");
        eprintln!("{}", prototester::config::display_config_summary(config));
        eprintln!();
    }

    let tester = LatencyTester::new(
        Arc::new(DnsManager::new()),
        system_transport(),
        Arc::new(ConsoleReporter::from_config(config)),
        logs.clone(),
    );

    let result = tester.run(config.probe, &config.test).await?;

    OutputCoordinator::from_config(config).display_results(&result)?;

    if config.verbose {
        eprintln!();
        eprintln!("{}", summary_line(&result));
    }

    // The report is already out; the failure only sets the exit code
    if result.all_probes_failed() {
        let error = AppError::test_execution(format!("every {} probe failed", result.protocol));
        logs.create_error_logger().log_error(&error, Some("run"), None).await;
        return Ok(error.exit_code());
    }

    Ok(0)
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Use only one of -t, -u, --icmp, --http and --dns");
            eprintln!("  - -4 takes an IPv4 address and -6 an IPv6 address");
            eprintln!("  - --dns-protocol accepts udp, tcp, dot or doh");
            eprintln!("  - Check PROTOTESTER_* variables and your .env file");
        }
        AppError::DnsResolution(_) => {
            eprintln!();
            eprintln!("DNS resolution help:");
            eprintln!("  - --compare needs a hostname with both A and AAAA records");
            eprintln!("  - Test resolution manually with 'dig A' and 'dig AAAA'");
        }
        AppError::Network(_) | AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check that the target is reachable on the chosen port");
            eprintln!("  - Increase the per-probe timeout with --timeout");
            eprintln!("  - Verify IPv6 connectivity before testing IPv6 targets");
        }
        AppError::PermissionDenied(_) => {
            eprintln!();
            eprintln!("Permission help:");
            eprintln!("  - Raw ICMP sockets need root or CAP_NET_RAW");
            eprintln!("  - On Linux, unprivileged ICMP needs net.ipv4.ping_group_range");
        }
        _ => {}
    }
}
