//! Test execution engine
//!
//! This module contains the latency tester that sequences probes:
//! - one immutable [`PhaseConfig`] per family/protocol phase
//! - strictly sequential probes inside a phase, one family after the other
//! - a [`Reporter`] capability for progress output instead of global handles
//! - IPv4 vs IPv6 scoring in [`comparison`]

pub mod comparison;

pub use comparison::{combined_score, protocol_score, Verdict, Winner, TCP_WEIGHT, UDP_WEIGHT};

use crate::{
    dns::{resolve_dual_stack, resolve_family, HostResolver},
    error::{AppError, Result},
    logging::{LoggerFactory, NetworkLogger, PerformanceLogger},
    models::{ComparisonResult, FamilyPair, ProbeResult, Statistics, TestConfig, TestResult},
    probe::{self, Probe},
    stats::StatisticsEngine,
    transport::SocketTransport,
    types::{DnsProtocol, IpFamily, ProbeKind, TestMode},
};
use chrono::Utc;
use colored::Colorize;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Everything one probe needs to know about its phase.
///
/// Built once per phase and never mutated while probes run.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    pub kind: ProbeKind,
    pub family: IpFamily,
    pub target: IpAddr,
    pub port: u16,
    pub count: u32,
    pub interval: Duration,
    pub timeout: Duration,
    pub icmp_size: usize,
    pub dns_protocol: DnsProtocol,
    pub dns_query: String,
}

impl PhaseConfig {
    /// Phase against `target`; the family follows from the address
    pub fn for_target(kind: ProbeKind, target: IpAddr, config: &TestConfig) -> Self {
        Self {
            kind,
            family: IpFamily::of(&target),
            target,
            port: config.port,
            count: config.count,
            interval: config.interval,
            timeout: config.timeout,
            icmp_size: config.icmp_size,
            dns_protocol: config.dns_protocol,
            dns_query: config.dns_query.clone(),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.target, self.port)
    }

    /// "TCP IPv6 ([2001:db8::1]:53)"
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.kind, self.family, self.socket_addr())
    }
}

/// Progress sink handed to the tester.
///
/// Every method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    fn phase_started(&self, _phase: &PhaseConfig) {}

    fn probe_completed(&self, _family: IpFamily, _seq: u32, _result: &ProbeResult) {}

    /// The ICMP probe moved from one socket mechanism to the next
    fn fallback(&self, _family: IpFamily, _from: &str, _to: &str) {}
}

/// Reporter that prints nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Verbose progress lines on the console
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    verbose: bool,
    use_color: bool,
    to_stderr: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, use_color: bool, to_stderr: bool) -> Self {
        Self {
            verbose,
            use_color,
            to_stderr,
        }
    }

    /// Progress goes to stderr when stdout carries a JSON report
    pub fn from_config(config: &crate::models::Config) -> Self {
        Self::new(config.verbose, config.enable_color, config.json_output)
    }

    fn emit(&self, line: &str) {
        if !self.verbose {
            return;
        }
        if self.to_stderr {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    pub fn format_probe_line(family: IpFamily, seq: u32, result: &ProbeResult) -> String {
        if result.success {
            format!("{} test {}: {:.3}ms", family, seq, result.latency_ms())
        } else {
            format!(
                "{} test {}: failed ({})",
                family,
                seq,
                result.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

impl Reporter for ConsoleReporter {
    fn phase_started(&self, phase: &PhaseConfig) {
        let line = format!("Testing {}...", phase.label());
        if self.use_color {
            self.emit(&line.bold().to_string());
        } else {
            self.emit(&line);
        }
    }

    fn probe_completed(&self, family: IpFamily, seq: u32, result: &ProbeResult) {
        let line = Self::format_probe_line(family, seq, result);
        if self.use_color && !result.success {
            self.emit(&line.red().to_string());
        } else {
            self.emit(&line);
        }
    }

    fn fallback(&self, family: IpFamily, from: &str, to: &str) {
        let line = format!("{}: {} not permitted, using {}", family, from, to);
        if self.use_color {
            self.emit(&line.yellow().to_string());
        } else {
            self.emit(&line);
        }
    }
}

/// Probe results of the phase currently running, one list per family
#[derive(Debug, Default)]
struct FamilyResults {
    ipv4: Vec<ProbeResult>,
    ipv6: Vec<ProbeResult>,
}

impl FamilyResults {
    fn list_mut(&mut self, family: IpFamily) -> &mut Vec<ProbeResult> {
        match family {
            IpFamily::V4 => &mut self.ipv4,
            IpFamily::V6 => &mut self.ipv6,
        }
    }

    fn list(&self, family: IpFamily) -> &[ProbeResult] {
        match family {
            IpFamily::V4 => &self.ipv4,
            IpFamily::V6 => &self.ipv6,
        }
    }
}

/// Runs single-target and IPv4 vs IPv6 comparison tests.
///
/// Phases run one after another on the same instance; each phase clears its
/// family's result list before the first probe.
pub struct LatencyTester {
    resolver: Arc<dyn HostResolver>,
    transport: Arc<dyn SocketTransport>,
    reporter: Arc<dyn Reporter>,
    engine: StatisticsEngine,
    logs: LoggerFactory,
    net_logger: NetworkLogger,
    perf_logger: PerformanceLogger,
    results: Mutex<FamilyResults>,
}

impl LatencyTester {
    pub fn new(
        resolver: Arc<dyn HostResolver>,
        transport: Arc<dyn SocketTransport>,
        reporter: Arc<dyn Reporter>,
        logs: LoggerFactory,
    ) -> Self {
        Self {
            resolver,
            transport,
            reporter,
            engine: StatisticsEngine::with_defaults(),
            net_logger: logs.create_network_logger(),
            perf_logger: logs.create_performance_logger(),
            logs,
            results: Mutex::new(FamilyResults::default()),
        }
    }

    pub fn with_statistics_engine(mut self, engine: StatisticsEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Snapshot of the results collected so far for `family`
    pub async fn results(&self, family: IpFamily) -> Vec<ProbeResult> {
        self.results.lock().await.list(family).to_vec()
    }

    /// Run `kind` in the mode selected by `config`
    pub async fn run(&self, kind: ProbeKind, config: &TestConfig) -> Result<TestResult> {
        config.validate()?;
        let started = Instant::now();
        let operation = format!("{} {:?} test", kind, config.mode());
        let correlation_id = self.perf_logger.logger().start_operation(&operation).await;

        let outcome = match config.mode() {
            TestMode::Single => self.run_single(kind, config).await,
            TestMode::Compare => self.run_compare(kind, config).await,
        };
        self.perf_logger
            .logger()
            .end_operation(&correlation_id, &operation, outcome.is_ok())
            .await;
        let result = outcome?;

        let probes = config.count as usize * phases_in(&result);
        self.perf_logger
            .log_operation_complete(&operation, started.elapsed(), probes)
            .await;

        Ok(result)
    }

    /// Probe the configured targets, IPv6 first.
    ///
    /// A target that fails to resolve only fails its own family: that family
    /// records `count` DNS failures and the other family still runs.
    pub async fn run_single(&self, kind: ProbeKind, config: &TestConfig) -> Result<TestResult> {
        let mut result = TestResult::new(TestMode::Single, protocol_label(kind, config.dns_protocol), config.clone());

        if config.tests_ipv6() {
            let stats = self.run_family(kind, IpFamily::V6, config, &mut result).await;
            result.ipv6_results = Some(stats);
        }

        if config.tests_ipv4() {
            let stats = self.run_family(kind, IpFamily::V4, config, &mut result).await;
            result.ipv4_results = Some(stats);
        }

        result.timestamp = Utc::now();
        Ok(result)
    }

    async fn run_family(&self, kind: ProbeKind, family: IpFamily, config: &TestConfig, result: &mut TestResult) -> Statistics {
        let (key, target) = match family {
            IpFamily::V4 => ("ipv4", config.target4.as_str()),
            IpFamily::V6 => ("ipv6", config.target6.as_str()),
        };

        match self.resolve(target, family).await {
            Ok(ip) => {
                result.targets.insert(key.to_string(), ip.to_string());
                self.run_phase(&PhaseConfig::for_target(kind, ip, config)).await
            }
            Err(e) => {
                crate::log_warn!(
                    self.net_logger.logger(),
                    "{} target {} did not resolve, recording {} failed probes: {}",
                    family,
                    target,
                    config.count,
                    e
                )
                .field("host", target)
                .field("family", family.label())
                .error_info(&e)
                .log()
                .await;
                result.targets.insert(key.to_string(), target.to_string());
                result.error_message = Some(match result.error_message.take() {
                    Some(previous) => format!("{}; {}", previous, e),
                    None => e.to_string(),
                });
                self.record_unresolved(family, config.count, &e).await
            }
        }
    }

    /// Fill `family` with `count` failures carrying the resolution error
    async fn record_unresolved(&self, family: IpFamily, count: u32, error: &AppError) -> Statistics {
        let mut results = self.results.lock().await;
        let list = results.list_mut(family);
        list.clear();
        for seq in 1..=count {
            let outcome = ProbeResult::failure(error);
            self.reporter.probe_completed(family, seq, &outcome);
            list.push(outcome);
        }
        self.engine.calculate(list.as_slice())
    }

    /// Resolve the hostname to both families and compare them.
    ///
    /// TCP and UDP runs test both protocols and weight them; other kinds
    /// compare the one protocol.
    pub async fn run_compare(&self, kind: ProbeKind, config: &TestConfig) -> Result<TestResult> {
        let hostname = config.hostname.as_deref().unwrap_or_default();

        let lookup_started = Instant::now();
        let (v4, v6) = match resolve_dual_stack(self.resolver.as_ref(), hostname).await {
            Ok(pair) => pair,
            Err(e) => {
                self.net_logger.log_resolution_failure(hostname, &e).await;
                return Err(e);
            }
        };
        self.net_logger
            .log_resolution(hostname, &[IpAddr::V6(v6), IpAddr::V4(v4)], lookup_started.elapsed())
            .await;

        let ipv4 = IpAddr::V4(v4);
        let ipv6 = IpAddr::V6(v6);

        let mut comparison = ComparisonResult {
            hostname: hostname.to_string(),
            protocol: String::new(),
            port: config.port,
            resolved_ipv4: ipv4,
            resolved_ipv6: ipv6,
            tcp: None,
            udp: None,
            icmp: None,
            http: None,
            dns: None,
            dns_query: None,
            ipv4_score: 0.0,
            ipv6_score: 0.0,
            winner: String::new(),
            percent_better: None,
            timestamp: Utc::now(),
        };

        let verdict = match kind {
            ProbeKind::Tcp | ProbeKind::Udp => {
                let tcp = self.run_pair(ProbeKind::Tcp, ipv4, ipv6, config).await;
                let udp = self.run_pair(ProbeKind::Udp, ipv4, ipv6, config).await;
                let verdict = Verdict::from_tcp_udp(&tcp, &udp);
                comparison.protocol = "TCP/UDP".to_string();
                comparison.tcp = Some(tcp);
                comparison.udp = Some(udp);
                verdict
            }
            other => {
                let pair = self.run_pair(other, ipv4, ipv6, config).await;
                let verdict = Verdict::from_single(&pair);
                comparison.protocol = protocol_label(other, config.dns_protocol);
                match other {
                    ProbeKind::Icmp => comparison.icmp = Some(pair),
                    ProbeKind::Http => comparison.http = Some(pair),
                    _ => {
                        comparison.dns_query = Some(config.dns_query.clone());
                        comparison.dns = Some(pair);
                    }
                }
                verdict
            }
        };

        comparison.ipv4_score = verdict.ipv4_score;
        comparison.ipv6_score = verdict.ipv6_score;
        comparison.winner = verdict.winner.to_string();
        comparison.percent_better = verdict.percent_better;
        comparison.timestamp = Utc::now();

        let mut result = TestResult::new(TestMode::Compare, comparison.protocol.clone(), config.clone());
        result.targets.insert("hostname".to_string(), hostname.to_string());
        result.targets.insert("ipv4".to_string(), ipv4.to_string());
        result.targets.insert("ipv6".to_string(), ipv6.to_string());
        result.comparison = Some(comparison);
        Ok(result)
    }

    /// One protocol over both families, IPv6 first
    async fn run_pair(&self, kind: ProbeKind, ipv4: IpAddr, ipv6: IpAddr, config: &TestConfig) -> FamilyPair {
        let ipv6 = self.run_phase(&PhaseConfig::for_target(kind, ipv6, config)).await;
        let ipv4 = self.run_phase(&PhaseConfig::for_target(kind, ipv4, config)).await;
        FamilyPair { ipv4, ipv6 }
    }

    /// Run `phase.count` probes back to back and reduce them.
    ///
    /// No interval sleep follows the last probe.
    pub async fn run_phase(&self, phase: &PhaseConfig) -> Statistics {
        let probe = probe::for_kind(phase.kind, Arc::clone(&self.transport), &self.logs);
        let started = Instant::now();

        self.results.lock().await.list_mut(phase.family).clear();
        self.reporter.phase_started(phase);
        crate::log_debug!(self.perf_logger.logger(), "Starting {}", phase.label())
            .field("count", phase.count)
            .field("interval_ms", phase.interval.as_millis() as u64)
            .field("timeout_ms", phase.timeout.as_millis() as u64)
            .log()
            .await;

        for seq in 1..=phase.count {
            let outcome = self.probe_once(probe.as_ref(), phase, seq).await;
            self.reporter.probe_completed(phase.family, seq, &outcome);
            self.results.lock().await.list_mut(phase.family).push(outcome);

            if seq < phase.count && !phase.interval.is_zero() {
                tokio::time::sleep(phase.interval).await;
            }
        }

        let collected = self.results(phase.family).await;
        let stats = self.engine.calculate(&collected);
        self.perf_logger.log_phase_complete(phase, started.elapsed(), &stats).await;
        stats
    }

    async fn probe_once(&self, probe: &dyn Probe, phase: &PhaseConfig, seq: u32) -> ProbeResult {
        probe::execute(probe, phase, seq, self.reporter.as_ref(), &self.net_logger).await
    }

    async fn resolve(&self, target: &str, family: IpFamily) -> Result<IpAddr> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ip);
        }

        let started = Instant::now();
        let ip = resolve_family(self.resolver.as_ref(), target, family).await?;
        self.net_logger.log_resolution(target, &[ip], started.elapsed()).await;
        Ok(ip)
    }
}

/// "DNS-UDP" style labels for DNS, the probe name otherwise
pub fn protocol_label(kind: ProbeKind, dns_protocol: DnsProtocol) -> String {
    match kind {
        ProbeKind::Dns => dns_protocol.report_label(),
        other => other.as_str().to_string(),
    }
}

fn phases_in(result: &TestResult) -> usize {
    match &result.comparison {
        Some(cmp) => 2 * [&cmp.tcp, &cmp.udp, &cmp.icmp, &cmp.http, &cmp.dns].iter().filter(|p| p.is_some()).count(),
        None => result.ipv4_results.iter().count() + result.ipv6_results.iter().count(),
    }
}
