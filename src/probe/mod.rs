//! Protocol probes: one timed round trip per call.
//!
//! Every variant implements [`Probe`] and reports its outcome as a plain
//! `Result<Duration>`. [`execute`] is the boundary where errors become
//! data: it always returns a [`ProbeResult`], never an error.

pub mod dns;
pub mod http;
pub mod icmp;
pub mod tcp;
pub mod udp;

pub use dns::DnsProbe;
pub use http::HttpProbe;
pub use icmp::IcmpProbe;
pub use tcp::TcpProbe;
pub use udp::UdpProbe;

use crate::{
    error::Result,
    executor::{PhaseConfig, Reporter},
    logging::{LoggerFactory, NetworkLogger},
    models::ProbeResult,
    transport::SocketTransport,
    types::ProbeKind,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A single protocol round trip against the target of a phase
#[async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Perform probe number `seq` (1-based) and return its latency
    async fn probe(&self, phase: &PhaseConfig, seq: u32, reporter: &dyn Reporter) -> Result<Duration>;
}

/// Run one probe and capture the outcome, success or failure, as data
pub async fn execute(
    probe: &dyn Probe,
    phase: &PhaseConfig,
    seq: u32,
    reporter: &dyn Reporter,
    logger: &NetworkLogger,
) -> ProbeResult {
    let outcome = probe.probe(phase, seq, reporter).await;
    let log = logger.logger();
    match outcome {
        Ok(latency) => {
            let latency_ms = latency.as_secs_f64() * 1000.0;
            crate::log_debug!(log, "{} probe {}: {:.3}ms", phase.label(), seq, latency_ms)
                .probe(phase.kind, phase.family, &phase.target, seq)
                .field("latency_ms", latency_ms)
                .field("success", true)
                .log()
                .await;
            ProbeResult::success(latency)
        }
        Err(e) => {
            crate::log_debug!(log, "{} probe {} failed: {}", phase.label(), seq, e)
                .probe(phase.kind, phase.family, &phase.target, seq)
                .field("success", false)
                .error_info(&e)
                .log()
                .await;
            ProbeResult::failure(&e)
        }
    }
}

/// Build the probe for `kind`. ICMP needs the platform socket transport.
pub fn for_kind(kind: ProbeKind, transport: Arc<dyn SocketTransport>, logs: &LoggerFactory) -> Box<dyn Probe> {
    match kind {
        ProbeKind::Tcp => Box::new(TcpProbe),
        ProbeKind::Udp => Box::new(UdpProbe),
        ProbeKind::Icmp => Box::new(IcmpProbe::new(transport).with_logger(logs.create_network_logger())),
        ProbeKind::Http => Box::new(HttpProbe),
        ProbeKind::Dns => Box::new(DnsProbe),
    }
}
