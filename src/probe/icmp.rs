//! ICMP echo probe with the socket privilege fallback chain.
//!
//! Each probe walks the chain from the least privileged mechanism:
//!
//! 1. unprivileged datagram ICMP socket (connect + write)
//! 2. raw ICMP socket (sendto, checksum computed for IPv4)
//! 3. TCP connect to the same target and port
//!
//! Only a permission-class error moves to the next level. Timeouts,
//! unreachable networks and protocol errors end the probe immediately.
//! Levels the platform does not support are skipped.

use super::{tcp::connect_latency, Probe};
use crate::{
    codec::icmp::process_identifier,
    error::{AppError, Result},
    executor::{PhaseConfig, Reporter},
    logging::NetworkLogger,
    transport::{echo_round_trip, IcmpSocketKind, SocketTransport},
    types::ProbeKind,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const TCP_FALLBACK_LABEL: &str = "TCP connect";

pub struct IcmpProbe {
    transport: Arc<dyn SocketTransport>,
    identifier: u16,
    logger: NetworkLogger,
}

impl IcmpProbe {
    pub fn new(transport: Arc<dyn SocketTransport>) -> Self {
        Self {
            transport,
            identifier: process_identifier(),
            logger: NetworkLogger::new(),
        }
    }

    pub fn with_logger(mut self, logger: NetworkLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Socket kinds to try, in order, on this platform
    pub fn chain(&self) -> Vec<IcmpSocketKind> {
        [IcmpSocketKind::Datagram, IcmpSocketKind::Raw]
            .into_iter()
            .filter(|kind| self.transport.supports(*kind))
            .collect()
    }

    /// One blocking echo round trip on a blocking-pool thread
    async fn echo(&self, kind: IcmpSocketKind, phase: &PhaseConfig, sequence: u16) -> Result<Duration> {
        let transport = Arc::clone(&self.transport);
        let target = phase.target;
        let identifier = self.identifier;
        let payload_size = phase.icmp_size;
        let timeout = phase.timeout;

        tokio::task::spawn_blocking(move || {
            echo_round_trip(transport.as_ref(), kind, target, identifier, sequence, payload_size, timeout)
        })
        .await
        .map_err(|e| AppError::internal(format!("ICMP probe task failed: {}", e)))?
    }
}

#[async_trait]
impl Probe for IcmpProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Icmp
    }

    async fn probe(&self, phase: &PhaseConfig, seq: u32, reporter: &dyn Reporter) -> Result<Duration> {
        // Sequence numbers wrap at 16 bits; stale replies are rejected by timestamp
        let sequence = (seq & 0xffff) as u16;
        let chain = self.chain();

        for (level, kind) in chain.iter().enumerate() {
            match self.echo(*kind, phase, sequence).await {
                Ok(latency) => return Ok(latency),
                Err(e) if e.is_permission_denied() => {
                    let next = chain
                        .get(level + 1)
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| TCP_FALLBACK_LABEL.to_string());
                    let from = kind.to_string();
                    self.logger.log_icmp_fallback(phase.family, &from, &next, &e).await;
                    reporter.fallback(phase.family, &from, &next);
                }
                Err(e) => return Err(e),
            }
        }

        connect_latency(phase.socket_addr(), phase.timeout).await
    }
}
