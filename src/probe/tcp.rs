use super::Probe;
use crate::{
    error::{AppError, Result},
    executor::{PhaseConfig, Reporter},
    types::ProbeKind,
};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time;

/// Time to an established TCP connection
pub struct TcpProbe;

/// Connect to `addr` and return the handshake time. The stream is dropped
/// immediately.
pub async fn connect_latency(addr: SocketAddr, timeout: Duration) -> Result<Duration> {
    let started = Instant::now();
    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(started.elapsed()),
        Ok(Err(e)) => Err(AppError::from_io(&format!("connect to {}", addr), e)),
        Err(_) => Err(AppError::timeout(format!("connect to {} timed out after {:?}", addr, timeout))),
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Tcp
    }

    async fn probe(&self, phase: &PhaseConfig, _seq: u32, _reporter: &dyn Reporter) -> Result<Duration> {
        connect_latency(phase.socket_addr(), phase.timeout).await
    }
}
