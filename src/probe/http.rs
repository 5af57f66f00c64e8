use super::Probe;
use crate::{
    client::{probe_client, probe_url},
    error::Result,
    executor::{PhaseConfig, Reporter},
    types::ProbeKind,
};
use async_trait::async_trait;
use reqwest::Url;
use std::time::{Duration, Instant};

/// Full HEAD request/response cycle, TLS handshake included.
///
/// Any HTTP status counts as a reply.
pub struct HttpProbe;

/// https for 443 and 8443, http otherwise
pub fn scheme_for_port(port: u16) -> &'static str {
    match port {
        443 | 8443 => "https",
        _ => "http",
    }
}

pub fn head_url(phase: &PhaseConfig) -> Result<Url> {
    probe_url(scheme_for_port(phase.port), &phase.target, phase.port, "/")
}

#[async_trait]
impl Probe for HttpProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Http
    }

    async fn probe(&self, phase: &PhaseConfig, _seq: u32, _reporter: &dyn Reporter) -> Result<Duration> {
        let client = probe_client(phase.family, phase.timeout)?;
        let url = head_url(phase)?;

        let started = Instant::now();
        let _response = client.head(url).send().await?;
        Ok(started.elapsed())
    }
}
