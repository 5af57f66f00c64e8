//! Hostname resolution and DNS exchanges used by the probes

pub mod exchange;
pub mod tls;

use crate::{
    error::{AppError, Result},
    types::IpFamily,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    sync::Arc,
};
use tokio::sync::RwLock;
use trust_dns_resolver::{system_conf, TokioAsyncResolver};

/// Anything that can turn a hostname into addresses
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// Resolver backed by the system DNS configuration.
///
/// The trust-dns resolver is created lazily on first use. If the system
/// configuration cannot be read, lookups go through the OS resolver via
/// `tokio::net::lookup_host` instead.
pub struct DnsManager {
    system_resolver: Arc<RwLock<Option<TokioAsyncResolver>>>,
}

impl DnsManager {
    pub fn new() -> Self {
        Self {
            system_resolver: Arc::new(RwLock::new(None)),
        }
    }

    /// Initialize the system DNS resolver
    pub async fn initialize_system_resolver(&self) -> Result<()> {
        let (config, opts) = system_conf::read_system_conf()
            .map_err(|e| AppError::dns_resolution(format!("Failed to read system DNS config: {}", e)))?;

        let resolver = TokioAsyncResolver::tokio(config, opts);

        let mut system_resolver = self.system_resolver.write().await;
        *system_resolver = Some(resolver);

        Ok(())
    }

    async fn resolver(&self) -> Option<TokioAsyncResolver> {
        if let Some(resolver) = self.system_resolver.read().await.as_ref() {
            return Some(resolver.clone());
        }
        if self.initialize_system_resolver().await.is_err() {
            return None;
        }
        self.system_resolver.read().await.clone()
    }

    async fn lookup_via_os(host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| AppError::dns_resolution(format!("DNS lookup failed for {}: {}", host, e)))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

impl Default for DnsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostResolver for DnsManager {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        match self.resolver().await {
            Some(resolver) => {
                let response = resolver
                    .lookup_ip(host)
                    .await
                    .map_err(|e| AppError::dns_resolution(format!("DNS lookup failed for {}: {}", host, e)))?;
                Ok(response.iter().collect())
            }
            None => Self::lookup_via_os(host).await,
        }
    }
}

/// Fixed host table, for tests and for pinning names without DNS
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, addrs: Vec<IpAddr>) -> Self {
        self.hosts.insert(host.to_ascii_lowercase(), addrs);
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| AppError::dns_resolution(format!("DNS lookup failed for {}: no such host", host)))
    }
}

/// First IPv4 and first IPv6 address, in resolver order
pub fn split_families(addrs: &[IpAddr]) -> (Option<Ipv4Addr>, Option<Ipv6Addr>) {
    let v4 = addrs.iter().find_map(|ip| match ip {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(_) => None,
    });
    let v6 = addrs.iter().find_map(|ip| match ip {
        IpAddr::V6(v6) => Some(*v6),
        IpAddr::V4(_) => None,
    });
    (v4, v6)
}

/// Addresses of both families for a comparison run.
///
/// Fails before any probing if either family has no address.
pub async fn resolve_dual_stack(resolver: &dyn HostResolver, host: &str) -> Result<(Ipv4Addr, Ipv6Addr)> {
    let addrs = resolver.lookup(host).await?;
    match split_families(&addrs) {
        (Some(v4), Some(v6)) => Ok((v4, v6)),
        (None, None) => Err(AppError::dns_resolution(format!("no A or AAAA records found for {}", host))),
        (None, Some(_)) => Err(AppError::dns_resolution(format!(
            "No IPv4 address found for {} - cannot perform comparison",
            host
        ))),
        (Some(_), None) => Err(AppError::dns_resolution(format!(
            "No IPv6 address found for {} - cannot perform comparison",
            host
        ))),
    }
}

/// First address of `family` for `host`. Literals of the other family are rejected.
pub async fn resolve_family(resolver: &dyn HostResolver, host: &str, family: IpFamily) -> Result<IpAddr> {
    let addrs = resolver.lookup(host).await?;
    addrs
        .into_iter()
        .find(|ip| IpFamily::of(ip) == family)
        .ok_or_else(|| AppError::dns_resolution(format!("no {} address found for {}", family, host)))
}
