//! HTTP client construction for the HTTP and DNS-over-HTTPS probes

use crate::{
    error::{AppError, Result},
    types::IpFamily,
};
use reqwest::{Client, Url};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Wildcard local address of a family, used to pin outgoing connections to it
pub fn unspecified_addr(family: IpFamily) -> IpAddr {
    match family {
        IpFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

/// Host part of a URL for an address literal; IPv6 needs brackets
pub fn url_host(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}

/// `scheme://host:port/path` for an address literal
pub fn probe_url(scheme: &str, ip: &IpAddr, port: u16, path: &str) -> Result<Url> {
    let url = Url::parse(&format!("{}://{}:{}{}", scheme, url_host(ip), port, path))?;
    Ok(url)
}

/// Build a client for one probe.
///
/// Connections are bound to the requested family, certificate checks are
/// off (targets are bare IPs), and no idle connections are pooled so every
/// request pays for its own handshake.
pub fn probe_client(family: IpFamily, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .local_address(unspecified_addr(family))
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
        .build()
        .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
}
