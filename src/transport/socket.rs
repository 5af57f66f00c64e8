//! Owned ICMP socket handle. Closed on drop on every exit path.

use super::IcmpSocketKind;
use crate::types::{AppError, IpFamily, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub struct IcmpSocket {
    inner: Socket,
    family: IpFamily,
    kind: IcmpSocketKind,
}

impl IcmpSocket {
    /// Create a socket of the given kind. Permission problems surface as
    /// `AppError::PermissionDenied`.
    pub fn open(family: IpFamily, kind: IcmpSocketKind) -> Result<Self> {
        let (domain, protocol) = match family {
            IpFamily::V4 => (Domain::IPV4, Protocol::ICMPV4),
            IpFamily::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };
        let ty = match kind {
            IcmpSocketKind::Datagram => Type::DGRAM,
            IcmpSocketKind::Raw => Type::RAW,
        };

        let inner = Socket::new(domain, ty, Some(protocol))
            .map_err(|e| AppError::from_io(&format!("create {} {} socket", family, kind), e))?;

        Ok(Self { inner, family, kind })
    }

    /// Wrap an already created socket
    pub fn from_socket(inner: Socket, family: IpFamily, kind: IcmpSocketKind) -> Self {
        Self { inner, family, kind }
    }

    pub fn family(&self) -> IpFamily {
        self.family
    }

    pub fn kind(&self) -> IcmpSocketKind {
        self.kind
    }

    pub fn connect(&self, dst: IpAddr) -> Result<()> {
        self.inner
            .connect(&SockAddr::from(SocketAddr::new(dst, 0)))
            .map_err(|e| AppError::from_io(&format!("connect {} socket to {}", self.kind, dst), e))
    }

    /// Write to a connected socket
    pub fn send(&self, packet: &[u8]) -> Result<usize> {
        (&self.inner)
            .write(packet)
            .map_err(|e| AppError::from_io("send echo request", e))
    }

    pub fn send_to(&self, packet: &[u8], dst: IpAddr) -> Result<usize> {
        self.inner
            .send_to(packet, &SockAddr::from(SocketAddr::new(dst, 0)))
            .map_err(|e| AppError::from_io(&format!("send echo request to {}", dst), e))
    }

    /// Raw receive; errors are left unclassified so callers can retry `EINTR`
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.inner).read(buf)
    }

    pub fn set_receive_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    pub fn as_socket(&self) -> &Socket {
        &self.inner
    }

    /// Close explicitly. Dropping the socket has the same effect.
    pub fn close(self) {
        drop(self.inner);
    }
}

#[cfg(unix)]
impl std::os::unix::io::AsRawFd for IcmpSocket {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        std::os::unix::io::AsRawFd::as_raw_fd(&self.inner)
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawSocket for IcmpSocket {
    fn as_raw_socket(&self) -> std::os::windows::io::RawSocket {
        std::os::windows::io::AsRawSocket::as_raw_socket(&self.inner)
    }
}
