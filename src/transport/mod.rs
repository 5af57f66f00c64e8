//! Socket primitives for ICMP probing behind one interface.
//!
//! The concrete platform transport is chosen once by [`system_transport`];
//! probe code only ever sees `dyn SocketTransport`. Everything here is
//! blocking and is meant to run on a blocking thread.

pub mod echo;
pub mod socket;

#[cfg(unix)]
pub mod fdset;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use echo::echo_round_trip;
pub use socket::IcmpSocket;

use crate::types::{AppError, IpFamily, Result};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Kind of ICMP socket, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmpSocketKind {
    /// `SOCK_DGRAM` + ICMP protocol, usable without privileges on some systems
    Datagram,
    /// `SOCK_RAW`, needs elevated privileges
    Raw,
}

impl fmt::Display for IcmpSocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datagram => f.write_str("unprivileged ICMP"),
            Self::Raw => f.write_str("raw ICMP"),
        }
    }
}

/// Platform socket operations used by the ICMP probe
pub trait SocketTransport: Send + Sync {
    /// Short platform name for logs
    fn name(&self) -> &'static str;

    /// Whether this platform can create the given socket kind at all.
    /// Unsupported kinds are skipped by the fallback chain.
    fn supports(&self, kind: IcmpSocketKind) -> bool;

    /// Whether replies read from this socket start with an IPv4 header
    fn has_ip_header(&self, family: IpFamily, kind: IcmpSocketKind) -> bool;

    fn open_icmp(&self, family: IpFamily, kind: IcmpSocketKind) -> Result<IcmpSocket> {
        IcmpSocket::open(family, kind)
    }

    /// Wait until `socket` is readable or `timeout` elapses.
    ///
    /// `Ok(false)` means the timeout expired. An `Interrupted` error may be
    /// returned and is retried by [`recv_matching`].
    fn wait_readable(&self, socket: &IcmpSocket, timeout: Duration) -> io::Result<bool>;
}

/// The transport for the platform this binary was built for
pub fn system_transport() -> Arc<dyn SocketTransport> {
    #[cfg(unix)]
    {
        Arc::new(unix::UnixTransport::new())
    }
    #[cfg(windows)]
    {
        Arc::new(windows::WindowsTransport::new())
    }
}

/// Read packets until `accept` returns a value or `timeout` elapses.
///
/// Stray packets (those `accept` rejects) are dropped and reading continues.
/// The remaining time is recomputed from a monotonic deadline on every
/// iteration, and `EINTR` is retried.
pub fn recv_matching<T>(
    transport: &dyn SocketTransport,
    socket: &IcmpSocket,
    timeout: Duration,
    mut accept: impl FnMut(&[u8]) -> Option<T>,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; crate::defaults::RECV_BUFFER_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(reply_timeout(timeout));
        }

        match transport.wait_readable(socket, remaining) {
            Ok(true) => {}
            Ok(false) => return Err(reply_timeout(timeout)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AppError::from_io("wait for ICMP reply", e)),
        }

        match socket.recv(&mut buf) {
            Ok(n) => {
                if let Some(value) = accept(&buf[..n]) {
                    return Ok(value);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Err(reply_timeout(timeout));
            }
            Err(e) => return Err(AppError::from_io("receive ICMP reply", e)),
        }
    }
}

fn reply_timeout(timeout: Duration) -> AppError {
    AppError::timeout(format!("no echo reply within {:?}", timeout))
}
