//! Windows transport.
//!
//! Winsock `select` is not used. Readiness is approximated by arming the
//! receive timeout and reporting the socket as ready, so the following
//! blocking receive returns `WouldBlock`/`TimedOut` once the time is up.
//! Precision is therefore that of `SO_RCVTIMEO` (milliseconds, and the
//! wait restarts on each stray packet) rather than a true select deadline.

use super::{IcmpSocket, IcmpSocketKind, SocketTransport};
use crate::types::IpFamily;
use std::io;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct WindowsTransport;

impl WindowsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SocketTransport for WindowsTransport {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn supports(&self, kind: IcmpSocketKind) -> bool {
        // No unprivileged ICMP sockets on Windows
        kind == IcmpSocketKind::Raw
    }

    fn has_ip_header(&self, family: IpFamily, kind: IcmpSocketKind) -> bool {
        family == IpFamily::V4 && kind == IcmpSocketKind::Raw
    }

    fn wait_readable(&self, socket: &IcmpSocket, timeout: Duration) -> io::Result<bool> {
        // A zero timeout would mean "block forever"
        let timeout = timeout.max(Duration::from_millis(1));
        socket.set_receive_timeout(Some(timeout))?;
        Ok(true)
    }
}
