//! Unix transport: native sockets with `select(2)` readiness.

use super::fdset::FdSet;
use super::{IcmpSocket, IcmpSocketKind, SocketTransport};
use crate::types::IpFamily;
use std::io;
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct UnixTransport;

impl UnixTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SocketTransport for UnixTransport {
    fn name(&self) -> &'static str {
        if cfg!(target_os = "linux") {
            "linux"
        } else if cfg!(target_os = "macos") {
            "darwin"
        } else {
            "unix"
        }
    }

    fn supports(&self, _kind: IcmpSocketKind) -> bool {
        true
    }

    fn has_ip_header(&self, family: IpFamily, kind: IcmpSocketKind) -> bool {
        match (family, kind) {
            (IpFamily::V6, _) => false,
            (IpFamily::V4, IcmpSocketKind::Raw) => true,
            // Darwin hands datagram ICMP sockets the full IPv4 packet
            (IpFamily::V4, IcmpSocketKind::Datagram) => cfg!(target_os = "macos"),
        }
    }

    fn wait_readable(&self, socket: &IcmpSocket, timeout: Duration) -> io::Result<bool> {
        let fd = socket.as_raw_fd();
        let mut set = FdSet::new();
        set.insert(fd)?;

        let mut raw = set.to_libc();
        let mut tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        // SAFETY: raw and tv are valid for the duration of the call and fd is
        // an open descriptor owned by `socket`.
        let ready = unsafe {
            libc::select(set.nfds(), &mut raw, ptr::null_mut(), ptr::null_mut(), &mut tv)
        };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }

        set.retain_from_libc(&raw);
        Ok(ready > 0 && set.contains(fd))
    }
}
