//! One ICMP echo round trip over a single socket kind.

use super::{recv_matching, IcmpSocketKind, SocketTransport};
use crate::codec::icmp::{match_echo_reply, EchoRequest};
use crate::types::{IpFamily, Result};
use std::net::IpAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Send one echo request to `dst` and wait for its reply.
///
/// Datagram sockets are connected and written to; the kernel fills in the
/// checksum and rewrites the identifier, so replies are matched on sequence
/// alone. Raw sockets use `sendto`, carry a computed checksum for IPv4, and
/// are matched on identifier and sequence.
///
/// The socket is scoped to this call and closed on every exit path.
pub fn echo_round_trip(
    transport: &dyn SocketTransport,
    kind: IcmpSocketKind,
    dst: IpAddr,
    identifier: u16,
    sequence: u16,
    payload_size: usize,
    timeout: Duration,
) -> Result<Duration> {
    let family = IpFamily::of(&dst);
    let socket = transport.open_icmp(family, kind)?;
    let request = EchoRequest::new(family, identifier, sequence, payload_size);

    let sent_at_nanos = unix_nanos();
    let started = Instant::now();
    match kind {
        IcmpSocketKind::Datagram => {
            socket.connect(dst)?;
            socket.send(&request.encode(sent_at_nanos, false))?;
        }
        IcmpSocketKind::Raw => {
            let packet = request.encode(sent_at_nanos, family == IpFamily::V4);
            socket.send_to(&packet, dst)?;
        }
    }

    let expected_id = match kind {
        IcmpSocketKind::Datagram => None,
        IcmpSocketKind::Raw => Some(identifier),
    };
    let has_ip_header = transport.has_ip_header(family, kind);

    recv_matching(transport, &socket, timeout, |buf| {
        let reply = match_echo_reply(buf, expected_id, sequence, has_ip_header)?;
        // An echoed timestamp from an older probe with a wrapped sequence
        // number is a stray reply.
        match reply.sent_at_nanos {
            Some(echoed) if echoed != sent_at_nanos => None,
            Some(echoed) => Some(latency_from_timestamp(echoed, started)),
            None => Some(started.elapsed()),
        }
    })
}

/// Receive time minus the embedded send time, or the monotonic elapsed time
/// if the wall clock stepped backwards in between.
fn latency_from_timestamp(sent_at_nanos: u64, started: Instant) -> Duration {
    unix_nanos()
        .checked_sub(sent_at_nanos)
        .map(Duration::from_nanos)
        .unwrap_or_else(|| started.elapsed())
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
