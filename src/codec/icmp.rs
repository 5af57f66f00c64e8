//! ICMP Echo Request/Reply encoding for IPv4 and IPv6

use crate::types::IpFamily;

/// Size of the ICMP echo header (type, code, checksum, identifier, sequence)
pub const ICMP_HEADER_LEN: usize = 8;

/// Bytes at the start of the payload that carry the send timestamp
pub const TIMESTAMP_LEN: usize = 8;

pub const ECHO_REQUEST_V4: u8 = 8;
pub const ECHO_REPLY_V4: u8 = 0;
pub const ECHO_REQUEST_V6: u8 = 128;
pub const ECHO_REPLY_V6: u8 = 129;

/// An outgoing echo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoRequest {
    pub family: IpFamily,
    pub identifier: u16,
    pub sequence: u16,
    /// Payload bytes following the header
    pub payload_size: usize,
}

impl EchoRequest {
    pub fn new(family: IpFamily, identifier: u16, sequence: u16, payload_size: usize) -> Self {
        Self { family, identifier, sequence, payload_size }
    }

    /// Encode the request. `sent_at_nanos` is written big-endian into the
    /// first payload bytes when the payload is large enough to hold it.
    ///
    /// The checksum is only filled in when `with_checksum` is set, which is the
    /// raw IPv4 case; the kernel computes it for datagram sockets and ICMPv6.
    pub fn encode(&self, sent_at_nanos: u64, with_checksum: bool) -> Vec<u8> {
        let mut packet = vec![0u8; ICMP_HEADER_LEN + self.payload_size];
        packet[0] = match self.family {
            IpFamily::V4 => ECHO_REQUEST_V4,
            IpFamily::V6 => ECHO_REQUEST_V6,
        };
        packet[1] = 0;
        packet[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        packet[6..8].copy_from_slice(&self.sequence.to_be_bytes());

        if self.payload_size >= TIMESTAMP_LEN {
            packet[ICMP_HEADER_LEN..ICMP_HEADER_LEN + TIMESTAMP_LEN]
                .copy_from_slice(&sent_at_nanos.to_be_bytes());
        }

        if with_checksum {
            let checksum = internet_checksum(&packet);
            packet[2..4].copy_from_slice(&checksum.to_be_bytes());
        }

        packet
    }
}

/// RFC 1071 Internet checksum over `data`.
///
/// Sums big-endian 16-bit words, pads an odd trailing byte on the right,
/// folds carries into the low 16 bits and returns the one's complement.
/// Callers must zero the checksum field before computing.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

/// A decoded echo reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub family: IpFamily,
    pub identifier: u16,
    pub sequence: u16,
    /// Send timestamp echoed back in the payload, if present
    pub sent_at_nanos: Option<u64>,
}

impl EchoReply {
    /// Whether this reply answers our request. `identifier` is `None` on
    /// datagram sockets, where the kernel rewrites it.
    pub fn matches(&self, identifier: Option<u16>, sequence: u16) -> bool {
        self.sequence == sequence && identifier.map_or(true, |id| id == self.identifier)
    }
}

/// Decode an echo reply from a received buffer.
///
/// With `has_ip_header` the buffer starts with an IPv4 header of
/// `(buf[0] & 0x0F) * 4` bytes which is skipped first. Returns `None` for
/// anything that is not an echo reply or is too short to hold one.
pub fn decode_echo_reply(buf: &[u8], has_ip_header: bool) -> Option<EchoReply> {
    let icmp = if has_ip_header {
        let header_len = usize::from(*buf.first()? & 0x0F) * 4;
        buf.get(header_len..)?
    } else {
        buf
    };

    if icmp.len() < ICMP_HEADER_LEN {
        return None;
    }

    let family = match icmp[0] {
        ECHO_REPLY_V4 => IpFamily::V4,
        ECHO_REPLY_V6 => IpFamily::V6,
        _ => return None,
    };

    let sent_at_nanos = icmp
        .get(ICMP_HEADER_LEN..ICMP_HEADER_LEN + TIMESTAMP_LEN)
        .and_then(|bytes| <[u8; TIMESTAMP_LEN]>::try_from(bytes).ok())
        .map(u64::from_be_bytes);

    Some(EchoReply {
        family,
        identifier: u16::from_be_bytes([icmp[4], icmp[5]]),
        sequence: u16::from_be_bytes([icmp[6], icmp[7]]),
        sent_at_nanos,
    })
}

/// Decode `buf` and return the reply only if it answers the expected request.
pub fn match_echo_reply(
    buf: &[u8],
    identifier: Option<u16>,
    sequence: u16,
    has_ip_header: bool,
) -> Option<EchoReply> {
    decode_echo_reply(buf, has_ip_header).filter(|reply| reply.matches(identifier, sequence))
}

/// Identifier used for outgoing requests: the low 16 bits of the process id
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}
