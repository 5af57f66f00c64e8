//! Minimal DNS message codec: one A/IN question out, header checks in.
//!
//! Only what a round-trip timing needs is implemented. Answers are never
//! parsed; a response is accepted once it is long enough to hold a header
//! and echoes the query's transaction id.

use crate::types::{AppError, Result};

pub const DNS_HEADER_LEN: usize = 12;
pub const MAX_LABEL_LEN: usize = 63;
/// Longest encoded QNAME, terminator included
pub const MAX_NAME_LEN: usize = 255;

/// Standard query with recursion desired
pub const FLAGS_STANDARD_QUERY: u16 = 0x0100;
pub const QTYPE_A: u16 = 1;
pub const QCLASS_IN: u16 = 1;

/// Largest length-prefixed response accepted over TCP/DoT
pub const MAX_TCP_RESPONSE_LEN: usize = crate::defaults::MAX_TCP_DNS_RESPONSE;

/// Fixed 12-byte message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    /// Header for a single-question recursive query
    pub fn query(id: u16) -> Self {
        Self {
            id,
            flags: FLAGS_STANDARD_QUERY,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; DNS_HEADER_LEN] {
        let mut out = [0u8; DNS_HEADER_LEN];
        for (i, value) in [self.id, self.flags, self.qdcount, self.ancount, self.nscount, self.arcount]
            .into_iter()
            .enumerate()
        {
            out[i * 2..i * 2 + 2].copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < DNS_HEADER_LEN {
            return Err(AppError::protocol(format!("DNS response too short: {} bytes", buf.len())));
        }
        let word = |i: usize| u16::from_be_bytes([buf[i], buf[i + 1]]);
        Ok(Self {
            id: word(0),
            flags: word(2),
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }
}

/// The question section entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuestion {
    pub fn a_record(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qtype: QTYPE_A,
            qclass: QCLASS_IN,
        }
    }

    /// Append QNAME, QTYPE and QCLASS to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        for label in labels(&self.name)? {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        if out.len() - start > MAX_NAME_LEN {
            return Err(AppError::validation(format!("domain name too long: {}", self.name)));
        }
        out.extend_from_slice(&self.qtype.to_be_bytes());
        out.extend_from_slice(&self.qclass.to_be_bytes());
        Ok(())
    }
}

/// Split a dotted name into labels. A single trailing dot (the root) is
/// accepted; empty labels anywhere else are not.
fn labels(name: &str) -> Result<Vec<&str>> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(AppError::validation("domain name is empty"));
    }

    trimmed
        .split('.')
        .map(|label| {
            if label.is_empty() {
                Err(AppError::validation(format!("empty label in domain: {}", name)))
            } else if label.len() > MAX_LABEL_LEN {
                Err(AppError::validation(format!("domain label too long: {}", label)))
            } else {
                Ok(label)
            }
        })
        .collect()
}

/// Check that `domain` can be encoded as a QNAME
pub fn validate_domain(domain: &str) -> Result<()> {
    DnsQuestion::a_record(domain).encode_into(&mut Vec::with_capacity(MAX_NAME_LEN + 4))
}

/// Encode a query with a caller-chosen id
pub fn encode_query(id: u16, question: &DnsQuestion) -> Result<Vec<u8>> {
    let mut packet = Vec::with_capacity(512);
    packet.extend_from_slice(&DnsHeader::query(id).to_bytes());
    question.encode_into(&mut packet)?;
    Ok(packet)
}

/// Build an A/IN query for `domain` with a random transaction id.
///
/// Returns the encoded message and the id the response must echo.
pub fn build_query(domain: &str) -> Result<(Vec<u8>, u16)> {
    let id: u16 = rand::random();
    let packet = encode_query(id, &DnsQuestion::a_record(domain))?;
    Ok((packet, id))
}

/// Check framing and transaction id of a response
pub fn validate_response(buf: &[u8], query_id: u16) -> Result<()> {
    let header = DnsHeader::parse(buf)?;
    if header.id != query_id {
        return Err(AppError::protocol(format!(
            "DNS response ID mismatch: got {}, expected {}",
            header.id, query_id
        )));
    }
    Ok(())
}

/// Prefix a query with its 2-byte big-endian length for stream transports
pub fn frame_stream_query(query: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(query.len())
        .map_err(|_| AppError::validation(format!("DNS query too large: {} bytes", query.len())))?;
    let mut framed = Vec::with_capacity(query.len() + 2);
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(query);
    Ok(framed)
}

/// Decode a stream response length prefix, rejecting implausible sizes
pub fn stream_response_len(prefix: [u8; 2]) -> Result<usize> {
    let len = usize::from(u16::from_be_bytes(prefix));
    if len > MAX_TCP_RESPONSE_LEN {
        return Err(AppError::protocol(format!("DNS response too large: {} bytes", len)));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_layout() {
        let packet = encode_query(0xabcd, &DnsQuestion::a_record("dns-query.qosbox.com")).unwrap();

        assert_eq!(&packet[0..2], &[0xab, 0xcd]);
        assert_eq!(&packet[2..4], &[0x01, 0x00]);
        assert_eq!(&packet[4..6], &[0, 1]);
        assert_eq!(&packet[6..12], &[0; 6]);

        let mut expected_name = vec![9];
        expected_name.extend_from_slice(b"dns-query");
        expected_name.push(6);
        expected_name.extend_from_slice(b"qosbox");
        expected_name.push(3);
        expected_name.extend_from_slice(b"com");
        expected_name.push(0);
        assert_eq!(&packet[12..12 + expected_name.len()], expected_name.as_slice());

        let tail = &packet[12 + expected_name.len()..];
        assert_eq!(tail, &[0, 1, 0, 1]);
    }

    #[test]
    fn test_build_query_id_round_trips() {
        for _ in 0..32 {
            let (packet, id) = build_query("example.com").unwrap();
            assert_eq!(u16::from_be_bytes([packet[0], packet[1]]), id);
            assert!(validate_response(&packet, id).is_ok());
        }
    }

    #[test]
    fn test_label_limits() {
        let ok = format!("{}.com", "a".repeat(63));
        assert!(build_query(&ok).is_ok());

        let long = "b".repeat(64);
        let err = build_query(&format!("{}.com", long)).unwrap_err();
        assert_eq!(err.category(), "VALIDATION");
        assert!(err.to_string().contains(&format!("domain label too long: {}", long)));
    }

    #[test]
    fn test_trailing_dot_and_empty_labels() {
        let plain = encode_query(1, &DnsQuestion::a_record("example.com")).unwrap();
        let rooted = encode_query(1, &DnsQuestion::a_record("example.com.")).unwrap();
        assert_eq!(plain, rooted);

        assert!(validate_domain("example..com").is_err());
        assert!(validate_domain("").is_err());
        assert!(validate_domain(".").is_err());
    }

    #[test]
    fn test_name_length_limit() {
        let name = vec!["a".repeat(63); 4].join(".");
        assert!(validate_domain(&name).is_err());
    }

    #[test]
    fn test_validate_response_errors() {
        let err = validate_response(&[0u8; 11], 1).unwrap_err();
        assert_eq!(err.category(), "PROTOCOL");
        assert!(err.to_string().contains("DNS response too short: 11 bytes"));

        let mut response = DnsHeader::query(0x1111).to_bytes().to_vec();
        response[2] = 0x81;
        let err = validate_response(&response, 0x2222).unwrap_err();
        assert_eq!(err.category(), "PROTOCOL");
        assert!(err.to_string().contains("DNS response ID mismatch: got 4369, expected 8738"));

        assert!(validate_response(&response, 0x1111).is_ok());
    }

    #[test]
    fn test_stream_framing() {
        let query = vec![7u8; 300];
        let framed = frame_stream_query(&query).unwrap();
        assert_eq!(&framed[0..2], &[0x01, 0x2c]);
        assert_eq!(&framed[2..], query.as_slice());

        assert_eq!(stream_response_len([0x10, 0x00]).unwrap(), 4096);
        let err = stream_response_len([0x10, 0x01]).unwrap_err();
        assert!(err.to_string().contains("DNS response too large: 4097 bytes"));
    }

    #[test]
    fn test_header_parse() {
        let header = DnsHeader {
            id: 9,
            flags: 0x8180,
            qdcount: 1,
            ancount: 2,
            nscount: 0,
            arcount: 1,
        };
        assert_eq!(DnsHeader::parse(&header.to_bytes()).unwrap(), header);
    }
}
