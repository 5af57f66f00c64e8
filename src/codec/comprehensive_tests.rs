//! Property-based tests for the ICMP and DNS codecs

use super::dns::{self, DnsQuestion};
use super::icmp::{self, EchoRequest};
use crate::types::IpFamily;
use proptest::collection::vec;
use proptest::prelude::*;

mod generators {
    use super::*;

    pub fn family() -> impl Strategy<Value = IpFamily> {
        prop_oneof![Just(IpFamily::V4), Just(IpFamily::V6)]
    }

    /// Dotted names made of valid labels
    pub fn domain() -> impl Strategy<Value = String> {
        vec("[a-z0-9-]{1,63}", 1..4).prop_map(|labels| labels.join("."))
    }
}

proptest! {
    /// Summing a checksummed packet (checksum included) always gives 0xFFFF
    #[test]
    fn checksummed_packet_verifies(bytes in vec(any::<u8>(), 0..512)) {
        let mut packet = bytes;
        packet.resize(packet.len().max(4), 0);
        packet[2] = 0;
        packet[3] = 0;
        let checksum = icmp::internet_checksum(&packet);
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());
        prop_assert_eq!(icmp::internet_checksum(&packet), 0);
    }

    /// Encoded requests carry the requested sizes and fields
    #[test]
    fn echo_request_layout(
        family in generators::family(),
        id in any::<u16>(),
        seq in any::<u16>(),
        size in 0usize..1400,
        sent_at in any::<u64>(),
    ) {
        let packet = EchoRequest::new(family, id, seq, size).encode(sent_at, family == IpFamily::V4);
        prop_assert_eq!(packet.len(), icmp::ICMP_HEADER_LEN + size);
        prop_assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), id);
        prop_assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), seq);
        if size >= icmp::TIMESTAMP_LEN {
            prop_assert_eq!(&packet[8..16], &sent_at.to_be_bytes());
        }
    }

    /// A reply built from a request (type flipped) matches that request only
    #[test]
    fn reply_matches_its_request(
        family in generators::family(),
        id in any::<u16>(),
        seq in any::<u16>(),
        other_seq in any::<u16>(),
    ) {
        let mut reply = EchoRequest::new(family, id, seq, 16).encode(99, false);
        reply[0] = match family {
            IpFamily::V4 => icmp::ECHO_REPLY_V4,
            IpFamily::V6 => icmp::ECHO_REPLY_V6,
        };
        let decoded = icmp::match_echo_reply(&reply, Some(id), seq, false);
        prop_assert!(decoded.is_some());
        prop_assert_eq!(decoded.and_then(|r| r.sent_at_nanos), Some(99));

        let stray = icmp::match_echo_reply(&reply, None, other_seq, false);
        prop_assert_eq!(stray.is_some(), other_seq == seq);
    }

    /// The decoder never panics on arbitrary input
    #[test]
    fn decode_arbitrary_bytes(bytes in vec(any::<u8>(), 0..128), has_ip_header in any::<bool>()) {
        let _ = icmp::decode_echo_reply(&bytes, has_ip_header);
        let _ = dns::DnsHeader::parse(&bytes);
    }

    /// Query size follows directly from the name
    #[test]
    fn query_length_follows_name(name in generators::domain(), id in any::<u16>()) {
        let packet = dns::encode_query(id, &DnsQuestion::a_record(name.clone())).unwrap_or_default();
        if name.len() + 2 <= dns::MAX_NAME_LEN {
            prop_assert_eq!(packet.len(), dns::DNS_HEADER_LEN + name.len() + 2 + 4);
            prop_assert!(dns::validate_response(&packet, id).is_ok());
        } else {
            prop_assert!(packet.is_empty());
        }
    }
}
