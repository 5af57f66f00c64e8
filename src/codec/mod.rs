//! Wire formats built and parsed by hand: ICMP echo and DNS queries

pub mod dns;
pub mod icmp;

pub use dns::{build_query, validate_domain, validate_response, DnsHeader, DnsQuestion};
pub use icmp::{decode_echo_reply, internet_checksum, match_echo_reply, EchoReply, EchoRequest};

#[cfg(test)]
mod comprehensive_tests;
