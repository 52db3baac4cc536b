//! What the query path needs from a packet.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::types::Family;

/// Address capability of a decoded packet.
///
/// `family` is `None` for anything that is not IPv4 or IPv6; such
/// packets get the default timeout.
pub trait PacketAddress {
    fn family(&self) -> Option<Family>;

    /// Raw network-order destination address: 4 bytes for IPv4, 16 for IPv6.
    fn dst_addr(&self) -> &[u8];
}

/// A bare destination address, for callers that already decoded the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Destination {
    family: Family,
    octets: [u8; 16],
}

impl Destination {
    pub fn v4(addr: Ipv4Addr) -> Self {
        let mut octets = [0u8; 16];
        octets[..4].copy_from_slice(&addr.octets());
        Self {
            family: Family::V4,
            octets,
        }
    }

    pub fn v6(addr: Ipv6Addr) -> Self {
        Self {
            family: Family::V6,
            octets: addr.octets(),
        }
    }
}

impl From<IpAddr> for Destination {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Destination::v4(v4),
            IpAddr::V6(v6) => Destination::v6(v6),
        }
    }
}

impl PacketAddress for Destination {
    fn family(&self) -> Option<Family> {
        Some(self.family)
    }

    fn dst_addr(&self) -> &[u8] {
        &self.octets[..self.family.addr_len()]
    }
}
