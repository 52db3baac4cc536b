//! Data structures for the prefix index

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::constants::{V4_ADDR_LEN, V4_BITS, V6_ADDR_LEN, V6_BITS};
use crate::errors::Error;
use crate::helpers::{canonical, ip_key, key_from_bytes, parse_prefix};

/// Arena index of a trie node.
pub type NodeId = u32;

/// Address family tag carried by every prefix and query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Address width in bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        match self {
            Family::V4 => V4_BITS,
            Family::V6 => V6_BITS,
        }
    }

    /// Raw address length in bytes.
    #[inline]
    pub const fn addr_len(self) -> usize {
        match self {
            Family::V4 => V4_ADDR_LEN,
            Family::V6 => V6_ADDR_LEN,
        }
    }

    /// Short name used in logs and metric labels.
    pub const fn label(self) -> &'static str {
        match self {
            Family::V4 => "ipv4",
            Family::V6 => "ipv6",
        }
    }

    /// Family of an address string: any colon means IPv6.
    pub fn sniff(s: &str) -> Family {
        if s.contains(':') {
            Family::V6
        } else {
            Family::V4
        }
    }
}

impl From<&IpAddr> for Family {
    fn from(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

/// A network prefix. `key` is left-aligned in a u128 (an IPv4 address
/// occupies the top 32 bits) and holds no bits past `prefix_len`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Prefix {
    family: Family,
    key: u128,
    prefix_len: u8,
}

impl Prefix {
    /// Build a prefix from raw network-order address bytes.
    pub fn new(family: Family, addr: &[u8], prefix_len: u8) -> Result<Self, Error> {
        match key_from_bytes(family, addr) {
            Some(key) if prefix_len <= family.bits() => Ok(Self {
                family,
                key: canonical(key, prefix_len),
                prefix_len,
            }),
            _ => Err(Error::InvalidPrefix {
                family,
                len: addr.len(),
                prefix_len,
            }),
        }
    }

    pub fn from_ip(ip: IpAddr, prefix_len: u8) -> Result<Self, Error> {
        let family = Family::from(&ip);
        if prefix_len > family.bits() {
            return Err(Error::InvalidPrefix {
                family,
                len: family.addr_len(),
                prefix_len,
            });
        }
        Ok(Self {
            family,
            key: canonical(ip_key(ip), prefix_len),
            prefix_len,
        })
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    #[inline]
    pub fn key(&self) -> u128 {
        self.key
    }

    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Canonical network address.
    pub fn network(&self) -> IpAddr {
        match self.family {
            Family::V4 => IpAddr::V4(Ipv4Addr::from((self.key >> 96) as u32)),
            Family::V6 => IpAddr::V6(Ipv6Addr::from(self.key)),
        }
    }

    /// Whether `key` (a left-aligned address of the same family) lies in this prefix.
    #[inline]
    pub fn contains_key(&self, key: u128) -> bool {
        canonical(key, self.prefix_len) == self.key
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefix(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

/// A prefix with its attached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    pub prefix: Prefix,
    pub value: T,
}

/// Node in the Patricia tree. Internal (branch-only) nodes carry no value.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub key: u128,       // canonical, left-aligned
    pub prefix_len: u8,  // valid bits in key
    pub value: Option<T>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl<T> Node<T> {
    pub fn leaf(key: u128, prefix_len: u8, value: T) -> Self {
        Self {
            key,
            prefix_len,
            value: Some(value),
            left: None,
            right: None,
        }
    }

    pub fn branch(key: u128, prefix_len: u8) -> Self {
        Self {
            key,
            prefix_len,
            value: None,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.value.is_some()
    }

    #[inline]
    pub fn child(&self, bit: u8) -> Option<NodeId> {
        if bit == 0 {
            self.left
        } else {
            self.right
        }
    }

    #[inline]
    pub fn child_mut(&mut self, bit: u8) -> &mut Option<NodeId> {
        if bit == 0 {
            &mut self.left
        } else {
            &mut self.right
        }
    }
}

/// Whether an insert stored a new prefix or found one already present.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The prefix was already stored; its first value is kept.
    Existing,
}
