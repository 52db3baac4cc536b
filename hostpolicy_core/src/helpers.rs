//! Helper functions for Patricia tree operations and config value parsing

use crate::errors::Error;
use crate::types::{Family, Prefix};
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[inline]
pub fn v4_key(addr: u32) -> u128 {
    (addr as u128) << 96
}

#[inline]
pub fn ip_key(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => v4_key(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Left-aligned key from raw network-order bytes; `None` on a length mismatch.
#[inline]
pub fn key_from_bytes(family: Family, addr: &[u8]) -> Option<u128> {
    match family {
        Family::V4 => {
            let octets: [u8; 4] = addr.try_into().ok()?;
            Some(v4_key(u32::from_be_bytes(octets)))
        }
        Family::V6 => {
            let octets: [u8; 16] = addr.try_into().ok()?;
            Some(u128::from_be_bytes(octets))
        }
    }
}

pub fn common_prefix_len(key1: u128, key2: u128, max_len: u8) -> u8 {
    if max_len == 0 {
        return 0;
    }
    let diff = (key1 ^ key2) & mask(max_len);
    if diff == 0 {
        return max_len;
    }
    (diff.leading_zeros() as u8).min(max_len)
}

#[inline]
pub fn get_bit(key: u128, index: u8) -> u8 {
    debug_assert!(index <= 127);
    ((key >> (127 - index)) & 1) as u8
}

#[inline]
pub fn mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 128 {
        !0u128
    } else {
        !(!0u128 >> prefix_len)
    }
}

// Canonicalise a key: zero host bits beyond `plen`.
#[inline(always)]
pub fn canonical(key: u128, plen: u8) -> u128 {
    key & mask(plen)
}

/// Parse `addr` or `addr/len`. A colon anywhere selects IPv6, anything
/// else is read as IPv4. Without a suffix the mask is the full width.
pub fn parse_prefix(s: &str) -> Result<Prefix, Error> {
    let s = s.trim();
    let malformed = || Error::MalformedAddress(s.to_string());
    let (ip, plen) = match (Family::sniff(s), s.contains('/')) {
        (Family::V4, true) => {
            let net: Ipv4Net = s.parse().map_err(|_| malformed())?;
            (IpAddr::V4(net.addr()), net.prefix_len())
        }
        (Family::V4, false) => {
            let ip: Ipv4Addr = s.parse().map_err(|_| malformed())?;
            (IpAddr::V4(ip), Family::V4.bits())
        }
        (Family::V6, true) => {
            let net: Ipv6Net = s.parse().map_err(|_| malformed())?;
            (IpAddr::V6(net.addr()), net.prefix_len())
        }
        (Family::V6, false) => {
            let ip: Ipv6Addr = s.parse().map_err(|_| malformed())?;
            (IpAddr::V6(ip), Family::V6.bits())
        }
    };
    Prefix::from_ip(ip, plen)
}

/// Parse a timeout such as `40`, `30s`, `5m`, `2h` or `1d` into seconds.
pub fn parse_duration_secs(s: &str) -> Result<u64, Error> {
    let trimmed = s.trim();
    let malformed = || Error::MalformedDuration(s.to_string());

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(malformed());
    }
    let n: u64 = digits.parse().map_err(|_| malformed())?;

    let scale: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3_600,
        "d" | "day" | "days" => 86_400,
        _ => return Err(malformed()),
    };
    n.checked_mul(scale).ok_or_else(malformed)
}
