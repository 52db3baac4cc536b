//! Dual-family prefix index: one Patricia tree per address family.

use std::net::IpAddr;

use log::debug;
use metrics::{counter, gauge};

use crate::errors::Error;
use crate::helpers::{ip_key, key_from_bytes, parse_prefix};
use crate::patricia::PatriciaTree;
use crate::telemetry::{DUPLICATE_PREFIXES, ENTRIES_INSERTED, INDEX_NODES};
use crate::types::{Entry, Family, InsertOutcome, Prefix};

/// Longest-prefix-match index over IPv4 and IPv6 prefixes.
///
/// Built with [`insert`](Self::insert), then only read. A query for one
/// family never walks the other family's tree.
#[derive(Debug, Clone)]
pub struct PrefixIndex<T> {
    v4: PatriciaTree<T>,
    v6: PatriciaTree<T>,
}

impl<T> Default for PrefixIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PrefixIndex<T> {
    pub fn new() -> Self {
        Self {
            v4: PatriciaTree::new(Family::V4),
            v6: PatriciaTree::new(Family::V6),
        }
    }

    /// Reserve arena space for `v4` and `v6` nodes up front.
    pub fn with_capacity(v4: usize, v6: usize) -> Result<Self, Error> {
        Ok(Self {
            v4: PatriciaTree::with_capacity(Family::V4, v4)?,
            v6: PatriciaTree::with_capacity(Family::V6, v6)?,
        })
    }

    #[inline]
    pub fn tree(&self, family: Family) -> &PatriciaTree<T> {
        match family {
            Family::V4 => &self.v4,
            Family::V6 => &self.v6,
        }
    }

    #[inline]
    fn tree_mut(&mut self, family: Family) -> &mut PatriciaTree<T> {
        match family {
            Family::V4 => &mut self.v4,
            Family::V6 => &mut self.v6,
        }
    }

    pub fn insert(&mut self, prefix: Prefix, value: T) -> Result<InsertOutcome, Error> {
        let family = prefix.family();
        let tree = self.tree_mut(family);
        let outcome = tree.insert(&prefix, value)?;
        let nodes = tree.node_count();
        match outcome {
            InsertOutcome::Inserted => {
                counter!(ENTRIES_INSERTED, "family" => family.label()).increment(1);
                gauge!(INDEX_NODES, "family" => family.label()).set(nodes as f64);
            }
            InsertOutcome::Existing => {
                counter!(DUPLICATE_PREFIXES, "family" => family.label()).increment(1);
            }
        }
        Ok(outcome)
    }

    /// Parse an address or CIDR string and insert it.
    pub fn insert_str(&mut self, cidr: &str, value: T) -> Result<InsertOutcome, Error> {
        let prefix = parse_prefix(cidr)?;
        debug!("[INSERT] adding {} host {}", prefix.family().label(), cidr);
        self.insert(prefix, value)
    }

    /// Longest-prefix match for a raw network-order address. Returns `None`
    /// on a miss or when `addr` is not `family.addr_len()` bytes long.
    pub fn lookup_best_match(&self, family: Family, addr: &[u8]) -> Option<&T> {
        let key = key_from_bytes(family, addr)?;
        self.tree(family).best_match(key)
    }

    pub fn lookup_ip(&self, ip: IpAddr) -> Option<&T> {
        self.tree(Family::from(&ip)).best_match(ip_key(ip))
    }

    /// Value stored for exactly `prefix`.
    pub fn get(&self, prefix: &Prefix) -> Option<&T> {
        self.tree(prefix.family()).get(prefix)
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.v4.node_count() + self.v6.node_count()
    }

    /// IPv4 entries followed by IPv6 entries.
    pub fn entries(&self) -> Vec<Entry<T>>
    where
        T: Clone,
    {
        let mut out = self.v4.entries();
        out.extend(self.v6.entries());
        out
    }
}
