//! Host timeout policy: loads host groups into a [`PrefixIndex`] and
//! answers per-packet timeout queries.

use std::fmt;
use std::net::IpAddr;

use log::{debug, error, info, warn};
use metrics::{counter, Counter};

use crate::conf::ConfNode;
use crate::constants::{
    ADDRESS_FIELD, DEFAULT_CONFIG_PATH, DEFAULT_TIMEOUT, EXIT_FAILURE, HOST_CONFIG_PATH,
    TIMEOUT_FIELD,
};
use crate::errors::Error;
use crate::helpers::parse_duration_secs;
use crate::index::PrefixIndex;
use crate::packet::{Destination, PacketAddress};
use crate::telemetry::{self, GROUPS_SKIPPED, LOOKUPS, LOOKUP_MISSES, MALFORMED_ADDRESSES};
use crate::types::{Family, InsertOutcome};

/// Counters collected while loading host groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub groups_loaded: usize,
    pub groups_skipped: usize,
    pub entries_inserted: usize,
    pub duplicates: usize,
    pub addresses_rejected: usize,
}

/// Query-path counter handles, registered once when the policy is built
/// so a lookup never rebuilds a metric key.
#[derive(Clone)]
struct LookupCounters {
    non_ip: Counter,
    hit: Counter,
    miss: Counter,
    miss_v4: Counter,
    miss_v6: Counter,
}

impl LookupCounters {
    fn register() -> Self {
        telemetry::describe();
        Self {
            non_ip: counter!(LOOKUPS, "result" => "non_ip"),
            hit: counter!(LOOKUPS, "result" => "hit"),
            miss: counter!(LOOKUPS, "result" => "miss"),
            miss_v4: counter!(LOOKUP_MISSES, "family" => Family::V4.label()),
            miss_v6: counter!(LOOKUP_MISSES, "family" => Family::V6.label()),
        }
    }

    #[inline]
    fn miss_for(&self, family: Family) -> &Counter {
        match family {
            Family::V4 => &self.miss_v4,
            Family::V6 => &self.miss_v6,
        }
    }
}

impl fmt::Debug for LookupCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupCounters").finish_non_exhaustive()
    }
}

/// Per-host timeout policy.
///
/// Built once at startup, then shared read-only (`&HostPolicy` or
/// `Arc<HostPolicy>`) by every thread that needs a timeout. Lookup
/// counters bind to the metrics recorder installed when the policy is
/// built.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    index: PrefixIndex<u64>,
    default_timeout: u64,
    counters: LookupCounters,
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPolicy {
    pub fn new() -> Self {
        Self::with_index(PrefixIndex::new())
    }

    pub fn with_index(index: PrefixIndex<u64>) -> Self {
        Self {
            index,
            default_timeout: DEFAULT_TIMEOUT,
            counters: LookupCounters::register(),
        }
    }

    /// Build the policy from the root of the configuration tree: the
    /// default comes from `defrag.default-config.timeout`, host groups
    /// from `defrag.host-config`. Only an allocation failure is an error.
    pub fn from_config(root: &ConfNode) -> Result<Self, Error> {
        crate::ensure_logging();

        let section = root.get(HOST_CONFIG_PATH);
        let (v4, v6) = section.map(capacity_hint).unwrap_or((0, 0));
        let index = PrefixIndex::with_capacity(v4, v6)?;
        let mut policy = Self::with_index(index);

        if let Some(value) = root
            .get(DEFAULT_CONFIG_PATH)
            .and_then(|n| n.child_value(TIMEOUT_FIELD))
        {
            match parse_duration_secs(value) {
                Ok(secs) => policy.set_default_timeout(secs),
                Err(e) => warn!("[LOAD] default timeout ignored: {e}"),
            }
        }

        match section {
            Some(section) => {
                let report = policy.load_host_groups(section)?;
                info!(
                    "[LOAD] {} host groups loaded, {} skipped; {} entries, {} duplicates, {} bad addresses",
                    report.groups_loaded,
                    report.groups_skipped,
                    report.entries_inserted,
                    report.duplicates,
                    report.addresses_rejected
                );
            }
            None => debug!("[LOAD] no {HOST_CONFIG_PATH} section"),
        }
        Ok(policy)
    }

    /// Like [`from_config`](Self::from_config), but terminates the process
    /// when the index cannot be allocated.
    pub fn from_config_or_exit(root: &ConfNode) -> Self {
        match Self::from_config(root) {
            Ok(policy) => policy,
            Err(e) => {
                error!("[LOAD] {e}; cannot serve host timeouts");
                std::process::exit(EXIT_FAILURE);
            }
        }
    }

    pub fn set_default_timeout(&mut self, timeout: u64) {
        self.default_timeout = timeout;
        debug!("[LOAD] default timeout {timeout}");
    }

    #[inline]
    pub fn default_timeout(&self) -> u64 {
        self.default_timeout
    }

    #[inline]
    pub fn index(&self) -> &PrefixIndex<u64> {
        &self.index
    }

    /// Add one address or CIDR with its timeout.
    pub fn add_host(&mut self, cidr: &str, timeout: u64) -> Result<InsertOutcome, Error> {
        self.index.insert_str(cidr, timeout)
    }

    /// Load every host group under `section`.
    ///
    /// A group without a usable `timeout` is skipped as a whole; a bad
    /// address is skipped on its own and the rest of its group still loads.
    /// An allocation failure stops the load and is returned.
    pub fn load_host_groups(&mut self, section: &ConfNode) -> Result<LoadReport, Error> {
        let mut report = LoadReport::default();
        for group in host_groups(section) {
            debug!("[LOAD] parsing configuration for {}", group.name);
            let (timeout, addresses) = match parse_group(group) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("[LOAD] skipping host group `{}`: {e}", group.name);
                    counter!(GROUPS_SKIPPED).increment(1);
                    report.groups_skipped += 1;
                    continue;
                }
            };

            for addr in addresses {
                let res = match addr {
                    Some(addr) => self.add_host(addr, timeout),
                    None => Err(Error::MalformedAddress(String::new())),
                };
                report.record(&group.name, addr, res)?;
            }
            report.groups_loaded += 1;
        }
        Ok(report)
    }

    /// Timeout for a packet's destination; the default for non-IP packets
    /// and for destinations no host group covers.
    pub fn get_host_timeout<P: PacketAddress + ?Sized>(&self, packet: &P) -> u64 {
        let Some(family) = packet.family() else {
            self.counters.non_ip.increment(1);
            return self.default_timeout;
        };
        match self.index.lookup_best_match(family, packet.dst_addr()) {
            Some(&timeout) => {
                self.counters.hit.increment(1);
                timeout
            }
            None => {
                self.counters.miss.increment(1);
                self.counters.miss_for(family).increment(1);
                self.default_timeout
            }
        }
    }

    pub fn timeout_for_ip(&self, ip: IpAddr) -> u64 {
        self.get_host_timeout(&Destination::from(ip))
    }
}

impl LoadReport {
    /// Count one insert result. Only an allocation failure is passed back.
    fn record(
        &mut self,
        group: &str,
        addr: Option<&str>,
        res: Result<InsertOutcome, Error>,
    ) -> Result<(), Error> {
        match res {
            Ok(InsertOutcome::Inserted) => self.entries_inserted += 1,
            Ok(InsertOutcome::Existing) => {
                debug!(
                    "[LOAD] {} in `{group}` already configured; first timeout kept",
                    addr.unwrap_or_default()
                );
                self.duplicates += 1;
            }
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                warn!("[LOAD] failed to add host in `{group}`: {e}");
                counter!(MALFORMED_ADDRESSES).increment(1);
                self.addresses_rejected += 1;
            }
        }
        Ok(())
    }
}

/// Host groups come either as a sequence of single-key maps
/// (`- dmz: {timeout, address}`), where every child of every item is a
/// group, or as a map of groups (`dmz: {timeout, address}`).
fn host_groups<'a>(section: &'a ConfNode) -> impl Iterator<Item = &'a ConfNode> + 'a {
    let is_seq = section.is_sequence();
    section.children().flat_map(move |item| {
        std::iter::once(item)
            .filter(move |_| !is_seq)
            .chain(item.children().filter(move |_| is_seq))
    })
}

type GroupAddresses<'a> = Vec<Option<&'a str>>;

/// Timeout plus address strings of one group. `None` marks a list item
/// that carries no scalar.
fn parse_group(group: &ConfNode) -> Result<(u64, GroupAddresses<'_>), Error> {
    let timeout = group
        .child_value(TIMEOUT_FIELD)
        .ok_or_else(|| Error::MissingField {
            group: group.name.clone(),
            field: TIMEOUT_FIELD,
        })
        .and_then(parse_duration_secs)?;
    debug!("[LOAD] timeout value {timeout}");

    let address = group.child(ADDRESS_FIELD).ok_or_else(|| Error::MissingField {
        group: group.name.clone(),
        field: ADDRESS_FIELD,
    })?;
    let addresses = match address.value() {
        Some(single) => vec![Some(single)],
        None => address.children().map(ConfNode::value).collect(),
    };
    Ok((timeout, addresses))
}

/// Upper bound on arena nodes per family: each insert adds at most two.
fn capacity_hint(section: &ConfNode) -> (usize, usize) {
    let mut v4 = 0usize;
    let mut v6 = 0usize;
    for group in host_groups(section) {
        let Some(address) = group.child(ADDRESS_FIELD) else {
            continue;
        };
        let strings: Vec<&str> = match address.value() {
            Some(single) => vec![single],
            None => address.children().filter_map(ConfNode::value).collect(),
        };
        for s in strings {
            match Family::sniff(s) {
                Family::V4 => v4 += 2,
                Family::V6 => v6 += 2,
            }
        }
    }
    (v4, v6)
}
