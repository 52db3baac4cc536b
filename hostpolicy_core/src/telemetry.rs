//! Metric names and descriptions.
//!
//! The library only emits through the `metrics` facade; exporting is the
//! host process's business. [`describe`] runs whenever a policy is built,
//! so install the recorder first.

use metrics::{describe_counter, describe_gauge, Unit};

pub const ENTRIES_INSERTED: &str = "hostpolicy_entries_inserted_total";
pub const DUPLICATE_PREFIXES: &str = "hostpolicy_duplicate_prefixes_total";
pub const MALFORMED_ADDRESSES: &str = "hostpolicy_malformed_addresses_total";
pub const GROUPS_SKIPPED: &str = "hostpolicy_groups_skipped_total";
pub const LOOKUPS: &str = "hostpolicy_lookups_total";
pub const LOOKUP_MISSES: &str = "hostpolicy_lookup_misses_total";
pub const INDEX_NODES: &str = "hostpolicy_index_nodes";

pub fn describe() {
    describe_counter!(ENTRIES_INSERTED, Unit::Count, "Prefixes stored in the index, by family");
    describe_counter!(DUPLICATE_PREFIXES, Unit::Count, "Prefixes configured more than once");
    describe_counter!(MALFORMED_ADDRESSES, Unit::Count, "Address strings skipped during load");
    describe_counter!(GROUPS_SKIPPED, Unit::Count, "Host groups skipped for a bad timeout");
    describe_counter!(LOOKUPS, Unit::Count, "Host timeout queries, by outcome");
    describe_counter!(LOOKUP_MISSES, Unit::Count, "Queries answered with the default timeout");
    describe_gauge!(INDEX_NODES, Unit::Count, "Arena nodes held by the index, by family");
}
