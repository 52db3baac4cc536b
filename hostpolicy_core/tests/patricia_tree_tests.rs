use proptest::collection::vec as pvec;
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use hostpolicy_core::helpers::v4_key;
use hostpolicy_core::{Family, InsertOutcome, PatriciaTree, Prefix, PrefixIndex};

fn p(s: &str) -> Prefix {
    s.parse().unwrap()
}

fn v4(s: &str) -> [u8; 4] {
    s.parse::<Ipv4Addr>().unwrap().octets()
}

fn v6(s: &str) -> [u8; 16] {
    s.parse::<Ipv6Addr>().unwrap().octets()
}

#[test]
fn basic_ops() {
    let mut tree = PatriciaTree::new(Family::V4);
    assert!(tree.is_empty());
    assert_eq!(tree.best_match(v4_key(0xC0A80001)), None);

    tree.insert(&p("192.168.0.1"), 60u64).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.best_match(v4_key(0xC0A80001)), Some(&60));
    assert_eq!(tree.best_match(v4_key(0xC0A80002)), None);
}

#[test]
fn split_creates_balanced_branches() {
    let mut tree = PatriciaTree::new(Family::V4);
    tree.insert(&p("128.0.0.0/32"), 6u64).unwrap();
    tree.insert(&p("0.0.0.0/32"), 60u64).unwrap();

    // two leaves under one branch node at bit 0
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.best_match(v4_key(0x8000_0000)), Some(&6));
    assert_eq!(tree.best_match(v4_key(0)), Some(&60));
    assert_eq!(tree.best_match(v4_key(0x4000_0000)), None);
}

#[test]
fn insert_above_keeps_more_specific_child() {
    let mut tree = PatriciaTree::new(Family::V4);
    tree.insert(&p("1.2.3.4/32"), 32u64).unwrap();
    tree.insert(&p("1.2.3.0/24"), 24u64).unwrap();

    assert_eq!(tree.node_count(), 2);
    assert_eq!(tree.best_match(v4_key(0x01020304)), Some(&32));
    assert_eq!(tree.best_match(v4_key(0x01020305)), Some(&24));
    assert_eq!(tree.best_match(v4_key(0x01020404)), None);
}

#[test]
fn branch_node_promoted_to_terminal() {
    let mut tree = PatriciaTree::new(Family::V4);
    tree.insert(&p("10.0.0.0/16"), 1u64).unwrap();
    tree.insert(&p("10.128.0.0/16"), 2u64).unwrap();
    // the split left a value-less branch at 10.0.0.0/8
    assert_eq!(tree.best_match(v4_key(0x0A01_0000)), None);

    assert_eq!(tree.insert(&p("10.0.0.0/8"), 3u64).unwrap(), InsertOutcome::Inserted);
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.best_match(v4_key(0x0A01_0000)), Some(&3));
    assert_eq!(tree.best_match(v4_key(0x0A00_0001)), Some(&1));
    assert_eq!(tree.best_match(v4_key(0x0A80_0001)), Some(&2));
}

#[test]
fn duplicate_prefix_keeps_first_value() {
    let mut tree = PatriciaTree::new(Family::V4);
    assert_eq!(tree.insert(&p("10.0.0.0/8"), 1u64).unwrap(), InsertOutcome::Inserted);
    // host bits are ignored, so this is the same prefix
    assert_eq!(tree.insert(&p("10.9.9.9/8"), 2u64).unwrap(), InsertOutcome::Existing);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.get(&p("10.0.0.0/8")), Some(&1));
}

#[test]
fn default_route_matches_everything() {
    let mut tree = PatriciaTree::new(Family::V4);
    tree.insert(&p("0.0.0.0/0"), 7u64).unwrap();
    tree.insert(&p("192.168.0.0/16"), 9u64).unwrap();
    assert_eq!(tree.best_match(v4_key(0x0808_0808)), Some(&7));
    assert_eq!(tree.best_match(v4_key(0xC0A8_0101)), Some(&9));
}

#[test]
fn tree_rejects_other_family() {
    let mut tree = PatriciaTree::new(Family::V4);
    assert!(tree.insert(&p("::1"), 1u64).is_err());
    assert!(tree.is_empty());
}

#[test]
fn longest_match_precedence() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("10.0.0.0/8"), 'A').unwrap();
    idx.insert(p("10.1.0.0/16"), 'B').unwrap();

    assert_eq!(idx.lookup_best_match(Family::V4, &v4("10.1.2.3")), Some(&'B'));
    assert_eq!(idx.lookup_best_match(Family::V4, &v4("10.2.2.3")), Some(&'A'));
    assert_eq!(idx.lookup_best_match(Family::V4, &v4("11.0.0.1")), None);
}

#[test]
fn insertion_order_does_not_change_the_answer() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("10.1.0.0/16"), 'B').unwrap();
    idx.insert(p("10.0.0.0/8"), 'A').unwrap();

    assert_eq!(idx.lookup_best_match(Family::V4, &v4("10.1.2.3")), Some(&'B'));
    assert_eq!(idx.lookup_best_match(Family::V4, &v4("10.2.2.3")), Some(&'A'));
}

#[test]
fn family_isolation() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("::/0"), 1u64).unwrap();
    idx.insert(p("2001:db8::/32"), 2u64).unwrap();

    assert_eq!(idx.lookup_best_match(Family::V4, &v4("10.0.0.1")), None);
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("2001:db8::1")), Some(&2));
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("fe80::1")), Some(&1));

    // an IPv4 entry is invisible to an IPv6 query with the same leading bits
    let mut idx = PrefixIndex::new();
    idx.insert(p("32.1.0.0/16"), 4u64).unwrap();
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("2001::1")), None);
}

#[test]
fn wrong_length_address_is_a_miss() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("0.0.0.0/0"), 1u64).unwrap();
    assert_eq!(idx.lookup_best_match(Family::V4, &[10, 0, 0]), None);
    assert_eq!(idx.lookup_best_match(Family::V4, &v6("::1")), None);
}

#[test]
fn ipv6_prefix_behavior() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("2001:db8::/32"), 32u64).unwrap();
    idx.insert(p("2001:db8:0:1::/64"), 64u64).unwrap();
    idx.insert(p("::1"), 128u64).unwrap();

    assert_eq!(idx.lookup_best_match(Family::V6, &v6("2001:db8:0:1::42")), Some(&64));
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("2001:db8:ffff::1")), Some(&32));
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("::1")), Some(&128));
    assert_eq!(idx.lookup_best_match(Family::V6, &v6("::2")), None);
    assert_eq!(idx.lookup_ip("2001:db8::9".parse().unwrap()), Some(&32));
}

#[test]
fn prefix_parsing() {
    let net = p("192.168.1.77/24");
    assert_eq!(net.family(), Family::V4);
    assert_eq!(net.prefix_len(), 24);
    assert_eq!(net.network(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 0)));
    assert_eq!(net.to_string(), "192.168.1.0/24");

    assert_eq!(p(" 1.1.1.1 ").prefix_len(), 32);
    assert_eq!(p("::1").prefix_len(), 128);
    assert_eq!(p("fe80::/10").family(), Family::V6);

    for bad in ["not-an-ip", "", "1.2.3.4/33", "::1/129", "1.2.3", "1.2.3.4/", "::g"] {
        assert!(bad.parse::<Prefix>().is_err(), "{bad:?} parsed");
    }
}

#[test]
fn prefix_from_raw_bytes_checks_bounds() {
    assert!(Prefix::new(Family::V4, &[10, 0, 0, 0], 8).is_ok());
    assert!(Prefix::new(Family::V4, &[10, 0, 0, 0], 33).is_err());
    assert!(Prefix::new(Family::V4, &[0u8; 16], 8).is_err());
    assert!(Prefix::new(Family::V6, &[0u8; 4], 8).is_err());
    assert!(Prefix::new(Family::V6, &[0u8; 16], 128).is_ok());
}

#[test]
fn entries_lists_stored_prefixes_only() {
    let mut idx = PrefixIndex::new();
    idx.insert(p("10.0.0.0/16"), 1u64).unwrap();
    idx.insert(p("10.128.0.0/16"), 2u64).unwrap();
    idx.insert(p("::1"), 3u64).unwrap();

    let listed: Vec<(String, u64)> = idx
        .entries()
        .into_iter()
        .map(|e| (e.prefix.to_string(), e.value))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("10.0.0.0/16".to_string(), 1),
            ("10.128.0.0/16".to_string(), 2),
            ("::1/128".to_string(), 3),
        ]
    );
    assert_eq!(idx.len(), 3);
    assert_eq!(idx.node_count(), 4);
}

/// Brute-force longest-prefix match over the same inserts, first value wins.
fn reference_lookup(entries: &[(u32, u8, u64)], addr: u32) -> Option<u64> {
    let mut stored: Vec<(Prefix, u64)> = Vec::new();
    for &(a, plen, v) in entries {
        let prefix = Prefix::new(Family::V4, &a.to_be_bytes(), plen).unwrap();
        if !stored.iter().any(|(q, _)| *q == prefix) {
            stored.push((prefix, v));
        }
    }
    stored
        .iter()
        .filter(|(q, _)| q.contains_key(v4_key(addr)))
        .max_by_key(|(q, _)| q.prefix_len())
        .map(|&(_, v)| v)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn property_matches_linear_scan(
        entries in pvec((any::<u32>(), 0u8..=32, any::<u64>()), 1..48),
        queries in pvec(any::<u32>(), 1..32),
    ) {
        let mut idx = PrefixIndex::new();
        for &(a, plen, v) in &entries {
            idx.insert(Prefix::new(Family::V4, &a.to_be_bytes(), plen).unwrap(), v).unwrap();
        }
        // query both random addresses and the inserted ones
        let all = queries.iter().copied().chain(entries.iter().map(|e| e.0));
        for addr in all {
            let got = idx.lookup_best_match(Family::V4, &addr.to_be_bytes()).copied();
            prop_assert_eq!(got, reference_lookup(&entries, addr), "addr {:#x}", addr);
        }
    }

    #[test]
    fn property_every_address_in_a_lone_prefix_matches(
        a in any::<u32>(),
        plen in 0u8..=32,
        host in any::<u32>(),
    ) {
        let prefix = Prefix::new(Family::V4, &a.to_be_bytes(), plen).unwrap();
        let mut idx = PrefixIndex::new();
        idx.insert(prefix, 99u64).unwrap();

        let host_mask = if plen == 0 { u32::MAX } else { u32::MAX >> plen };
        let inside = ((prefix.key() >> 96) as u32) | (host & host_mask);
        prop_assert_eq!(idx.lookup_best_match(Family::V4, &inside.to_be_bytes()), Some(&99));
    }
}
