use super::*;

use proptest::prelude::*;
use std::collections::BTreeSet;

fn commit(keys: &[Vec<u8>]) -> Vec<u8> {
    let mut b = Builder::in_memory();
    for k in keys {
        b.insert(k);
        b.check_invariants().unwrap();
    }
    b.commit().unwrap().into_inner()
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet forces long shared prefixes and plenty of splits; the
    // full byte range covers everything else.
    prop_oneof![
        3 => prop::collection::vec(b'a'..=b'c', 0..=8),
        1 => prop::collection::vec(any::<u8>(), 0..=24),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_membership_matches_set(
        keys in prop::collection::vec(key_strategy(), 0..=300),
        queries in prop::collection::vec(key_strategy(), 0..=300),
    ) {
        let model: BTreeSet<Vec<u8>> = keys.iter().cloned().collect();
        let r = Reader::from_storage(commit(&keys)).unwrap();
        r.verify().unwrap();

        prop_assert_eq!(r.len(), model.len() as u64);
        for k in &keys {
            prop_assert!(r.has(k), "inserted key {:?} not found", k);
        }
        for p in &queries {
            prop_assert_eq!(r.has(p), model.contains(p), "query {:?}", p);
        }
    }

    #[test]
    fn prop_duplicates_do_not_change_file(keys in prop::collection::vec(key_strategy(), 0..=200)) {
        let mut seen = BTreeSet::new();
        let unique: Vec<Vec<u8>> = keys.iter().filter(|k| seen.insert(k.to_vec())).cloned().collect();

        let mut doubled = keys.clone();
        doubled.extend(keys.iter().rev().cloned());

        let once = commit(&unique);
        prop_assert_eq!(&once, &commit(&keys));
        prop_assert_eq!(&once, &commit(&doubled));
    }

    #[test]
    fn prop_builder_agrees_with_reader(
        keys in prop::collection::vec(key_strategy(), 0..=200),
        queries in prop::collection::vec(key_strategy(), 0..=200),
    ) {
        let mut b = Builder::in_memory();
        b.extend(&keys);
        let in_memory: Vec<bool> = queries.iter().map(|p| b.contains(p)).collect();
        let nodes = b.node_count();

        let r = Reader::from_storage(b.commit().unwrap().into_inner()).unwrap();
        let on_disk: Vec<bool> = queries.iter().map(|p| r.has(p)).collect();
        prop_assert_eq!(in_memory, on_disk);
        prop_assert_eq!(r.node_count(), nodes);
    }
}

/// Call `f` with every insertion order of `keys` (Heap's algorithm, one swap
/// per order).
fn for_each_order(keys: &[Vec<u8>], mut f: impl FnMut(&[Vec<u8>])) {
    let mut order = keys.to_vec();
    let mut counters = vec![0usize; order.len()];
    f(&order);

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            f(&order);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

#[test]
fn test_for_each_order_is_exhaustive() {
    let keys: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i]).collect();
    let mut seen = BTreeSet::new();
    for_each_order(&keys, |order| {
        seen.insert(order.to_vec());
    });
    assert_eq!(seen.len(), 24);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"abd".to_vec(),
        b"b".to_vec(),
        b"ba".to_vec(),
    ];
    let absent: [&[u8]; 5] = [b"c", b"aa", b"abcd", b"bb", b"bab"];

    for_each_order(&keys, |perm| {
        let r = Reader::from_storage(commit(perm)).unwrap();
        r.verify().unwrap();
        assert_eq!(r.len(), keys.len() as u64);
        for k in &keys {
            assert!(r.has(k), "{k:?} missing after inserting {perm:?}");
        }
        for k in absent {
            assert!(!r.has(k), "{k:?} present after inserting {perm:?}");
        }
    });
}

#[test]
fn exhaustive_prefix_chain_orders() {
    // Every key is a prefix of the next, so each order exercises a different
    // mix of appends, descents and splits that end exactly on a key.
    let keys: Vec<Vec<u8>> = ["x", "xy", "xyz", "xyzw", "xyzwv"]
        .iter()
        .map(|k| k.as_bytes().to_vec())
        .collect();

    let mut shapes = BTreeSet::new();
    for_each_order(&keys, |perm| {
        let bytes = commit(perm);
        let r = Reader::from_storage(&bytes[..]).unwrap();
        r.verify().unwrap();
        assert_eq!(r.node_count(), 6, "one node per key plus the root");
        for k in &keys {
            assert!(r.has(k));
        }
        assert!(!r.has(b"xyzwvu"));
        shapes.insert(bytes.clone());
    });
    // The chain has a single radix shape regardless of order.
    assert_eq!(shapes.len(), 1);
}
