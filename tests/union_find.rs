//! Tests for union_find module

use explorer_tiles::union_find::DenseUnionFind;

#[test]
fn test_basic_operations() {
    let mut uf = DenseUnionFind::new();

    let a = uf.make_set();
    let b = uf.make_set();
    let c = uf.make_set();

    assert!(!uf.connected(a, b));

    uf.union(a, b);
    assert!(uf.connected(a, b));
    assert!(!uf.connected(a, c));
}

#[test]
fn test_path_compression() {
    let mut uf = DenseUnionFind::with_len(4);

    // Create chain: 0 -> 1 -> 2 -> 3
    uf.union(0, 1);
    uf.union(1, 2);
    uf.union(2, 3);

    // After find, all should point to same root
    let root = uf.find(0);
    assert_eq!(uf.find(1), root);
    assert_eq!(uf.find(2), root);
    assert_eq!(uf.find(3), root);
    assert_eq!(uf.root(3), root);
}

#[test]
fn test_set_sizes() {
    let mut uf = DenseUnionFind::with_len(6);

    uf.union(0, 1);
    uf.union(2, 3);
    uf.union(3, 4);

    assert_eq!(uf.set_size(0), 2);
    assert_eq!(uf.set_size(4), 3);
    assert_eq!(uf.set_size(5), 1);

    // Merging already-joined elements changes nothing
    assert!(uf.union(2, 4).is_none());
    assert_eq!(uf.set_size(2), 3);
}

#[test]
fn test_groups_of_subset() {
    let mut uf = DenseUnionFind::with_len(5);

    uf.union(4, 0);
    uf.union(0, 2);

    // Element 3 is excluded from the grouping
    let groups = uf.groups_of([0, 1, 2, 4]);
    assert_eq!(groups.len(), 2);

    let big = groups.get(&uf.root(0)).unwrap();
    assert_eq!(big, &vec![0, 2, 4], "Members should be sorted");
    assert_eq!(groups.get(&1).unwrap(), &vec![1]);
}

#[test]
fn test_serde_round_trip_preserves_sets() {
    let mut uf = DenseUnionFind::with_len(3);
    uf.union(0, 2);

    let json = serde_json::to_string(&uf).unwrap();
    let mut restored: DenseUnionFind = serde_json::from_str(&json).unwrap();

    assert!(restored.connected(0, 2));
    assert!(!restored.connected(0, 1));
    assert_eq!(restored.set_size(2), 2);
}
