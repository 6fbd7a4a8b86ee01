//! Tests for the tile visit store

use explorer_tiles::engine::{find_deleted_activities, TileVisitStore, Visit};
use explorer_tiles::{ExplorerError, Tile};
use std::collections::HashSet;

#[test]
fn test_first_touch_appends_history_once() {
    let mut store = TileVisitStore::new();
    let tile = Tile::new(4, 4);

    assert!(store.record_touch(3, tile, 1, 100, true).unwrap());
    assert!(!store.record_touch(3, tile, 2, 50, true).unwrap());
    assert!(!store.record_touch(3, tile, 3, 200, true).unwrap());

    let history = store.discovery_history(3);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].activity_id, 1);
    assert_eq!(history[0].tile, tile);

    // First/last follow visit time, not processing order
    let info = store.tile_info(3, tile).unwrap();
    assert_eq!(info.first, Some(Visit { time: 50, activity_id: 2 }));
    assert_eq!(info.last, Some(Visit { time: 200, activity_id: 3 }));
    assert_eq!(info.activity_ids.len(), 3);
}

#[test]
fn test_ineligible_activity_only_joins_activity_set() {
    let mut store = TileVisitStore::new();
    let tile = Tile::new(2, 3);

    assert!(!store.record_touch(5, tile, 9, 10, false).unwrap());
    assert!(store.discovery_history(5).is_empty());

    let info = store.tile_info(5, tile).unwrap();
    assert!(!info.is_discovered());
    assert!(info.activity_ids.contains(&9));
    assert_eq!(store.discovered_tiles(5).count(), 0);

    // A later eligible activity discovers the tile
    assert!(store.record_touch(5, tile, 10, 20, true).unwrap());
    assert_eq!(store.discovery_history(5).len(), 1);
    assert_eq!(store.discovered_tiles(5).collect::<Vec<_>>(), vec![tile]);
}

#[test]
fn test_zooms_are_independent() {
    let mut store = TileVisitStore::new();
    store.record_touch(19, Tile::new(100, 100), 1, 0, true).unwrap();
    store.record_touch(18, Tile::new(50, 50), 1, 0, true).unwrap();

    assert_eq!(store.discovery_history(19).len(), 1);
    assert_eq!(store.discovery_history(18).len(), 1);
    assert!(store.discovery_history(17).is_empty());
    assert_eq!(store.tile_activities(19).len(), 1);
}

#[test]
fn test_out_of_range_is_rejected() {
    let mut store = TileVisitStore::new();
    assert!(matches!(
        store.record_touch(20, Tile::new(0, 0), 1, 0, true),
        Err(ExplorerError::InvalidZoom(20))
    ));
    assert!(store.record_touch(2, Tile::new(4, 0), 1, 0, true).is_err());
    assert!(store.is_empty());
}

#[test]
fn test_referenced_ids_and_deletions() {
    let mut store = TileVisitStore::new();
    store.record_touch(10, Tile::new(1, 1), 1, 0, true).unwrap();
    store.record_touch(10, Tile::new(1, 2), 2, 0, false).unwrap();
    store.record_touch(11, Tile::new(2, 2), 3, 0, true).unwrap();

    let referenced: Vec<u64> = store.referenced_activity_ids().into_iter().collect();
    assert_eq!(referenced, vec![1, 2, 3]);

    let present: HashSet<u64> = [1, 2, 3].into_iter().collect();
    assert!(find_deleted_activities(&store, &present).is_empty());

    let present: HashSet<u64> = [1, 3, 4].into_iter().collect();
    let deleted: Vec<u64> = find_deleted_activities(&store, &present).into_iter().collect();
    assert_eq!(deleted, vec![2]);
}

#[test]
fn test_serde_round_trip() {
    let mut store = TileVisitStore::new();
    store.record_touch(19, Tile::new(7, 8), 1, 5, true).unwrap();
    store.record_touch(19, Tile::new(7, 9), 2, 6, false).unwrap();

    let json = serde_json::to_string(&store).unwrap();
    let restored: TileVisitStore = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, store);
}
