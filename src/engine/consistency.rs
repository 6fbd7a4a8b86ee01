//! Detection of upstream deletions.
//!
//! Evolution timelines are prefix computations over the discovery order, so
//! a deleted activity cannot be patched out of the state. The engine only
//! needs to know whether anything it references has disappeared.

use std::collections::{BTreeSet, HashSet};

use crate::ActivityId;

use super::visit_store::TileVisitStore;

/// Activity ids referenced by the store but absent from `present`.
///
/// Covers the per-tile activity sets as well as first/last visitors.
pub fn find_deleted_activities(
    store: &TileVisitStore,
    present: &HashSet<ActivityId>,
) -> BTreeSet<ActivityId> {
    store
        .referenced_activity_ids()
        .into_iter()
        .filter(|id| !present.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tile;

    #[test]
    fn test_reports_missing_ids() {
        let mut store = TileVisitStore::new();
        store.record_touch(3, Tile::new(1, 2), 7, 0, true).unwrap();
        store.record_touch(3, Tile::new(1, 2), 8, 5, false).unwrap();

        let present: HashSet<ActivityId> = [7].into_iter().collect();
        let deleted = find_deleted_activities(&store, &present);
        assert_eq!(deleted.into_iter().collect::<Vec<_>>(), vec![8]);
    }
}
