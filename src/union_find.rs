//! Union-Find over a dense integer arena.
//!
//! Elements are small integers handed out in insertion order, so parents,
//! ranks and set sizes live in flat vectors. Union by rank plus path halving
//! gives near-constant amortized `find`/`union`, and the whole structure is
//! serializable for resumable computations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Disjoint-set forest keyed by dense `u32` ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseUnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
    size: Vec<u32>,
}

impl DenseUnionFind {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forest with `n` singleton sets `0..n`.
    pub fn with_len(n: u32) -> Self {
        let mut uf = Self::new();
        for _ in 0..n {
            uf.make_set();
        }
        uf
    }

    /// Add a new singleton set and return its id.
    pub fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.rank.push(0);
        self.size.push(1);
        id
    }

    /// Number of elements (not sets).
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the root of `id`, halving the path on the way.
    pub fn find(&mut self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            let grandparent = self.parent[self.parent[id as usize] as usize];
            self.parent[id as usize] = grandparent;
            id = grandparent;
        }
        id
    }

    /// Find the root of `id` without modifying the forest.
    pub fn root(&self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            id = self.parent[id as usize];
        }
        id
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Returns the new root if two distinct sets were merged, `None` if they
    /// were already the same set.
    pub fn union(&mut self, a: u32, b: u32) -> Option<u32> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return None;
        }

        let (winner, loser) = match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                self.rank[ra as usize] += 1;
                (ra, rb)
            }
        };

        self.parent[loser as usize] = winner;
        self.size[winner as usize] += self.size[loser as usize];
        Some(winner)
    }

    /// Whether `a` and `b` are in the same set.
    pub fn connected(&mut self, a: u32, b: u32) -> bool {
        self.find(a) == self.find(b)
    }

    /// Size of the set containing `id`.
    pub fn set_size(&self, id: u32) -> u32 {
        self.size[self.root(id) as usize]
    }

    /// Group the given elements by root.
    ///
    /// Members are sorted so the output is deterministic.
    pub fn groups_of(&self, ids: impl IntoIterator<Item = u32>) -> HashMap<u32, Vec<u32>> {
        let mut groups: HashMap<u32, Vec<u32>> = HashMap::new();
        for id in ids {
            groups.entry(self.root(id)).or_default().push(id);
        }
        for members in groups.values_mut() {
            members.sort_unstable();
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_tracks_size() {
        let mut uf = DenseUnionFind::with_len(4);
        assert_eq!(uf.set_size(0), 1);
        assert!(uf.union(0, 1).is_some());
        assert!(uf.union(2, 3).is_some());
        assert!(uf.union(1, 0).is_none());
        assert!(uf.union(1, 3).is_some());
        assert_eq!(uf.set_size(2), 4);
    }
}
