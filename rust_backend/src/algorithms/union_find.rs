//! Connected components of core points via union-find.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;

use super::density::PointAttribute;
use super::spatial_index::SpatialIndex;
use crate::core::domain::Point;

/// Disjoint sets over `0..n` with union by rank and path compression.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// One singleton set per element.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Root of the set containing `x`; compresses the path walked.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Merge the sets of `a` and `b`. Returns `false` if already merged.
    ///
    /// The lower-rank root goes under the higher-rank one; on equal rank the
    /// root of `b` goes under the root of `a`.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            }
        }
        true
    }

    /// All sets, each listed in ascending element order. Sets are ordered by
    /// their smallest element.
    pub fn collect(&mut self) -> Vec<Vec<usize>> {
        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for element in 0..self.parent.len() {
            let root = self.find(element);
            let slot = *slots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(element);
        }

        groups
    }
}

/// Groups core points into clusters of mutually reachable neighbours.
pub struct ClusterMerger<'i, 'a> {
    index: &'i SpatialIndex<'a, Point>,
    epsilon: i32,
}

impl<'i, 'a> ClusterMerger<'i, 'a> {
    pub fn new(index: &'i SpatialIndex<'a, Point>, epsilon: i32) -> Self {
        Self { index, epsilon }
    }

    /// Connected components of the core points, as item indices.
    ///
    /// Neighbour queries run in parallel; every union goes through one lock.
    /// Components are ordered by their first core point in index order.
    pub fn merge(&self, attributes: &[PointAttribute]) -> Vec<Vec<usize>> {
        let items = self.index.items();
        let core: Vec<usize> = attributes
            .iter()
            .enumerate()
            .filter(|(_, attribute)| **attribute == PointAttribute::Core)
            .map(|(i, _)| i)
            .collect();

        let mut slot_of = vec![usize::MAX; attributes.len()];
        for (slot, &i) in core.iter().enumerate() {
            slot_of[i] = slot;
        }

        let sets = Mutex::new(UnionFind::new(core.len()));
        core.par_iter().enumerate().for_each(|(slot, &i)| {
            let neighbours: Vec<usize> = self
                .index
                .neighbors(&items[i], self.epsilon)
                .into_iter()
                .filter(|&j| attributes[j] == PointAttribute::Core)
                .map(|j| slot_of[j])
                .collect();

            let mut sets = sets.lock();
            for neighbour in neighbours {
                sets.union(slot, neighbour);
            }
        });

        sets.into_inner()
            .collect()
            .into_iter()
            .map(|group| group.into_iter().map(|slot| core[slot]).collect())
            .collect()
    }
}
