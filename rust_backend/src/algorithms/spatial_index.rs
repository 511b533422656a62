//! Multi-level range tree over integer keys.
//!
//! Each level of the tree indexes one key (for points: x, then y, then z) in a
//! sorted map whose values are the subtrees for the remaining keys. A leaf
//! holds exactly one item, so the full key tuple must be unique.
//!
//! Queries descend only into subtrees whose key lies inside the per-axis
//! bounds, then filter the candidates by exact Manhattan distance.

use std::collections::BTreeMap;

use crate::core::domain::Point;
use crate::error::{AnalysisError, AnalysisResult};

/// Extracts one integer key from an item.
pub type KeyFn<T> = fn(&T) -> i32;

enum Node {
    /// Index of the item in the backing slice
    Leaf(usize),
    Internal(BTreeMap<i32, Node>),
}

/// Read-only range index over a borrowed slice of items.
///
/// Query results are indices into [`SpatialIndex::items`], in ascending key
/// order.
pub struct SpatialIndex<'a, T> {
    items: &'a [T],
    keys: Vec<KeyFn<T>>,
    root: Option<Node>,
}

impl<'a, T> SpatialIndex<'a, T> {
    /// Build the index.
    ///
    /// # Errors
    /// * `AnalysisError::DuplicateKey` if two items share the full key tuple
    /// * `AnalysisError::InternalError` if `keys` is empty
    pub fn build(items: &'a [T], keys: Vec<KeyFn<T>>) -> AnalysisResult<Self> {
        if keys.is_empty() {
            return Err(AnalysisError::InternalError(
                "spatial index needs at least one key".to_string(),
            ));
        }

        let root = if items.is_empty() {
            None
        } else {
            Some(make_node(items, &keys, 0, (0..items.len()).collect())?)
        };

        Ok(Self { items, keys, root })
    }

    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn len(&self) -> usize {
        if self.root.is_some() {
            self.items.len()
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items within Manhattan distance `|epsilon|` of `center`, inclusive.
    ///
    /// The center itself is included when it is indexed.
    pub fn neighbors(&self, center: &T, epsilon: i32) -> Vec<usize> {
        let radius = i64::from(epsilon.unsigned_abs());
        let coords: Vec<i64> = self.keys.iter().map(|key| i64::from(key(center))).collect();
        let from: Vec<i32> = coords.iter().map(|&c| clamp_to_i32(c - radius)).collect();
        let to: Vec<i32> = coords.iter().map(|&c| clamp_to_i32(c + radius)).collect();

        self.query_inclusive_range(&from, &to)
            .into_iter()
            .filter(|&index| self.manhattan_distance(center, &self.items[index]) <= radius)
            .collect()
    }

    /// Release every node. The index answers empty afterwards.
    pub fn clear(&mut self) {
        let mut pending: Vec<Node> = self.root.take().into_iter().collect();
        while let Some(node) = pending.pop() {
            if let Node::Internal(children) = node {
                pending.extend(children.into_values());
            }
        }
    }

    fn manhattan_distance(&self, a: &T, b: &T) -> i64 {
        self.keys
            .iter()
            .map(|key| (i64::from(key(a)) - i64::from(key(b))).abs())
            .sum()
    }

    /// Indices of all items inside the axis-aligned box, bounds inclusive.
    fn query_inclusive_range(&self, from: &[i32], to: &[i32]) -> Vec<usize> {
        debug_assert_eq!(from.len(), self.keys.len());
        debug_assert_eq!(to.len(), self.keys.len());

        let mut result = Vec::new();
        let mut stack: Vec<(&Node, usize)> = self.root.iter().map(|root| (root, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            match node {
                Node::Leaf(index) => result.push(*index),
                Node::Internal(children) => {
                    let less = from[depth].min(to[depth]);
                    let greater = from[depth].max(to[depth]);
                    // pushed in reverse so they pop in ascending key order
                    stack.extend(
                        children
                            .range(less..=greater)
                            .rev()
                            .map(|(_, child)| (child, depth + 1)),
                    );
                }
            }
        }

        result
    }
}

impl<T> Drop for SpatialIndex<'_, T> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn make_node<T>(
    items: &[T],
    keys: &[KeyFn<T>],
    depth: usize,
    indices: Vec<usize>,
) -> AnalysisResult<Node> {
    if depth == keys.len() {
        return match indices.as_slice() {
            [single] => Ok(Node::Leaf(*single)),
            [first, ..] => Err(AnalysisError::DuplicateKey(
                keys.iter().map(|key| key(&items[*first])).collect(),
            )),
            [] => Err(AnalysisError::InternalError(
                "empty group while building spatial index".to_string(),
            )),
        };
    }

    let key = keys[depth];
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for index in indices {
        groups.entry(key(&items[index])).or_default().push(index);
    }

    let children = groups
        .into_iter()
        .map(|(component, group)| Ok((component, make_node(items, keys, depth + 1, group)?)))
        .collect::<AnalysisResult<BTreeMap<i32, Node>>>()?;

    Ok(Node::Internal(children))
}

/// Key functions for (x, y, z) point indexing.
pub fn point_axes() -> Vec<KeyFn<Point>> {
    let axes: [KeyFn<Point>; 3] = [|p| p.x, |p| p.y, |p| p.z];
    axes.to_vec()
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
