//! Domain models for weighted events and their analysis results.
//!
//! A [`Point`] is one block coordinate together with the number of events
//! observed there during the collection period. Analysis splits a set of
//! points into a [`Partition`], and statistics turn each part into a
//! [`ClusterStatistics`] or [`NoiseStatistics`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A block coordinate carrying an event count.
///
/// Equality covers all four fields, so two points at the same coordinate with
/// different weights are distinct values. Analysis requires at most one point
/// per coordinate; use [`Point::merge_by_coordinate`] to fold raw events.
///
/// # Examples
///
/// ```
/// use bread_analysis::Point;
///
/// let a = Point::new(0, 64, 0, 3);
/// let b = Point::new(2, 60, -1, 1);
/// assert_eq!(a.manhattan_distance(&b), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: u32,
}

impl Point {
    pub fn new(x: i32, y: i32, z: i32, w: u32) -> Self {
        Self { x, y, z, w }
    }

    /// Sum of absolute per-axis differences, ignoring weights.
    pub fn manhattan_distance(&self, other: &Point) -> i64 {
        (i64::from(self.x) - i64::from(other.x)).abs()
            + (i64::from(self.y) - i64::from(other.y)).abs()
            + (i64::from(self.z) - i64::from(other.z)).abs()
    }

    /// Fold points sharing a coordinate into one point whose weight is the sum.
    ///
    /// Weights saturate at `u32::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bread_analysis::Point;
    ///
    /// let merged = Point::merge_by_coordinate(vec![
    ///     Point::new(1, 2, 3, 1),
    ///     Point::new(1, 2, 3, 4),
    ///     Point::new(0, 0, 0, 1),
    /// ]);
    /// assert_eq!(merged.len(), 2);
    /// assert!(merged.contains(&Point::new(1, 2, 3, 5)));
    /// ```
    pub fn merge_by_coordinate<I>(points: I) -> HashSet<Point>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut weights: HashMap<(i32, i32, i32), u32> = HashMap::new();
        for point in points {
            let weight = weights.entry((point.x, point.y, point.z)).or_insert(0);
            *weight = weight.saturating_add(point.w);
        }
        weights
            .into_iter()
            .map(|((x, y, z), w)| Point::new(x, y, z, w))
            .collect()
    }
}

/// Output of one cluster analysis: every input point lands in exactly one set.
///
/// Cluster order carries no meaning. The noise set is always present, even
/// when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub clusters: Vec<HashSet<Point>>,
    pub noise: HashSet<Point>,
}

impl Partition {
    /// Flatten into `clusters ++ [noise]`; the last set is always the noise.
    pub fn into_sets(self) -> Vec<HashSet<Point>> {
        let mut sets = self.clusters;
        sets.push(self.noise);
        sets
    }
}

/// Summary of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    pub raw: HashSet<Point>,
    pub events_per_tick: f64,
    /// Weighted centroid as `[x, y, z]`
    pub centroid: [f64; 3],
    /// Weighted mean Euclidean distance of the events from the centroid
    pub distance_from_centroid: f64,
}

/// Summary of the points that belong to no cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseStatistics {
    pub raw: HashSet<Point>,
    pub events_per_tick: f64,
}

/// Statistics for one source, with clusters ordered busiest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStatistics {
    pub clusters: Vec<ClusterStatistics>,
    pub noise: NoiseStatistics,
}

impl WorldStatistics {
    /// Assemble statistics, sorting clusters by descending `events_per_tick`.
    pub fn new(mut clusters: Vec<ClusterStatistics>, noise: NoiseStatistics) -> Self {
        clusters.sort_by(|a, b| b.events_per_tick.total_cmp(&a.events_per_tick));
        Self { clusters, noise }
    }

    /// Sum of the event rates of all clusters and the noise.
    pub fn total_events_per_tick(&self) -> f64 {
        self.clusters.iter().map(|c| c.events_per_tick).sum::<f64>() + self.noise.events_per_tick
    }
}
