//! Property tests for the cluster analysis pipeline.
//!
//! These tests check, over random point sets, that:
//! 1. Every point lands in exactly one cluster or the noise
//! 2. The union-find merge finds the same clusters as a graph traversal
//! 3. Reachable points join their nearest core point
//! 4. Well separated dense blobs are recovered exactly
//! 5. Repeated runs give the same partition

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use bread_analysis::algorithms::{
    cluster_analysis, point_axes, ClusterMerger, DensityClassifier, PointAttribute, SpatialIndex,
    EPSILON,
};
use bread_analysis::{AnalysisParameters, Point};

const THRESHOLD: u64 = 25;

// ==================== Helper Functions ====================

fn points_strategy() -> impl Strategy<Value = HashSet<Point>> {
    prop::collection::vec((-40i32..40, -6i32..6, -40i32..40, 1u32..20), 0..80)
        .prop_map(|raw| {
            Point::merge_by_coordinate(raw.into_iter().map(|(x, y, z, w)| Point::new(x, y, z, w)))
        })
}

/// Dense 3x3x3 cubes 200 blocks apart along x, plus isolated noise points
/// 50 blocks apart on a plane far above them.
fn blobs_with_noise_strategy() -> impl Strategy<Value = (Vec<HashSet<Point>>, HashSet<Point>)> {
    (5usize..15, 0usize..20, 1u32..4).prop_map(|(blob_count, noise_count, weight)| {
        let blobs = (0..blob_count as i32)
            .map(|b| {
                let mut blob = HashSet::new();
                for dx in 0..3 {
                    for dy in 0..3 {
                        for dz in 0..3 {
                            // the heavy center alone makes every cube point core
                            let w = if (dx, dy, dz) == (1, 1, 1) { 30 } else { weight };
                            blob.insert(Point::new(b * 200 + dx, dy, dz, w));
                        }
                    }
                }
                blob
            })
            .collect();
        let noise = (0..noise_count as i32)
            .map(|n| Point::new(n * 50, 1000, 0, 1))
            .collect();
        (blobs, noise)
    })
}

fn brute_force_is_core(points: &HashSet<Point>, center: &Point) -> bool {
    let weight: u64 = points
        .iter()
        .filter(|p| p.manhattan_distance(center) <= i64::from(EPSILON))
        .map(|p| u64::from(p.w))
        .sum();
    weight > THRESHOLD
}

/// Connected components of the core points by depth-first traversal.
fn traversal_components(items: &[Point], attributes: &[PointAttribute]) -> BTreeSet<Vec<usize>> {
    let core: Vec<usize> = (0..items.len())
        .filter(|&i| attributes[i] == PointAttribute::Core)
        .collect();

    let mut visited = vec![false; items.len()];
    let mut components = BTreeSet::new();
    for &start in &core {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            component.push(i);
            for &j in &core {
                if !visited[j] && items[i].manhattan_distance(&items[j]) <= i64::from(EPSILON) {
                    visited[j] = true;
                    stack.push(j);
                }
            }
        }
        component.sort_unstable();
        components.insert(component);
    }
    components
}

fn within(a: &Point, b: &Point) -> bool {
    a.manhattan_distance(b) <= i64::from(EPSILON)
}

fn sorted(set: &HashSet<Point>) -> Vec<Point> {
    let mut points: Vec<Point> = set.iter().copied().collect();
    points.sort_unstable();
    points
}

// ==================== Properties ====================

proptest! {
    #[test]
    fn partition_covers_every_point_once(points in points_strategy()) {
        let partition = cluster_analysis(&points, &AnalysisParameters::new(THRESHOLD, 300)).unwrap();

        let assigned = partition.clusters.iter().map(HashSet::len).sum::<usize>() + partition.noise.len();
        prop_assert_eq!(assigned, points.len());
        let mut seen = HashSet::new();
        for set in partition.clusters.iter().chain(std::iter::once(&partition.noise)) {
            for point in set {
                prop_assert!(points.contains(point));
                prop_assert!(seen.insert(*point), "point {:?} assigned twice", point);
            }
        }
        prop_assert!(partition.clusters.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn union_find_matches_graph_traversal(points in points_strategy()) {
        let items = sorted(&points);
        let index = SpatialIndex::build(&items, point_axes()).unwrap();
        let attributes = DensityClassifier::new(EPSILON, THRESHOLD).classify(&index);

        let merged: BTreeSet<Vec<usize>> = ClusterMerger::new(&index, EPSILON)
            .merge(&attributes)
            .into_iter()
            .collect();

        prop_assert_eq!(merged, traversal_components(&items, &attributes));
    }

    #[test]
    fn labels_follow_nearest_core(points in points_strategy()) {
        let partition = cluster_analysis(&points, &AnalysisParameters::new(THRESHOLD, 300)).unwrap();
        let cores: Vec<Point> = points
            .iter()
            .filter(|p| brute_force_is_core(&points, p))
            .copied()
            .collect();

        for noise in &partition.noise {
            prop_assert!(!brute_force_is_core(&points, noise));
            prop_assert!(cores.iter().all(|c| !within(noise, c)));
        }

        for cluster in &partition.clusters {
            prop_assert!(cluster.iter().any(|p| brute_force_is_core(&points, p)));
            for point in cluster.iter().filter(|p| !brute_force_is_core(&points, p)) {
                let nearest = cores
                    .iter()
                    .filter(|c| within(point, c))
                    .map(|c| point.manhattan_distance(c))
                    .min();
                let nearest_own = cluster
                    .iter()
                    .filter(|c| brute_force_is_core(&points, c) && within(point, c))
                    .map(|c| point.manhattan_distance(c))
                    .min();
                prop_assert!(nearest.is_some());
                prop_assert_eq!(nearest, nearest_own);
            }
        }
    }

    #[test]
    fn recovers_generated_blobs((blobs, noise) in blobs_with_noise_strategy()) {
        let mut points: HashSet<Point> = noise.clone();
        for blob in &blobs {
            points.extend(blob.iter().copied());
        }

        let partition = cluster_analysis(&points, &AnalysisParameters::new(THRESHOLD, 300)).unwrap();

        prop_assert_eq!(partition.noise, noise);
        prop_assert_eq!(partition.clusters, blobs);
    }

    #[test]
    fn analysis_is_deterministic(points in points_strategy()) {
        let params = AnalysisParameters::new(THRESHOLD, 300);
        let first = cluster_analysis(&points, &params).unwrap();
        let second = cluster_analysis(&points, &params).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ==================== Scenarios ====================

#[test]
fn test_dense_blob_with_scattered_noise() {
    let mut points: HashSet<Point> = (0..5)
        .flat_map(|x| (0..5).map(move |z| Point::new(x, 64, z, 2)))
        .collect();
    let noise = [
        Point::new(100, 64, 100, 1),
        Point::new(-100, 64, 0, 1),
        Point::new(0, 10, -100, 1),
    ];
    points.extend(noise);

    let partition = cluster_analysis(&points, &AnalysisParameters::new(THRESHOLD, 300)).unwrap();

    assert_eq!(partition.clusters.len(), 1);
    assert_eq!(partition.clusters[0].len(), 25);
    assert_eq!(partition.noise, noise.into_iter().collect::<HashSet<_>>());
}

#[test]
fn test_clusters_ordered_by_first_core_point() {
    let far: HashSet<Point> = (0..3).map(|i| Point::new(1000 + i, 0, 0, 20)).collect();
    let near: HashSet<Point> = (0..3).map(|i| Point::new(-1000 + i, 0, 0, 20)).collect();
    let points: HashSet<Point> = far.union(&near).copied().collect();

    let partition = cluster_analysis(&points, &AnalysisParameters::new(THRESHOLD, 300)).unwrap();
    assert_eq!(partition.clusters, vec![near, far]);
}
