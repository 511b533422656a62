//! Density-based partition of one point set into clusters and noise.

use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use super::density::{DensityClassifier, PointAttribute};
use super::spatial_index::{point_axes, SpatialIndex};
use super::union_find::ClusterMerger;
use crate::config::AnalysisParameters;
use crate::core::domain::{Partition, Point};
use crate::error::{AnalysisError, AnalysisResult};

/// A point with its label, created per analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointData {
    pub point: Point,
    pub attribute: PointAttribute,
    /// 1-based cluster number; 0 = unassigned
    pub cluster_id: usize,
}

impl PointData {
    pub fn new(point: Point) -> Self {
        Self {
            point,
            attribute: PointAttribute::Noise,
            cluster_id: 0,
        }
    }
}

/// Partition `points` into dense clusters and noise.
///
/// 1. Points whose epsilon-neighbourhood weighs more than the noise threshold
///    become core points.
/// 2. Core points within epsilon of each other are merged into clusters.
/// 3. Every other point joins the cluster of its nearest core point within
///    epsilon, or stays noise. Distance ties go to the core point that comes
///    first in (x, y, z) order.
///
/// Runs its data-parallel passes on the current rayon pool.
///
/// # Errors
/// * `AnalysisError::DuplicateKey` if two points share a coordinate
///
/// # Examples
///
/// ```
/// use bread_analysis::algorithms::cluster_analysis;
/// use bread_analysis::{AnalysisParameters, Point};
/// use std::collections::HashSet;
///
/// let points: HashSet<Point> = [
///     Point::new(0, 0, 0, 20),
///     Point::new(1, 0, 0, 20),
///     Point::new(2, 0, 0, 20),
/// ]
/// .into_iter()
/// .collect();
///
/// let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
/// assert_eq!(partition.clusters.len(), 1);
/// assert!(partition.noise.is_empty());
/// ```
pub fn cluster_analysis(
    points: &HashSet<Point>,
    params: &AnalysisParameters,
) -> AnalysisResult<Partition> {
    cluster_analysis_with_cancel(points, params, &CancellationToken::new())
}

/// [`cluster_analysis`] that gives up between phases once `cancel` fires.
///
/// # Errors
/// * `AnalysisError::DuplicateKey` if two points share a coordinate
/// * `AnalysisError::Cancelled` if `cancel` fired before the last phase
pub fn cluster_analysis_with_cancel(
    points: &HashSet<Point>,
    params: &AnalysisParameters,
    cancel: &CancellationToken,
) -> AnalysisResult<Partition> {
    let checkpoint = || {
        if cancel.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    };

    let mut items: Vec<Point> = points.iter().copied().collect();
    items.sort_unstable();

    checkpoint()?;
    let mut index = SpatialIndex::build(&items, point_axes())?;

    checkpoint()?;
    let classifier = DensityClassifier::new(params.epsilon, params.noise_weight_threshold);
    let attributes = classifier.classify(&index);
    let mut labelled: Vec<PointData> = items
        .iter()
        .zip(&attributes)
        .map(|(&point, &attribute)| PointData {
            attribute,
            ..PointData::new(point)
        })
        .collect();

    checkpoint()?;
    let components = ClusterMerger::new(&index, params.epsilon).merge(&attributes);
    for (number, members) in components.iter().enumerate() {
        for &member in members {
            labelled[member].cluster_id = number + 1;
        }
    }

    checkpoint()?;
    let nearest_core: Vec<Option<usize>> = labelled
        .par_iter()
        .map(|data| {
            if data.attribute != PointAttribute::Noise {
                return None;
            }
            index
                .neighbors(&data.point, params.epsilon)
                .into_iter()
                .filter(|&j| labelled[j].attribute == PointAttribute::Core)
                .min_by_key(|&j| data.point.manhattan_distance(&labelled[j].point))
        })
        .collect();
    index.clear();

    for (i, nearest) in nearest_core.into_iter().enumerate() {
        if let Some(core) = nearest {
            labelled[i].attribute = PointAttribute::Reachable;
            labelled[i].cluster_id = labelled[core].cluster_id;
        }
    }

    let mut partition = Partition {
        clusters: vec![HashSet::new(); components.len()],
        noise: HashSet::new(),
    };
    for data in labelled {
        match data.attribute {
            PointAttribute::Noise => {
                partition.noise.insert(data.point);
            }
            PointAttribute::Core | PointAttribute::Reachable => {
                partition.clusters[data.cluster_id - 1].insert(data.point);
            }
        }
    }

    debug!(
        "Partitioned {} points into {} clusters and {} noise points",
        items.len(),
        partition.clusters.len(),
        partition.noise.len()
    );

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[Point]) -> HashSet<Point> {
        points.iter().copied().collect()
    }

    #[test]
    fn test_three_heavy_points_form_one_cluster() {
        let points = set(&[
            Point::new(0, 0, 0, 20),
            Point::new(1, 0, 0, 20),
            Point::new(2, 0, 0, 20),
        ]);

        let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
        assert_eq!(partition.clusters, vec![points]);
        assert!(partition.noise.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let partition = cluster_analysis(&HashSet::new(), &AnalysisParameters::new(25, 300)).unwrap();
        assert_eq!(partition.into_sets(), vec![HashSet::new()]);
    }

    #[test]
    fn test_all_light_points_are_noise() {
        let points = set(&[
            Point::new(0, 0, 0, 5),
            Point::new(3, 0, 0, 5),
            Point::new(200, 0, 0, 5),
        ]);

        let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
        assert!(partition.clusters.is_empty());
        assert_eq!(partition.noise, points);
    }

    #[test]
    fn test_light_point_near_core_becomes_reachable() {
        // (0,0,0) is core only thanks to the heavy point behind it; (16,0,0)
        // sees just that core and itself, and (40,0,0) sees nothing
        let core = Point::new(0, 0, 0, 1);
        let reachable = Point::new(16, 0, 0, 1);
        let outlier = Point::new(40, 0, 0, 1);
        let points = set(&[Point::new(-16, 0, 0, 30), core, reachable, outlier]);

        let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
        assert_eq!(partition.clusters.len(), 1);
        let cluster = &partition.clusters[0];
        assert!(cluster.contains(&core));
        assert!(cluster.contains(&reachable));
        assert_eq!(partition.noise, set(&[outlier]));
    }

    #[test]
    fn test_separate_blobs_form_separate_clusters() {
        let mut points = HashSet::new();
        for i in 0..5 {
            points.insert(Point::new(i, 0, 0, 10));
            points.insert(Point::new(500 + i, 0, 0, 10));
        }

        let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
        assert_eq!(partition.clusters.len(), 2);
        assert!(partition.clusters.iter().all(|c| c.len() == 5));
        assert!(partition.noise.is_empty());
    }

    #[test]
    fn test_equidistant_noise_joins_first_core_in_index_order() {
        // Two clusters {(-26,..), (-10,..)} and {(10,..), (26,..)}; the point
        // at the origin sees both inner cores at distance 10 but weighs only 3
        let left_core = Point::new(-10, 0, 0, 1);
        let right_core = Point::new(10, 0, 0, 1);
        let origin = Point::new(0, 0, 0, 1);
        let points = set(&[
            Point::new(-26, 0, 0, 30),
            left_core,
            origin,
            right_core,
            Point::new(26, 0, 0, 30),
        ]);

        let partition = cluster_analysis(&points, &AnalysisParameters::new(25, 300)).unwrap();
        assert_eq!(partition.clusters.len(), 2);
        assert!(partition.noise.is_empty());

        let with_origin = partition
            .clusters
            .iter()
            .find(|c| c.contains(&origin))
            .unwrap();
        assert!(with_origin.contains(&left_core));
        assert!(!with_origin.contains(&right_core));
    }

    #[test]
    fn test_duplicate_coordinate_is_fatal() {
        let points = set(&[Point::new(4, 5, 6, 1), Point::new(4, 5, 6, 2)]);
        let result = cluster_analysis(&points, &AnalysisParameters::new(25, 300));
        assert_eq!(result, Err(AnalysisError::DuplicateKey(vec![4, 5, 6])));
    }

    #[test]
    fn test_cancelled_analysis_stops_early() {
        let points = set(&[Point::new(0, 0, 0, 20), Point::new(1, 0, 0, 20)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cluster_analysis_with_cancel(&points, &AnalysisParameters::new(25, 300), &cancel);
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }

    #[test]
    fn test_uncancelled_token_runs_to_completion() {
        let points = set(&[Point::new(0, 0, 0, 20), Point::new(1, 0, 0, 20)]);
        let result =
            cluster_analysis_with_cancel(&points, &AnalysisParameters::new(25, 300), &CancellationToken::new())
                .unwrap();
        assert_eq!(result.clusters, vec![points]);
    }

    #[test]
    fn test_point_data_starts_unassigned() {
        let data = PointData::new(Point::new(1, 1, 1, 1));
        assert_eq!(data.attribute, PointAttribute::Noise);
        assert_eq!(data.cluster_id, 0);
    }
}
