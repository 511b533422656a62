//! Per-cluster and noise statistics.
//!
//! Weighted coordinate sums are accumulated as big integers, and the centroid
//! is divided out with a fixed decimal precision, so large weights at far-away
//! coordinates neither overflow nor lose digits before the final `f64`.

use bigdecimal::{BigDecimal, RoundingMode};
use log::warn;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::collections::HashSet;

use crate::core::domain::{ClusterStatistics, NoiseStatistics, Point};

/// Fractional digits kept when dividing the weighted sums.
pub const CENTROID_SCALE: i64 = 16;

/// Events per tick over the collection period.
///
/// A zero period yields 0.0 rather than infinity.
pub fn events_per_tick(total_weight: u64, period_ticks: u32) -> f64 {
    if period_ticks == 0 {
        warn!("Collection period of zero ticks, reporting no events per tick");
        return 0.0;
    }
    total_weight as f64 / f64::from(period_ticks)
}

/// Sum of the weights of `points`.
pub fn total_weight(points: &HashSet<Point>) -> u64 {
    points.iter().map(|p| u64::from(p.w)).sum()
}

/// Weighted centroid `(Σw·x, Σw·y, Σw·z) / Σw`, rounded half-up to
/// [`CENTROID_SCALE`] digits. An empty or weightless set sits at the origin.
pub fn weighted_centroid(points: &HashSet<Point>) -> [f64; 3] {
    let mut sums = [BigInt::zero(), BigInt::zero(), BigInt::zero()];
    let mut total = BigInt::zero();

    for point in points {
        let weight = BigInt::from(point.w);
        sums[0] += BigInt::from(point.x) * &weight;
        sums[1] += BigInt::from(point.y) * &weight;
        sums[2] += BigInt::from(point.z) * &weight;
        total += weight;
    }

    if total.is_zero() {
        return [0.0; 3];
    }

    let total = BigDecimal::new(total, 0);
    sums.map(|sum| {
        let mean = BigDecimal::new(sum, 0) / &total;
        mean.with_scale_round(CENTROID_SCALE, RoundingMode::HalfUp)
            .to_f64()
            .unwrap_or(0.0)
    })
}

/// Weighted mean Euclidean distance of `points` from `centroid`.
pub fn mean_distance(points: &HashSet<Point>, centroid: &[f64; 3]) -> f64 {
    let total = total_weight(points);
    if total == 0 {
        return 0.0;
    }

    let weighted: f64 = points
        .iter()
        .map(|p| {
            let dx = f64::from(p.x) - centroid[0];
            let dy = f64::from(p.y) - centroid[1];
            let dz = f64::from(p.z) - centroid[2];
            f64::from(p.w) * (dx * dx + dy * dy + dz * dz).sqrt()
        })
        .sum();

    weighted / total as f64
}

/// Rate, centroid and spread of one cluster. Takes ownership of the points,
/// which are kept as the raw set.
pub fn count_cluster(cluster: HashSet<Point>, period_ticks: u32) -> ClusterStatistics {
    let centroid = weighted_centroid(&cluster);
    ClusterStatistics {
        events_per_tick: events_per_tick(total_weight(&cluster), period_ticks),
        distance_from_centroid: mean_distance(&cluster, &centroid),
        centroid,
        raw: cluster,
    }
}

pub fn count_noise(noise: HashSet<Point>, period_ticks: u32) -> NoiseStatistics {
    NoiseStatistics {
        events_per_tick: events_per_tick(total_weight(&noise), period_ticks),
        raw: noise,
    }
}
