//! Core-point classification by weighted neighbourhood size.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::spatial_index::SpatialIndex;
use crate::core::domain::Point;

/// Neighbourhood radius, in blocks of Manhattan distance.
pub const EPSILON: i32 = 16;

/// Role of a point in the density clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointAttribute {
    /// Not (yet) part of any cluster; final noise if it stays this way
    Noise,
    /// Within epsilon of a core point and adopted into its cluster
    Reachable,
    /// Neighbourhood weight above the noise threshold
    Core,
}

/// Marks points whose epsilon-neighbourhood (including the point itself)
/// carries more event weight than the noise threshold.
#[derive(Debug, Clone, Copy)]
pub struct DensityClassifier {
    epsilon: i32,
    noise_weight_threshold: u64,
}

impl DensityClassifier {
    pub fn new(epsilon: i32, noise_weight_threshold: u64) -> Self {
        Self {
            epsilon,
            noise_weight_threshold,
        }
    }

    /// Total weight of the points within epsilon of `center`.
    pub fn neighborhood_weight(&self, index: &SpatialIndex<'_, Point>, center: &Point) -> u64 {
        let items = index.items();
        index
            .neighbors(center, self.epsilon)
            .into_iter()
            .map(|i| u64::from(items[i].w))
            .sum()
    }

    pub fn is_core(&self, index: &SpatialIndex<'_, Point>, center: &Point) -> bool {
        self.neighborhood_weight(index, center) > self.noise_weight_threshold
    }

    /// Label every indexed point `Core` or `Noise`, in index item order.
    ///
    /// Points are classified independently on the current rayon pool.
    pub fn classify(&self, index: &SpatialIndex<'_, Point>) -> Vec<PointAttribute> {
        index
            .items()
            .par_iter()
            .map(|point| {
                if self.is_core(index, point) {
                    PointAttribute::Core
                } else {
                    PointAttribute::Noise
                }
            })
            .collect()
    }
}
