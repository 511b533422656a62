//! Density clustering algorithms.
//!
//! This module holds the building blocks of the per-source cluster analysis
//! and the analysis itself.
//!
//! # Components
//!
//! - [`spatial_index`]: Range tree answering Manhattan neighbourhood queries
//! - [`density`]: Core-point classification by neighbourhood weight
//! - [`union_find`]: Merging of adjacent core points into clusters
//! - [`analysis`]: The full partition of a point set into clusters and noise

pub mod analysis;
pub mod density;
pub mod spatial_index;
pub mod union_find;

pub use analysis::{cluster_analysis, cluster_analysis_with_cancel, PointData};
pub use density::{DensityClassifier, PointAttribute, EPSILON};
pub use spatial_index::{point_axes, KeyFn, SpatialIndex};
pub use union_find::{ClusterMerger, UnionFind};
