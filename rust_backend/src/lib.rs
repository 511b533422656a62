//! BREAD analysis backend - density clustering of weighted block events.
//!
//! Collected events arrive as one set of weighted [`Point`]s per source (world).
//! Each set is partitioned into dense clusters and sparse noise, and every
//! cluster is summarised by its event rate, weighted centroid and spread.
//!
//! # Layers
//!
//! - [`core`]: shared data types (points, partitions, statistics)
//! - [`algorithms`]: range tree, core-point classification, union-find merge,
//!   and the per-source cluster analysis built from them
//! - [`services`]: statistics, the bounded worker pool, the deadline-bound
//!   [`Analyser`] and the [`AnalysisSession`] result cache
//! - [`config`]: collection-period presets and TOML configuration
//!
//! # Example
//!
//! ```no_run
//! use bread_analysis::{Analyser, AnalyserConfig, Point};
//! use std::collections::{HashMap, HashSet};
//!
//! let mut world = HashSet::new();
//! world.insert(Point::new(0, 64, 0, 20));
//! world.insert(Point::new(1, 64, 0, 20));
//!
//! let mut points = HashMap::new();
//! points.insert("overworld".to_string(), world);
//!
//! let analyser = Analyser::start(points, &AnalyserConfig::default(), |result| {
//!     match result {
//!         Ok(Some(stats)) => println!("{} worlds analysed", stats.len()),
//!         Ok(None) => println!("timed out"),
//!         Err(e) => eprintln!("analysis failed: {}", e),
//!     }
//! })?;
//! analyser.wait();
//! # Ok::<(), bread_analysis::AnalysisError>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod services;

pub use config::{AnalyserConfig, AnalysisParameters, CollectionMode, CollectionPeriod};
pub use crate::core::domain::{ClusterStatistics, NoiseStatistics, Partition, Point, WorldStatistics};
pub use error::{AnalysisError, AnalysisResult};
pub use services::analyser::Analyser;
pub use services::session::{AnalysisSession, RunOutcome, SessionStatus};
