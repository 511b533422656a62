//! Service layer for running analyses.
//!
//! This module sits on top of the clustering algorithms. It turns partitions
//! into statistics, schedules the work on a bounded pool under a deadline, and
//! keeps the last result around between runs.

pub mod analyser;
pub mod session;
pub mod statistics;
pub mod worker_pool;

pub use analyser::{analyse_source, analyse_sources, Analyser, AnalysisOutput};
pub use session::{AnalysisSession, RunOutcome, SessionStatus};
pub use statistics::{count_cluster, count_noise};
pub use worker_pool::WorkerPool;
