//! Deadline-bound analysis of many point sources.
//!
//! [`Analyser::start`] runs in the background: each source is clustered on a
//! shared [`WorkerPool`], then every cluster and the noise are summarised
//! concurrently. The whole run races a deadline. The completion callback gets
//! either all sources' statistics, `None` on timeout, or the first error; it
//! never sees a partial result, and it is not called after
//! [`Analyser::force_stop`].

use futures::future::try_join_all;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::statistics::{count_cluster, count_noise};
use super::worker_pool::WorkerPool;
use crate::algorithms::analysis::cluster_analysis_with_cancel;
use crate::config::{AnalyserConfig, AnalysisParameters};
use crate::core::domain::{Partition, Point, WorldStatistics};
use crate::error::{AnalysisError, AnalysisResult};

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const STOPPED: u8 = 2;

/// What the completion callback receives: statistics per source, or `None`
/// when the deadline passed first.
pub type AnalysisOutput<K> = AnalysisResult<Option<HashMap<K, WorldStatistics>>>;

/// Handle to one background analysis run.
pub struct Analyser {
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Analyser {
    /// Validate `config` and start analysing `points` in the background.
    ///
    /// Returns as soon as the run is scheduled. `callback` is invoked once from
    /// the run's own thread, after [`Analyser::is_running`] has turned false.
    ///
    /// # Errors
    /// * `AnalysisError::ConfigurationError` if `config` does not validate
    /// * `AnalysisError::WorkerPool` if the pool or the supervisor thread
    ///   cannot be started
    pub fn start<K, C>(
        points: HashMap<K, HashSet<Point>>,
        config: &AnalyserConfig,
        callback: C,
    ) -> AnalysisResult<Self>
    where
        K: Eq + Hash + Send + 'static,
        C: FnOnce(AnalysisOutput<K>) + Send + 'static,
    {
        config.validate()?;
        let params = config.collection.parameters()?;
        let timeout = config.timeout();

        let pool = WorkerPool::new(config.threads)?;
        let cancel = pool.cancellation_token();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| AnalysisError::WorkerPool(format!("Failed to build runtime: {}", e)))?;

        let state = Arc::new(AtomicU8::new(RUNNING));

        info!(
            "Starting analysis of {} sources ({} points) with {} threads, timeout {:?}",
            points.len(),
            points.values().map(HashSet::len).sum::<usize>(),
            pool.threads(),
            timeout
        );

        let supervisor = thread::Builder::new()
            .name("bread-analyser".to_string())
            .spawn({
                let state = Arc::clone(&state);
                let cancel = cancel.clone();
                move || {
                    let started = Instant::now();
                    let outcome = runtime.block_on(async {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            result = tokio::time::timeout(
                                timeout,
                                analyse_sources(&pool, points, params),
                            ) => Some(result),
                        }
                    });

                    // abandon whatever is still queued
                    drop(pool);
                    drop(runtime);

                    let output = match outcome {
                        None => {
                            info!("Analysis stopped after {:?}", started.elapsed());
                            return;
                        }
                        Some(Ok(Ok(stats))) => {
                            info!(
                                "Analysis of {} sources finished in {:?}",
                                stats.len(),
                                started.elapsed()
                            );
                            Ok(Some(stats))
                        }
                        Some(Ok(Err(e))) => {
                            error!("Analysis failed: {}", e);
                            Err(e)
                        }
                        Some(Err(_)) => {
                            warn!("Analysis timed out after {:?}", timeout);
                            Ok(None)
                        }
                    };

                    // lost against force_stop
                    if state
                        .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        return;
                    }
                    callback(output);
                }
            })
            .map_err(|e| {
                AnalysisError::WorkerPool(format!("Failed to spawn analysis thread: {}", e))
            })?;

        Ok(Self {
            state,
            cancel,
            supervisor: Mutex::new(Some(supervisor)),
        })
    }

    /// True until the run completes, times out, fails or is stopped.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Cancel the run. Pending tasks are dropped and the callback will not be
    /// invoked. Returns `false`, doing nothing, if the run was already over.
    ///
    /// Safe to call from any thread at any time.
    pub fn force_stop(&self) -> bool {
        if self
            .state
            .compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        info!("Force stopping analysis");
        self.cancel.cancel();
        true
    }

    /// Block until the background thread exits, which includes the callback.
    pub fn wait(&self) {
        let handle = self.supervisor.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Analysis thread panicked");
            }
        }
    }
}

/// Statistics for every source, or the first error.
pub async fn analyse_sources<K>(
    pool: &WorkerPool,
    points: HashMap<K, HashSet<Point>>,
    params: AnalysisParameters,
) -> AnalysisResult<HashMap<K, WorldStatistics>>
where
    K: Eq + Hash,
{
    let runs = points.into_iter().map(|(key, source)| async move {
        let stats = analyse_source(pool, source, params).await?;
        Ok::<_, AnalysisError>((key, stats))
    });

    Ok(try_join_all(runs).await?.into_iter().collect())
}

/// Cluster one source, then summarise its clusters and noise concurrently.
///
/// Cancelling the pool also interrupts a clustering already under way at its
/// next phase boundary.
pub async fn analyse_source(
    pool: &WorkerPool,
    points: HashSet<Point>,
    params: AnalysisParameters,
) -> AnalysisResult<WorldStatistics> {
    let cancel = pool.cancellation_token();
    let Partition { clusters, noise } = pool
        .submit(move || cluster_analysis_with_cancel(&points, &params, &cancel))
        .await?;

    let ticks = params.period_ticks;
    let clusters = try_join_all(
        clusters
            .into_iter()
            .map(|cluster| pool.submit(move || Ok(count_cluster(cluster, ticks)))),
    );
    let noise = pool.submit(move || Ok(count_noise(noise, ticks)));

    let (clusters, noise) = futures::try_join!(clusters, noise)?;
    Ok(WorldStatistics::new(clusters, noise))
}
