//! Long-lived holder of the current analysis run and its last result.
//!
//! A session runs at most one [`Analyser`] at a time and caches what the last
//! run produced, so callers can start a run and come back for the statistics
//! later. Starting a new run clears the cache; a timed-out, failed or stopped
//! run leaves it empty.

use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use super::analyser::Analyser;
use crate::config::AnalyserConfig;
use crate::core::domain::{Point, WorldStatistics};
use crate::error::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Analysing,
}

/// How the last run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    TimedOut,
    Failed(String),
    Stopped,
}

struct SessionState<K> {
    status: SessionStatus,
    /// Bumped on every start and stop; callbacks of older runs are ignored
    generation: u64,
    analyser: Option<Arc<Analyser>>,
    last_result: Option<HashMap<K, WorldStatistics>>,
    last_outcome: Option<RunOutcome>,
}

/// Cheap to clone; clones share the same state.
pub struct AnalysisSession<K> {
    config: AnalyserConfig,
    state: Arc<RwLock<SessionState<K>>>,
}

impl<K> Clone for AnalysisSession<K> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K> AnalysisSession<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(SessionState {
                status: SessionStatus::Idle,
                generation: 0,
                analyser: None,
                last_result: None,
                last_outcome: None,
            })),
        }
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Start analysing `points` unless a run is already in progress.
    ///
    /// # Returns
    /// * `Ok(true)` if a new run was started
    /// * `Ok(false)` if the session is busy
    pub fn start(&self, points: HashMap<K, HashSet<Point>>) -> AnalysisResult<bool> {
        let mut state = self.state.write();
        if state.status == SessionStatus::Analysing {
            debug!("Analysis already in progress, not starting another");
            return Ok(false);
        }

        state.generation += 1;
        state.last_result = None;
        state.last_outcome = None;

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        // The callback runs on the analyser thread and blocks on the lock
        // until this function has stored the handle.
        let analyser = Analyser::start(points, &self.config, move |output| {
            let mut state = shared.write();
            if state.generation != generation {
                return;
            }

            state.status = SessionStatus::Idle;
            state.analyser = None;
            match output {
                Ok(Some(stats)) => {
                    state.last_result = Some(stats);
                    state.last_outcome = Some(RunOutcome::Completed);
                }
                Ok(None) => state.last_outcome = Some(RunOutcome::TimedOut),
                Err(e) => state.last_outcome = Some(RunOutcome::Failed(e.to_string())),
            }
        })?;

        state.status = SessionStatus::Analysing;
        state.analyser = Some(Arc::new(analyser));
        Ok(true)
    }

    /// Stop the current run. Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        let mut state = self.state.write();
        if state.status != SessionStatus::Analysing {
            return false;
        }

        if let Some(analyser) = state.analyser.take() {
            analyser.force_stop();
        }
        state.generation += 1;
        state.status = SessionStatus::Idle;
        state.last_outcome = Some(RunOutcome::Stopped);
        info!("Analysis session stopped");
        true
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Analysing
    }

    /// Statistics of the last completed run.
    pub fn last_result(&self) -> Option<HashMap<K, WorldStatistics>> {
        self.state.read().last_result.clone()
    }

    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.state.read().last_outcome.clone()
    }

    /// Block until the current run, if any, has finished.
    pub fn wait(&self) {
        let analyser = self.state.read().analyser.clone();
        if let Some(analyser) = analyser {
            analyser.wait();
        }
    }
}
