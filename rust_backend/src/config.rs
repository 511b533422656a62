//! Analysis configuration and collection-period presets.
//!
//! The collection period is the one knob shared with the external event
//! collector: it fixes how long events are gathered and, from that, the two
//! constants the analysis derives (noise weight threshold and the events per
//! tick denominator). Settings can be read from a `bread.toml` file:
//!
//! ```toml
//! threads = 16
//! timeout_ms = 60000
//!
//! [collection]
//! mode = "semi-fast"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::algorithms::density::EPSILON;
use crate::error::{AnalysisError, AnalysisResult};

/// Collection period of multiplier 1, in ticks (15 seconds).
pub const COLLECTING_TICKS_BASE: u32 = 300;
/// Noise weight threshold of multiplier 1.
pub const NOISE_WEIGHT_BASE: u64 = 25;
pub const DEFAULT_THREADS: usize = 16;
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Named collection presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionMode {
    /// 15 seconds
    Fast,
    /// 30 seconds
    SemiFast,
    /// 60 seconds
    Normal,
}

impl CollectionMode {
    pub fn multiplier(self) -> u32 {
        match self {
            CollectionMode::Fast => 1,
            CollectionMode::SemiFast => 2,
            CollectionMode::Normal => 4,
        }
    }
}

impl FromStr for CollectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(CollectionMode::Fast),
            "semi-fast" | "semi_fast" => Ok(CollectionMode::SemiFast),
            "normal" | "start" => Ok(CollectionMode::Normal),
            other => Err(format!(
                "Unknown collection mode: {}. Use 'fast', 'semi-fast' or 'normal'",
                other
            )),
        }
    }
}

/// How the collection period, and so the analysis constants, is specified.
///
/// All forms resolve to one [`AnalysisParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPeriod {
    /// Scales both base constants by a positive integer.
    Multiplier(u32),
    /// Preset multiplier.
    Mode(CollectionMode),
    /// Explicit constants.
    Fixed {
        noise_weight_threshold: u64,
        period_ticks: u32,
    },
}

impl Default for CollectionPeriod {
    fn default() -> Self {
        CollectionPeriod::Mode(CollectionMode::Normal)
    }
}

impl CollectionPeriod {
    /// Resolve to the analysis constants.
    ///
    /// # Examples
    ///
    /// ```
    /// use bread_analysis::{CollectionMode, CollectionPeriod};
    ///
    /// let params = CollectionPeriod::Mode(CollectionMode::SemiFast).parameters().unwrap();
    /// assert_eq!(params.period_ticks, 600);
    /// assert_eq!(params.noise_weight_threshold, 50);
    /// ```
    pub fn parameters(&self) -> AnalysisResult<AnalysisParameters> {
        let (noise_weight_threshold, period_ticks) = match *self {
            CollectionPeriod::Multiplier(0) => {
                return Err(AnalysisError::ConfigurationError(
                    "Collection period multiplier must be positive".to_string(),
                ))
            }
            CollectionPeriod::Multiplier(multiplier) => {
                let ticks = COLLECTING_TICKS_BASE.checked_mul(multiplier).ok_or_else(|| {
                    AnalysisError::ConfigurationError(format!(
                        "Collection period multiplier too large: {}",
                        multiplier
                    ))
                })?;
                (NOISE_WEIGHT_BASE * u64::from(multiplier), ticks)
            }
            CollectionPeriod::Mode(mode) => {
                return CollectionPeriod::Multiplier(mode.multiplier()).parameters()
            }
            CollectionPeriod::Fixed {
                noise_weight_threshold,
                period_ticks,
            } => (noise_weight_threshold, period_ticks),
        };

        if period_ticks == 0 {
            return Err(AnalysisError::ConfigurationError(
                "Collection period must be at least one tick".to_string(),
            ));
        }

        Ok(AnalysisParameters {
            epsilon: EPSILON,
            noise_weight_threshold,
            period_ticks,
        })
    }
}

/// Constants of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisParameters {
    /// Neighbourhood radius (Manhattan distance)
    pub epsilon: i32,
    /// A point is core when its neighbourhood weight strictly exceeds this
    pub noise_weight_threshold: u64,
    /// Events-per-tick denominator
    pub period_ticks: u32,
}

impl AnalysisParameters {
    pub fn new(noise_weight_threshold: u64, period_ticks: u32) -> Self {
        Self {
            epsilon: EPSILON,
            noise_weight_threshold,
            period_ticks,
        }
    }
}

/// Analyser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyserConfig {
    #[serde(default)]
    pub collection: CollectionPeriod,
    /// Worker pool size
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Deadline for a whole run
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            collection: CollectionPeriod::default(),
            threads: default_threads(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AnalyserConfig {
    pub fn new(collection: CollectionPeriod) -> Self {
        Self {
            collection,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AnalyserConfig)` if the file parses and validates
    /// * `Err(AnalysisError::ConfigurationError)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnalysisError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        let config: AnalyserConfig = toml::from_str(&content).map_err(|e| {
            AnalysisError::ConfigurationError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `bread.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> AnalysisResult<Self> {
        let search_paths = vec![
            PathBuf::from("bread.toml"),
            PathBuf::from("rust_backend/bread.toml"),
            PathBuf::from("../bread.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(AnalysisError::ConfigurationError(
            "No bread.toml found in standard locations".to_string(),
        ))
    }

    /// Check ranges and that the collection period resolves.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.threads == 0 {
            return Err(AnalysisError::ConfigurationError(
                "'threads' must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AnalysisError::ConfigurationError(
                "'timeout_ms' must be at least 1".to_string(),
            ));
        }
        self.collection.parameters().map(|_| ())
    }
}
