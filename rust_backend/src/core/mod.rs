//! Core data types for event analysis.
//!
//! This module defines the weighted points fed into the analysis and the
//! partition and statistics structures handed back to callers.

pub mod domain;
