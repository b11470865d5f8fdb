//! Soak-run instrumentation and reporting.
//!
//! This module provides the metrics layer behind the agent's
//! instrumented mode: O(1) running aggregates over unbounded sample
//! streams, the per-run counter set, and the text and CSV reports
//! rendered from it.

pub mod soak;
pub mod stats;

// Re-export commonly used items
pub use soak::{SoakMetrics, SoakReport};
pub use stats::{RunningStat, StatSummary};
