//! O(1) running statistics over an unbounded sample stream.

use serde::{Deserialize, Serialize};

/// Cumulative count, min, max and sum of a sample stream.
///
/// Each update is O(1) and the aggregate never windows or evicts: it
/// covers every sample since construction. Internally an empty stat
/// holds a `u64::MAX` minimum so the first sample always wins; the
/// accessors return `None` until a sample lands, so that sentinel can
/// never leak into a report.
#[derive(Debug, Clone, Copy)]
pub struct RunningStat {
    count: u64,
    min: u64,
    max: u64,
    sum: u64,
}

impl RunningStat {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self {
            count: 0,
            min: u64::MAX,
            max: 0,
            sum: 0,
        }
    }

    /// Fold one sample into the aggregate.
    pub fn record(&mut self, sample: u64) {
        self.count += 1;
        self.sum = self.sum.saturating_add(sample);
        if sample < self.min {
            self.min = sample;
        }
        if sample > self.max {
            self.max = sample;
        }
    }

    /// Number of samples recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// True if no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Smallest sample seen, if any.
    pub fn min(&self) -> Option<u64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest sample seen, if any.
    pub fn max(&self) -> Option<u64> {
        (self.count > 0).then_some(self.max)
    }

    /// Sum of all samples.
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Integer mean of all samples, if any. Truncating division keeps
    /// the reports in whole units.
    pub fn mean(&self) -> Option<u64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count)
        }
    }

    /// Frozen copy of the aggregate for a report.
    pub fn summary(&self) -> StatSummary {
        StatSummary {
            count: self.count,
            min: self.min(),
            max: self.max(),
            mean: self.mean(),
        }
    }
}

impl Default for RunningStat {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a [`RunningStat`], safe to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Number of samples behind the aggregate.
    pub count: u64,
    /// Smallest sample, absent when no sample was recorded.
    pub min: Option<u64>,
    /// Largest sample, absent when no sample was recorded.
    pub max: Option<u64>,
    /// Truncated integer mean, absent when no sample was recorded.
    pub mean: Option<u64>,
}
