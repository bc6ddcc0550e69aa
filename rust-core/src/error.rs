//! Error taxonomy.
//!
//! The pipeline has exactly one failure class: a call either completes or
//! produces no valid observation for the current cycle. The variants below
//! only carry diagnostics for logs; callers treat all of them alike.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PedometerError {
    #[error("sample batch is empty")]
    EmptyBatch,

    #[error("sample batch of {len} exceeds window capacity {capacity}")]
    BatchTooLarge { len: usize, capacity: usize },

    #[error("channel {channel} carries {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("filtered sample counts diverged: expected {expected}, got {actual}")]
    FilteredCountMismatch { expected: usize, actual: usize },

    /// Recovery-by-reset: the window was cleared and the caller may keep
    /// feeding batches.
    #[error("window holds {count} samples, not a multiple of batch length {batch_len}; window reset")]
    PartialWindow { count: usize, batch_len: usize },

    #[error("analysis signal is empty")]
    EmptySignal,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl PedometerError {
    /// Whether the window store was reset as part of this failure.
    pub fn reset_window(&self) -> bool {
        matches!(self, PedometerError::PartialWindow { .. })
    }
}

pub type Result<T> = std::result::Result<T, PedometerError>;
