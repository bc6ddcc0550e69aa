//! Tunable parameters of the step pipeline.
//!
//! Buffer capacities are compile-time constants (see [`crate::types`]). What
//! remains here are thresholds and policies, all expressed relative to the
//! sensor's 1 g reference so the same defaults hold across sensor ranges.

use serde::{Deserialize, Serialize};

use crate::error::{PedometerError, Result};
use crate::types::{HISTORY_LEN, SAMPLE_RATE_HZ, WINDOW_LEN};

/// Configuration for the pedometer pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedometerConfig {
    /// Raw samples supplied per ingest call. The window is only analysed when
    /// its fill level is a multiple of this, so it must divide the window
    /// length. Typical: 25 (1 s at 25 Hz).
    pub batch_len: usize,

    /// Raw sensor counts corresponding to 1 g.
    pub one_g_lsb: i32,

    /// A channel whose max-minus-min stays within `one_g / noise_floor_divisor`
    /// is treated as noise for the cycle.
    pub noise_floor_divisor: i32,

    /// Both flanks of a waveform must rise more than `one_g / min_height_divisor`.
    pub min_height_divisor: i32,

    /// Largest allowed ratio between the two flank heights of a waveform.
    pub max_height_ratio: i32,

    /// Samples kept ahead of the last surviving valley when carrying a tail
    /// into the next window.
    pub carry_lookahead: usize,

    /// Once one channel yields fewer than two peaks, zero the interval
    /// statistic of every channel analysed after it in the same cycle.
    pub latch_interval_suppression: bool,

    /// Classes resolved with the highest-variance axis instead of the trimmed mean.
    pub var_step_classes: Vec<i32>,

    /// Classes whose resolved count is doubled.
    pub doubled_classes: Vec<i32>,
}

impl Default for PedometerConfig {
    fn default() -> Self {
        Self {
            batch_len: SAMPLE_RATE_HZ,
            one_g_lsb: 16384,
            noise_floor_divisor: 10,
            min_height_divisor: 14,
            max_height_ratio: 2,
            carry_lookahead: 2,
            latch_interval_suppression: true,
            var_step_classes: vec![5, 9],
            doubled_classes: vec![5, 6],
        }
    }
}

impl PedometerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_len == 0 || self.batch_len > WINDOW_LEN {
            return Err(PedometerError::InvalidConfig(format!(
                "batch_len must be in 1..={WINDOW_LEN}, got {}",
                self.batch_len
            )));
        }
        if WINDOW_LEN % self.batch_len != 0 {
            return Err(PedometerError::InvalidConfig(format!(
                "batch_len must divide the {WINDOW_LEN}-sample window, got {}",
                self.batch_len
            )));
        }
        if self.one_g_lsb <= 0 {
            return Err(PedometerError::InvalidConfig(format!(
                "one_g_lsb must be positive, got {}",
                self.one_g_lsb
            )));
        }
        if self.noise_floor_divisor <= 0 || self.min_height_divisor <= 0 {
            return Err(PedometerError::InvalidConfig(
                "threshold divisors must be positive".to_string(),
            ));
        }
        if self.max_height_ratio < 1 {
            return Err(PedometerError::InvalidConfig(format!(
                "max_height_ratio must be at least 1, got {}",
                self.max_height_ratio
            )));
        }
        if self.carry_lookahead >= HISTORY_LEN {
            return Err(PedometerError::InvalidConfig(format!(
                "carry_lookahead must be below {HISTORY_LEN}, got {}",
                self.carry_lookahead
            )));
        }
        Ok(())
    }

    /// Minimum max-minus-min span for a channel to be analysed.
    pub fn noise_floor(&self) -> i32 {
        self.one_g_lsb / self.noise_floor_divisor
    }

    /// Minimum flank height of a counted waveform.
    pub fn min_height(&self) -> i32 {
        self.one_g_lsb / self.min_height_divisor
    }
}
