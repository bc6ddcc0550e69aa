//! Per-axis step estimation.
//!
//! Wraps the extractor with a noise gate and derives the two numbers each
//! channel contributes to a decision window: its validated step count and its
//! mean inter-peak spacing (the "interval" feature).
//!
//! The interval statistic has a latch: once a channel in the current cycle
//! produces fewer than two peaks, every channel analysed after it reports an
//! interval of zero. Step counts are unaffected. The latch clears at the start
//! of each cycle and can be turned off through
//! [`PedometerConfig::latch_interval_suppression`].

use crate::config::PedometerConfig;
use crate::error::{PedometerError, Result};
use crate::poles::PeakValleyExtractor;

/// What one channel contributed to a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisEstimate {
    /// Validated peaks, i.e. steps seen on this axis.
    pub steps: u32,
    /// Mean index distance between consecutive validated peaks, or 0.
    pub interval: f32,
    /// Start of the waveform tail to carry into the next cycle.
    pub carry_from: Option<usize>,
    /// False when the channel stayed under the noise floor.
    pub analysed: bool,
}

pub struct AxisStepEstimator {
    extractor: PeakValleyExtractor,
    noise_floor: i32,
    latch_enabled: bool,
    latched: bool,
}

impl AxisStepEstimator {
    pub fn new(config: &PedometerConfig) -> Self {
        Self {
            extractor: PeakValleyExtractor::new(config),
            noise_floor: config.noise_floor(),
            latch_enabled: config.latch_interval_suppression,
            latched: false,
        }
    }

    /// Clear the interval latch. Call once before the first channel of a cycle.
    pub fn begin_cycle(&mut self) {
        self.latched = false;
    }

    /// Whether interval suppression is active for the rest of this cycle.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Estimate steps on one channel's analysis buffer.
    pub fn estimate(&mut self, signal: &[i16]) -> Result<AxisEstimate> {
        let span = peak_to_peak(signal).ok_or(PedometerError::EmptySignal)?;
        if span <= self.noise_floor {
            return Ok(AxisEstimate::default());
        }

        let extraction = self.extractor.extract(signal)?;
        let peaks = &extraction.poles.peaks;
        let steps = peaks.len();

        let suppressed = self.latch_enabled && self.latched;
        if steps < 2 {
            self.latched = true;
        }

        let interval = match (peaks.first(), peaks.last()) {
            (Some(&first), Some(&last)) if steps >= 2 && !suppressed => {
                (last - first) as f32 / (steps - 1) as f32
            }
            _ => 0.0,
        };

        Ok(AxisEstimate {
            steps: steps as u32,
            interval,
            carry_from: extraction.carry_from,
            analysed: true,
        })
    }
}

/// Max minus min of the signal, `None` when empty.
fn peak_to_peak(signal: &[i16]) -> Option<i32> {
    let max = signal.iter().copied().max()?;
    let min = signal.iter().copied().min()?;
    Some(i32::from(max) - i32::from(min))
}
