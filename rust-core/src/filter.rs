//! Two-stage mean filter cascade.
//!
//! Every channel is smoothed by an 11-sample moving mean followed by a
//! 5-sample moving mean. A stage works in two phases:
//!
//! - **Fill phase**: samples are appended; on every odd fill count the stage
//!   emits the mean of what it holds, paired with the middle sample.
//! - **Circular phase**: entered once the buffer is full. Each sample
//!   overwrites the oldest slot and the stage emits on every call.
//!
//! The second stage consumes the first stage's mean, so until both stages are
//! full only part of the input reaches the output.
//!
//! All arithmetic is integer (device counts), O(N) per sample with N <= 11.

use heapless::Vec as HVec;

use crate::error::{PedometerError, Result};
use crate::types::{AxisSet, Channel};

/// Length of the first smoothing stage.
pub const STAGE1_LEN: usize = 11;

/// Length of the second smoothing stage.
pub const STAGE2_LEN: usize = 5;

/// One emission of a filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOutput {
    /// Mean of the samples currently held.
    pub filt: i16,
    /// Middle sample of the buffer (by age), the unsmoothed companion of `filt`.
    pub raw: i16,
}

/// A single moving-mean stage of length `N`.
#[derive(Debug, Clone)]
pub struct MeanFilterStage<const N: usize> {
    buffer: [i16; N],
    write_index: usize,
    full: bool,
}

impl<const N: usize> MeanFilterStage<N> {
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            write_index: 0,
            full: false,
        }
    }

    /// Feed one sample, returning an output when the stage emits.
    pub fn push(&mut self, sample: i16) -> Option<FilterOutput> {
        if self.full {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % N;
            // write_index now points at the oldest sample.
            let middle = (self.write_index + N / 2) % N;
            return Some(FilterOutput {
                filt: mean(&self.buffer),
                raw: self.buffer[middle],
            });
        }

        self.buffer[self.write_index] = sample;
        self.write_index += 1;
        let count = self.write_index;

        let output = (count % 2 == 1).then(|| FilterOutput {
            filt: mean(&self.buffer[..count]),
            raw: self.buffer[count / 2],
        });

        if count == N {
            self.full = true;
            self.write_index = 0;
        }
        output
    }

    /// Whether the stage has switched to circular phase.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Samples currently held.
    pub fn len(&self) -> usize {
        if self.full {
            N
        } else {
            self.write_index
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.write_index = 0;
        self.full = false;
    }
}

impl<const N: usize> Default for MeanFilterStage<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[i16]) -> i16 {
    let sum: i32 = values.iter().map(|&v| i32::from(v)).sum();
    // Mean of i16 values always fits in i16.
    (sum / values.len() as i32) as i16
}

/// The per-channel 11 -> 5 smoothing cascade.
#[derive(Debug, Clone, Default)]
pub struct MeanFilterCascade {
    stage1: MeanFilterStage<STAGE1_LEN>,
    stage2: MeanFilterStage<STAGE2_LEN>,
}

impl MeanFilterCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw sample; returns the smoothed value when stage 2 emits.
    pub fn push(&mut self, sample: i16) -> Option<i16> {
        let first = self.stage1.push(sample)?;
        self.stage2.push(first.filt).map(|second| second.filt)
    }

    /// Smooth a block of raw samples, appending every emitted value to `out`.
    ///
    /// Returns the number of values appended. An empty block is rejected
    /// before any state changes.
    pub fn filter_block<const CAP: usize>(
        &mut self,
        input: &[i16],
        out: &mut HVec<i16, CAP>,
    ) -> Result<usize> {
        if input.is_empty() {
            return Err(PedometerError::EmptyBatch);
        }
        let before = out.len();
        for &sample in input {
            if let Some(smoothed) = self.push(sample) {
                out.push(smoothed).map_err(|_| PedometerError::BatchTooLarge {
                    len: input.len(),
                    capacity: CAP,
                })?;
            }
        }
        Ok(out.len() - before)
    }

    /// True once both stages emit on every input.
    pub fn is_settled(&self) -> bool {
        self.stage1.is_full() && self.stage2.is_full()
    }

    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
    }
}

/// Cascades for all six channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilters {
    cascades: AxisSet<MeanFilterCascade>,
}

impl ChannelFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cascade_mut(&mut self, channel: Channel) -> &mut MeanFilterCascade {
        &mut self.cascades[channel]
    }

    pub fn is_settled(&self) -> bool {
        self.cascades.iter().all(|(_, cascade)| cascade.is_settled())
    }

    pub fn reset(&mut self) {
        for channel in Channel::ALL {
            self.cascades[channel].reset();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fill_phase_emits_on_odd_counts() {
        let mut stage = MeanFilterStage::<5>::new();
        let outputs: Vec<Option<FilterOutput>> = [10, 20, 30, 40, 50]
            .iter()
            .map(|&s| stage.push(s))
            .collect();

        assert_eq!(outputs[0], Some(FilterOutput { filt: 10, raw: 10 }));
        assert_eq!(outputs[1], None);
        assert_eq!(outputs[2], Some(FilterOutput { filt: 20, raw: 20 }));
        assert_eq!(outputs[3], None);
        assert_eq!(outputs[4], Some(FilterOutput { filt: 30, raw: 30 }));
        assert!(stage.is_full());
    }

    #[test]
    fn test_circular_phase_emits_every_sample() {
        let mut stage = MeanFilterStage::<5>::new();
        for s in [10, 20, 30, 40, 50] {
            stage.push(s);
        }
        // Buffer now holds 20..=60 by age; middle is 40.
        assert_eq!(stage.push(60), Some(FilterOutput { filt: 40, raw: 40 }));
        assert_eq!(stage.push(70), Some(FilterOutput { filt: 50, raw: 50 }));
        assert_eq!(stage.len(), 5);
    }

    #[test]
    fn test_mean_truncates_toward_zero() {
        let mut stage = MeanFilterStage::<3>::new();
        stage.push(-1);
        stage.push(-2);
        let out = stage.push(0).unwrap();
        assert_eq!(out.filt, -1);
    }

    #[test]
    fn test_cascade_emission_count_during_warmup() {
        let mut cascade = MeanFilterCascade::new();
        let emitted = (0..25).filter(|_| cascade.push(100).is_some()).count();
        // Stage 1 emits 6 + 14 = 20 values; stage 2 emits 3 + 15 of them.
        assert_eq!(emitted, 18);
        assert!(cascade.is_settled());

        let emitted = (0..25).filter(|_| cascade.push(100).is_some()).count();
        assert_eq!(emitted, 25);
    }

    #[test]
    fn test_filter_block_rejects_empty_input() {
        let mut cascade = MeanFilterCascade::new();
        let mut out: HVec<i16, 8> = HVec::new();
        assert!(matches!(
            cascade.filter_block(&[], &mut out),
            Err(PedometerError::EmptyBatch)
        ));
        assert!(out.is_empty());
        assert!(!cascade.is_settled());
    }

    #[test]
    fn test_filter_block_appends() {
        let mut cascade = MeanFilterCascade::new();
        let mut out: HVec<i16, 32> = HVec::new();
        let appended = cascade.filter_block(&[7; 25], &mut out).unwrap();
        assert_eq!(appended, 18);
        assert!(out.iter().all(|&v| v == 7));
    }

    #[test]
    fn test_reset_returns_to_fill_phase() {
        let mut filters = ChannelFilters::new();
        for _ in 0..30 {
            for channel in Channel::ALL {
                filters.cascade_mut(channel).push(1);
            }
        }
        assert!(filters.is_settled());
        filters.reset();
        assert!(!filters.is_settled());
    }

    proptest! {
        #[test]
        fn prop_constant_input_is_reproduced(value in any::<i16>(), warmup in 16usize..64) {
            let mut cascade = MeanFilterCascade::new();
            let mut last = None;
            for _ in 0..warmup {
                if let Some(v) = cascade.push(value) {
                    last = Some(v);
                }
            }
            prop_assert!(cascade.is_settled());
            prop_assert_eq!(last, Some(value));
        }

        #[test]
        fn prop_stage_output_bounded_by_inputs(samples in prop::collection::vec(any::<i16>(), 1..40)) {
            let mut stage = MeanFilterStage::<STAGE1_LEN>::new();
            let lo = *samples.iter().min().unwrap();
            let hi = *samples.iter().max().unwrap();
            for &s in &samples {
                if let Some(out) = stage.push(s) {
                    prop_assert!(out.filt >= lo && out.filt <= hi);
                }
            }
        }
    }
}
