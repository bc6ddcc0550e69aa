//! Peak/valley extraction on one channel's analysis buffer.
//!
//! A pass runs five steps over the smoothed signal:
//!
//! 1. **Candidates**: local maxima (peaks) and minima (valleys). Plateaus are
//!    tolerated on the left edge only, so a flat top yields a single peak.
//! 2. **False poles**: peaks below the buffer mean and valleys above it are
//!    discarded.
//! 3. **Merging**: two poles of the same kind with no opposite pole strictly
//!    between them collapse into the more extreme one. A leading peak with no
//!    valley before it is then dropped, so every counted peak rises out of a
//!    valley.
//! 4. **Shape validation**: each peak must sit between two valleys with both
//!    flanks taller than the minimum height and within a 2:1 ratio of each
//!    other.
//! 5. **Carry-over**: the tail from just before the last surviving valley is
//!    handed back so an in-progress waveform is analysed whole next cycle.
//!
//! Poles are stored as indices into the analysed buffer, never as values, in
//! bounded lists of [`MAX_POLES`] entries. Extra candidates are ignored.

use heapless::Vec as HVec;

use crate::config::PedometerConfig;
use crate::error::{PedometerError, Result};
use crate::types::{HISTORY_LEN, MAX_POLES};

/// Bounded list of indices into the analysed signal, in ascending order.
pub type PoleList = HVec<usize, MAX_POLES>;

/// Peaks and valleys found in one signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoleSet {
    pub peaks: PoleList,
    pub valleys: PoleList,
}

impl PoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from explicit index lists, truncating at [`MAX_POLES`].
    pub fn from_indices(peaks: &[usize], valleys: &[usize]) -> Self {
        let mut set = Self::new();
        for &peak in peaks.iter().take(MAX_POLES) {
            let _ = set.peaks.push(peak);
        }
        for &valley in valleys.iter().take(MAX_POLES) {
            let _ = set.valleys.push(valley);
        }
        set
    }
}

/// A candidate step: one peak and the two valleys around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformFeature {
    pub peak: usize,
    pub left_valley: usize,
    pub right_valley: usize,
    /// Rise from the left valley to the peak.
    pub left_height: i32,
    /// Fall from the peak to the right valley.
    pub right_height: i32,
    /// Samples between the left valley and the peak.
    pub left_span: usize,
    /// Samples between the peak and the right valley.
    pub right_span: usize,
}

impl WaveformFeature {
    /// Locate the valleys bracketing `peak`. `None` if either side is missing.
    pub fn locate(signal: &[i16], peak: usize, valleys: &[usize]) -> Option<Self> {
        let right_pos = valleys.iter().position(|&v| v > peak)?;
        let left_pos = right_pos.checked_sub(1)?;
        let (left_valley, right_valley) = (valleys[left_pos], valleys[right_pos]);

        let top = i32::from(signal[peak]);
        Some(Self {
            peak,
            left_valley,
            right_valley,
            left_height: top - i32::from(signal[left_valley]),
            right_height: top - i32::from(signal[right_valley]),
            left_span: peak - left_valley,
            right_span: right_valley - peak,
        })
    }

    /// Both flanks above `min_height` and within `max_ratio` of each other.
    pub fn is_step(&self, min_height: i32, max_ratio: i32) -> bool {
        if self.left_height <= min_height || self.right_height <= min_height {
            return false;
        }
        let smaller = self.left_height.min(self.right_height);
        let larger = self.left_height.max(self.right_height);
        i64::from(smaller) * i64::from(max_ratio) >= i64::from(larger)
    }
}

/// Outcome of a full extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Validated poles; every remaining peak is a counted step.
    pub poles: PoleSet,
    /// Start index of the tail to carry into the next cycle, if any.
    pub carry_from: Option<usize>,
}

impl Extraction {
    pub fn step_count(&self) -> usize {
        self.poles.peaks.len()
    }
}

/// Peak/valley extractor parameterised by the pipeline thresholds.
#[derive(Debug, Clone)]
pub struct PeakValleyExtractor {
    min_height: i32,
    max_height_ratio: i32,
    carry_lookahead: usize,
}

impl PeakValleyExtractor {
    pub fn new(config: &PedometerConfig) -> Self {
        Self {
            min_height: config.min_height(),
            max_height_ratio: config.max_height_ratio,
            carry_lookahead: config.carry_lookahead,
        }
    }

    /// Run all five steps on `signal`.
    pub fn extract(&self, signal: &[i16]) -> Result<Extraction> {
        if signal.is_empty() {
            return Err(PedometerError::EmptySignal);
        }

        let mut poles = find_candidates(signal);
        log::trace!(
            "candidates: {} peaks, {} valleys",
            poles.peaks.len(),
            poles.valleys.len()
        );
        remove_false_poles(signal, &mut poles);
        merge_close_poles(signal, &mut poles);
        self.validate_waveforms(signal, &mut poles);
        let carry_from = self.carry_over_start(signal.len(), &poles);

        Ok(Extraction { poles, carry_from })
    }

    /// Step 4: keep only peaks that form a well-shaped waveform.
    ///
    /// When a peak fails the shape test its left valley goes with it, unless
    /// the previous peak was kept and ends on that valley. A peak without two
    /// bracketing valleys is dropped on its own.
    pub fn validate_waveforms(&self, signal: &[i16], poles: &mut PoleSet) {
        let PoleSet { peaks, valleys } = poles;
        let mut previous_kept = false;

        peaks.retain(|&peak| {
            let keep = match WaveformFeature::locate(signal, peak, valleys.as_slice()) {
                None => false,
                Some(wave) if wave.is_step(self.min_height, self.max_height_ratio) => true,
                Some(wave) => {
                    if !previous_kept {
                        valleys.retain(|&v| v != wave.left_valley);
                    }
                    false
                }
            };
            previous_kept = keep;
            keep
        });
    }

    /// Step 5: where the next cycle should pick up this signal.
    ///
    /// The tail starts `carry_lookahead` samples before the last surviving
    /// valley and is only carried when it is shorter than the history buffer.
    pub fn carry_over_start(&self, signal_len: usize, poles: &PoleSet) -> Option<usize> {
        let last_valley = *poles.valleys.last()?;
        let start = last_valley.saturating_sub(self.carry_lookahead);
        (signal_len - start < HISTORY_LEN).then_some(start)
    }
}

/// Step 1: local extrema, left-plateau tolerant, capped per kind.
pub fn find_candidates(signal: &[i16]) -> PoleSet {
    let mut poles = PoleSet::new();
    if signal.len() < 3 {
        return poles;
    }

    for i in 1..signal.len() - 1 {
        let (prev, here, next) = (signal[i - 1], signal[i], signal[i + 1]);
        if here >= prev && here > next {
            // A full list stops recording; later candidates are ignored.
            let _ = poles.peaks.push(i);
        } else if here <= prev && here < next {
            let _ = poles.valleys.push(i);
        }
    }
    poles
}

/// Step 2: drop peaks below the mean and valleys above it.
pub fn remove_false_poles(signal: &[i16], poles: &mut PoleSet) {
    if signal.is_empty() {
        return;
    }
    let sum: i64 = signal.iter().map(|&v| i64::from(v)).sum();
    let mean = sum as f32 / signal.len() as f32;

    poles.peaks.retain(|&i| f32::from(signal[i]) >= mean);
    poles.valleys.retain(|&i| f32::from(signal[i]) <= mean);
}

/// Step 3: collapse same-kind neighbours and enforce valley-before-peak.
pub fn merge_close_poles(signal: &[i16], poles: &mut PoleSet) {
    merge_runs(signal, &mut poles.peaks, &poles.valleys, |candidate, kept| {
        candidate > kept
    });
    merge_runs(signal, &mut poles.valleys, &poles.peaks, |candidate, kept| {
        candidate < kept
    });

    if let Some(&first_peak) = poles.peaks.first() {
        let preceded = poles.valleys.first().is_some_and(|&v| v < first_peak);
        if !preceded {
            poles.peaks.remove(0);
        }
    }
}

/// Collapse consecutive entries of `poles` not separated by any `separators`
/// entry. `more_extreme(b, a)` decides whether the later pole replaces the
/// earlier one; ties keep the earlier.
fn merge_runs(
    signal: &[i16],
    poles: &mut PoleList,
    separators: &PoleList,
    more_extreme: impl Fn(i16, i16) -> bool,
) {
    let mut i = 0;
    while i + 1 < poles.len() {
        let (a, b) = (poles[i], poles[i + 1]);
        let separated = separators.iter().any(|&s| a < s && s < b);
        if separated {
            i += 1;
        } else if more_extreme(signal[b], signal[a]) {
            poles.remove(i);
        } else {
            poles.remove(i + 1);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PeakValleyExtractor {
        PeakValleyExtractor::new(&PedometerConfig::default())
    }

    fn list(poles: &PoleList) -> Vec<usize> {
        poles.iter().copied().collect()
    }

    #[test]
    fn test_candidates_left_plateau_tolerant() {
        // Flat top at 2..=3 yields one peak at the right edge of the plateau.
        let signal = [0, 5, 9, 9, 4, 1, 1, 6, 2];
        let poles = find_candidates(&signal);
        assert_eq!(list(&poles.peaks), vec![3, 7]);
        assert_eq!(list(&poles.valleys), vec![6]);
    }

    #[test]
    fn test_candidates_ignore_edges_and_short_signals() {
        assert_eq!(find_candidates(&[5, 1]), PoleSet::new());
        let poles = find_candidates(&[9, 1, 9]);
        assert!(poles.peaks.is_empty());
        assert_eq!(list(&poles.valleys), vec![1]);
    }

    #[test]
    fn test_candidates_capped() {
        let signal: Vec<i16> = (0..300).map(|i| if i % 2 == 0 { 0 } else { 10 }).collect();
        let poles = find_candidates(&signal);
        assert_eq!(poles.peaks.len(), MAX_POLES);
        assert_eq!(poles.valleys.len(), MAX_POLES);
        assert_eq!(poles.peaks[MAX_POLES - 1], 99);
    }

    #[test]
    fn test_false_pole_removal() {
        // Mean is about 12: the low bump at 2 and the high dip at 5 go.
        let signal = [20, 0, 6, 4, 30, 14, 16, 0, 20];
        let mut poles = find_candidates(&signal);
        assert_eq!(list(&poles.peaks), vec![2, 4, 6]);
        assert_eq!(list(&poles.valleys), vec![1, 3, 5, 7]);

        remove_false_poles(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![4, 6]);
        assert_eq!(list(&poles.valleys), vec![1, 3, 7]);
    }

    #[test]
    fn test_merge_keeps_higher_peak() {
        let signal = [0, 10, 5, 20, 0, -5, 0];
        let mut poles = PoleSet::from_indices(&[1, 3], &[0, 5]);
        merge_close_poles(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![3]);
    }

    #[test]
    fn test_merge_keeps_lower_valley() {
        let signal = [10, 0, 5, -3, 10, 12, 10];
        let mut poles = PoleSet::from_indices(&[5], &[1, 3]);
        merge_close_poles(&signal, &mut poles);
        assert_eq!(list(&poles.valleys), vec![3]);
        assert_eq!(list(&poles.peaks), vec![5]);
    }

    #[test]
    fn test_merge_respects_separators() {
        let signal = [0, -4, 10, 5, 20, -2, 0];
        let mut poles = PoleSet::from_indices(&[2, 4], &[1, 3, 5]);
        merge_close_poles(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![2, 4]);
        assert_eq!(list(&poles.valleys), vec![1, 3, 5]);
    }

    #[test]
    fn test_merge_collapses_runs_of_three() {
        let signal = [0, 7, 3, 9, 4, 8, 0];
        let mut poles = PoleSet::from_indices(&[1, 3, 5], &[0]);
        merge_close_poles(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![3]);
    }

    #[test]
    fn test_leading_peak_without_valley_dropped() {
        let signal = [0, 10, 0, -10, 0, 12, 0, -10, 0];
        let mut poles = PoleSet::from_indices(&[1, 5], &[3, 7]);
        merge_close_poles(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![5]);

        let mut lonely = PoleSet::from_indices(&[1], &[]);
        merge_close_poles(&signal, &mut lonely);
        assert!(lonely.peaks.is_empty());
    }

    #[test]
    fn test_waveform_locate_and_heights() {
        let signal = [0, -2000, 0, 2000, 0, -1000, 0];
        let wave = WaveformFeature::locate(&signal, 3, &[1, 5]).unwrap();
        assert_eq!(wave.left_valley, 1);
        assert_eq!(wave.right_valley, 5);
        assert_eq!(wave.left_height, 4000);
        assert_eq!(wave.right_height, 3000);
        assert_eq!((wave.left_span, wave.right_span), (2, 2));

        assert!(WaveformFeature::locate(&signal, 3, &[1]).is_none());
        assert!(WaveformFeature::locate(&signal, 3, &[5]).is_none());
    }

    #[test]
    fn test_shape_validation_accepts_symmetric_waveform() {
        let signal = [0, -2000, 0, 2000, 0, -2000, 0];
        let mut poles = PoleSet::from_indices(&[3], &[1, 5]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![3]);
    }

    #[test]
    fn test_shape_validation_rejects_lopsided_waveform() {
        // Heights 4000 and 1500: ratio beyond 2.
        let signal = [0, -2000, 0, 2000, 0, 500, 0];
        let mut poles = PoleSet::from_indices(&[3], &[1, 5]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert!(poles.peaks.is_empty());
        // No kept peak needs the left valley, so it goes too.
        assert_eq!(list(&poles.valleys), vec![5]);
    }

    #[test]
    fn test_shape_validation_ratio_bound_inclusive() {
        // Heights 4000 and 2000: exactly 2:1 is still a step.
        let signal = [0, -2000, 0, 2000, 0, 0, 0];
        let mut poles = PoleSet::from_indices(&[3], &[1, 5]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![3]);
    }

    #[test]
    fn test_shape_validation_large_ratio_full_scale_heights() {
        // Heights 65535 and 52767.
        let signal = [0, i16::MIN, 0, i16::MAX, 0, -20000, 0];
        let wave = WaveformFeature::locate(&signal, 3, &[1, 5]).unwrap();
        assert_eq!((wave.left_height, wave.right_height), (65535, 52767));
        assert!(wave.is_step(1170, 40000));
        assert!(wave.is_step(1170, i32::MAX));
        assert!(!wave.is_step(60000, i32::MAX));
    }

    #[test]
    fn test_shape_validation_rejects_small_waveform() {
        // Heights of 1000 stay under the 1170 minimum.
        let signal = [0, -500, 0, 500, 0, -500, 0];
        let mut poles = PoleSet::from_indices(&[3], &[1, 5]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert!(poles.peaks.is_empty());
    }

    #[test]
    fn test_shape_validation_keeps_valley_shared_with_kept_peak() {
        // Peak 3 is a good step; peak 7 is lopsided. Valley 5 ends peak 3's
        // waveform and must survive.
        let signal = [0, -2000, 0, 2000, 0, -2000, 0, 6000, 0, 4000, 0];
        let mut poles = PoleSet::from_indices(&[3, 7], &[1, 5, 9]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert_eq!(list(&poles.peaks), vec![3]);
        assert_eq!(list(&poles.valleys), vec![1, 5, 9]);
    }

    #[test]
    fn test_shape_validation_drops_unbracketed_peak_only() {
        let signal = [0, -2000, 0, 2000, 0];
        let mut poles = PoleSet::from_indices(&[3], &[1]);
        extractor().validate_waveforms(&signal, &mut poles);
        assert!(poles.peaks.is_empty());
        assert_eq!(list(&poles.valleys), vec![1]);
    }

    #[test]
    fn test_carry_over_start() {
        let ex = extractor();
        let poles = PoleSet::from_indices(&[], &[20, 150]);
        assert_eq!(ex.carry_over_start(200, &poles), Some(148));

        // Tail of 75 samples no longer fits the history.
        let poles = PoleSet::from_indices(&[], &[127]);
        assert_eq!(ex.carry_over_start(200, &poles), None);

        let poles = PoleSet::from_indices(&[], &[1]);
        assert_eq!(ex.carry_over_start(40, &poles), Some(0));

        assert_eq!(ex.carry_over_start(200, &PoleSet::new()), None);
    }

    #[test]
    fn test_extract_rejects_empty_signal() {
        assert!(matches!(extractor().extract(&[]), Err(PedometerError::EmptySignal)));
    }

    #[test]
    fn test_extract_counts_clean_waveforms() {
        // Three clean steps followed by a rising edge that has not peaked yet.
        let mut signal: Vec<i16> = vec![0];
        for _ in 0..3 {
            signal.extend_from_slice(&[-3000, -1000, 1000, 3000, 1000, -1000]);
        }
        signal.extend_from_slice(&[-3000, -1000, 1000, 3000]);

        let extraction = extractor().extract(&signal).unwrap();
        assert_eq!(extraction.step_count(), 3);
        assert_eq!(list(&extraction.poles.peaks), vec![4, 10, 16]);
        assert_eq!(list(&extraction.poles.valleys), vec![1, 7, 13, 19]);
        // The unfinished waveform starts two samples ahead of valley 19.
        assert_eq!(extraction.carry_from, Some(17));
    }
}
