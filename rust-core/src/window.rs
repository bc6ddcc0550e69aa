//! Window and history storage.
//!
//! Smoothed samples accumulate per channel in a 5-second window. When the
//! window is full it is analysed together with the channel's history: the
//! unresolved waveform tail the previous analysis pass carried over.
//!
//! All three buffers (window, history, and the combined analysis buffer) share
//! the same overflow policy, implemented once by [`BoundedSeries::load`].

use crate::error::{PedometerError, Result};
use crate::types::{AxisSet, Channel, ANALYSIS_LEN, HISTORY_LEN, WINDOW_LEN};

/// Fixed-capacity sequence of smoothed samples that keeps the most recent
/// `N` values appended to it.
#[derive(Debug, Clone)]
pub struct BoundedSeries<const N: usize> {
    data: [i16; N],
    len: usize,
}

impl<const N: usize> BoundedSeries<N> {
    pub fn new() -> Self {
        Self { data: [0; N], len: 0 }
    }

    /// Append samples, evicting the oldest content when capacity is reached.
    ///
    /// - Fits: plain append.
    /// - More new samples than capacity: keep only the newest `N` of them.
    /// - Otherwise: shift existing content left just enough, then append.
    pub fn load(&mut self, samples: &[i16]) {
        let incoming = samples.len();
        if self.len + incoming <= N {
            self.data[self.len..self.len + incoming].copy_from_slice(samples);
            self.len += incoming;
        } else if incoming > N {
            self.data.copy_from_slice(&samples[incoming - N..]);
            self.len = N;
        } else {
            let evict = self.len + incoming - N;
            self.data.copy_within(evict..self.len, 0);
            let kept = self.len - evict;
            self.data[kept..].copy_from_slice(samples);
            self.len = N;
        }
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for BoundedSeries<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel window and history buffers.
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    windows: AxisSet<BoundedSeries<WINDOW_LEN>>,
    histories: AxisSet<BoundedSeries<HISTORY_LEN>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append smoothed samples to a channel's window.
    pub fn load(&mut self, channel: Channel, samples: &[i16]) {
        self.windows[channel].load(samples);
    }

    /// Enforce the batch alignment rule.
    ///
    /// Every channel's fill level must be an exact multiple of `batch_len`.
    /// If any is not, all windows are emptied and the cycle is rejected.
    pub fn check_alignment(&mut self, batch_len: usize) -> Result<()> {
        let misaligned = self
            .windows
            .iter()
            .map(|(_, window)| window.len())
            .find(|count| count % batch_len != 0);

        match misaligned {
            Some(count) => {
                self.clear_windows();
                Err(PedometerError::PartialWindow { count, batch_len })
            }
            None => Ok(()),
        }
    }

    /// Whether every channel's window has reached capacity.
    pub fn is_full(&self) -> bool {
        self.windows.iter().all(|(_, window)| window.is_full())
    }

    pub fn window(&self, channel: Channel) -> &[i16] {
        self.windows[channel].as_slice()
    }

    pub fn window_len(&self, channel: Channel) -> usize {
        self.windows[channel].len()
    }

    pub fn history(&self, channel: Channel) -> &[i16] {
        self.histories[channel].as_slice()
    }

    /// History tail followed by the current window.
    pub fn analysis_buffer(&self, channel: Channel) -> BoundedSeries<ANALYSIS_LEN> {
        let mut analysis = BoundedSeries::new();
        analysis.load(self.histories[channel].as_slice());
        analysis.load(self.windows[channel].as_slice());
        analysis
    }

    /// Replace a channel's history with the given waveform tail.
    pub fn set_history(&mut self, channel: Channel, tail: &[i16]) {
        let history = &mut self.histories[channel];
        history.clear();
        history.load(tail);
    }

    pub fn clear_history(&mut self, channel: Channel) {
        self.histories[channel].clear();
    }

    pub fn clear_windows(&mut self) {
        for channel in Channel::ALL {
            self.windows[channel].clear();
        }
    }

    pub fn reset(&mut self) {
        self.clear_windows();
        for channel in Channel::ALL {
            self.histories[channel].clear();
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
    fn test_load_appends_when_fitting() {
        let mut series = BoundedSeries::<5>::new();
        series.load(&[1, 2]);
        series.load(&[3]);
        assert_eq!(series.as_slice(), &[1, 2, 3]);
        assert!(!series.is_full());
    }

    #[test]
    fn test_load_shifts_out_oldest() {
        let mut series = BoundedSeries::<5>::new();
        series.load(&[1, 2, 3, 4]);
        series.load(&[5, 6, 7]);
        assert_eq!(series.as_slice(), &[3, 4, 5, 6, 7]);
        assert!(series.is_full());
    }

    #[test]
    fn test_load_oversized_keeps_newest() {
        let mut series = BoundedSeries::<3>::new();
        series.load(&[9, 9]);
        series.load(&[1, 2, 3, 4, 5]);
        assert_eq!(series.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn test_alignment_rejection_resets_all_windows() {
        let mut store = WindowStore::new();
        for channel in Channel::ALL {
            store.load(channel, &[1; 25]);
        }
        assert!(store.check_alignment(25).is_ok());

        for channel in Channel::ALL {
            store.load(channel, &[1; 10]);
        }
        let err = store.check_alignment(25).unwrap_err();
        assert!(matches!(err, PedometerError::PartialWindow { count: 35, batch_len: 25 }));
        for channel in Channel::ALL {
            assert_eq!(store.window_len(channel), 0);
        }
    }

    #[test]
    fn test_analysis_buffer_concatenates_history_and_window() {
        let mut store = WindowStore::new();
        store.set_history(Channel::AccelZ, &[7, 8]);
        store.load(Channel::AccelZ, &[1, 2, 3]);
        let analysis = store.analysis_buffer(Channel::AccelZ);
        assert_eq!(analysis.as_slice(), &[7, 8, 1, 2, 3]);
        assert_eq!(analysis.capacity(), ANALYSIS_LEN);

        store.set_history(Channel::AccelZ, &[4]);
        assert_eq!(store.history(Channel::AccelZ), &[4]);
    }

    #[test]
    fn test_full_only_when_every_channel_full() {
        let mut store = WindowStore::new();
        for channel in Channel::ALL {
            store.load(channel, &[0; WINDOW_LEN]);
        }
        assert!(store.is_full());
        store.clear_windows();
        for channel in Channel::ALL.iter().skip(1) {
            store.load(*channel, &[0; WINDOW_LEN]);
        }
        assert!(!store.is_full());
    }

    proptest! {
        #[test]
        fn prop_capacity_law(chunks in prop::collection::vec(
            prop::collection::vec(any::<i16>(), 0..20), 0..12)
        ) {
            let mut series = BoundedSeries::<16>::new();
            let mut appended: Vec<i16> = Vec::new();
            for chunk in &chunks {
                series.load(chunk);
                appended.extend_from_slice(chunk);
                prop_assert!(series.len() <= 16);
            }
            let keep = appended.len().min(16);
            prop_assert_eq!(series.as_slice(), &appended[appended.len() - keep..]);
        }
    }
}
