//! Core data types for the pedometer kernel.
//!
//! Every buffer in the pipeline has a capacity fixed at compile time. The
//! reference configuration samples at 25 Hz, analyses 5-second decision
//! windows, and carries at most 3 seconds of unresolved waveform from one
//! window into the next.
//!
//! Design principle: a channel is a type, not an index. Per-axis data travels
//! in an [`AxisSet`] keyed by [`Channel`], so the two orderings the pipeline
//! needs (sensor layout and classifier layout) can never be confused.

use std::ops::{Index, IndexMut};

use crate::error::{PedometerError, Result};

// ============================================================================
// CAPACITIES
// ============================================================================

/// Reference sampling rate of the accelerometer and gyroscope.
pub const SAMPLE_RATE_HZ: usize = 25;

/// Length of one decision window in seconds.
pub const WINDOW_SECS: usize = 5;

/// Longest waveform tail carried from one decision window to the next.
pub const HISTORY_SECS: usize = 3;

/// Smoothed samples per channel in a full decision window (125).
pub const WINDOW_LEN: usize = SAMPLE_RATE_HZ * WINDOW_SECS;

/// Capacity of the cross-window history carry-over (75).
pub const HISTORY_LEN: usize = SAMPLE_RATE_HZ * HISTORY_SECS;

/// Capacity of the combined history + window analysis buffer (200).
pub const ANALYSIS_LEN: usize = HISTORY_LEN + WINDOW_LEN;

/// Maximum number of peaks (and, separately, valleys) recorded per pass.
pub const MAX_POLES: usize = 50;

/// Number of sensor channels: accel x/y/z and gyro x/y/z.
pub const CHANNEL_COUNT: usize = 6;

/// Resolved step count for one decision window.
pub type StepCount = u32;

// ============================================================================
// CHANNELS
// ============================================================================

/// One of the six inertial channels.
///
/// The discriminant follows the sensor layout (accel before gyro). The
/// classifier and the fusion resolver use [`Channel::FEATURE_ORDER`] instead,
/// which lists the gyro group first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    AccelX = 0,
    AccelY = 1,
    AccelZ = 2,
    GyroX = 3,
    GyroY = 4,
    GyroZ = 5,
}

impl Channel {
    /// Sensor layout order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::AccelX,
        Channel::AccelY,
        Channel::AccelZ,
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
    ];

    /// Classifier input order: gyro group, then accel group.
    pub const FEATURE_ORDER: [Channel; CHANNEL_COUNT] = [
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
        Channel::AccelX,
        Channel::AccelY,
        Channel::AccelZ,
    ];

    pub const ACCEL: [Channel; 3] = [Channel::AccelX, Channel::AccelY, Channel::AccelZ];
    pub const GYRO: [Channel; 3] = [Channel::GyroX, Channel::GyroY, Channel::GyroZ];

    /// Position in sensor layout order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_accel(self) -> bool {
        matches!(self, Channel::AccelX | Channel::AccelY | Channel::AccelZ)
    }

    /// Short label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Channel::AccelX => "ax",
            Channel::AccelY => "ay",
            Channel::AccelZ => "az",
            Channel::GyroX => "gx",
            Channel::GyroY => "gy",
            Channel::GyroZ => "gz",
        }
    }
}

/// A value per channel, indexed by [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSet<T> {
    values: [T; CHANNEL_COUNT],
}

impl<T> AxisSet<T> {
    /// Wrap values given in sensor layout order (ax, ay, az, gx, gy, gz).
    pub fn from_array(values: [T; CHANNEL_COUNT]) -> Self {
        Self { values }
    }

    /// Build each entry from its channel.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            values: std::array::from_fn(|i| f(Channel::ALL[i])),
        }
    }

    /// Map every entry, keeping the channel association.
    pub fn map<'a, U>(&'a self, mut f: impl FnMut(Channel, &'a T) -> U) -> AxisSet<U> {
        AxisSet::from_fn(|channel| f(channel, &self.values[channel.index()]))
    }

    /// Iterate in sensor layout order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.values.iter())
    }

    /// Values in sensor layout order.
    pub fn as_array(&self) -> &[T; CHANNEL_COUNT] {
        &self.values
    }
}

impl<T: Copy> AxisSet<T> {
    /// Values rearranged into [`Channel::FEATURE_ORDER`].
    pub fn in_feature_order(&self) -> [T; CHANNEL_COUNT] {
        Channel::FEATURE_ORDER.map(|channel| self.values[channel.index()])
    }
}

impl<T> Index<Channel> for AxisSet<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.values[channel.index()]
    }
}

impl<T> IndexMut<Channel> for AxisSet<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.values[channel.index()]
    }
}

// ============================================================================
// SAMPLES
// ============================================================================

/// One timestep of raw sensor data in device counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Accelerometer [x, y, z].
    pub accel: [i16; 3],
    /// Gyroscope [x, y, z].
    pub gyro: [i16; 3],
}

impl Sample {
    pub fn new(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self { accel, gyro }
    }

    /// Reading of a single channel.
    pub fn channel(&self, channel: Channel) -> i16 {
        match channel {
            Channel::AccelX => self.accel[0],
            Channel::AccelY => self.accel[1],
            Channel::AccelZ => self.accel[2],
            Channel::GyroX => self.gyro[0],
            Channel::GyroY => self.gyro[1],
            Channel::GyroZ => self.gyro[2],
        }
    }
}

/// One ingest call worth of raw samples, as six parallel channel slices.
#[derive(Debug, Clone, Copy)]
pub struct SampleBatch<'a> {
    channels: AxisSet<&'a [i16]>,
}

impl<'a> SampleBatch<'a> {
    pub fn new(
        ax: &'a [i16],
        ay: &'a [i16],
        az: &'a [i16],
        gx: &'a [i16],
        gy: &'a [i16],
        gz: &'a [i16],
    ) -> Self {
        Self {
            channels: AxisSet::from_array([ax, ay, az, gx, gy, gz]),
        }
    }

    pub fn from_channels(channels: AxisSet<&'a [i16]>) -> Self {
        Self { channels }
    }

    pub fn channel(&self, channel: Channel) -> &'a [i16] {
        self.channels[channel]
    }

    pub fn channels(&self) -> &AxisSet<&'a [i16]> {
        &self.channels
    }

    /// Check the batch against the ingest contract and return its length.
    ///
    /// All six channels must carry the same, non-zero number of samples and
    /// that number must not exceed [`WINDOW_LEN`].
    pub fn validate(&self) -> Result<usize> {
        let len = self.channels[Channel::AccelX].len();
        for (channel, samples) in self.channels.iter() {
            if samples.len() != len {
                return Err(PedometerError::ChannelLengthMismatch {
                    channel: channel.label(),
                    expected: len,
                    actual: samples.len(),
                });
            }
        }
        if len == 0 {
            return Err(PedometerError::EmptyBatch);
        }
        if len > WINDOW_LEN {
            return Err(PedometerError::BatchTooLarge {
                len,
                capacity: WINDOW_LEN,
            });
        }
        Ok(len)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacities() {
        assert_eq!(WINDOW_LEN, 125);
        assert_eq!(HISTORY_LEN, 75);
        assert_eq!(ANALYSIS_LEN, 200);
    }

    #[test]
    fn test_feature_order_puts_gyro_first() {
        let set = AxisSet::from_array([1, 2, 3, 4, 5, 6]);
        assert_eq!(set.in_feature_order(), [4, 5, 6, 1, 2, 3]);
        assert_eq!(set[Channel::GyroY], 5);
    }

    #[test]
    fn test_sample_channel_lookup() {
        let sample = Sample::new([1, 2, 3], [-4, -5, -6]);
        let values: Vec<i16> = Channel::ALL.iter().map(|&c| sample.channel(c)).collect();
        assert_eq!(values, vec![1, 2, 3, -4, -5, -6]);
    }

    #[test]
    fn test_batch_validation() {
        let full = [0i16; 25];
        let short = [0i16; 24];
        let batch = SampleBatch::new(&full, &full, &full, &full, &full, &full);
        assert_eq!(batch.validate().unwrap(), 25);

        let mismatched = SampleBatch::new(&full, &full, &full, &full, &short, &full);
        assert!(matches!(
            mismatched.validate(),
            Err(PedometerError::ChannelLengthMismatch { channel: "gy", .. })
        ));

        let empty: [i16; 0] = [];
        let batch = SampleBatch::new(&empty, &empty, &empty, &empty, &empty, &empty);
        assert!(matches!(batch.validate(), Err(PedometerError::EmptyBatch)));

        let oversized = [0i16; WINDOW_LEN + 1];
        let batch = SampleBatch::new(
            &oversized, &oversized, &oversized, &oversized, &oversized, &oversized,
        );
        assert!(matches!(
            batch.validate(),
            Err(PedometerError::BatchTooLarge { len: 126, .. })
        ));
    }
}
