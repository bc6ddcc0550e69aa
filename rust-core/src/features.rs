//! Window-level feature vector for the activity classifier.
//!
//! Layout (20 values, gyro group first):
//!
//! ```text
//!  0      mean_gyro_mag
//!  1..=3  var_gx var_gy var_gz
//!  4..=6  cov_gxy cov_gxz cov_gyz
//!  7..=9  interval_gx interval_gy interval_gz
//! 10      mean_acc_mag
//! 11..=13 var_ax var_ay var_az
//! 14..=16 cov_axy cov_axz cov_ayz
//! 17..=19 interval_ax interval_ay interval_az
//! ```
//!
//! The classifier was trained on exactly this layout and these numerics,
//! including the variance quirk documented on [`seeded_variance`].

use crate::types::{AxisSet, Channel};
use crate::window::WindowStore;

/// Number of values in a feature vector.
pub const FEATURE_LEN: usize = 20;

/// Values contributed by one sensor group (gyro or accel).
const GROUP_LEN: usize = FEATURE_LEN / 2;

/// Offset of the gyro group.
pub const GYRO_OFFSET: usize = 0;
/// Offset of the accel group.
pub const ACCEL_OFFSET: usize = GROUP_LEN;

// Offsets within a group.
const MAG: usize = 0;
const VAR: usize = 1;
const COV: usize = 4;
const INTERVAL: usize = 7;

/// One decision window's statistical summary, in classifier input order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector([f32; FEATURE_LEN]);

impl FeatureVector {
    pub fn from_array(values: [f32; FEATURE_LEN]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f32; FEATURE_LEN] {
        &self.0
    }

    fn group_offset(channel: Channel) -> usize {
        if channel.is_accel() {
            ACCEL_OFFSET
        } else {
            GYRO_OFFSET
        }
    }

    fn axis(channel: Channel) -> usize {
        channel.index() % 3
    }

    pub fn mean_gyro_magnitude(&self) -> f32 {
        self.0[GYRO_OFFSET + MAG]
    }

    pub fn mean_accel_magnitude(&self) -> f32 {
        self.0[ACCEL_OFFSET + MAG]
    }

    pub fn variance(&self, channel: Channel) -> f32 {
        self.0[Self::group_offset(channel) + VAR + Self::axis(channel)]
    }

    pub fn interval(&self, channel: Channel) -> f32 {
        self.0[Self::group_offset(channel) + INTERVAL + Self::axis(channel)]
    }

    /// Covariance of the pair (x,y), (x,z) or (y,z) within `channel`'s group,
    /// selected by `pair` 0, 1 or 2.
    pub fn covariance(&self, channel: Channel, pair: usize) -> f32 {
        self.0[Self::group_offset(channel) + COV + pair.min(2)]
    }

    /// Per-axis variances, keyed by channel.
    pub fn variances(&self) -> AxisSet<f32> {
        AxisSet::from_fn(|channel| self.variance(channel))
    }
}

/// Build the feature vector from the full window and per-axis intervals.
pub fn build_feature_vector(store: &WindowStore, intervals: &AxisSet<f32>) -> FeatureVector {
    let mut values = [0.0f32; FEATURE_LEN];
    for (offset, group) in [(GYRO_OFFSET, Channel::GYRO), (ACCEL_OFFSET, Channel::ACCEL)] {
        let axes = group.map(|channel| store.window(channel));
        let slot = &mut values[offset..offset + GROUP_LEN];

        slot[MAG] = mean_magnitude(axes);
        for axis in 0..3 {
            slot[VAR + axis] = seeded_variance(axes[axis]);
            slot[INTERVAL + axis] = intervals[group[axis]];
        }
        slot[COV] = abs_covariance(axes[0], axes[1]);
        slot[COV + 1] = abs_covariance(axes[0], axes[2]);
        slot[COV + 2] = abs_covariance(axes[1], axes[2]);
    }
    FeatureVector(values)
}

/// Average over time of the sum over axes of `(v >> 2)^2`.
///
/// The shift keeps the squares in range and scales out sensor noise; the
/// result is an energy proxy, not a true magnitude.
pub fn mean_magnitude(axes: [&[i16]; 3]) -> f32 {
    let len = axes.iter().map(|axis| axis.len()).min().unwrap_or(0);
    if len == 0 {
        return 0.0;
    }
    let energy: i64 = (0..len)
        .map(|t| {
            axes.iter()
                .map(|axis| {
                    let scaled = i64::from(axis[t] >> 2);
                    scaled * scaled
                })
                .sum::<i64>()
        })
        .sum();
    energy as f32 / len as f32
}

/// Population variance with a running sum seeded at 1 instead of 0.
///
/// The mean is therefore biased by `1 / len`. Downstream thresholds and the
/// classifier were tuned against this exact value, so it is kept as-is.
pub fn seeded_variance(values: &[i16]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum = values.iter().fold(1.0f64, |acc, &v| acc + f64::from(v));
    let mean = sum / n;
    let squares: f64 = values
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum();
    (squares / n) as f32
}

/// Absolute sample covariance (n - 1 denominator) of two equally long series.
pub fn abs_covariance(a: &[i16], b: &[i16]) -> f32 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean = |s: &[i16]| s[..n].iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    let (mean_a, mean_b) = (mean(a), mean(b));
    let cross: f64 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(&x, &y)| (f64::from(x) - mean_a) * (f64::from(y) - mean_b))
        .sum();
    (cross / (n - 1) as f64).abs() as f32
}
