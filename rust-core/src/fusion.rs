//! Step count fusion.
//!
//! Six per-axis counts disagree in practice: the axis aligned with the
//! dominant motion sees every step, the others see some or none. The resolver
//! picks one number for the decision window using the classifier's verdict:
//!
//! - `var_step`: the count of the axis with the highest sample variance.
//! - `mean_step`: trimmed mean, dropping one highest and one lowest count.
//!
//! Classes in `var_step_classes` use `var_step`, all others `mean_step`.
//! Classes in `doubled_classes` then double the result (gaits where one
//! sensor-side waveform spans two footfalls).

use crate::classifier::ClassId;
use crate::config::PedometerConfig;
use crate::types::{AxisSet, Channel, StepCount, CHANNEL_COUNT};

/// How the resolved count of a decision window came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionBreakdown {
    /// Axis with the highest variance.
    pub var_axis: Channel,
    pub var_step: StepCount,
    pub mean_step: StepCount,
    /// Count reported for the window.
    pub resolved: StepCount,
}

/// Combine per-axis counts and the class id into the window's step count.
///
/// Ties in variance go to the axis that comes first in feature order.
pub fn resolve_step_count(
    steps: &AxisSet<StepCount>,
    variances: &AxisSet<f32>,
    class: ClassId,
    config: &PedometerConfig,
) -> FusionBreakdown {
    let var_axis = highest_variance_axis(variances);
    let var_step = steps[var_axis];
    let mean_step = trimmed_mean(&steps.in_feature_order());

    let base = if class.is_in(&config.var_step_classes) {
        var_step
    } else {
        mean_step
    };
    let resolved = if class.is_in(&config.doubled_classes) {
        base.saturating_mul(2)
    } else {
        base
    };

    FusionBreakdown {
        var_axis,
        var_step,
        mean_step,
        resolved,
    }
}

fn highest_variance_axis(variances: &AxisSet<f32>) -> Channel {
    let mut best = Channel::FEATURE_ORDER[0];
    for channel in Channel::FEATURE_ORDER.into_iter().skip(1) {
        if variances[channel] > variances[best] {
            best = channel;
        }
    }
    best
}

/// `(sum - max - min) / 4`, integer division.
fn trimmed_mean(counts: &[StepCount; CHANNEL_COUNT]) -> StepCount {
    let sum: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let max = counts.iter().copied().max().map_or(0, u64::from);
    let min = counts.iter().copied().min().map_or(0, u64::from);
    let trimmed = (sum - max - min) / (CHANNEL_COUNT as u64 - 2);
    StepCount::try_from(trimmed).unwrap_or(StepCount::MAX)
}
