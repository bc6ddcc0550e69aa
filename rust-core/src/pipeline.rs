//! Pedometer pipeline: the owned context behind every entry point.
//!
//! This module wires the stages together and owns all mutable state: filter
//! stages, windows, histories and the interval latch. Nothing is global, so
//! independent counters are just independent [`Pedometer`] values.
//!
//! # Data flow
//!
//! Each [`Pedometer::process`] call ingests one batch:
//! 1. **Smoothing**: every channel runs through its 11 -> 5 mean cascade
//! 2. **Windowing**: smoothed samples are appended to the channel windows,
//!    rejecting the cycle if any fill level is not a multiple of the batch size
//! 3. **Analysis** (full windows only): per-axis step estimation over history
//!    plus window, in feature order
//! 4. **Decision**: feature vector, classifier call, fusion
//!
//! # Resources
//! - No allocation per call: every buffer is fixed-capacity
//! - Single-threaded; wrap in a mutex to share

use heapless::Vec as HVec;

use crate::classifier::{ActivityClassifier, ClassId};
use crate::config::PedometerConfig;
use crate::error::{PedometerError, Result};
use crate::estimator::AxisStepEstimator;
use crate::features::{build_feature_vector, FeatureVector};
use crate::filter::ChannelFilters;
use crate::fusion::{resolve_step_count, FusionBreakdown};
use crate::types::{AxisSet, Channel, Sample, SampleBatch, StepCount, WINDOW_LEN};
use crate::window::WindowStore;

/// Report of one completed decision window.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionWindow {
    /// 1-based index of the cycle since the last init.
    pub cycle: u64,
    /// Validated steps per axis.
    pub axis_steps: AxisSet<StepCount>,
    /// Mean inter-peak spacing per axis, 0 when unavailable.
    pub intervals: AxisSet<f32>,
    pub features: FeatureVector,
    pub class_id: ClassId,
    pub fusion: FusionBreakdown,
}

impl DecisionWindow {
    /// Resolved step count for the window.
    pub fn step_count(&self) -> StepCount {
        self.fusion.resolved
    }
}

/// Common smoothed length of a per-channel block.
///
/// The cascades are fed identical lengths and stay in lockstep, so a
/// divergence means corrupted filter state.
fn aligned_len(smoothed: &AxisSet<HVec<i16, WINDOW_LEN>>) -> Result<usize> {
    let expected = smoothed[Channel::AccelX].len();
    match smoothed.iter().find(|(_, s)| s.len() != expected) {
        Some((_, diverged)) => Err(PedometerError::FilteredCountMismatch {
            expected,
            actual: diverged.len(),
        }),
        None => Ok(expected),
    }
}

/// The pedometer context.
pub struct Pedometer<C: ActivityClassifier> {
    config: PedometerConfig,
    classifier: C,

    // Processing stages
    filters: ChannelFilters,
    store: WindowStore,
    estimator: AxisStepEstimator,

    // Reporting
    last_window: Option<DecisionWindow>,
    total_steps: u64,
    cycles: u64,
}

impl<C: ActivityClassifier> Pedometer<C> {
    /// Create an initialized context. Fails only on an invalid config.
    pub fn new(config: PedometerConfig, classifier: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filters: ChannelFilters::new(),
            store: WindowStore::new(),
            estimator: AxisStepEstimator::new(&config),
            config,
            classifier,
            last_window: None,
            total_steps: 0,
            cycles: 0,
        })
    }

    /// Reset filters, windows, histories and counters to their initial state.
    ///
    /// Idempotent. Never fails with the fixed-capacity buffers; the `Result`
    /// matches the status of the C entry point.
    pub fn init(&mut self) -> Result<()> {
        self.filters.reset();
        self.store.reset();
        self.estimator.begin_cycle();
        self.last_window = None;
        self.total_steps = 0;
        self.cycles = 0;
        Ok(())
    }

    /// Alias for [`Pedometer::init`].
    pub fn reset(&mut self) -> Result<()> {
        self.init()
    }

    /// Ingest one batch of raw samples.
    ///
    /// Returns the resolved step count of the decision window completed by
    /// this batch, or 0 while the window is still filling. On
    /// [`PedometerError::PartialWindow`] the windows have been emptied and
    /// feeding may simply continue.
    pub fn process(&mut self, batch: &SampleBatch<'_>) -> Result<StepCount> {
        let len = batch.validate()?;

        let mut smoothed: AxisSet<HVec<i16, WINDOW_LEN>> = AxisSet::default();
        for channel in Channel::ALL {
            self.filters
                .cascade_mut(channel)
                .filter_block(batch.channel(channel), &mut smoothed[channel])?;
        }

        let expected = aligned_len(&smoothed)?;

        for channel in Channel::ALL {
            self.store.load(channel, &smoothed[channel]);
        }
        if let Err(err) = self.store.check_alignment(self.config.batch_len) {
            log::warn!("{err}");
            return Err(err);
        }

        log::trace!(
            "batch of {len} raw -> {expected} smoothed, window at {}",
            self.store.window_len(Channel::AccelX)
        );

        if !self.store.is_full() {
            return Ok(0);
        }
        let window = self.run_cycle()?;
        let steps = window.step_count();
        self.store.clear_windows();
        self.last_window = Some(window);
        Ok(steps)
    }

    /// Ingest interleaved samples; same contract as [`Pedometer::process`].
    pub fn process_samples(&mut self, samples: &[Sample]) -> Result<StepCount> {
        if samples.len() > WINDOW_LEN {
            return Err(PedometerError::BatchTooLarge {
                len: samples.len(),
                capacity: WINDOW_LEN,
            });
        }
        let columns: AxisSet<HVec<i16, WINDOW_LEN>> = AxisSet::from_fn(|channel| {
            samples.iter().map(|sample| sample.channel(channel)).collect()
        });
        let batch = SampleBatch::from_channels(columns.map(|_, column| column.as_slice()));
        self.process(&batch)
    }

    /// One analysis pass over the full windows.
    fn run_cycle(&mut self) -> Result<DecisionWindow> {
        self.estimator.begin_cycle();
        let mut axis_steps = AxisSet::default();
        let mut intervals = AxisSet::default();

        for channel in Channel::FEATURE_ORDER {
            let analysis = self.store.analysis_buffer(channel);
            let signal = analysis.as_slice();
            let estimate = self.estimator.estimate(signal)?;

            match estimate.carry_from {
                Some(start) => self.store.set_history(channel, &signal[start..]),
                None => self.store.clear_history(channel),
            }
            axis_steps[channel] = estimate.steps;
            intervals[channel] = estimate.interval;
        }

        let features = build_feature_vector(&self.store, &intervals);
        let class_id = self.classifier.classify(&features);
        let fusion = resolve_step_count(&axis_steps, &features.variances(), class_id, &self.config);

        self.cycles += 1;
        self.total_steps += u64::from(fusion.resolved);

        log::debug!(
            "cycle {}: steps {:?} class {} var_axis {} -> {} (total {})",
            self.cycles,
            axis_steps.in_feature_order(),
            class_id.raw(),
            fusion.var_axis.label(),
            fusion.resolved,
            self.total_steps
        );

        Ok(DecisionWindow {
            cycle: self.cycles,
            axis_steps,
            intervals,
            features,
            class_id,
            fusion,
        })
    }

    /// Report of the most recent completed decision window.
    pub fn last_window(&self) -> Option<&DecisionWindow> {
        self.last_window.as_ref()
    }

    /// Sum of resolved counts since the last init.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Completed decision windows since the last init.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Smoothed samples buffered toward the next decision window.
    pub fn buffered(&self) -> usize {
        self.store.window_len(Channel::AccelX)
    }

    pub fn config(&self) -> &PedometerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

// ============================================================================
// TESTS
// ============================================================================
