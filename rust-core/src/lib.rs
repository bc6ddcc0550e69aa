//! Trace Pedometer Library
//!
//! An on-device step counter that turns six-axis inertial streams
//! (accelerometer and gyroscope, 25 Hz) into a resolved step count per
//! 5-second decision window.
//!
//! # Design Philosophy
//!
//! - **Bounded by construction**: every buffer has a compile-time capacity;
//!   nothing allocates per call.
//! - **Explicit context**: all filter, window and history state lives in a
//!   [`Pedometer`] value, so independent counters never interfere.
//! - **Injected classifier**: the activity model is a strategy supplied by
//!   the embedder, not part of the numeric pipeline.
//! - **Seam-safe**: an unresolved waveform at the end of a window is carried
//!   into the next one instead of being dropped or counted twice.
//!
//! # Example
//!
//! ```
//! use trace_pedometer::{ClassId, FixedClassifier, Pedometer, PedometerConfig, SampleBatch};
//!
//! let mut pedometer =
//!     Pedometer::new(PedometerConfig::default(), FixedClassifier(ClassId(0))).unwrap();
//!
//! let still = [0i16; 25];
//! let batch = SampleBatch::new(&still, &still, &still, &still, &still, &still);
//!
//! // The first second only warms up the smoothing filters.
//! assert!(pedometer.process(&batch).is_err());
//! assert_eq!(pedometer.process(&batch).unwrap(), 0);
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod estimator;
pub mod features;
pub mod ffi;
pub mod filter;
pub mod fusion;
pub mod pipeline;
pub mod poles;
pub mod types;
pub mod window;


// Re-export commonly used types
pub use classifier::{ActivityClassifier, ClassId, FixedClassifier};
pub use config::PedometerConfig;
pub use error::{PedometerError, Result};
pub use features::FeatureVector;
pub use pipeline::{DecisionWindow, Pedometer};
pub use types::{AxisSet, Channel, Sample, SampleBatch, StepCount};
