//! C FFI bindings for firmware and mobile integration.
//!
//! Exposes the pedometer context through a C ABI. The embedder supplies the
//! activity classifier as a plain C callback.
//!
//! Memory Safety:
//! - The engine instance must be freed with `pedometer_destroy()`
//! - Strings returned by the engine are owned by it and stay valid until the
//!   next call on the same engine
//! - NULL checks are performed on all inputs
//!
//! Thread Safety:
//! - The engine is NOT thread-safe. Use a single thread or mutex.
//!
//! Every fallible call returns [`PedometerStatus`]: `Ok` (0) or `Error` (-1).
//! The reason for the last failure is available from `pedometer_last_error()`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::classifier::{ActivityClassifier, ClassId};
use crate::config::PedometerConfig;
use crate::error::PedometerError;
use crate::features::{FeatureVector, FEATURE_LEN};
use crate::pipeline::Pedometer;
use crate::types::{Channel, SampleBatch, CHANNEL_COUNT, WINDOW_LEN};

// ============================================================================
// TYPES
// ============================================================================

/// Classifier callback: reads `FEATURE_LEN` (20) floats, returns a class id.
pub type ClassifyFn = unsafe extern "C" fn(features: *const f32) -> i32;

/// Adapter running a C classifier callback.
#[derive(Debug, Clone, Copy)]
pub struct ExternClassifier {
    callback: ClassifyFn,
}

impl ActivityClassifier for ExternClassifier {
    fn classify(&self, features: &FeatureVector) -> ClassId {
        // SAFETY: the pointer covers FEATURE_LEN floats for the whole call;
        // the embedder guaranteed the callback only reads that many.
        ClassId(unsafe { (self.callback)(features.as_array().as_ptr()) })
    }
}

/// Opaque handle to a pedometer instance.
pub struct PedometerEngine {
    pedometer: Pedometer<ExternClassifier>,
    last_error: Option<CString>,
}

impl PedometerEngine {
    fn record(&mut self, err: &PedometerError) {
        self.last_error = CString::new(err.to_string()).ok();
    }
}

/// Result status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedometerStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Invalid argument, rejected batch, or no observation this cycle.
    Error = -1,
}

/// Snapshot of the last completed decision window.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedometerWindowReport {
    /// 1-based cycle index since the last init (0 = no window yet).
    pub cycle: u64,
    /// Steps per axis in sensor order (ax, ay, az, gx, gy, gz).
    pub axis_steps: [u32; CHANNEL_COUNT],
    /// Interval statistic per axis in sensor order.
    pub intervals: [f32; CHANNEL_COUNT],
    /// Feature vector exactly as passed to the classifier.
    pub features: [f32; FEATURE_LEN],
    /// Class id returned by the classifier.
    pub class_id: i32,
    /// Resolved step count.
    pub steps: u32,
}

impl Default for PedometerWindowReport {
    fn default() -> Self {
        Self {
            cycle: 0,
            axis_steps: [0; CHANNEL_COUNT],
            intervals: [0.0; CHANNEL_COUNT],
            features: [0.0; FEATURE_LEN],
            class_id: 0,
            steps: 0,
        }
    }
}

// ============================================================================
// ENGINE LIFECYCLE
// ============================================================================

/// Create a pedometer with the default configuration.
///
/// # Safety
/// - `classify` must be safe to call with a pointer to 20 floats.
/// - The returned pointer must be freed with `pedometer_destroy()`.
///
/// # Returns
/// - Pointer to an initialized engine on success.
/// - NULL if `classify` is NULL.
#[no_mangle]
pub unsafe extern "C" fn pedometer_create(classify: Option<ClassifyFn>) -> *mut PedometerEngine {
    match classify {
        Some(callback) => create_engine(PedometerConfig::default(), callback),
        None => ptr::null_mut(),
    }
}

/// Create a pedometer from a JSON configuration document.
///
/// Missing fields take their defaults.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Same requirements as `pedometer_create()`.
///
/// # Returns
/// - NULL on a NULL argument, malformed JSON or an invalid configuration.
#[no_mangle]
pub unsafe extern "C" fn pedometer_create_with_config_json(
    classify: Option<ClassifyFn>,
    config_json: *const c_char,
) -> *mut PedometerEngine {
    let Some(callback) = classify else {
        return ptr::null_mut();
    };
    if config_json.is_null() {
        return ptr::null_mut();
    }

    let parsed = CStr::from_ptr(config_json)
        .to_str()
        .map_err(|e| PedometerError::InvalidConfig(e.to_string()))
        .and_then(PedometerConfig::from_json);

    match parsed {
        Ok(config) => create_engine(config, callback),
        Err(err) => {
            log::warn!("rejecting pedometer config: {err}");
            ptr::null_mut()
        }
    }
}

fn create_engine(config: PedometerConfig, callback: ClassifyFn) -> *mut PedometerEngine {
    match Pedometer::new(config, ExternClassifier { callback }) {
        Ok(pedometer) => Box::into_raw(Box::new(PedometerEngine {
            pedometer,
            last_error: None,
        })),
        Err(err) => {
            log::warn!("rejecting pedometer config: {err}");
            ptr::null_mut()
        }
    }
}

/// Destroy a pedometer instance.
///
/// # Safety
/// - `engine` must be a pointer returned by a create function, or NULL.
/// - Must not be called twice on the same pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_destroy(engine: *mut PedometerEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Reset all filter, window and history state. Idempotent.
///
/// # Safety
/// - `engine` must be a valid engine pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_init(engine: *mut PedometerEngine) -> PedometerStatus {
    let Some(engine) = engine.as_mut() else {
        return PedometerStatus::Error;
    };
    match engine.pedometer.init() {
        Ok(()) => {
            engine.last_error = None;
            PedometerStatus::Ok
        }
        Err(err) => {
            engine.record(&err);
            PedometerStatus::Error
        }
    }
}

// ============================================================================
// PROCESSING
// ============================================================================

/// Ingest one batch of raw samples given as six parallel arrays.
///
/// `*out` is set to 0 first, then to the resolved step count when this batch
/// completes a decision window.
///
/// # Safety
/// - `engine` must be a valid engine pointer.
/// - Each channel pointer must reference `len` readable `i16` values.
/// - `out` must be a valid pointer to a `u32`.
///
/// # Returns
/// - `Error` without touching the engine for NULL arguments, zero `len` or
///   `len` above the window capacity (125).
/// - `Error` after resetting the window when the buffered sample count is not
///   a multiple of the configured batch length; keep feeding batches.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn pedometer_process(
    engine: *mut PedometerEngine,
    ax: *const i16,
    ay: *const i16,
    az: *const i16,
    gx: *const i16,
    gy: *const i16,
    gz: *const i16,
    len: usize,
    out: *mut u32,
) -> PedometerStatus {
    if let Some(out) = out.as_mut() {
        *out = 0;
    }
    let (Some(engine), Some(out)) = (engine.as_mut(), out.as_mut()) else {
        return PedometerStatus::Error;
    };

    let pointers = [ax, ay, az, gx, gy, gz];
    if let Some(missing) = pointers.iter().position(|p| p.is_null()) {
        engine.last_error = CString::new(format!(
            "channel {} is NULL",
            Channel::ALL[missing].label()
        ))
        .ok();
        return PedometerStatus::Error;
    }
    if len == 0 || len > WINDOW_LEN {
        let err = if len == 0 {
            PedometerError::EmptyBatch
        } else {
            PedometerError::BatchTooLarge {
                len,
                capacity: WINDOW_LEN,
            }
        };
        engine.record(&err);
        return PedometerStatus::Error;
    }

    let [ax, ay, az, gx, gy, gz] = pointers.map(|p| slice::from_raw_parts(p, len));
    let batch = SampleBatch::new(ax, ay, az, gx, gy, gz);

    match engine.pedometer.process(&batch) {
        Ok(steps) => {
            *out = steps;
            PedometerStatus::Ok
        }
        Err(err) => {
            engine.record(&err);
            PedometerStatus::Error
        }
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Sum of resolved step counts since the last init, or -1 for a NULL engine.
///
/// # Safety
/// - `engine` must be a valid engine pointer or NULL.
#[no_mangle]
pub unsafe extern "C" fn pedometer_total_steps(engine: *const PedometerEngine) -> i64 {
    match engine.as_ref() {
        Some(engine) => i64::try_from(engine.pedometer.total_steps()).unwrap_or(i64::MAX),
        None => -1,
    }
}

/// Copy the last decision window into `out`.
///
/// `out` is zeroed (cycle 0) when no window has completed since init.
///
/// # Safety
/// - `engine` must be a valid engine pointer.
/// - `out` must be a valid pointer to a `PedometerWindowReport`.
#[no_mangle]
pub unsafe extern "C" fn pedometer_last_window(
    engine: *const PedometerEngine,
    out: *mut PedometerWindowReport,
) -> PedometerStatus {
    let (Some(engine), Some(out)) = (engine.as_ref(), out.as_mut()) else {
        return PedometerStatus::Error;
    };

    *out = match engine.pedometer.last_window() {
        Some(window) => PedometerWindowReport {
            cycle: window.cycle,
            axis_steps: *window.axis_steps.as_array(),
            intervals: *window.intervals.as_array(),
            features: *window.features.as_array(),
            class_id: window.class_id.raw(),
            steps: window.step_count(),
        },
        None => PedometerWindowReport::default(),
    };
    PedometerStatus::Ok
}

/// Message describing the last failure, or NULL if there was none.
///
/// # Safety
/// - `engine` must be a valid engine pointer or NULL.
/// - The string is owned by the engine; do not free it.
#[no_mangle]
pub unsafe extern "C" fn pedometer_last_error(engine: *const PedometerEngine) -> *const c_char {
    engine
        .as_ref()
        .and_then(|engine| engine.last_error.as_ref())
        .map_or(ptr::null(), |message| message.as_ptr())
}

/// Library version string (static, never freed).
#[no_mangle]
pub extern "C" fn pedometer_version() -> *const c_char {
    static VERSION: &[u8] = concat!("trace-pedometer ", env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// TESTS
// ============================================================================
