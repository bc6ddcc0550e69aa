//! Activity classifier boundary.
//!
//! The model itself lives outside this crate. The pipeline only needs a
//! mapping from one decision window's [`FeatureVector`] to a class id, which it
//! hands to the fusion resolver. Anything implementing [`ActivityClassifier`]
//! can be injected: a closure (boxed or not), a model struct, or a C callback (see
//! [`crate::ffi`]).

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Activity category reported by the classifier (walking, running, sitting...).
///
/// Ids are opaque to the pipeline; only the configured fusion policy gives
/// some of them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i32);

impl ClassId {
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whether this id appears in a configured class list.
    pub fn is_in(self, classes: &[i32]) -> bool {
        classes.contains(&self.0)
    }
}

impl From<i32> for ClassId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Maps a decision window's features to an activity class.
///
/// Called exactly once per completed decision window.
pub trait ActivityClassifier {
    fn classify(&self, features: &FeatureVector) -> ClassId;
}

impl<F> ActivityClassifier for F
where
    F: Fn(&FeatureVector) -> ClassId,
{
    fn classify(&self, features: &FeatureVector) -> ClassId {
        self(features)
    }
}

/// Classifier that always reports the same class. Useful for replaying a
/// labelled recording or pinning the fusion rule in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClassifier(pub ClassId);

impl ActivityClassifier for FixedClassifier {
    fn classify(&self, _features: &FeatureVector) -> ClassId {
        self.0
    }
}
