//! Ordered detector registries and the process-wide default registry.
//!
//! A registry holds two levels of detectors. Specific detectors are
//! consulted before generic ones; within a level, registration order
//! decides. The first match wins, there is no best-match search.
//!
//! Plugins contribute defaults at link time through [`inventory`]:
//!
//! ```ignore
//! inventory::submit! {
//!     magpie_core::DetectorPlugin {
//!         name: "tensors",
//!         level: magpie_core::DetectionLevel::Generic,
//!         priority: 0,
//!         build: tensor_detector,
//!     }
//! }
//! ```

use std::any::Any;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::CodecHandle;
use crate::codecs::{BincodeCodec, Blob, BlobCodec};
use crate::detector::{ArtefactDetector, Detector};
use crate::view::ViewHandle;

/// Priority band of a registered detector.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionLevel {
    /// Overrides, consulted first.
    Specific,
    /// Fallbacks.
    Generic,
}

/// A child view matched for a value, with the element codec when the match
/// came from an artefact collection pattern.
#[derive(Clone, Debug)]
pub struct ChildMatch {
    pub view: ViewHandle,
    pub element_codec: Option<CodecHandle>,
}

// ---------------------------------------------------------------------------
// DetectorRegistry
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectorRegistry {
    specific: Vec<Detector>,
    generic: Vec<Detector>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `detector` at `level`. Returns `false` if an identical
    /// detector is already registered at any level.
    pub fn register(&mut self, detector: impl Into<Detector>, level: DetectionLevel) -> bool {
        let detector = detector.into();
        if self.contains(&detector) {
            return false;
        }
        match level {
            DetectionLevel::Specific => self.specific.push(detector),
            DetectionLevel::Generic => self.generic.push(detector),
        }
        true
    }

    pub fn contains(&self, detector: &Detector) -> bool {
        self.specific.contains(detector) || self.generic.contains(detector)
    }

    /// Append every detector of `other` after this registry's own, level by
    /// level. Detectors already present are skipped.
    pub fn merge(&mut self, other: &DetectorRegistry) {
        for detector in &other.specific {
            self.register(detector.clone(), DetectionLevel::Specific);
        }
        for detector in &other.generic {
            self.register(detector.clone(), DetectionLevel::Generic);
        }
    }

    /// This registry with `fallback` appended, see [`merge`](Self::merge).
    pub fn layered_over(&self, fallback: &DetectorRegistry) -> Self {
        let mut merged = self.clone();
        merged.merge(fallback);
        merged
    }

    /// All detectors in consultation order.
    pub fn iter(&self) -> impl Iterator<Item = &Detector> {
        self.specific.iter().chain(self.generic.iter())
    }

    pub fn level_of(&self, detector: &Detector) -> Option<DetectionLevel> {
        if self.specific.contains(detector) {
            Some(DetectionLevel::Specific)
        } else if self.generic.contains(detector) {
            Some(DetectionLevel::Generic)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.specific.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specific.is_empty() && self.generic.is_empty()
    }

    /// View for a container's own type: child detectors only.
    pub fn container_view_for(&self, container: &dyn Any) -> Option<ViewHandle> {
        self.iter().find_map(|d| match d {
            Detector::Child(child) => child.view_for(container).cloned(),
            Detector::Artefact(_) => None,
        })
    }

    /// First child pattern matching `value`: child detector rules and
    /// artefact collection patterns, in detector order.
    pub fn child_for(&self, value: &dyn Any) -> Option<ChildMatch> {
        self.iter().find_map(|d| match d {
            Detector::Child(child) => child.view_for(value).map(|view| ChildMatch {
                view: view.clone(),
                element_codec: None,
            }),
            Detector::Artefact(artefact) => artefact.collection_for(value).map(|m| ChildMatch {
                view: m.view,
                element_codec: Some(m.element_codec),
            }),
        })
    }

    /// Codec of the first artefact detector accepting `value`.
    pub fn codec_for(&self, value: &dyn Any) -> Option<CodecHandle> {
        self.iter().find_map(|d| match d {
            Detector::Artefact(artefact) => artefact.codec_for(value).cloned(),
            Detector::Child(_) => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Default registry
// ---------------------------------------------------------------------------

/// A detector contributed to the default registry at link time.
pub struct DetectorPlugin {
    pub name: &'static str,
    pub level: DetectionLevel,
    /// Lower values are registered first within a level.
    pub priority: i32,
    pub build: fn() -> Detector,
}

inventory::collect!(DetectorPlugin);

static RUNTIME_DEFAULTS: RwLock<Vec<(Detector, DetectionLevel)>> = RwLock::new(Vec::new());

/// Append a detector to the process-wide defaults.
///
/// The list is append-only. Registries built by [`default_registry`]
/// afterwards include it; existing snapshots are unaffected.
pub fn register_default(detector: impl Into<Detector>, level: DetectionLevel) {
    let detector = detector.into();
    debug!(detector = detector.name(), ?level, "registered default detector");
    RUNTIME_DEFAULTS
        .write()
        .expect("lock poisoned")
        .push((detector, level));
}

/// Snapshot of the process-wide defaults.
///
/// Link-time plugins come first, ordered by level, priority and name, then
/// runtime registrations in the order they were made.
pub fn default_registry() -> DetectorRegistry {
    let mut plugins: Vec<&DetectorPlugin> = inventory::iter::<DetectorPlugin>.into_iter().collect();
    plugins.sort_by(|a, b| {
        (a.level, a.priority, a.name).cmp(&(b.level, b.priority, b.name))
    });

    let mut registry = DetectorRegistry::new();
    for plugin in plugins {
        registry.register((plugin.build)(), plugin.level);
    }
    for (detector, level) in RUNTIME_DEFAULTS.read().expect("lock poisoned").iter() {
        registry.register(detector.clone(), *level);
    }
    registry
}

fn dense_arrays() -> Detector {
    ArtefactDetector::new("dense-arrays")
        .payload::<Vec<f32>>(BincodeCodec)
        .payload::<Vec<f64>>(BincodeCodec)
        .payload::<Vec<i32>>(BincodeCodec)
        .payload::<Vec<i64>>(BincodeCodec)
        .payload::<Vec<u8>>(BincodeCodec)
        .without_collections()
        .into()
}

inventory::submit! {
    DetectorPlugin {
        name: "dense-arrays",
        level: DetectionLevel::Generic,
        priority: 0,
        build: dense_arrays,
    }
}

fn opaque_blobs() -> Detector {
    ArtefactDetector::new("opaque-blobs")
        .payload::<Blob>(BlobCodec)
        .into()
}

inventory::submit! {
    DetectorPlugin {
        name: "opaque-blobs",
        level: DetectionLevel::Generic,
        priority: i32::MAX,
        build: opaque_blobs,
    }
}
