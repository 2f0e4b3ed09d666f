use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::{Codec, CodecHandle};
use crate::view::ViewHandle;

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

type PredicateFn = dyn Fn(&dyn Any) -> bool + Send + Sync;

/// Structural pattern matched against a value.
#[derive(Clone)]
pub enum Pattern {
    /// The value is exactly this type.
    Type { id: TypeId, name: &'static str },
    /// A named custom test, for shapes a type alone cannot tell apart.
    Predicate { name: String, test: Arc<PredicateFn> },
}

impl Pattern {
    pub fn of<T: Any>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn predicate(
        name: impl Into<String>,
        test: impl Fn(&dyn Any) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    pub fn matches(&self, value: &dyn Any) -> bool {
        match self {
            Self::Type { id, .. } => value.type_id() == *id,
            Self::Predicate { test, .. } => test(value),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Predicate { name, .. } => name,
        }
    }
}

/// Type patterns compare by type, predicates by name.
impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
            (Self::Predicate { name: a, .. }, Self::Predicate { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => write!(f, "Type({name})"),
            Self::Predicate { name, .. } => write!(f, "Predicate({name})"),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtefactDetector
// ---------------------------------------------------------------------------

/// A collection shape of a payload type that is walked as a child.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    pub pattern: Pattern,
    pub view: ViewHandle,
}

#[derive(Clone, Debug, PartialEq)]
struct Payload {
    pattern: Pattern,
    codec: CodecHandle,
    collections: Vec<Collection>,
}

/// Maps payload types to the codec that stores them.
///
/// Each payload type also yields child patterns for `Vec<T>` and
/// `BTreeMap<String, T>`, so a list of scalars is walked as a child whose
/// elements are artefacts, one resource per element. For large numeric
/// arrays that is rarely wanted; [`without_collections`] turns this off.
///
/// [`without_collections`]: ArtefactDetector::without_collections
#[derive(Clone, Debug, PartialEq)]
pub struct ArtefactDetector {
    name: String,
    payloads: Vec<Payload>,
    collections: bool,
}

/// A child match from an artefact detector's collection patterns.
#[derive(Clone, Debug)]
pub struct CollectionMatch {
    pub view: ViewHandle,
    pub element_codec: CodecHandle,
}

impl ArtefactDetector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payloads: Vec::new(),
            collections: true,
        }
    }

    /// Add payload type `T` stored with `codec`.
    pub fn payload<T: Any>(mut self, codec: impl Codec<T>) -> Self {
        let codec = CodecHandle::new::<T>(codec);
        if self.payloads.iter().any(|p| p.codec == codec) {
            return self;
        }
        self.payloads.push(Payload {
            pattern: Pattern::of::<T>(),
            codec,
            collections: vec![
                Collection {
                    pattern: Pattern::of::<Vec<T>>(),
                    view: ViewHandle::sequence::<T>(),
                },
                Collection {
                    pattern: Pattern::of::<BTreeMap<String, T>>(),
                    view: ViewHandle::map::<BTreeMap<String, T>>(),
                },
            ],
        });
        self
    }

    /// Do not treat collections of the payload types as children.
    pub fn without_collections(mut self) -> Self {
        self.collections = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codec for `value` if it is one of the payload types.
    pub fn codec_for(&self, value: &dyn Any) -> Option<&CodecHandle> {
        self.payloads
            .iter()
            .find(|p| p.pattern.matches(value))
            .map(|p| &p.codec)
    }

    /// Child view for `value` if it is a collection of a payload type.
    pub fn collection_for(&self, value: &dyn Any) -> Option<CollectionMatch> {
        if !self.collections {
            return None;
        }
        self.payloads.iter().find_map(|p| {
            p.collections
                .iter()
                .find(|c| c.pattern.matches(value))
                .map(|c| CollectionMatch {
                    view: c.view.clone(),
                    element_codec: p.codec.clone(),
                })
        })
    }

    pub fn payload_count(&self) -> usize {
        self.payloads.len()
    }
}

// ---------------------------------------------------------------------------
// ChildDetector
// ---------------------------------------------------------------------------

/// Maps structural patterns to the container view used to walk them.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildDetector {
    name: String,
    rules: Vec<(Pattern, ViewHandle)>,
}

impl ChildDetector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Walk values of type `T` with `view`.
    pub fn with_type<T: Any>(self, view: ViewHandle) -> Self {
        self.with_pattern(Pattern::of::<T>(), view)
    }

    /// Walk values accepted by `test` with `view`.
    pub fn with_predicate(
        self,
        name: impl Into<String>,
        test: impl Fn(&dyn Any) -> bool + Send + Sync + 'static,
        view: ViewHandle,
    ) -> Self {
        self.with_pattern(Pattern::predicate(name, test), view)
    }

    pub fn with_pattern(mut self, pattern: Pattern, view: ViewHandle) -> Self {
        if !self.rules.iter().any(|(p, _)| *p == pattern) {
            self.rules.push((pattern, view));
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// View of the first rule matching `value`, in rule order.
    pub fn view_for(&self, value: &dyn Any) -> Option<&ViewHandle> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(value))
            .map(|(_, view)| view)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Either kind of detector, as held by a registry.
#[derive(Clone, Debug, PartialEq)]
pub enum Detector {
    Artefact(ArtefactDetector),
    Child(ChildDetector),
}

impl Detector {
    pub fn name(&self) -> &str {
        match self {
            Self::Artefact(d) => d.name(),
            Self::Child(d) => d.name(),
        }
    }
}

impl From<ArtefactDetector> for Detector {
    fn from(detector: ArtefactDetector) -> Self {
        Self::Artefact(detector)
    }
}

impl From<ChildDetector> for Detector {
    fn from(detector: ChildDetector) -> Self {
        Self::Child(detector)
    }
}
