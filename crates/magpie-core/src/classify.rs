//! Classification of a model's members into artefacts, children and
//! ignored members.
//!
//! For each enumerated key of a container, in view order:
//!
//! 1. a declared slot is an artefact with the declared codec;
//! 2. a value whose type has a record in the [`Catalog`] is a child using
//!    that record;
//! 3. a value matching a child pattern is a child walked with the matched
//!    view;
//! 4. a value matching an artefact detector is an artefact, unless the
//!    scope only stores declared slots;
//! 5. anything else is ignored.
//!
//! Children are classified recursively and pruned when they hold nothing.
//! Access faults on a single member are logged and the member is ignored.
//! The classifier never mutates the instance.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::codec::CodecHandle;
use crate::config::{Configuration, StorageLocation};
use crate::error::{CoreError, CoreResult};
use crate::registry::DetectorRegistry;
use crate::view::{AccessFault, ViewHandle};

/// Default bound on nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How an artefact slot was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Declared,
    Detected,
}

/// How to walk a child value.
#[derive(Clone, Debug)]
pub struct ChildTarget {
    pub view: ViewHandle,
    /// Record of the child's type when it is registered in the catalog.
    pub config: Option<Arc<Configuration>>,
    /// Codec of the elements when the child is a collection of payloads.
    pub element_codec: Option<CodecHandle>,
}

impl ChildTarget {
    pub fn storage(&self) -> StorageLocation {
        self.config
            .as_ref()
            .map(|c| c.storage().clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct ChildSlot {
    pub target: ChildTarget,
    pub classification: Classification,
}

#[derive(Clone, Debug)]
pub enum SlotKind {
    Artefact { codec: CodecHandle, origin: Origin },
    Child(Box<ChildSlot>),
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub key: String,
    pub kind: SlotKind,
}

/// Classified members of one container, in a deterministic order.
#[derive(Clone, Debug)]
pub struct Classification {
    pub view: ViewHandle,
    pub storage: StorageLocation,
    pub slots: Vec<Slot>,
    pub ignored: Vec<String>,
}

impl Classification {
    /// Returns `true` if there is no artefact and no retained child.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn artefacts(&self) -> impl Iterator<Item = (&str, &CodecHandle)> {
        self.slots.iter().filter_map(|s| match &s.kind {
            SlotKind::Artefact { codec, .. } => Some((s.key.as_str(), codec)),
            SlotKind::Child(_) => None,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ChildSlot)> {
        self.slots.iter().filter_map(|s| match &s.kind {
            SlotKind::Child(child) => Some((s.key.as_str(), &**child)),
            SlotKind::Artefact { .. } => None,
        })
    }

    /// Slot names in classification order.
    pub fn keys(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.key.as_str()).collect()
    }
}

/// Classification of a single value.
pub enum Member<'v> {
    Artefact {
        value: &'v dyn Any,
        codec: CodecHandle,
    },
    Child {
        /// The container to walk, after resolving the storage location.
        container: &'v dyn Any,
        target: ChildTarget,
    },
    Ignored,
}

impl std::fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Artefact { codec, .. } => write!(f, "Artefact({})", codec.label()),
            Self::Child { target, .. } => write!(f, "Child({})", target.view.name()),
            Self::Ignored => f.write_str("Ignored"),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage location
// ---------------------------------------------------------------------------

pub(crate) fn locate<'v>(
    storage: &StorageLocation,
    instance: &'v dyn Any,
) -> Result<&'v dyn Any, AccessFault> {
    match storage {
        StorageLocation::SelfContainer => Ok(instance),
        StorageLocation::Member { key, outer } => outer
            .get(instance, key)?
            .ok_or_else(|| AccessFault::UnknownKey(key.clone())),
    }
}

pub(crate) fn locate_mut<'v>(
    storage: &StorageLocation,
    instance: &'v mut dyn Any,
) -> Result<&'v mut dyn Any, AccessFault> {
    match storage {
        StorageLocation::SelfContainer => Ok(instance),
        StorageLocation::Member { key, outer } => outer
            .get_mut(instance, key)?
            .ok_or_else(|| AccessFault::UnknownKey(key.clone())),
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Scope {
    declared: IndexMap<String, CodecHandle>,
    registry: Arc<DetectorRegistry>,
    detect_artefacts: bool,
}

impl Scope {
    fn of(config: &Configuration, defaults: &DetectorRegistry) -> Self {
        Self {
            declared: config.declared().clone(),
            registry: Arc::new(config.effective_detectors(defaults)),
            detect_artefacts: config.auto_detect(),
        }
    }

    /// Scope of a child without a record: the same detectors, auto-detect.
    fn inherited(&self) -> Self {
        Self {
            declared: IndexMap::new(),
            registry: self.registry.clone(),
            detect_artefacts: true,
        }
    }
}

/// Read-only classification engine.
pub struct Classifier<'a> {
    catalog: &'a Catalog,
    defaults: &'a DetectorRegistry,
    max_depth: usize,
    retain_rebuildable: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(catalog: &'a Catalog, defaults: &'a DetectorRegistry) -> Self {
        Self {
            catalog,
            defaults,
            max_depth: DEFAULT_MAX_DEPTH,
            retain_rebuildable: false,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Keep empty collection children that can be rebuilt from stored
    /// elements. Loading uses this so an empty target list can be refilled.
    pub fn retain_rebuildable(mut self, retain: bool) -> Self {
        self.retain_rebuildable = retain;
        self
    }

    /// Classify `instance`, a value of the type described by `config`.
    pub fn classify(&self, config: &Configuration, instance: &dyn Any) -> CoreResult<Classification> {
        let scope = Scope::of(config, self.defaults);
        let container = locate(config.storage(), instance)?;
        let view = container_view(config, &scope.registry, container)?;
        self.classify_container(&view, config.storage().clone(), container, &scope, 0)
    }

    /// Classify a single value as a member of a container of `config`'s type.
    pub fn classify_member<'v>(
        &self,
        config: &Configuration,
        value: &'v dyn Any,
    ) -> CoreResult<Member<'v>> {
        let scope = Scope::of(config, self.defaults);
        self.member(&scope, value)
    }

    fn classify_container(
        &self,
        view: &ViewHandle,
        storage: StorageLocation,
        container: &dyn Any,
        scope: &Scope,
        depth: usize,
    ) -> CoreResult<Classification> {
        if depth > self.max_depth {
            return Err(CoreError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        let keys = view.keys(container)?;
        let mut slots = Vec::new();
        let mut ignored = Vec::new();
        for key in &keys {
            match self.classify_key(view, container, key, scope, depth)? {
                Some(kind) => slots.push(Slot {
                    key: key.clone(),
                    kind,
                }),
                None => ignored.push(key.clone()),
            }
        }

        // Declared slots the view does not enumerate still have to be saved.
        for (slot, codec) in &scope.declared {
            if !keys.contains(slot) {
                slots.push(Slot {
                    key: slot.clone(),
                    kind: SlotKind::Artefact {
                        codec: codec.clone(),
                        origin: Origin::Declared,
                    },
                });
            }
        }

        Ok(Classification {
            view: view.clone(),
            storage,
            slots,
            ignored,
        })
    }

    fn classify_key(
        &self,
        view: &ViewHandle,
        container: &dyn Any,
        key: &str,
        scope: &Scope,
        depth: usize,
    ) -> CoreResult<Option<SlotKind>> {
        if let Some(codec) = scope.declared.get(key) {
            debug!(slot = %key, codec = %codec.label(), "declared artefact");
            return Ok(Some(SlotKind::Artefact {
                codec: codec.clone(),
                origin: Origin::Declared,
            }));
        }

        let value = match view.get(container, key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(slot = %key, "member absent, ignored");
                return Ok(None);
            }
            Err(fault) => {
                warn!(slot = %key, %fault, "member access failed, ignored");
                return Ok(None);
            }
        };

        let member = match self.member(scope, value) {
            Ok(member) => member,
            Err(CoreError::Access(fault)) => {
                warn!(slot = %key, %fault, "member storage access failed, ignored");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match member {
            Member::Artefact { codec, .. } => {
                debug!(slot = %key, codec = %codec.label(), "detected artefact");
                Ok(Some(SlotKind::Artefact {
                    codec,
                    origin: Origin::Detected,
                }))
            }
            Member::Child { container, target } => {
                let child_scope = match &target.config {
                    Some(config) => Scope::of(config, self.defaults),
                    None => scope.inherited(),
                };
                let classification = match self.classify_container(
                    &target.view,
                    target.storage(),
                    container,
                    &child_scope,
                    depth + 1,
                ) {
                    Ok(classification) => classification,
                    Err(CoreError::Access(fault)) => {
                        warn!(slot = %key, %fault, "child access failed, ignored");
                        return Ok(None);
                    }
                    Err(err) => return Err(err),
                };

                if classification.is_empty() && !self.keeps_empty(&target) {
                    debug!(slot = %key, view = target.view.name(), "empty child pruned");
                    return Ok(None);
                }
                debug!(
                    slot = %key,
                    view = target.view.name(),
                    slots = classification.slots.len(),
                    "child"
                );
                Ok(Some(SlotKind::Child(Box::new(ChildSlot {
                    target,
                    classification,
                }))))
            }
            Member::Ignored => {
                debug!(slot = %key, "no detector matched, ignored");
                Ok(None)
            }
        }
    }

    fn member<'v>(&self, scope: &Scope, value: &'v dyn Any) -> CoreResult<Member<'v>> {
        if let Some(config) = self.catalog.config_of(value) {
            let container = locate(config.storage(), value)?;
            let registry = config.effective_detectors(self.defaults);
            let view = container_view(config, &registry, container)?;
            return Ok(Member::Child {
                container,
                target: ChildTarget {
                    view,
                    config: Some(config.clone()),
                    element_codec: None,
                },
            });
        }

        if let Some(found) = scope.registry.child_for(value) {
            return Ok(Member::Child {
                container: value,
                target: ChildTarget {
                    view: found.view,
                    config: None,
                    element_codec: found.element_codec,
                },
            });
        }

        if scope.detect_artefacts {
            if let Some(codec) = scope.registry.codec_for(value) {
                return Ok(Member::Artefact { value, codec });
            }
        }
        Ok(Member::Ignored)
    }

    fn keeps_empty(&self, target: &ChildTarget) -> bool {
        self.retain_rebuildable
            && target.view.replaces_wholesale()
            && target.element_codec.is_some()
    }
}

/// The configured view, else the first child detector matching the
/// container's own type.
fn container_view(
    config: &Configuration,
    registry: &DetectorRegistry,
    container: &dyn Any,
) -> CoreResult<ViewHandle> {
    config
        .view()
        .cloned()
        .or_else(|| registry.container_view_for(container))
        .ok_or(CoreError::NoContainerView {
            type_name: config.type_name(),
        })
}
