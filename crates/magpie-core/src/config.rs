//! Configuration records and the attachment protocol.
//!
//! An [`Attachment`] describes what a caller wants to add to a type's
//! record. [`Configuration::merge`] folds it into an existing record and
//! returns a new value; records are never mutated after construction.
//!
//! Merge rules:
//! - declared slots accumulate; an identical redeclaration is a no-op;
//! - a slot redeclared with a different codec follows the
//!   [`ConflictPolicy`];
//! - detectors accumulate without duplicates;
//! - name, view, storage location and endpoint are set by the first
//!   attachment that provides them.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use magpie_store::SharedStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::CodecHandle;
use crate::detector::Detector;
use crate::error::{CoreError, CoreResult};
use crate::registry::{DetectionLevel, DetectorRegistry};
use crate::view::ViewHandle;
use crate::views::Attributes;

/// What happens when a slot is redeclared with a different codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail with [`CoreError::ConfigurationConflict`].
    #[default]
    Reject,
    /// Keep the codec of the first declaration and log a warning.
    FirstWriterWins,
}

/// Storage endpoint attached to a type. Endpoints compare by identity.
#[derive(Clone)]
pub struct Endpoint(SharedStore);

impl Endpoint {
    pub fn new(store: SharedStore) -> Self {
        Self(store)
    }

    pub fn store(&self) -> &SharedStore {
        &self.0
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self.0.endpoint())
    }
}

/// Where a model keeps the members that are walked.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StorageLocation {
    /// The model is its own container.
    #[default]
    SelfContainer,
    /// The members live in the container held by `key`, reached through
    /// `outer`.
    Member { key: String, outer: ViewHandle },
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Builder for one attachment call.
#[derive(Clone, Debug, Default)]
pub struct Attachment {
    declarations: Vec<(String, CodecHandle)>,
    detectors: Vec<(Detector, DetectionLevel)>,
    endpoint: Option<Endpoint>,
    name: Option<String>,
    view: Option<ViewHandle>,
    storage: Option<StorageLocation>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every slot in `slots` as an artefact stored with `codec`.
    pub fn artefacts<I, S>(mut self, codec: CodecHandle, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for slot in slots {
            self.declarations.push((slot.into(), codec.clone()));
        }
        self
    }

    pub fn artefact(self, slot: impl Into<String>, codec: CodecHandle) -> Self {
        self.artefacts(codec, [slot])
    }

    /// Add a detector consulted before the defaults.
    ///
    /// An [`ArtefactDetector`](crate::ArtefactDetector) also promotes
    /// `Vec<T>` and `BTreeMap<String, T>` of its payload types to children,
    /// ahead of any default that would store the collection whole. Each
    /// element then becomes its own artefact and staged file. Call
    /// `without_collections` on the detector to keep collections whole.
    pub fn detector(self, detector: impl Into<Detector>) -> Self {
        self.detector_at(detector, DetectionLevel::Specific)
    }

    pub fn detector_at(mut self, detector: impl Into<Detector>, level: DetectionLevel) -> Self {
        self.detectors.push((detector.into(), level));
        self
    }

    /// Submit trees of this type to `store` instead of the parent's store.
    ///
    /// The parent tree still records the child id, so the parent's store
    /// must accept ids it does not hold. [`InMemoryModelStore::new`]
    /// rejects them as `DanglingChild`; use
    /// [`InMemoryModelStore::allowing_foreign_children`] for the parent.
    ///
    /// [`InMemoryModelStore::new`]: magpie_store::InMemoryModelStore::new
    /// [`InMemoryModelStore::allowing_foreign_children`]: magpie_store::InMemoryModelStore::allowing_foreign_children
    pub fn endpoint(mut self, store: SharedStore) -> Self {
        self.endpoint = Some(Endpoint::new(store));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn view(mut self, view: ViewHandle) -> Self {
        self.view = Some(view);
        self
    }

    /// Walk the container held by member `key` instead of the model itself.
    pub fn storage_member(mut self, key: impl Into<String>, outer: ViewHandle) -> Self {
        self.storage = Some(StorageLocation::Member {
            key: key.into(),
            outer,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable configuration record of one model type.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
    declared: IndexMap<String, CodecHandle>,
    detectors: DetectorRegistry,
    view: Option<ViewHandle>,
    storage: Option<StorageLocation>,
    endpoint: Option<Endpoint>,
}

impl Configuration {
    /// Empty record for `T`.
    pub fn new<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
            declared: IndexMap::new(),
            detectors: DetectorRegistry::new(),
            view: None,
            storage: None,
            endpoint: None,
        }
    }

    /// Record for `T` built from a single attachment.
    pub fn attach<T: Any>(attachment: &Attachment, policy: ConflictPolicy) -> CoreResult<Self> {
        Self::new::<T>().merge(attachment, policy)
    }

    /// Record for a [`Model`] type: its own attachment plus an
    /// [`AttributeView`](crate::AttributeView) when it names no view and is
    /// its own container.
    pub fn of<T: Model>(policy: ConflictPolicy) -> CoreResult<Self> {
        Self::new::<T>().merge_model::<T>(policy)
    }

    /// [`merge`](Self::merge) the attachment of `T` plus the attribute view
    /// fallback described on [`of`](Self::of).
    pub fn merge_model<T: Model>(&self, policy: ConflictPolicy) -> CoreResult<Self> {
        let config = self.merge(&T::attachment(), policy)?;
        if config.storage.is_some() {
            return Ok(config);
        }
        config.merge(&Attachment::new().view(ViewHandle::attributes::<T>()), policy)
    }

    /// Fold `attachment` into this record, returning the merged record.
    pub fn merge(&self, attachment: &Attachment, policy: ConflictPolicy) -> CoreResult<Self> {
        let mut merged = self.clone();

        for (slot, codec) in &attachment.declarations {
            match merged.declared.get(slot) {
                None => {
                    merged.declared.insert(slot.clone(), codec.clone());
                }
                Some(existing) if existing == codec => {}
                Some(existing) => match policy {
                    ConflictPolicy::Reject => {
                        return Err(CoreError::ConfigurationConflict {
                            type_name: self.type_name,
                            slot: slot.clone(),
                            existing: existing.label(),
                            incoming: codec.label(),
                        });
                    }
                    ConflictPolicy::FirstWriterWins => {
                        warn!(
                            model = self.type_name,
                            slot = %slot,
                            kept = %existing.label(),
                            ignored = %codec.label(),
                            "conflicting artefact declaration ignored"
                        );
                    }
                },
            }
        }

        for (detector, level) in &attachment.detectors {
            merged.detectors.register(detector.clone(), *level);
        }

        if merged.name.is_none() {
            merged.name = attachment.name.clone();
        }
        if merged.view.is_none() {
            merged.view = attachment.view.clone();
        }
        if merged.storage.is_none() {
            merged.storage = attachment.storage.clone();
        }
        if merged.endpoint.is_none() {
            merged.endpoint = attachment.endpoint.clone();
        }
        Ok(merged)
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Name given by an attachment, if any.
    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display name: the attached name or the unqualified type name.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| short_type_name(self.type_name).to_string())
    }

    pub fn declared(&self) -> &IndexMap<String, CodecHandle> {
        &self.declared
    }

    pub fn declared_codec(&self, slot: &str) -> Option<&CodecHandle> {
        self.declared.get(slot)
    }

    pub fn detectors(&self) -> &DetectorRegistry {
        &self.detectors
    }

    pub fn view(&self) -> Option<&ViewHandle> {
        self.view.as_ref()
    }

    pub fn storage(&self) -> &StorageLocation {
        static SELF_CONTAINER: StorageLocation = StorageLocation::SelfContainer;
        self.storage.as_ref().unwrap_or(&SELF_CONTAINER)
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Returns `true` when no slot is declared, so every walk detects
    /// artefacts as well as children.
    pub fn auto_detect(&self) -> bool {
        self.declared.is_empty()
    }

    /// This record's detectors layered over `defaults`.
    pub fn effective_detectors(&self, defaults: &DetectorRegistry) -> DetectorRegistry {
        self.detectors.layered_over(defaults)
    }
}

/// `a::b::Linear<c::D>` -> `Linear`.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A type that knows its own attachment.
pub trait Model: Attributes {
    fn attachment() -> Attachment {
        Attachment::new()
    }
}
