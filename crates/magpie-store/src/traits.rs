use std::sync::Arc;

use magpie_types::{Fingerprint, ModelId, Resource};

use crate::error::{StoreError, StoreResult};
use crate::tree::{ModelTree, ResourceRef};

/// Storage capability for saved model trees.
///
/// All implementations must satisfy these invariants:
/// - `submit` consumes staged references: once it returns, the tree can be
///   resolved without the staging area that produced it.
/// - `resolve` returns trees whose artefact references are all
///   [`ResourceRef::Stored`], in submission order.
/// - Identities are stable: resolving the id returned by `submit` yields a
///   tree with the same entries.
/// - All I/O errors are propagated, never silently ignored.
pub trait ModelStore: Send + Sync {
    /// Store a tree and return its identity.
    ///
    /// Submitting an identical tree twice is a no-op returning the same id.
    fn submit(&self, tree: &ModelTree) -> StoreResult<ModelId>;

    /// Resolve an identity back into its tree.
    ///
    /// Returns `Ok(None)` if the identity is unknown.
    fn resolve(&self, id: &ModelId) -> StoreResult<Option<ModelTree>>;

    /// Fetch a stored resource by fingerprint.
    fn fetch(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Resource>>;

    /// Check whether a tree is stored under `id`.
    fn exists(&self, id: &ModelId) -> StoreResult<bool>;

    /// Human-readable description of where this store keeps its data.
    fn endpoint(&self) -> String;

    /// Resolve an identity, failing if it is unknown.
    fn require(&self, id: &ModelId) -> StoreResult<ModelTree> {
        self.resolve(id)?
            .ok_or_else(|| StoreError::ModelNotFound(id.clone()))
    }

    /// Read the bytes behind a reference.
    ///
    /// Staged references are read from disk and checked against their
    /// recorded fingerprint. Stored references go through [`fetch`].
    ///
    /// [`fetch`]: ModelStore::fetch
    fn read_resource(&self, slot: &str, reference: &ResourceRef) -> StoreResult<Resource> {
        match reference {
            ResourceRef::Staged {
                path, fingerprint, ..
            } => {
                let resource = Resource::from_file(path)?;
                let computed = resource.fingerprint();
                if computed != *fingerprint {
                    return Err(StoreError::HashMismatch {
                        slot: slot.to_string(),
                        expected: *fingerprint,
                        computed,
                    });
                }
                Ok(resource)
            }
            ResourceRef::Stored { fingerprint, .. } => self
                .fetch(fingerprint)?
                .ok_or(StoreError::ResourceNotFound(*fingerprint)),
        }
    }
}

/// A store shared between configurations and walkers.
pub type SharedStore = Arc<dyn ModelStore>;
