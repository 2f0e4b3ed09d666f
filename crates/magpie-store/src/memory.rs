use std::collections::HashMap;
use std::sync::RwLock;

use magpie_types::{Fingerprint, ModelId, Resource};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ModelStore;
use crate::tree::{ArtefactEntry, ModelTree};

/// In-memory model store.
///
/// Intended for tests and embedding. Resources are held once per
/// fingerprint, trees once per identity, both behind a `RwLock`.
///
/// Child identities must already be stored unless the store was created
/// with [`allowing_foreign_children`](Self::allowing_foreign_children).
pub struct InMemoryModelStore {
    trees: RwLock<HashMap<ModelId, ModelTree>>,
    blobs: RwLock<HashMap<Fingerprint, Resource>>,
    foreign_children: bool,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self {
            trees: RwLock::new(HashMap::new()),
            blobs: RwLock::new(HashMap::new()),
            foreign_children: false,
        }
    }

    /// A store that accepts child identities held by other stores.
    pub fn allowing_foreign_children() -> Self {
        Self {
            foreign_children: true,
            ..Self::new()
        }
    }

    /// Number of stored model trees.
    pub fn model_count(&self) -> usize {
        self.trees.read().expect("lock poisoned").len()
    }

    /// Number of distinct stored resources.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing has been submitted.
    pub fn is_empty(&self) -> bool {
        self.model_count() == 0
    }

}

impl Default for InMemoryModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelStore for InMemoryModelStore {
    fn submit(&self, tree: &ModelTree) -> StoreResult<ModelId> {
        tree.validate()?;
        if !self.foreign_children {
            let trees = self.trees.read().expect("lock poisoned");
            for child in &tree.children {
                if !trees.contains_key(&child.id) {
                    return Err(StoreError::DanglingChild {
                        slot: child.slot.clone(),
                        id: child.id.clone(),
                    });
                }
            }
        }

        let mut stored = ModelTree::new(tree.name.clone(), tree.provenance.clone());
        stored.children = tree.children.clone();
        for entry in &tree.artefacts {
            let resource = self.read_resource(&entry.slot, &entry.resource)?;
            self.blobs
                .write()
                .expect("lock poisoned")
                .entry(resource.fingerprint())
                .or_insert(resource);
            stored.push_artefact(ArtefactEntry::new(
                entry.slot.clone(),
                entry.resource.to_stored(),
            ));
        }

        let id = stored.derive_id()?;
        debug!(
            model = %id.short_id(),
            artefacts = stored.artefacts.len(),
            children = stored.children.len(),
            "stored model tree"
        );
        self.trees
            .write()
            .expect("lock poisoned")
            .entry(id.clone())
            .or_insert(stored);
        Ok(id)
    }

    fn resolve(&self, id: &ModelId) -> StoreResult<Option<ModelTree>> {
        Ok(self.trees.read().expect("lock poisoned").get(id).cloned())
    }

    fn fetch(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Resource>> {
        Ok(self
            .blobs
            .read()
            .expect("lock poisoned")
            .get(fingerprint)
            .cloned())
    }

    fn exists(&self, id: &ModelId) -> StoreResult<bool> {
        Ok(self.trees.read().expect("lock poisoned").contains_key(id))
    }

    fn endpoint(&self) -> String {
        "memory://".to_string()
    }
}

impl std::fmt::Debug for InMemoryModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryModelStore")
            .field("model_count", &self.model_count())
            .field("blob_count", &self.blob_count())
            .field("foreign_children", &self.foreign_children)
            .finish()
    }
}
