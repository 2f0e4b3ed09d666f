use std::path::PathBuf;

use magpie_types::{ContentHasher, Fingerprint, ModelId, Provenance};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Resource references
// ---------------------------------------------------------------------------

/// Where the bytes of an artefact live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceRef {
    /// Written to a staging area during the current save.
    Staged {
        path: PathBuf,
        fingerprint: Fingerprint,
        size: u64,
    },
    /// Held by the store that resolved the tree.
    Stored { fingerprint: Fingerprint, size: u64 },
}

impl ResourceRef {
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Self::Staged { fingerprint, .. } | Self::Stored { fingerprint, .. } => *fingerprint,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Staged { size, .. } | Self::Stored { size, .. } => *size,
        }
    }

    /// The stored form of this reference.
    pub fn to_stored(&self) -> Self {
        Self::Stored {
            fingerprint: self.fingerprint(),
            size: self.size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtefactEntry {
    pub slot: String,
    pub resource: ResourceRef,
}

impl ArtefactEntry {
    pub fn new(slot: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            slot: slot.into(),
            resource,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub slot: String,
    pub id: ModelId,
}

impl ChildEntry {
    pub fn new(slot: impl Into<String>, id: ModelId) -> Self {
        Self {
            slot: slot.into(),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelTree
// ---------------------------------------------------------------------------

/// The storable form of one model: named artefact resources plus child
/// identities.
///
/// Entry order is the order the save walker visited the slots in and is
/// preserved by stores. It takes part in the schema fingerprint, so two
/// trees with the same entries in a different order have different ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTree {
    pub name: String,
    pub provenance: Provenance,
    pub artefacts: Vec<ArtefactEntry>,
    pub children: Vec<ChildEntry>,
}

impl ModelTree {
    pub fn new(name: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            provenance,
            artefacts: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn push_artefact(&mut self, entry: ArtefactEntry) {
        self.artefacts.push(entry);
    }

    pub fn push_child(&mut self, entry: ChildEntry) {
        self.children.push(entry);
    }

    /// Look up an artefact entry by slot name.
    pub fn artefact(&self, slot: &str) -> Option<&ArtefactEntry> {
        self.artefacts.iter().find(|e| e.slot == slot)
    }

    /// Look up a child entry by slot name.
    pub fn child(&self, slot: &str) -> Option<&ChildEntry> {
        self.children.iter().find(|e| e.slot == slot)
    }

    /// Returns `true` if the tree has neither artefacts nor children.
    pub fn is_empty(&self) -> bool {
        self.artefacts.is_empty() && self.children.is_empty()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.artefacts.len() + self.children.len()
    }

    /// Slot names in tree order, artefacts first.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.artefacts
            .iter()
            .map(|e| e.slot.as_str())
            .chain(self.children.iter().map(|e| e.slot.as_str()))
    }

    /// Fail if any slot name appears twice.
    pub fn validate(&self) -> StoreResult<()> {
        let mut seen = std::collections::HashSet::new();
        for slot in self.slots() {
            if !seen.insert(slot) {
                return Err(StoreError::DuplicateSlot(slot.to_string()));
            }
        }
        Ok(())
    }

    /// Fingerprint of the tree's structure and content.
    ///
    /// Covers the name, every artefact slot with its resource fingerprint
    /// and size, and every child slot with its identity. Staged and stored
    /// references to the same bytes hash identically.
    pub fn schema_id(&self) -> StoreResult<Fingerprint> {
        let artefacts: Vec<_> = self
            .artefacts
            .iter()
            .map(|e| {
                serde_json::json!([e.slot, e.resource.fingerprint().to_hex(), e.resource.size()])
            })
            .collect();
        let children: Vec<_> = self
            .children
            .iter()
            .map(|e| serde_json::json!([e.slot, e.id.to_string()]))
            .collect();
        let canonical = serde_json::json!({
            "name": self.name,
            "artefacts": artefacts,
            "children": children,
        });
        ContentHasher::SCHEMA
            .hash_json(&canonical)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// The identity a content-addressed store assigns to this tree.
    pub fn derive_id(&self) -> StoreResult<ModelId> {
        Ok(ModelId::new(
            self.name.clone(),
            self.schema_id()?,
            self.provenance.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(data: &[u8]) -> ResourceRef {
        ResourceRef::Stored {
            fingerprint: ContentHasher::RESOURCE.hash(data),
            size: data.len() as u64,
        }
    }

    fn sample() -> ModelTree {
        let mut tree = ModelTree::new("encoder", Provenance::unversioned());
        tree.push_artefact(ArtefactEntry::new("weights", stored(b"w")));
        tree.push_artefact(ArtefactEntry::new("bias", stored(b"b")));
        tree
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    #[test]
    fn lookup_by_slot() {
        let tree = sample();
        assert!(tree.artefact("weights").is_some());
        assert!(tree.artefact("missing").is_none());
        assert!(tree.child("weights").is_none());
        assert_eq!(tree.len(), 2);
        assert!(!tree.is_empty());
    }

    #[test]
    fn slots_preserve_order() {
        let mut tree = sample();
        let child = sample().derive_id().unwrap();
        tree.push_child(ChildEntry::new("head", child));
        let slots: Vec<_> = tree.slots().collect();
        assert_eq!(slots, vec!["weights", "bias", "head"]);
    }

    #[test]
    fn validate_rejects_duplicate_slots() {
        let mut tree = sample();
        tree.push_artefact(ArtefactEntry::new("bias", stored(b"again")));
        assert!(matches!(
            tree.validate(),
            Err(StoreError::DuplicateSlot(slot)) if slot == "bias"
        ));
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    #[test]
    fn schema_id_is_deterministic() {
        assert_eq!(sample().schema_id().unwrap(), sample().schema_id().unwrap());
    }

    #[test]
    fn schema_id_ignores_staging_location() {
        let mut staged = ModelTree::new("encoder", Provenance::unversioned());
        staged.push_artefact(ArtefactEntry::new(
            "weights",
            ResourceRef::Staged {
                path: PathBuf::from("/tmp/a.artefact"),
                fingerprint: ContentHasher::RESOURCE.hash(b"w"),
                size: 1,
            },
        ));
        let mut stored_tree = ModelTree::new("encoder", Provenance::unversioned());
        stored_tree.push_artefact(ArtefactEntry::new("weights", stored(b"w")));
        assert_eq!(
            staged.schema_id().unwrap(),
            stored_tree.schema_id().unwrap()
        );
    }

    #[test]
    fn schema_id_tracks_content_and_order() {
        let base = sample().schema_id().unwrap();

        let mut changed = sample();
        changed.artefacts[0].resource = stored(b"other");
        assert_ne!(changed.schema_id().unwrap(), base);

        let mut reordered = sample();
        reordered.artefacts.reverse();
        assert_ne!(reordered.schema_id().unwrap(), base);
    }

    #[test]
    fn derive_id_carries_name_and_provenance() {
        let mut tree = sample();
        tree.provenance = Provenance::new("rev-3");
        let id = tree.derive_id().unwrap();
        assert_eq!(id.name(), "encoder");
        assert_eq!(id.provenance().as_str(), "rev-3");
        // Provenance is part of the id, not the schema
        assert_eq!(*id.schema_id(), sample().schema_id().unwrap());
    }

    #[test]
    fn to_stored_keeps_fingerprint() {
        let staged = ResourceRef::Staged {
            path: PathBuf::from("x"),
            fingerprint: Fingerprint::from_bytes(b"x"),
            size: 9,
        };
        let stored = staged.to_stored();
        assert!(matches!(stored, ResourceRef::Stored { size: 9, .. }));
        assert_eq!(stored.fingerprint(), staged.fingerprint());
    }
}
