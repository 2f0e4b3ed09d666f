use std::path::Path;

use magpie_types::Resource;
use tracing::debug;

use crate::error::StoreResult;
use crate::tree::{ArtefactEntry, ResourceRef};

/// Temporary directory holding the encoded artefacts of one save.
///
/// Each staged artefact is written to its own file with a random name. The
/// directory and its contents are removed when the area is dropped, so a
/// tree referring to staged files must be submitted before that.
pub struct StagingArea {
    dir: tempfile::TempDir,
    staged: usize,
}

impl StagingArea {
    /// Create a staging area in the system temporary directory.
    pub fn new() -> StoreResult<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("magpie-stage-").tempdir()?,
            staged: 0,
        })
    }

    /// Create a staging area under `root`.
    pub fn new_in(root: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            dir: tempfile::Builder::new()
                .prefix("magpie-stage-")
                .tempdir_in(root)?,
            staged: 0,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of artefacts staged so far.
    pub fn staged_count(&self) -> usize {
        self.staged
    }

    /// Write `resource` to a fresh file and return the tree entry for `slot`.
    pub fn stage(&mut self, slot: &str, resource: &Resource) -> StoreResult<ArtefactEntry> {
        let path = self
            .dir
            .path()
            .join(format!("{}.artefact", uuid::Uuid::new_v4()));
        std::fs::write(&path, resource.as_bytes())?;
        self.staged += 1;

        let fingerprint = resource.fingerprint();
        debug!(slot, fingerprint = %fingerprint.short_hex(), size = resource.len(), "staged artefact");
        Ok(ArtefactEntry::new(
            slot,
            ResourceRef::Staged {
                path,
                fingerprint,
                size: resource.len() as u64,
            },
        ))
    }
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("path", &self.dir.path())
            .field("staged", &self.staged)
            .finish()
    }
}
