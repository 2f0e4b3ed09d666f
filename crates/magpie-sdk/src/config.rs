use std::path::{Path, PathBuf};

use magpie_core::{ConflictPolicy, WalkOptions, DEFAULT_MAX_DEPTH};
use magpie_types::Provenance;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

/// Settings of a [`Magpie`](crate::Magpie) instance.
///
/// ```toml
/// max_depth = 32
/// provenance = "run-17"
/// staging_root = "/var/tmp/magpie"
/// conflict_policy = "first-writer-wins"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagpieConfig {
    /// Deepest model nesting a walk accepts.
    pub max_depth: usize,
    /// Provenance tag recorded on saved models.
    pub provenance: String,
    /// Where staging directories are created. Defaults to the system temp
    /// directory.
    pub staging_root: Option<PathBuf>,
    /// How conflicting artefact declarations are handled.
    pub conflict_policy: ConflictPolicy,
}

impl Default for MagpieConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            provenance: Provenance::unversioned().as_str().to_string(),
            staging_root: None,
            conflict_policy: ConflictPolicy::Reject,
        }
    }
}

impl MagpieConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            max_depth: self.max_depth,
            provenance: Provenance::new(self.provenance.clone()),
            staging_root: self.staging_root.clone(),
        }
    }
}
