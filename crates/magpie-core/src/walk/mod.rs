//! Save and load walkers.
//!
//! Both walkers classify first and then follow the classification
//! depth-first. Saving submits children before their parent so every
//! child identity exists when the parent tree is submitted.

mod load;
mod save;

use std::path::PathBuf;

use magpie_store::SharedStore;
use magpie_types::Provenance;

use crate::catalog::Catalog;
use crate::classify::{Classifier, DEFAULT_MAX_DEPTH};
use crate::config::Configuration;
use crate::registry::DetectorRegistry;

/// Options shared by save and load.
#[derive(Clone, Debug)]
pub struct WalkOptions {
    pub max_depth: usize,
    /// Provenance tag recorded on every saved tree.
    pub provenance: Provenance,
    /// Parent directory of staging areas, the system temp dir if unset.
    pub staging_root: Option<PathBuf>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            provenance: Provenance::unversioned(),
            staging_root: None,
        }
    }
}

/// Everything a walk reads: records, default detectors, the fallback store
/// and options.
pub struct WalkContext<'a> {
    pub catalog: &'a Catalog,
    pub defaults: &'a DetectorRegistry,
    /// Used by models whose record has no endpoint.
    pub store: SharedStore,
    pub options: &'a WalkOptions,
}

impl<'a> WalkContext<'a> {
    pub fn new(
        catalog: &'a Catalog,
        defaults: &'a DetectorRegistry,
        store: SharedStore,
        options: &'a WalkOptions,
    ) -> Self {
        Self {
            catalog,
            defaults,
            store,
            options,
        }
    }

    pub fn classifier(&self) -> Classifier<'a> {
        Classifier::new(self.catalog, self.defaults).max_depth(self.options.max_depth)
    }

    fn store_for(&self, config: Option<&Configuration>, inherited: &SharedStore) -> SharedStore {
        config
            .and_then(Configuration::endpoint)
            .map(|endpoint| endpoint.store().clone())
            .unwrap_or_else(|| inherited.clone())
    }
}
