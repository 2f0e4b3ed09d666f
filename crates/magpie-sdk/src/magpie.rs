use std::any::Any;
use std::sync::Arc;

use magpie_core::{
    default_registry, trace, Attachment, Catalog, Classification, Configuration,
    DetectorRegistry, Model, WalkContext, WalkOptions,
};
use magpie_store::{InMemoryModelStore, SharedStore};
use magpie_types::ModelId;
use tracing::debug;

use crate::config::MagpieConfig;
use crate::error::{SdkError, SdkResult};

/// High-level magpie API.
///
/// Owns the store, the catalog of configuration records and a snapshot of
/// the default detectors. The snapshot is taken on construction; call
/// [`refresh_defaults`](Self::refresh_defaults) after registering more
/// defaults at runtime.
pub struct Magpie {
    store: SharedStore,
    catalog: Catalog,
    defaults: DetectorRegistry,
    options: WalkOptions,
    config: MagpieConfig,
}

impl Magpie {
    /// A facade over a fresh [`InMemoryModelStore`] with default settings.
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryModelStore::new()), MagpieConfig::default())
    }

    pub fn with_store(store: SharedStore, config: MagpieConfig) -> Self {
        let defaults = default_registry();
        debug!(
            store = %store.endpoint(),
            defaults = defaults.len(),
            "magpie ready"
        );
        Self {
            store,
            catalog: Catalog::with_policy(config.conflict_policy),
            defaults,
            options: config.walk_options(),
            config,
        }
    }

    pub fn config(&self) -> &MagpieConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn defaults(&self) -> &DetectorRegistry {
        &self.defaults
    }

    // ---- Configuration ----

    /// Merge `attachment` into the record of `T`.
    pub fn attach<T: Any>(&mut self, attachment: &Attachment) -> SdkResult<Arc<Configuration>> {
        Ok(self.catalog.attach::<T>(attachment)?)
    }

    /// Record `T` with its own [`Model`] attachment.
    pub fn register<T: Model>(&mut self) -> SdkResult<Arc<Configuration>> {
        Ok(self.catalog.register::<T>()?)
    }

    /// Take a new snapshot of the process-wide default detectors.
    pub fn refresh_defaults(&mut self) {
        self.defaults = default_registry();
    }

    // ---- Walks ----

    pub fn classify<T: Any>(&self, model: &T) -> SdkResult<Classification> {
        let config = self.config_for::<T>()?;
        Ok(self.context().classifier().classify(&config, model)?)
    }

    /// Render the classification of `model`, see [`trace::render`].
    pub fn trace<T: Any>(&self, model: &T) -> SdkResult<String> {
        Ok(trace::render(&self.classify(model)?))
    }

    pub fn save<T: Any>(&self, model: &T) -> SdkResult<ModelId> {
        let config = self.config_for::<T>()?;
        Ok(self.context().save(&config, model)?)
    }

    /// Load `id` into an existing instance. Children are only loaded where
    /// the instance already holds a placeholder for them.
    pub fn load<T: Any>(&self, id: &ModelId, model: &mut T) -> SdkResult<()> {
        let config = self.config_for::<T>()?;
        Ok(self.context().load(&config, id, model)?)
    }

    /// Load `id` into `T::default()`.
    pub fn load_new<T: Any + Default>(&self, id: &ModelId) -> SdkResult<T> {
        let mut model = T::default();
        self.load(id, &mut model)?;
        Ok(model)
    }

    fn config_for<T: Any>(&self) -> SdkResult<Arc<Configuration>> {
        self.catalog
            .get::<T>()
            .cloned()
            .ok_or(SdkError::NotConfigured(std::any::type_name::<T>()))
    }

    fn context(&self) -> WalkContext<'_> {
        WalkContext::new(&self.catalog, &self.defaults, self.store.clone(), &self.options)
    }
}

impl std::fmt::Debug for Magpie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Magpie")
            .field("store", &self.store.endpoint())
            .field("models", &self.catalog.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}
