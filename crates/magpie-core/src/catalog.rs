use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{Attachment, ConflictPolicy, Configuration, Model};
use crate::error::CoreResult;

/// Caller-owned set of configuration records, one per model type.
///
/// Attaching replaces a type's record with the merged value; records handed
/// out earlier stay valid and unchanged.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: HashMap<TypeId, Arc<Configuration>>,
    policy: ConflictPolicy,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            records: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Merge `attachment` into the record of `T`, creating it if needed.
    pub fn attach<T: Any>(&mut self, attachment: &Attachment) -> CoreResult<Arc<Configuration>> {
        let merged = match self.records.get(&TypeId::of::<T>()) {
            Some(existing) => existing.merge(attachment, self.policy)?,
            None => Configuration::attach::<T>(attachment, self.policy)?,
        };
        Ok(self.insert(merged))
    }

    /// Merge the [`Model`] attachment of `T`, see [`Configuration::of`].
    pub fn register<T: Model>(&mut self) -> CoreResult<Arc<Configuration>> {
        let merged = match self.records.get(&TypeId::of::<T>()) {
            Some(existing) => existing.merge_model::<T>(self.policy)?,
            None => Configuration::of::<T>(self.policy)?,
        };
        Ok(self.insert(merged))
    }

    /// Store `config` under its type, replacing any previous record.
    pub fn insert(&mut self, config: Configuration) -> Arc<Configuration> {
        let config = Arc::new(config);
        debug!(
            model = config.type_name(),
            declared = config.declared().len(),
            detectors = config.detectors().len(),
            "configuration recorded"
        );
        self.records.insert(config.type_id(), config.clone());
        config
    }

    pub fn get<T: Any>(&self) -> Option<&Arc<Configuration>> {
        self.get_for(TypeId::of::<T>())
    }

    pub fn get_for(&self, type_id: TypeId) -> Option<&Arc<Configuration>> {
        self.records.get(&type_id)
    }

    /// Record of the value's runtime type.
    pub fn config_of(&self, value: &dyn Any) -> Option<&Arc<Configuration>> {
        self.get_for(value.type_id())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
