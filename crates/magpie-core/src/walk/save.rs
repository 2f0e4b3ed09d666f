use std::any::Any;
use std::sync::Arc;

use magpie_store::{ChildEntry, ModelTree, SharedStore, StagingArea};
use magpie_types::ModelId;
use tracing::{debug, info, warn};

use crate::classify::{locate, Classification};
use crate::config::Configuration;
use crate::error::{CoreError, CoreResult};
use crate::view::AccessFault;
use crate::walk::WalkContext;

impl WalkContext<'_> {
    /// Save `instance` and return the identity of its stored tree.
    ///
    /// Subtrees submitted before a failure stay in the store.
    pub fn save(&self, config: &Configuration, instance: &dyn Any) -> CoreResult<ModelId> {
        let classification = self.classifier().classify(config, instance)?;
        let container = locate(config.storage(), instance)?;
        let store = self.store_for(Some(config), &self.store);
        let name = config.display_name();

        let mut staging = match &self.options.staging_root {
            Some(root) => StagingArea::new_in(root)?,
            None => StagingArea::new()?,
        };
        info!(model = %name, store = %store.endpoint(), "save started");

        let id = self.save_node(&mut staging, &store, &name, &classification, container)?;
        info!(
            model = %id.short_id(),
            staged = staging.staged_count(),
            "save finished"
        );
        Ok(id)
    }

    fn save_node(
        &self,
        staging: &mut StagingArea,
        store: &SharedStore,
        name: &str,
        classification: &Classification,
        container: &dyn Any,
    ) -> CoreResult<ModelId> {
        let view = &classification.view;
        let mut tree = ModelTree::new(name, self.options.provenance.clone());

        for (slot, child) in classification.children() {
            let value = view
                .get(container, slot)?
                .ok_or_else(|| AccessFault::UnknownKey(slot.to_string()))?;
            let child_container = locate(&child.target.storage(), value)?;
            let child_config = child.target.config.as_deref();
            let child_name = child_config
                .and_then(Configuration::explicit_name)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{name}.{slot}"));
            let child_store = self.store_for(child_config, store);
            if !std::ptr::addr_eq(Arc::as_ptr(&child_store), Arc::as_ptr(store)) {
                debug!(
                    slot = %slot,
                    store = %child_store.endpoint(),
                    parent = %store.endpoint(),
                    "child routed to its own endpoint"
                );
            }

            let id = self.save_node(
                staging,
                &child_store,
                &child_name,
                &child.classification,
                child_container,
            )?;
            tree.push_child(ChildEntry::new(slot, id));
        }

        for (slot, codec) in classification.artefacts() {
            let value = match view.get(container, slot) {
                Ok(Some(value)) => value,
                Ok(None) => {
                    return Err(CoreError::ArtefactMissing {
                        model: name.to_string(),
                        slot: slot.to_string(),
                    });
                }
                Err(fault) => {
                    warn!(model = %name, slot = %slot, %fault, "artefact access failed");
                    return Err(CoreError::ArtefactMissing {
                        model: name.to_string(),
                        slot: slot.to_string(),
                    });
                }
            };
            let resource = codec.encode(value).map_err(|source| CoreError::Codec {
                slot: slot.to_string(),
                source,
            })?;
            tree.push_artefact(staging.stage(slot, &resource)?);
        }

        let id = store.submit(&tree)?;
        debug!(
            model = %id.short_id(),
            artefacts = tree.artefacts.len(),
            children = tree.children.len(),
            "submitted"
        );
        Ok(id)
    }
}
