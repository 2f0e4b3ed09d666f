use std::any::Any;

use magpie_store::{ModelTree, SharedStore};
use magpie_types::{ModelId, Resource};
use tracing::{debug, info, warn};

use crate::classify::{locate_mut, ChildSlot, Classification, SlotKind};
use crate::codec::CodecHandle;
use crate::config::{Configuration, StorageLocation};
use crate::error::{CoreError, CoreResult};
use crate::view::ViewHandle;
use crate::walk::WalkContext;

impl WalkContext<'_> {
    /// Load the tree stored under `id` into `instance`.
    ///
    /// The instance is classified the same way a save would, so children
    /// are loaded into the values already present. A failure leaves the
    /// instance partially populated.
    pub fn load(
        &self,
        config: &Configuration,
        id: &ModelId,
        instance: &mut dyn Any,
    ) -> CoreResult<()> {
        let store = self.store_for(Some(config), &self.store);
        let tree = store
            .resolve(id)?
            .ok_or_else(|| CoreError::ModelNotFound(id.clone()))?;
        let classification = self
            .classifier()
            .retain_rebuildable(true)
            .classify(config, &*instance)?;
        let container = locate_mut(config.storage(), instance)?;

        info!(model = %id.short_id(), store = %store.endpoint(), "load started");
        let loaded = self.load_node(&store, &tree, &classification, container)?;
        info!(model = %id.short_id(), artefacts = loaded, "load finished");
        Ok(())
    }

    /// Returns the number of artefacts decoded.
    fn load_node(
        &self,
        store: &SharedStore,
        tree: &ModelTree,
        classification: &Classification,
        container: &mut dyn Any,
    ) -> CoreResult<usize> {
        let view = &classification.view;
        let mut loaded = 0;

        for slot in &classification.slots {
            let key = slot.key.as_str();
            match &slot.kind {
                SlotKind::Artefact { codec, .. } => {
                    let Some(entry) = tree.artefact(key) else {
                        warn!(model = %tree.name, slot = %key, "artefact not in stored model, skipped");
                        continue;
                    };
                    let resource = store.read_resource(key, &entry.resource)?;
                    decode_into_slot(view, container, key, codec, &resource)?;
                    loaded += 1;
                }
                SlotKind::Child(child) => {
                    let Some(entry) = tree.child(key) else {
                        if child.classification.is_empty() {
                            debug!(model = %tree.name, slot = %key, "empty child not in stored model");
                        } else {
                            warn!(model = %tree.name, slot = %key, "child not in stored model, skipped");
                        }
                        continue;
                    };
                    let child_store = self.store_for(child.target.config.as_deref(), store);
                    let child_tree = child_store.resolve(&entry.id)?.ok_or_else(|| {
                        CoreError::ChildResolution {
                            slot: key.to_string(),
                            id: entry.id.clone(),
                        }
                    })?;

                    if is_rebuilt(child, &child_tree) {
                        loaded += rebuild_child(&child_store, &child_tree, child, view, container, key)?;
                    } else {
                        let value = view
                            .get_mut(container, key)?
                            .ok_or_else(|| CoreError::MissingPlaceholder {
                                slot: key.to_string(),
                            })?;
                        let child_container = locate_mut(&child.target.storage(), value)?;
                        loaded += self.load_node(
                            &child_store,
                            &child_tree,
                            &child.classification,
                            child_container,
                        )?;
                    }
                }
            }
        }

        for stored in tree.slots() {
            if classification.slot(stored).is_none() {
                warn!(model = %tree.name, slot = %stored, "stored slot has no counterpart in target, skipped");
            }
        }
        Ok(loaded)
    }
}

/// Collections of artefacts are replaced wholesale instead of filled in.
fn is_rebuilt(child: &ChildSlot, tree: &ModelTree) -> bool {
    child.target.view.replaces_wholesale()
        && tree.children.is_empty()
        && child.target.storage() == StorageLocation::SelfContainer
}

fn rebuild_child(
    store: &SharedStore,
    tree: &ModelTree,
    child: &ChildSlot,
    parent_view: &ViewHandle,
    parent: &mut dyn Any,
    key: &str,
) -> CoreResult<usize> {
    let mut entries = Vec::with_capacity(tree.artefacts.len());
    for entry in &tree.artefacts {
        let codec = child.target.element_codec.as_ref().or_else(|| {
            child
                .classification
                .artefacts()
                .find(|(slot, _)| *slot == entry.slot)
                .map(|(_, codec)| codec)
        });
        let Some(codec) = codec else {
            warn!(slot = %key, element = %entry.slot, "no codec for stored element, skipped");
            continue;
        };
        let resource = store.read_resource(&entry.slot, &entry.resource)?;
        let value = codec.decode(&resource).map_err(|source| CoreError::Codec {
            slot: format!("{key}.{}", entry.slot),
            source,
        })?;
        entries.push((entry.slot.clone(), value));
    }

    let count = entries.len();
    let rebuilt = child.target.view.rebuild(entries)?;
    parent_view.set(parent, key, rebuilt)?;
    debug!(slot = %key, elements = count, "child rebuilt");
    Ok(count)
}

/// Decode into the current value when it has the codec's payload type,
/// otherwise decode a fresh value and set it.
fn decode_into_slot(
    view: &ViewHandle,
    container: &mut dyn Any,
    key: &str,
    codec: &CodecHandle,
    resource: &Resource,
) -> CoreResult<()> {
    let codec_error = |source| CoreError::Codec {
        slot: key.to_string(),
        source,
    };
    match view.get_mut(container, key) {
        Ok(Some(current)) if codec.accepts(&*current) => {
            return codec.decode_into(current, resource).map_err(codec_error);
        }
        Ok(_) => {}
        Err(fault) => debug!(slot = %key, %fault, "slot not readable, setting a fresh value"),
    }
    let value = codec.decode(resource).map_err(codec_error)?;
    view.set(container, key, value)?;
    Ok(())
}
