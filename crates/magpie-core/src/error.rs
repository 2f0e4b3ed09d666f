use magpie_store::StoreError;
use magpie_types::ModelId;

use crate::codec::CodecError;
use crate::view::AccessFault;

/// Errors from classification and the save/load walkers.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A declared or detected artefact slot holds no value at save time.
    #[error("artefact {slot} of model {model} has no value")]
    ArtefactMissing { model: String, slot: String },

    /// A child identity recorded in a stored tree cannot be resolved.
    #[error("child slot {slot} references unresolvable model {id}")]
    ChildResolution { slot: String, id: ModelId },

    /// The identity passed to a load is unknown to the store.
    #[error("model not found: {0}")]
    ModelNotFound(ModelId),

    /// A codec failed to encode or decode a slot.
    #[error("codec failed on slot {slot}: {source}")]
    Codec {
        slot: String,
        #[source]
        source: CodecError,
    },

    /// Two attachments declare different codecs for the same slot.
    #[error("slot {slot} of {type_name} is declared with codec {existing}, cannot redeclare with {incoming}")]
    ConfigurationConflict {
        type_name: &'static str,
        slot: String,
        existing: String,
        incoming: String,
    },

    /// No container view is configured or detected for a model type.
    #[error("no container view for {type_name}")]
    NoContainerView { type_name: &'static str },

    /// The model graph is nested deeper than the configured limit.
    #[error("model graph exceeds maximum depth {limit}")]
    DepthExceeded { limit: usize },

    /// A container view could not access the model.
    #[error("container access failed: {0}")]
    Access(#[from] AccessFault),

    /// A stored child has no placeholder value in the load target.
    #[error("child slot {slot} has no placeholder to load into")]
    MissingPlaceholder { slot: String },

    /// Failure from the storage capability.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
