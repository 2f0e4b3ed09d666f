use magpie_types::{Fingerprint, ModelId};

/// Errors from model store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No tree is stored under the requested identity.
    #[error("model not found: {0}")]
    ModelNotFound(ModelId),

    /// A stored reference points at a resource the store does not hold.
    #[error("resource not found: {0}")]
    ResourceNotFound(Fingerprint),

    /// Staged bytes do not match the fingerprint recorded at staging time.
    #[error("hash mismatch for slot {slot}: expected {expected}, computed {computed}")]
    HashMismatch {
        slot: String,
        expected: Fingerprint,
        computed: Fingerprint,
    },

    /// A tree references a child identity that has not been submitted.
    #[error("child slot {slot} references unknown model {id}")]
    DanglingChild { slot: String, id: ModelId },

    /// The same slot name appears twice in one tree.
    #[error("duplicate slot in model tree: {0}")]
    DuplicateSlot(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from staging or the storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
