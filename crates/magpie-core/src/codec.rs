use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use magpie_types::Resource;

/// Boxed error returned by codec implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from encoding or decoding an artefact.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value handed to an erased codec is not its payload type.
    #[error("codec {codec} expects a value of type {expected}")]
    TypeMismatch {
        codec: String,
        expected: &'static str,
    },

    /// The codec itself failed. The source is passed through untouched.
    #[error("codec {codec} failed: {source}")]
    Failed {
        codec: String,
        #[source]
        source: BoxError,
    },
}

impl CodecError {
    pub fn failed(codec: &str, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            codec: codec.to_string(),
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encode/decode capability for one payload type.
///
/// `decode_into` receives the value currently held by the slot so a codec
/// can overwrite it in place instead of allocating a replacement. The
/// default implementation replaces it with a fresh [`decode`].
///
/// [`decode`]: Codec::decode
pub trait Codec<T: 'static>: Send + Sync + 'static {
    /// Stable name, used for equality and conflict detection.
    fn name(&self) -> &str;

    fn encode(&self, value: &T) -> Result<Resource, CodecError>;

    fn decode(&self, resource: &Resource) -> Result<T, CodecError>;

    fn decode_into(&self, existing: &mut T, resource: &Resource) -> Result<(), CodecError> {
        *existing = self.decode(resource)?;
        Ok(())
    }
}

/// A codec with its payload type erased.
pub trait ErasedCodec: Send + Sync {
    fn name(&self) -> &str;
    fn payload_type(&self) -> TypeId;
    fn payload_type_name(&self) -> &'static str;
    fn encode(&self, value: &dyn Any) -> Result<Resource, CodecError>;
    fn decode(&self, resource: &Resource) -> Result<Box<dyn Any>, CodecError>;
    fn decode_into(&self, existing: &mut dyn Any, resource: &Resource) -> Result<(), CodecError>;
}

struct Typed<T, C> {
    codec: C,
    _payload: PhantomData<fn() -> T>,
}

impl<T: 'static, C: Codec<T>> Typed<T, C> {
    fn mismatch(&self) -> CodecError {
        CodecError::TypeMismatch {
            codec: self.codec.name().to_string(),
            expected: std::any::type_name::<T>(),
        }
    }
}

impl<T: 'static, C: Codec<T>> ErasedCodec for Typed<T, C> {
    fn name(&self) -> &str {
        self.codec.name()
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn encode(&self, value: &dyn Any) -> Result<Resource, CodecError> {
        let value = value.downcast_ref::<T>().ok_or_else(|| self.mismatch())?;
        self.codec.encode(value)
    }

    fn decode(&self, resource: &Resource) -> Result<Box<dyn Any>, CodecError> {
        Ok(Box::new(self.codec.decode(resource)?))
    }

    fn decode_into(&self, existing: &mut dyn Any, resource: &Resource) -> Result<(), CodecError> {
        let existing = existing
            .downcast_mut::<T>()
            .ok_or_else(|| self.mismatch())?;
        self.codec.decode_into(existing, resource)
    }
}

// ---------------------------------------------------------------------------
// CodecHandle
// ---------------------------------------------------------------------------

/// Shared handle to a type-erased codec.
///
/// Two handles are equal when they have the same codec name and payload
/// type, which is what makes repeated attachments of the same codec
/// collapse into one declaration.
#[derive(Clone)]
pub struct CodecHandle(Arc<dyn ErasedCodec>);

impl CodecHandle {
    pub fn new<T: 'static>(codec: impl Codec<T>) -> Self {
        Self(Arc::new(Typed {
            codec,
            _payload: PhantomData,
        }))
    }

    /// `name:payload` label used in logs, conflicts and traces.
    pub fn label(&self) -> String {
        format!("{}:{}", self.0.name(), self.0.payload_type_name())
    }

    /// Returns `true` if `value` is this codec's payload type.
    pub fn accepts(&self, value: &dyn Any) -> bool {
        value.type_id() == self.0.payload_type()
    }
}

impl std::ops::Deref for CodecHandle {
    type Target = dyn ErasedCodec;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for CodecHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name() && self.0.payload_type() == other.0.payload_type()
    }
}

impl Eq for CodecHandle {}

impl fmt::Debug for CodecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodecHandle({})", self.label())
    }
}
