use serde::de::DeserializeOwned;
use serde::Serialize;

use magpie_types::Resource;

use crate::codec::{Codec, CodecError, CodecHandle};

/// Compact binary encoding for any serde type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BincodeCodec;

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        "bincode"
    }

    fn encode(&self, value: &T) -> Result<Resource, CodecError> {
        bincode::serialize(value)
            .map(Resource::new)
            .map_err(|e| CodecError::failed("bincode", e))
    }

    fn decode(&self, resource: &Resource) -> Result<T, CodecError> {
        bincode::deserialize(resource.as_bytes()).map_err(|e| CodecError::failed("bincode", e))
    }
}

/// Human-readable JSON encoding for any serde type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &T) -> Result<Resource, CodecError> {
        serde_json::to_vec(value)
            .map(Resource::new)
            .map_err(|e| CodecError::failed("json", e))
    }

    fn decode(&self, resource: &Resource) -> Result<T, CodecError> {
        serde_json::from_slice(resource.as_bytes()).map_err(|e| CodecError::failed("json", e))
    }
}

impl CodecHandle {
    /// [`BincodeCodec`] for payload type `T`.
    pub fn bincode<T: Serialize + DeserializeOwned + 'static>() -> Self {
        Self::new::<T>(BincodeCodec)
    }

    /// [`JsonCodec`] for payload type `T`.
    pub fn json<T: Serialize + DeserializeOwned + 'static>() -> Self {
        Self::new::<T>(JsonCodec)
    }
}
