use bytes::Bytes;

use magpie_types::Resource;

use crate::codec::{Codec, CodecError};

/// Opaque byte payload stored without interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Bytes);

impl Blob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

/// Stores a [`Blob`] byte for byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlobCodec;

impl Codec<Blob> for BlobCodec {
    fn name(&self) -> &str {
        "blob"
    }

    fn encode(&self, value: &Blob) -> Result<Resource, CodecError> {
        Ok(Resource::new(value.0.clone()))
    }

    fn decode(&self, resource: &Resource) -> Result<Blob, CodecError> {
        Ok(Blob(resource.bytes()))
    }
}
