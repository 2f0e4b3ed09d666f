use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::OnceLock;

use bytes::Bytes;

use crate::fingerprint::Fingerprint;
use crate::hasher::ContentHasher;

/// An encoded artefact: immutable bytes plus a content fingerprint.
///
/// The fingerprint is computed on first use and cached. Equality and hashing
/// go through the fingerprint, so two resources with identical bytes are
/// interchangeable as cache keys.
#[derive(Clone)]
pub struct Resource {
    bytes: Bytes,
    fingerprint: OnceLock<Fingerprint>,
}

impl Resource {
    /// Wrap a byte buffer.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            fingerprint: OnceLock::new(),
        }
    }

    /// Read a resource back from a file written by a staging area.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Consume the resource and return its buffer.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Number of encoded bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the resource holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content fingerprint, computed lazily.
    pub fn fingerprint(&self) -> Fingerprint {
        *self
            .fingerprint
            .get_or_init(|| ContentHasher::RESOURCE.hash(&self.bytes))
    }

    /// Returns `true` once the fingerprint has been computed.
    pub fn is_fingerprinted(&self) -> bool {
        self.fingerprint.get().is_some()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.len() == other.bytes.len() && self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint().hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint.get())
            .finish()
    }
}

impl From<Vec<u8>> for Resource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&'static [u8]> for Resource {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(bytes)
    }
}
