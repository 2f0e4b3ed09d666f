use crate::fingerprint::Fingerprint;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a resource and a schema digest with identical bytes
/// never share a fingerprint.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for artefact resources.
    pub const RESOURCE: Self = Self {
        domain: "magpie-resource-v1",
    };
    /// Hasher for the artefact/child schema of a saved model.
    pub const SCHEMA: Self = Self {
        domain: "magpie-schema-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Fingerprint::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Fingerprint, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::RESOURCE.hash(b"hello world");
        let id2 = ContentHasher::RESOURCE.hash(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        assert_ne!(
            ContentHasher::RESOURCE.hash(data),
            ContentHasher::SCHEMA.hash(data)
        );
    }

    #[test]
    fn domain_hash_differs_from_raw_fingerprint() {
        let raw = Fingerprint::from_bytes(b"test");
        assert_ne!(raw, ContentHasher::RESOURCE.hash(b"test"));
    }

    #[test]
    fn hash_json_is_stable_for_equal_values() {
        let a = serde_json::json!({"slot": "weights", "size": 3});
        let b = serde_json::json!({"slot": "weights", "size": 3});
        assert_eq!(
            ContentHasher::SCHEMA.hash_json(&a).unwrap(),
            ContentHasher::SCHEMA.hash_json(&b).unwrap()
        );
    }
}
