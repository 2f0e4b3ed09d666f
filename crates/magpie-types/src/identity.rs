use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::fingerprint::Fingerprint;

/// Source tag recorded with a saved model (e.g. a source revision).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provenance(String);

impl Provenance {
    const UNVERSIONED: &'static str = "unversioned";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag used when the caller supplies none.
    pub fn unversioned() -> Self {
        Self(Self::UNVERSIONED.to_string())
    }

    pub fn is_unversioned(&self) -> bool {
        self.0 == Self::UNVERSIONED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::unversioned()
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a saved model tree.
///
/// Composed of the display name, the fingerprint of the artefact/child
/// schema (including resource fingerprints and child identities), and the
/// provenance tag. Two structurally identical trees with identical payload
/// bytes produce the same `ModelId`.
///
/// The textual form is `name@<schema hex>` with `+provenance` appended when
/// the provenance is not the unversioned default.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId {
    name: String,
    schema_id: Fingerprint,
    provenance: Provenance,
}

impl ModelId {
    pub fn new(name: impl Into<String>, schema_id: Fingerprint, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            schema_id,
            provenance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_id(&self) -> &Fingerprint {
        &self.schema_id
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Short human-readable identifier: `name@<first 8 hex chars>`.
    pub fn short_id(&self) -> String {
        format!("{}@{}", self.name, self.schema_id.short_hex())
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelId({})", self.short_id())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.schema_id.to_hex())?;
        if !self.provenance.is_unversioned() {
            write!(f, "+{}", self.provenance)?;
        }
        Ok(())
    }
}

impl ModelId {
    const HEX_LEN: usize = 64;

    /// Splits `s` at the first `@` that is followed by a full schema hex
    /// and then either the end or `+`. Names and tags may themselves
    /// contain `@` and `+`.
    fn split_text(s: &str) -> Option<(&str, &str, Option<&str>)> {
        s.match_indices('@').find_map(|(at, _)| {
            let rest = &s[at + 1..];
            let hex = rest.get(..Self::HEX_LEN)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            match &rest[Self::HEX_LEN..] {
                "" => Some((&s[..at], hex, None)),
                tail => tail.strip_prefix('+').map(|tag| (&s[..at], hex, Some(tag))),
            }
        })
    }
}

impl FromStr for ModelId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, hex, tag) = match Self::split_text(s) {
            Some(parts) => parts,
            None => {
                // Not a well-formed id; parse the first candidate to report why.
                let (name, rest) = s
                    .split_once('@')
                    .ok_or_else(|| TypeError::InvalidModelId(format!("missing '@' in {s:?}")))?;
                let (hex, tag) = match rest.split_once('+') {
                    Some((hex, tag)) => (hex, Some(tag)),
                    None => (rest, None),
                };
                (name, hex, tag)
            }
        };
        if name.is_empty() {
            return Err(TypeError::InvalidModelId(format!("empty name in {s:?}")));
        }
        let provenance = tag.map_or_else(Provenance::unversioned, Provenance::new);
        Ok(Self::new(name, Fingerprint::from_hex(hex)?, provenance))
    }
}
