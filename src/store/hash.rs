//! Content revisions for stored entities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of a stored entity's JSON, as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Revision of an already serialized value.
    pub fn of_json(json: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Revision(format!("{:x}", hasher.finalize()))
    }

    /// Revision of any serializable value.
    ///
    /// # Errors
    /// Returns an error if the value cannot be serialized to JSON.
    pub fn compute<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self::of_json(&json))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Revision {
    fn from(value: String) -> Self {
        Revision(value)
    }
}
