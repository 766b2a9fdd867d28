//! Named sets of rotating HMAC keys.
//!
//! The JSON form matches the `HMAC_SECRETS` setting:
//!
//! ```json
//! {"name": "gateway keys", "keys": [
//!     {"created": "2021-10-12T18:00:42Z", "value": "supersecretkeyvalue"},
//!     {"created": "2020-10-13T18:00:42Z", "value": "anothersupersecretvalue"}
//! ]}
//! ```

use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::secret::SecretString;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key set is empty")]
    EmptyKeySet,

    #[error("key #{index} in set '{name}' has an empty secret")]
    EmptySecret { name: String, index: usize },

    #[error("invalid key set json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single secret with its creation time. Immutable once built.
#[derive(Debug, Clone, Deserialize)]
pub struct Key {
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub value: SecretString,
}

impl Key {
    #[must_use]
    pub fn new(created: OffsetDateTime, value: impl Into<String>) -> Self {
        Self {
            created,
            value: SecretString::new(value),
        }
    }
}

/// Named, insertion-ordered collection of keys.
///
/// Values are not deduplicated. The stored order is never changed; "latest"
/// lookups scan instead of sorting in place.
#[derive(Debug, Clone, Deserialize)]
pub struct KeySet {
    pub name: String,
    #[serde(default)]
    keys: Vec<Key>,
}

impl KeySet {
    #[must_use]
    pub fn new(name: impl Into<String>, keys: Vec<Key>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }

    /// Parse a key set from its JSON form.
    ///
    /// # Errors
    /// Returns [`KeyError::Parse`] if the document is not valid key-set JSON
    /// (including timestamps that are not RFC 3339).
    pub fn from_json(raw: &str) -> Result<Self, KeyError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The key with the greatest `created` timestamp.
    ///
    /// When several keys share the greatest timestamp the one inserted first
    /// wins.
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyKeySet`] if the set holds no keys.
    pub fn latest_key(&self) -> Result<&Key, KeyError> {
        self.keys
            .iter()
            .reduce(|latest, key| {
                if key.created > latest.created {
                    key
                } else {
                    latest
                }
            })
            .ok_or(KeyError::EmptyKeySet)
    }

    /// All keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reject sets that cannot be used for signing: no keys, or a key whose
    /// secret is empty.
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyKeySet`] or [`KeyError::EmptySecret`].
    pub fn validate(&self) -> Result<(), KeyError> {
        if self.keys.is_empty() {
            return Err(KeyError::EmptyKeySet);
        }
        if let Some(index) = self.keys.iter().position(|k| k.value.is_empty()) {
            return Err(KeyError::EmptySecret {
                name: self.name.clone(),
                index,
            });
        }
        Ok(())
    }
}
