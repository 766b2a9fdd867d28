use std::sync::Arc;

use http::header::HeaderName;

use crate::config_error::ConfigError;
use crate::keys::KeySet;
use crate::signer::HmacSigner;

/// Validated HMAC settings: the signed header list and the active key set.
#[derive(Debug, Clone)]
pub struct HmacConfig {
    pub headers: Vec<HeaderName>,
    pub keys: KeySet,
}

impl HmacConfig {
    /// Build from an already parsed key set.
    ///
    /// # Errors
    /// Returns [`ConfigError::Keys`] if the key set is empty or holds an
    /// empty secret.
    pub fn new(headers: Vec<HeaderName>, keys: KeySet) -> Result<Self, ConfigError> {
        keys.validate()?;
        Ok(Self { headers, keys })
    }

    /// Build from the raw `HMAC_HEADERS` list and `HMAC_SECRETS` JSON.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidHeaderName`] for a bad header entry and
    /// [`ConfigError::Keys`] for malformed or unusable key-set JSON.
    pub fn from_raw(headers: &str, secrets: &str) -> Result<Self, ConfigError> {
        let headers = parse_header_list(headers)?;
        let keys = KeySet::from_json(secrets)?;
        Self::new(headers, keys)
    }

    #[must_use]
    pub fn signer(&self) -> HmacSigner {
        HmacSigner::new(self.headers.clone())
    }

    /// Split into the shareable signer and key set.
    #[must_use]
    pub fn into_shared(self) -> (Arc<HmacSigner>, Arc<KeySet>) {
        (Arc::new(HmacSigner::new(self.headers)), Arc::new(self.keys))
    }
}

/// Parse a comma-separated header list such as `"Content-Type, X-Client-Id"`.
///
/// Entries are trimmed and empty entries dropped, so `""` yields an empty
/// list (body and query are still signed).
///
/// # Errors
/// Returns [`ConfigError::InvalidHeaderName`] if an entry is not a valid
/// HTTP header name.
pub fn parse_header_list(raw: &str) -> Result<Vec<HeaderName>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                ConfigError::InvalidHeaderName {
                    name: name.to_owned(),
                    source,
                }
            })
        })
        .collect()
}
