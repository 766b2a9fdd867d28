use thiserror::Error;

use crate::keys::KeyError;

/// Errors that can occur while building the HMAC configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid header name '{name}' in HMAC header list: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },

    #[error("error loading hmac secret json obj: {0}")]
    Keys(#[from] KeyError),
}
