use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or applying [`MicroConfig`](crate::MicroConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("error parsing routes json: {0}")]
    Routes(#[source] serde_json::Error),

    #[error("error parsing service pool json: {0}")]
    Pool(#[source] serde_json::Error),

    #[error(transparent)]
    Hmac(#[from] svckit_auth::ConfigError),

    #[error("invalid request id header '{name}': {source}")]
    RequestIdHeader {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },

    #[error("GATEWAY_URL is not set")]
    MissingGatewayUrl,

    #[error(transparent)]
    Registration(#[from] svckit_registry::RegistrationError),
}
