use std::time::Duration;

use thiserror::Error;

/// Why a pooled service was marked offline by a health probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no health route")]
    MissingHealthRoute,

    #[error("routes are not a JSON object of strings: {0}")]
    MalformedRoutes(#[source] serde_json::Error),

    #[error("invalid health url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("health url '{0}' has no host or port")]
    MissingAuthority(String),

    #[error("connect to {addr} failed: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
}

/// Gateway registration failures.
///
/// A `409 Conflict` answer is not an error, see
/// [`RegistrationOutcome::AlreadyRegistered`](crate::RegistrationOutcome).
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("error serializing service descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid gateway url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("error signing registration request: {0}")]
    Signing(#[from] svckit_auth::KeyError),

    #[error("error registering service: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("error registering service: gateway did not answer within {0:?}")]
    Timeout(Duration),

    #[error("error registering service. Status: {status} | body: {body_preview}")]
    Status {
        status: http::StatusCode,
        body_preview: String,
    },
}

impl From<hyper_util::client::legacy::Error> for RegistrationError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        RegistrationError::Transport(Box::new(err))
    }
}

impl From<hyper::Error> for RegistrationError {
    fn from(err: hyper::Error) -> Self {
        RegistrationError::Transport(Box::new(err))
    }
}
