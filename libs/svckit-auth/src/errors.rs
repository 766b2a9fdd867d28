use http::StatusCode;
use thiserror::Error;

use crate::keys::KeyError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required: missing X-HMAC-HASH header")]
    MissingSignature,

    #[error("Invalid signature encoding: {0}")]
    MalformedSignature(#[from] base64::DecodeError),

    #[error("Request body could not be read: {0}")]
    Body(String),

    #[error("Forbidden: signature did not match any active key")]
    SignatureMismatch,

    #[error("Signing key unavailable: {0}")]
    Keys(#[from] KeyError),

    #[error("Computed signature is not a valid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

impl AuthError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingSignature | AuthError::SignatureMismatch => StatusCode::UNAUTHORIZED,
            AuthError::MalformedSignature(_) | AuthError::Body(_) => StatusCode::BAD_REQUEST,
            AuthError::Keys(_) | AuthError::HeaderValue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as the shared JSON error body for the given request id.
    #[cfg(feature = "axum-ext")]
    pub fn to_err_response(&self, request_id: impl Into<String>) -> svckit_errors::ErrResponse {
        use svckit_errors::ErrResponse;

        match self {
            AuthError::MissingSignature | AuthError::SignatureMismatch => {
                ErrResponse::forbidden(request_id)
            }
            AuthError::MalformedSignature(_) | AuthError::Body(_) => {
                ErrResponse::invalid_request(request_id)
            }
            AuthError::Keys(_) | AuthError::HeaderValue(_) => ErrResponse::internal(request_id),
        }
    }
}

#[cfg(feature = "axum-ext")]
impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        self.to_err_response(String::new()).into_response()
    }
}
