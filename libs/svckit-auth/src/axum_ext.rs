//! Axum middleware for HMAC signing and validation

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tower_http::request_id::RequestId;

use crate::{
    config::HmacConfig,
    errors::AuthError,
    keys::KeySet,
    signer::{HMAC_HEADER, HmacSigner, SigningInput},
};

/// Largest request body the middleware will buffer for signing (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct HmacState {
    signer: Arc<HmacSigner>,
    keys: Arc<KeySet>,
    body_limit: usize,
}

impl HmacState {
    #[must_use]
    pub fn new(signer: Arc<HmacSigner>, keys: Arc<KeySet>) -> Self {
        Self {
            signer,
            keys,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    #[must_use]
    pub fn from_config(config: HmacConfig) -> Self {
        let (signer, keys) = config.into_shared();
        Self::new(signer, keys)
    }

    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    #[must_use]
    pub fn signer(&self) -> &HmacSigner {
        &self.signer
    }

    #[must_use]
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }
}

/// Read the whole body and hand back an equivalent request.
///
/// The returned request carries a body rebuilt from the same bytes, so
/// downstream handlers see exactly what was signed.
///
/// # Errors
/// Returns [`AuthError::Body`] if the body cannot be read or exceeds `limit`.
pub async fn buffer_request(request: Request, limit: usize) -> Result<(Request, Bytes), AuthError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AuthError::Body(e.to_string()))?;
    Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes))
}

/// Signs the inbound request with the latest key and stores the digest in
/// `X-HMAC-HASH` before calling the next handler.
///
/// Typically placed in front of a proxy handler that forwards the request
/// (see `copy_headers`) to a backend expecting signed calls.
pub async fn sign_request(
    State(state): State<HmacState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request_id_of(&request);
    tracing::debug!(request_id = %request_id, "creating hmac hash");

    match sign_inbound(&state, request).await {
        Ok(request) => {
            tracing::debug!(request_id = %request_id, "hmac added to header");
            next.run(request).await
        }
        Err(err) => {
            tracing::error!(request_id = %request_id, error = %err, "failed to sign request");
            err.to_err_response(request_id).into_response()
        }
    }
}

/// Rejects requests whose `X-HMAC-HASH` does not match any active key.
///
/// - missing header: 401
/// - header not valid base64, body unreadable: 400
/// - no key reproduces the digest: 401
pub async fn validate_hmac(
    State(state): State<HmacState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request_id_of(&request);
    tracing::debug!(request_id = %request_id, "validating hmac");

    match verify_inbound(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => {
            match &err {
                AuthError::SignatureMismatch | AuthError::MissingSignature => {
                    tracing::info!(request_id = %request_id, error = %err, "forbidden request");
                }
                _ => {
                    tracing::warn!(request_id = %request_id, error = %err, "invalid signed request");
                }
            }
            err.to_err_response(request_id).into_response()
        }
    }
}

async fn sign_inbound(state: &HmacState, request: Request) -> Result<Request, AuthError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|e| AuthError::Body(e.to_string()))?;

    let digest = state
        .signer
        .sign_with_latest(&SigningInput::from_parts(&parts, &body), &state.keys)?;

    let mut parts = parts;
    parts
        .headers
        .append(HMAC_HEADER, HeaderValue::from_str(&digest)?);
    Ok(Request::from_parts(parts, Body::from(body)))
}

async fn verify_inbound(state: &HmacState, request: Request) -> Result<Request, AuthError> {
    let (parts, body) = request.into_parts();

    let presented = parts
        .headers
        .get(&HMAC_HEADER)
        .ok_or(AuthError::MissingSignature)?;
    let presented = BASE64.decode(presented.as_bytes())?;

    let body = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|e| AuthError::Body(e.to_string()))?;

    let input = SigningInput::from_parts(&parts, &body);
    if !state.signer.verify(&input, &state.keys, &presented) {
        return Err(AuthError::SignatureMismatch);
    }

    Ok(Request::from_parts(parts, Body::from(body)))
}

/// Request id set by `SetRequestIdLayer`, or empty when the layer is absent.
fn request_id_of(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or_default()
        .to_owned()
}
