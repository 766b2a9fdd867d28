use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::{HeaderName, HeaderValue};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::error::ConfigError;

/// Request id as seen by handlers: `Extension(XRequestId(id))`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XRequestId(pub String);

/// Generates a fresh nanoid for requests that arrive without an id.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Parse the configured request id header name.
///
/// # Errors
/// Returns [`ConfigError::RequestIdHeader`] if `name` is not a header name.
pub fn request_id_header(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.trim().as_bytes()).map_err(|source| {
        ConfigError::RequestIdHeader {
            name: name.to_owned(),
            source,
        }
    })
}

/// Copy the id assigned by `SetRequestIdLayer` into the extensions and the
/// current span's `request_id` field.
pub async fn push_req_id_to_extensions(mut request: Request, next: Next) -> Response {
    let id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .map(str::to_owned);

    if let Some(id) = id {
        tracing::Span::current().record("request_id", id.as_str());
        request.extensions_mut().insert(XRequestId(id));
    }

    next.run(request).await
}
