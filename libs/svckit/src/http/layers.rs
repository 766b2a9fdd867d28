use axum::Router;
use axum::middleware::from_fn;
use http::header::{AUTHORIZATION, CONTENT_TYPE, STRICT_TRANSPORT_SECURITY, X_FRAME_OPTIONS};
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::MicroConfig;
use crate::error::ConfigError;
use crate::http::request_id::{MakeReqId, push_req_id_to_extensions, request_id_header};

pub const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Any origin, `GET`/`POST`, `Content-Type` and `Authorization`.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Add `X-Frame-Options: DENY` and HSTS to every response that does not
/// already carry them.
#[must_use]
pub fn default_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ))
}

/// Wrap `router` in the standard service middleware.
///
/// Runtime order, outermost first:
/// `SetRequestId` → `PropagateRequestId` → Trace → `push_req_id_to_extensions`
/// → default headers → CORS → router.
///
/// # Errors
/// Returns [`ConfigError::RequestIdHeader`] if `REQ_ID_HEADER` is not a valid
/// header name.
pub fn apply_middleware_stack(router: Router, config: &MicroConfig) -> Result<Router, ConfigError> {
    let req_id_header = request_id_header(&config.req_id_header)?;

    // registered innermost first
    let mut router = router.layer(cors_layer());
    router = default_headers(router);
    router = router.layer(from_fn(push_req_id_to_extensions));
    router = router.layer(TraceLayer::new_for_http().make_span_with(
        |request: &http::Request<axum::body::Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        },
    ));
    router = router.layer(PropagateRequestIdLayer::new(req_id_header.clone()));
    router = router.layer(SetRequestIdLayer::new(req_id_header, MakeReqId));

    Ok(router)
}
