use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use svckit::http::XRequestId;
use svckit_auth::axum_ext::{HmacState, validate_hmac};
use svckit_errors::ErrResponse;
use svckit_registry::{Heartbeat, ServicePool, ServicePoolStatus};

#[derive(Clone)]
pub struct AppState {
    pub app_name: Arc<str>,
    pub release_version: Arc<str>,
    pub pool: Arc<ServicePool>,
}

/// `/heartbeat` is public; the pool routes require a valid `X-HMAC-HASH`.
#[must_use]
pub fn build_router(state: AppState, hmac: HmacState) -> Router {
    let pool_routes = Router::new()
        .route("/pool/status", get(pool_status))
        .route("/pool/next", get(next_peer))
        .layer(from_fn_with_state(hmac, validate_hmac));

    Router::new()
        .route("/heartbeat", get(heartbeat))
        .merge(pool_routes)
        .with_state(state)
}

fn request_id(ext: Option<Extension<XRequestId>>) -> String {
    ext.map(|Extension(XRequestId(id))| id).unwrap_or_default()
}

async fn heartbeat(
    State(state): State<AppState>,
    rid: Option<Extension<XRequestId>>,
) -> Json<Heartbeat> {
    Json(
        Heartbeat::new(request_id(rid), state.app_name.as_ref())
            .with_release(state.release_version.as_ref(), ""),
    )
}

async fn pool_status(
    State(state): State<AppState>,
    rid: Option<Extension<XRequestId>>,
) -> Json<ServicePoolStatus> {
    Json(ServicePoolStatus::from_pool(request_id(rid), &state.pool))
}

async fn next_peer(State(state): State<AppState>, rid: Option<Extension<XRequestId>>) -> Response {
    match state.pool.next_peer() {
        Some(service) => Json(service.snapshot()).into_response(),
        None => {
            let rid = request_id(rid);
            tracing::warn!(request_id = %rid, "no online backend in pool");
            ErrResponse::service_unavailable(rid).into_response()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use http_body_util::BodyExt;
    use svckit_auth::{HMAC_HEADER, HmacSigner, Key, KeySet, SigningInput};
    use svckit_registry::ServiceDescriptor;
    use time::macros::datetime;
    use tower::ServiceExt;

    const SECRET: &str = "supersecretkeyvalue";

    fn hmac_state() -> HmacState {
        HmacState::new(
            Arc::new(HmacSigner::default()),
            Arc::new(KeySet::new(
                "test",
                vec![Key::new(datetime!(2021-10-12 18:00:42 UTC), SECRET)],
            )),
        )
    }

    fn app(pool: ServicePool) -> Router {
        let state = AppState {
            app_name: Arc::from("gateway"),
            release_version: Arc::from("v3"),
            pool: Arc::new(pool),
        };
        build_router(state, hmac_state())
    }

    fn signed_get(uri: &str) -> Request<Body> {
        let digest = HmacSigner::default().sign_encoded(
            &SigningInput::new(&HeaderMap::new(), b"", None),
            SECRET.as_bytes(),
        );
        Request::builder()
            .uri(uri)
            .header(HMAC_HEADER, digest)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn heartbeat_is_public() {
        let response = app(ServicePool::new())
            .oneshot(Request::builder().uri("/heartbeat").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["appName"], "gateway");
        assert_eq!(body["releaseVersion"], "v3");
    }

    #[tokio::test]
    async fn pool_routes_require_signature() {
        let response = app(ServicePool::new())
            .oneshot(Request::builder().uri("/pool/next").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn next_peer_returns_online_service() {
        let pool = ServicePool::new();
        pool.add_service(ServiceDescriptor::new(1, "orders", "o.local"));
        pool.add_service(ServiceDescriptor::new(2, "billing", "b.local").with_online(true));

        let response = app(pool).oneshot(signed_get("/pool/next")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], 2);
        assert_eq!(body["service_online"], true);
    }

    #[tokio::test]
    async fn next_peer_without_online_service_is_503() {
        let pool = ServicePool::new();
        pool.add_service(ServiceDescriptor::new(1, "orders", "o.local"));

        let response = app(pool).oneshot(signed_get("/pool/next")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["code"], 503);
    }

    #[tokio::test]
    async fn pool_status_lists_services() {
        let pool = ServicePool::new();
        pool.add_service(ServiceDescriptor::new(1, "orders", "o.local").with_online(true));

        let response = app(pool).oneshot(signed_get("/pool/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["services"][0]["appName"], "orders");
        assert_eq!(body["services"][0]["message"], "up");
    }
}
