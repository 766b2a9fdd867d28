use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Custom serializer for `StatusCode` to u16
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// JSON error body returned by svckit middleware and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct ErrResponse {
    /// Correlation id of the failed request (empty when unknown).
    #[serde(rename = "requestId")]
    pub request_id: String,
    /// HTTP status code, serialized as a number.
    #[serde(
        rename = "code",
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: StatusCode,
    /// Short human-readable status text.
    #[serde(rename = "status")]
    pub status_text: String,
}

impl ErrResponse {
    pub fn generic(
        request_id: impl Into<String>,
        status_code: StatusCode,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status_code,
            status_text: status_text.into(),
        }
    }

    /// Successful completion; used by endpoints that only acknowledge.
    pub fn no_err(request_id: impl Into<String>) -> Self {
        Self::generic(request_id, StatusCode::OK, "complete")
    }

    pub fn conflict(request_id: impl Into<String>) -> Self {
        Self::generic(request_id, StatusCode::CONFLICT, "conflict")
    }

    /// Authentication failure: 401 with status text `forbidden`.
    pub fn forbidden(request_id: impl Into<String>) -> Self {
        Self::generic(request_id, StatusCode::UNAUTHORIZED, "forbidden")
    }

    pub fn invalid_request(request_id: impl Into<String>) -> Self {
        Self::generic(request_id, StatusCode::BAD_REQUEST, "invalid request")
    }

    pub fn internal(request_id: impl Into<String>) -> Self {
        Self::generic(request_id, StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    pub fn service_unavailable(request_id: impl Into<String>) -> Self {
        Self::generic(
            request_id,
            StatusCode::SERVICE_UNAVAILABLE,
            "no backend available",
        )
    }

    /// The handler produced a value that could not be rendered.
    pub fn render(request_id: impl Into<String>) -> Self {
        Self::generic(
            request_id,
            StatusCode::UNPROCESSABLE_ENTITY,
            "error rendering response",
        )
    }
}

/// Axum integration: make `ErrResponse` directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrResponse {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code;
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp
    }
}
