//! Announces a service to the API gateway with a signed POST.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use svckit_auth::{HMAC_HEADER, HmacSigner, KeySet, SigningInput};

use crate::descriptor::ServiceDescriptor;
use crate::error::RegistrationError;

/// Default bound on one registration round trip.
pub const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on how much of a failed response body is kept for the error.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Gateway answered 200.
    Registered,
    /// Gateway answered 409; the service was already known.
    AlreadyRegistered,
}

/// Single-shot signed registration client.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client<HttpConnector, Full<Bytes>>,
    signer: Arc<HmacSigner>,
    keys: Arc<KeySet>,
    timeout: Duration,
}

impl GatewayClient {
    #[must_use]
    pub fn new(signer: Arc<HmacSigner>, keys: Arc<KeySet>, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            signer,
            keys,
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the descriptor to `gateway_url`, signed with the latest key.
    ///
    /// One attempt, bounded by the client timeout. `409 Conflict` counts as
    /// success.
    ///
    /// # Errors
    /// - [`RegistrationError::InvalidUrl`] if `gateway_url` is not an absolute http URL
    /// - [`RegistrationError::Signing`] if the key set is empty
    /// - [`RegistrationError::Transport`] / [`RegistrationError::Timeout`] on network failure
    /// - [`RegistrationError::Status`] for any answer other than 200 or 409
    pub async fn register(
        &self,
        descriptor: &ServiceDescriptor,
        gateway_url: &str,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let uri = parse_gateway_url(gateway_url)?;
        let body = Bytes::from(serde_json::to_vec(&descriptor.registration_request())?);

        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(body.clone()))
            .map_err(|e| RegistrationError::InvalidUrl {
                url: gateway_url.to_owned(),
                reason: e.to_string(),
            })?;

        let digest = self.signer.sign_with_latest(
            &SigningInput::new(request.headers(), &body, request.uri().query()),
            &self.keys,
        )?;
        let digest = HeaderValue::from_str(&digest)
            .map_err(|e| RegistrationError::Transport(Box::new(e)))?;
        request.headers_mut().insert(HMAC_HEADER, digest);

        tracing::debug!(
            service = %descriptor.service_name,
            gateway = %gateway_url,
            "registering service at gateway"
        );

        let (status, preview) = tokio::time::timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| RegistrationError::Timeout(self.timeout))??;

        match status {
            StatusCode::OK => {
                tracing::info!(service = %descriptor.service_name, "service registered");
                Ok(RegistrationOutcome::Registered)
            }
            StatusCode::CONFLICT => {
                tracing::info!(service = %descriptor.service_name, "service already registered");
                Ok(RegistrationOutcome::AlreadyRegistered)
            }
            status => Err(RegistrationError::Status {
                status,
                body_preview: preview,
            }),
        }
    }

    async fn send(
        &self,
        request: http::Request<Full<Bytes>>,
    ) -> Result<(StatusCode, String), RegistrationError> {
        let response = self.client.request(request).await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CONFLICT {
            return Ok((status, String::new()));
        }

        let preview = match Limited::new(response.into_body(), ERROR_BODY_PREVIEW_LIMIT)
            .collect()
            .await
        {
            Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                "<body too large for preview>".to_owned()
            }
            Err(e) => return Err(RegistrationError::Transport(e)),
        };
        Ok((status, preview))
    }
}

fn parse_gateway_url(raw: &str) -> Result<Uri, RegistrationError> {
    let invalid = |reason: &str| RegistrationError::InvalidUrl {
        url: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let uri: Uri = raw.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}
