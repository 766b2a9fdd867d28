use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ProbeError;

/// Name of the route key that points at a service's health endpoint.
pub const HEALTH_ROUTE: &str = "health";

/// A backend service known to the pool or announced to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub id: i64,
    pub service_name: String,
    #[serde(default)]
    pub service_summary: String,
    #[serde(default)]
    pub service_online: bool,
    #[serde(default = "default_protocol")]
    pub service_protocol: String,
    #[serde(default)]
    pub service_version: String,
    /// Host, optionally with port, e.g. `orders.internal:8080`.
    pub base_url: String,
    /// Route name to path, e.g. `{"health": "/health"}`. A JSON-encoded
    /// string holding such an object is accepted too.
    #[serde(default)]
    pub routes: Value,
}

fn default_protocol() -> String {
    "http".to_owned()
}

impl ServiceDescriptor {
    #[must_use]
    pub fn new(id: i64, service_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id,
            service_name: service_name.into(),
            service_summary: String::new(),
            service_online: false,
            service_protocol: default_protocol(),
            service_version: String::new(),
            base_url: base_url.into(),
            routes: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: Value) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn with_online(mut self, online: bool) -> Self {
        self.service_online = online;
        self
    }

    /// Decode `routes` into a name to path map.
    ///
    /// # Errors
    /// Returns [`ProbeError::MalformedRoutes`] when the routes are not an
    /// object of strings.
    pub fn route_map(&self) -> Result<BTreeMap<String, String>, ProbeError> {
        match &self.routes {
            Value::Null => Ok(BTreeMap::new()),
            Value::String(raw) => serde_json::from_str(raw),
            other => BTreeMap::<String, String>::deserialize(other),
        }
        .map_err(ProbeError::MalformedRoutes)
    }

    /// `{protocol}://{base_url}/{version}{health route}`
    ///
    /// # Errors
    /// [`ProbeError::MissingHealthRoute`] when no `health` route is declared,
    /// [`ProbeError::MalformedRoutes`] or [`ProbeError::InvalidUrl`] when the
    /// descriptor cannot produce a URL.
    pub fn health_url(&self) -> Result<Url, ProbeError> {
        let routes = self.route_map()?;
        let route = routes
            .get(HEALTH_ROUTE)
            .ok_or(ProbeError::MissingHealthRoute)?;
        let raw = format!(
            "{}://{}/{}{}",
            self.service_protocol, self.base_url, self.service_version, route
        );
        Url::parse(&raw).map_err(|source| ProbeError::InvalidUrl { url: raw, source })
    }

    /// Payload posted to the gateway when this service registers itself.
    #[must_use]
    pub fn registration_request(&self) -> RegistrationRequest<'_> {
        RegistrationRequest {
            service_name: &self.service_name,
            service_summary: &self.service_summary,
            service_online: self.service_online,
            service_protocol: &self.service_protocol,
            service_version: &self.service_version,
            base_url: &self.base_url,
            routes: &self.routes,
        }
    }
}

/// Registration wire body. The gateway assigns ids, so none is sent.
#[derive(Debug, Serialize)]
pub struct RegistrationRequest<'a> {
    pub service_name: &'a str,
    pub service_summary: &'a str,
    pub service_online: bool,
    pub service_protocol: &'a str,
    pub service_version: &'a str,
    pub base_url: &'a str,
    pub routes: &'a Value,
}
