//! Service configuration.
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. optional YAML file
//! 3. the whitelisted process environment variables in [`ENV_VARS`]
//!
//! JSON-valued settings (`SERVICE_ROUTES`, `HMAC_SECRETS`, `SERVICE_POOL`)
//! may be given either as a JSON string or as structured YAML.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use http::HeaderName;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use svckit_auth::{HmacConfig, HmacSigner, KeySet, parse_header_list};
use svckit_registry::{GatewayClient, RegistrationOutcome, ServiceDescriptor};

use crate::error::ConfigError;

/// Environment variables read into [`MicroConfig`], each mapping to the
/// field of the same name in lower case.
pub const ENV_VARS: &[&str] = &[
    "SERVICE_NAME",
    "SERVICE_SUMMARY",
    "SERVICE_PROTOCOL",
    "SERVICE_VERSION",
    "SERVICE_BASE_URL",
    "SERVICE_ROUTES",
    "GATEWAY_URL",
    "LOG_LEVEL",
    "HMAC_HEADERS",
    "HMAC_SECRETS",
    "REQ_ID_HEADER",
    "REGISTER_TIMEOUT_SECS",
    "HEALTH_CHECK_INTERVAL_SECS",
    "HEALTH_PROBE_TIMEOUT_SECS",
    "BIND_ADDR",
    "SERVICE_POOL",
];

pub const DEFAULT_REQ_ID_HEADER: &str = "X-SERVICE-REQUESTID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub service_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub service_summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub service_protocol: String,
    #[serde(deserialize_with = "lenient_string")]
    pub service_version: String,
    #[serde(deserialize_with = "lenient_string")]
    pub service_base_url: String,
    /// Route map announced to the gateway, e.g. `{"health": "/health"}`.
    pub service_routes: Value,
    pub gateway_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub log_level: String,
    /// Comma-separated header names covered by the HMAC digest.
    #[serde(deserialize_with = "lenient_string")]
    pub hmac_headers: String,
    /// Key-set document `{"name": .., "keys": [{"created": .., "value": ..}]}`.
    pub hmac_secrets: Value,
    #[serde(deserialize_with = "lenient_string")]
    pub req_id_header: String,
    pub register_timeout_secs: u64,
    pub health_check_interval_secs: u64,
    pub health_probe_timeout_secs: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub bind_addr: String,
    /// Backends to balance over: a JSON array of service descriptors.
    pub service_pool: Value,
    /// Free-form runtime variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_vars: BTreeMap<String, Value>,
}

impl Default for MicroConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            service_summary: String::new(),
            service_protocol: "http".to_owned(),
            service_version: String::new(),
            service_base_url: String::new(),
            service_routes: Value::Null,
            gateway_url: None,
            log_level: "info".to_owned(),
            hmac_headers: String::new(),
            hmac_secrets: Value::Null,
            req_id_header: DEFAULT_REQ_ID_HEADER.to_owned(),
            register_timeout_secs: 10,
            health_check_interval_secs: 30,
            health_probe_timeout_secs: 5,
            bind_addr: "0.0.0.0:8080".to_owned(),
            service_pool: Value::Null,
            runtime_vars: BTreeMap::new(),
        }
    }
}

impl MicroConfig {
    /// Defaults overlaid with the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when a variable cannot be converted to
    /// its field type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layered(None)
    }

    /// Defaults, then `path` (YAML) when given, then the environment.
    ///
    /// # Errors
    /// [`ConfigError::MissingFile`] if `path` does not exist,
    /// [`ConfigError::Load`] for unreadable YAML or mistyped values.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::raw().only(ENV_VARS));

        let config: Self = figment.extract().map_err(Box::new)?;
        tracing::debug!(service = %config.service_name, "configuration loaded");
        Ok(config)
    }

    #[must_use]
    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.register_timeout_secs)
    }

    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    #[must_use]
    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health_probe_timeout_secs)
    }

    /// # Errors
    /// Returns [`ConfigError::Hmac`] for an entry that is not a header name.
    pub fn hmac_headers(&self) -> Result<Vec<HeaderName>, ConfigError> {
        Ok(parse_header_list(&self.hmac_headers)?)
    }

    /// Parsed and validated HMAC key set.
    ///
    /// # Errors
    /// Returns [`ConfigError::Hmac`] when the document is missing, malformed,
    /// empty or holds an empty secret.
    pub fn key_set(&self) -> Result<KeySet, ConfigError> {
        let keys: KeySet = json_setting(&self.hmac_secrets)
            .map_err(|e| svckit_auth::ConfigError::Keys(e.into()))?;
        keys.validate()
            .map_err(svckit_auth::ConfigError::Keys)?;
        Ok(keys)
    }

    /// # Errors
    /// Same as [`MicroConfig::hmac_headers`] and [`MicroConfig::key_set`].
    pub fn hmac_config(&self) -> Result<HmacConfig, ConfigError> {
        Ok(HmacConfig::new(self.hmac_headers()?, self.key_set()?)?)
    }

    /// Route map as a JSON object.
    ///
    /// # Errors
    /// Returns [`ConfigError::Routes`] unless the setting is a JSON object.
    pub fn routes(&self) -> Result<serde_json::Map<String, Value>, ConfigError> {
        json_setting(&self.service_routes).map_err(ConfigError::Routes)
    }

    /// Backends listed in `SERVICE_POOL`; an unset pool is empty.
    ///
    /// # Errors
    /// Returns [`ConfigError::Pool`] when the setting is not an array of
    /// service descriptors.
    pub fn pool_descriptors(&self) -> Result<Vec<ServiceDescriptor>, ConfigError> {
        if self.service_pool.is_null() {
            return Ok(Vec::new());
        }
        json_setting(&self.service_pool).map_err(ConfigError::Pool)
    }

    /// Descriptor announcing this service, marked online.
    ///
    /// # Errors
    /// Returns [`ConfigError::Routes`] when the route map does not parse.
    pub fn service_descriptor(&self) -> Result<ServiceDescriptor, ConfigError> {
        let routes = self.routes()?;
        let mut descriptor =
            ServiceDescriptor::new(0, self.service_name.clone(), self.service_base_url.clone())
                .with_version(self.service_version.clone())
                .with_routes(Value::Object(routes))
                .with_online(true);
        descriptor.service_summary.clone_from(&self.service_summary);
        descriptor.service_protocol.clone_from(&self.service_protocol);
        Ok(descriptor)
    }

    /// Announce this service at `GATEWAY_URL`.
    ///
    /// # Errors
    /// - [`ConfigError::MissingGatewayUrl`] when no gateway is configured
    /// - [`ConfigError::Routes`] / [`ConfigError::Hmac`] for bad settings
    /// - [`ConfigError::Registration`] when the gateway rejects the call
    pub async fn register_at_gateway(&self) -> Result<RegistrationOutcome, ConfigError> {
        tracing::info!("registering service...");
        let gateway_url = self
            .gateway_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingGatewayUrl)?;

        let descriptor = self.service_descriptor()?;
        let client = GatewayClient::new(
            Arc::new(HmacSigner::new(self.hmac_headers()?)),
            Arc::new(self.key_set()?),
            self.register_timeout(),
        );

        let outcome = client.register(&descriptor, gateway_url).await?;
        tracing::info!(gateway = %gateway_url, ?outcome, "register complete");
        Ok(outcome)
    }

    /// Store a runtime variable, replacing any previous value.
    pub fn add_rv(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.runtime_vars.insert(key.into(), value.into());
    }

    /// Store the value of environment variable `name`, or `""` when unset.
    pub fn add_rv_from_env(&mut self, name: &str) {
        let value = std::env::var(name).unwrap_or_default();
        self.runtime_vars.insert(name.to_owned(), Value::String(value));
    }

    /// [`MicroConfig::add_rv_from_env`] for each name.
    pub fn load_rv<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add_rv_from_env(name.as_ref());
        }
    }

    #[must_use]
    pub fn rv(&self, key: &str) -> Option<&Value> {
        self.runtime_vars.get(key)
    }

    /// Effective configuration with secrets redacted.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut shown = self.clone();
        if !shown.hmac_secrets.is_null() {
            shown.hmac_secrets = Value::String("***".to_owned());
        }
        serde_json::to_string_pretty(&shown)
    }
}

/// Decode a JSON-valued setting that may arrive as a string or as structure.
fn json_setting<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    match value {
        Value::String(raw) => serde_json::from_str(raw),
        other => T::deserialize(other),
    }
}

/// Environment values are type-sniffed (`SERVICE_VERSION=2` arrives as a
/// number), so scalar string fields accept any scalar.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRETS: &str = r#"{"name": "svc keys", "keys": [
        {"created": "2020-10-13T18:00:42Z", "value": "old"},
        {"created": "2021-10-12T18:00:42Z", "value": "new"}
    ]}"#;

    fn clear_env() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn defaults_apply_without_environment() {
        temp_env::with_vars(clear_env(), || {
            let cfg = MicroConfig::load().unwrap();
            assert_eq!(cfg.req_id_header, DEFAULT_REQ_ID_HEADER);
            assert_eq!(cfg.log_level, "info");
            assert_eq!(cfg.register_timeout(), Duration::from_secs(10));
            assert_eq!(cfg.health_probe_timeout(), Duration::from_secs(5));
            assert!(cfg.gateway_url.is_none());
            assert!(cfg.pool_descriptors().unwrap().is_empty());
        });
    }

    #[test]
    fn environment_overrides_defaults() {
        let mut vars = clear_env();
        vars.extend([
            ("SERVICE_NAME", Some("orders")),
            ("SERVICE_VERSION", Some("2")),
            ("SERVICE_ROUTES", Some(r#"{"health": "/health"}"#)),
            ("HMAC_HEADERS", Some("Content-Type, X-Client-Id")),
            ("HMAC_SECRETS", Some(SECRETS)),
            ("REGISTER_TIMEOUT_SECS", Some("3")),
        ]);
        temp_env::with_vars(vars, || {
            let cfg = MicroConfig::load().unwrap();
            assert_eq!(cfg.service_name, "orders");
            assert_eq!(cfg.service_version, "2");
            assert_eq!(cfg.register_timeout(), Duration::from_secs(3));
            assert_eq!(cfg.routes().unwrap()["health"], "/health");
            assert_eq!(cfg.hmac_headers().unwrap().len(), 2);

            let keys = cfg.key_set().unwrap();
            assert_eq!(keys.len(), 2);
            assert_eq!(keys.latest_key().unwrap().value.expose(), "new");
        });
    }

    #[test]
    fn yaml_layer_accepts_structured_json_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.yaml");
        std::fs::write(
            &path,
            "service_name: billing\n\
             service_routes:\n  health: /hc\n\
             service_pool:\n  - id: 1\n    service_name: a\n    base_url: a.local\n    service_online: true\n",
        )
        .unwrap();

        let mut vars = clear_env();
        vars.push(("SERVICE_NAME", Some("from-env")));
        temp_env::with_vars(vars, || {
            let cfg = MicroConfig::load_layered(Some(&path)).unwrap();
            assert_eq!(cfg.service_name, "from-env");
            assert_eq!(cfg.routes().unwrap()["health"], "/hc");
            let pool = cfg.pool_descriptors().unwrap();
            assert_eq!(pool.len(), 1);
            assert!(pool[0].service_online);
        });
    }

    #[test]
    fn missing_yaml_file_is_an_error() {
        let err = MicroConfig::load_layered(Some(Path::new("/definitely/not/here.yaml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn malformed_routes_are_reported() {
        let cfg = MicroConfig {
            service_routes: Value::String("{not json".to_owned()),
            ..MicroConfig::default()
        };
        let err = cfg.service_descriptor().unwrap_err();
        assert!(err.to_string().starts_with("error parsing routes json"));
    }

    #[test]
    fn key_set_rejects_empty_and_missing_documents() {
        let missing = MicroConfig::default();
        assert!(matches!(missing.key_set(), Err(ConfigError::Hmac(_))));

        let empty = MicroConfig {
            hmac_secrets: json!({"name": "k", "keys": []}),
            ..MicroConfig::default()
        };
        assert!(matches!(empty.key_set(), Err(ConfigError::Hmac(_))));
    }

    #[test]
    fn service_descriptor_is_online_with_settings() {
        let cfg = MicroConfig {
            service_name: "orders".to_owned(),
            service_summary: "order intake".to_owned(),
            service_version: "v1".to_owned(),
            service_base_url: "orders.internal".to_owned(),
            service_routes: json!({"health": "/health"}),
            ..MicroConfig::default()
        };
        let d = cfg.service_descriptor().unwrap();
        assert!(d.service_online);
        assert_eq!(d.service_summary, "order intake");
        assert_eq!(d.service_protocol, "http");
        assert_eq!(d.routes["health"], "/health");
    }

    #[test]
    fn runtime_variables() {
        temp_env::with_vars(
            [("SVC_FEATURE_X", Some("on")), ("SVC_UNSET", None::<&str>)],
            || {
                let mut cfg = MicroConfig::default();
                cfg.add_rv("answer", 42);
                cfg.add_rv_from_env("SVC_FEATURE_X");
                cfg.load_rv(["SVC_UNSET"]);

                assert_eq!(cfg.rv("answer"), Some(&json!(42)));
                assert_eq!(cfg.rv("SVC_FEATURE_X"), Some(&json!("on")));
                assert_eq!(cfg.rv("SVC_UNSET"), Some(&json!("")));
                assert!(cfg.rv("other").is_none());

                cfg.add_rv("answer", "changed");
                assert_eq!(cfg.rv("answer"), Some(&json!("changed")));
            },
        );
    }

    #[test]
    fn redacted_dump_hides_secrets() {
        let cfg = MicroConfig {
            hmac_secrets: Value::String(SECRETS.to_owned()),
            ..MicroConfig::default()
        };
        let dump = cfg.to_redacted_json().unwrap();
        assert!(!dump.contains("\"new\""));
        assert!(dump.contains("***"));
    }
}
