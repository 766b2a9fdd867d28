use serde::{Deserialize, Serialize};

use crate::pool::{PooledService, ServicePool};

/// Liveness document served on `/heartbeat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub request_id: String,
    pub database_online: bool,
    pub app_name: String,
    #[serde(rename = "releaseCreatedAt")]
    pub release_date: String,
    pub release_version: String,
    #[serde(rename = "slugCommit")]
    pub slug: String,
    pub message: String,
}

impl Heartbeat {
    #[must_use]
    pub fn new(request_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            app_name: app_name.into(),
            message: "ok".to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_release(mut self, version: impl Into<String>, created_at: impl Into<String>) -> Self {
        self.release_version = version.into();
        self.release_date = created_at.into();
        self
    }

    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    fn for_service(request_id: &str, service: &PooledService) -> Self {
        let descriptor = service.descriptor();
        Self {
            request_id: request_id.to_owned(),
            app_name: descriptor.service_name.clone(),
            release_version: descriptor.service_version.clone(),
            message: if service.is_online() { "up" } else { "down" }.to_owned(),
            ..Self::default()
        }
    }
}

/// Heartbeat of every pooled service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePoolStatus {
    pub request_id: String,
    pub services: Vec<Heartbeat>,
}

impl ServicePoolStatus {
    #[must_use]
    pub fn from_pool(request_id: impl Into<String>, pool: &ServicePool) -> Self {
        let request_id = request_id.into();
        let services = pool
            .services()
            .iter()
            .map(|s| Heartbeat::for_service(&request_id, s))
            .collect();
        Self {
            request_id,
            services,
        }
    }
}
