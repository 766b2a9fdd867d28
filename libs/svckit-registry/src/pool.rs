//! Round-robin pool of backend services with TCP health probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::descriptor::ServiceDescriptor;
use crate::error::ProbeError;

/// Default bound on a single TCP health probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest period the health monitor runs at; a zero interval is raised to it.
pub const MIN_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// A pool entry: the descriptor plus its mutable online flag.
#[derive(Debug)]
pub struct PooledService {
    descriptor: ServiceDescriptor,
    online: AtomicBool,
}

impl PooledService {
    fn new(descriptor: ServiceDescriptor) -> Self {
        let online = AtomicBool::new(descriptor.service_online);
        Self { descriptor, online }
    }

    #[must_use]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.descriptor.id
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Descriptor copy with `service_online` reflecting the current flag.
    #[must_use]
    pub fn snapshot(&self) -> ServiceDescriptor {
        let mut descriptor = self.descriptor.clone();
        descriptor.service_online = self.is_online();
        descriptor
    }
}

/// Result of probing one service.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub id: i64,
    pub base_url: String,
    pub result: Result<(), ProbeError>,
}

impl ProbeOutcome {
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-service outcomes of one [`ServicePool::health_check`] pass, in pool order.
#[derive(Debug, Default)]
pub struct HealthReport {
    pub outcomes: Vec<ProbeOutcome>,
}

impl HealthReport {
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_up()).count()
    }

    #[must_use]
    pub fn offline_ids(&self) -> Vec<i64> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_up())
            .map(|o| o.id)
            .collect()
    }
}

/// Services shared by many request handlers.
///
/// Selection is lock-free on the cursor; the entry list sits behind a
/// read-mostly lock that is never held across an `.await`.
#[derive(Debug)]
pub struct ServicePool {
    services: RwLock<Vec<Arc<PooledService>>>,
    current: AtomicUsize,
    probe_timeout: Duration,
}

impl Default for ServicePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ServicePool {
    #[must_use]
    pub fn new() -> Self {
        Self::with_probe_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    #[must_use]
    pub fn with_probe_timeout(probe_timeout: Duration) -> Self {
        Self {
            services: RwLock::new(Vec::new()),
            current: AtomicUsize::new(0),
            probe_timeout,
        }
    }

    /// Append a service. Duplicates are kept.
    pub fn add_service(&self, descriptor: ServiceDescriptor) -> Arc<PooledService> {
        let entry = Arc::new(PooledService::new(descriptor));
        self.services.write().push(Arc::clone(&entry));
        tracing::debug!(id = entry.id(), base_url = %entry.descriptor.base_url, "service added to pool");
        entry
    }

    /// Pick the next online service in rotation.
    ///
    /// The cursor is advanced atomically, then the pool is scanned from that
    /// slot for at most one full turn. When the hit lies past the advanced
    /// slot the cursor jumps to it so the following call continues after it.
    /// Returns `None` for an empty pool or when nothing is online.
    #[must_use]
    pub fn next_peer(&self) -> Option<Arc<PooledService>> {
        let services = self.services.read();
        let len = services.len();
        if len == 0 {
            return None;
        }

        let next = self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1) % len;
        for i in next..next + len {
            let idx = i % len;
            let Some(candidate) = services.get(idx) else {
                continue;
            };
            if candidate.is_online() {
                if i != next {
                    self.current.store(idx, Ordering::Release);
                }
                return Some(Arc::clone(candidate));
            }
        }
        None
    }

    /// Set the online flag of the first service with `id`; no-op when absent.
    pub fn mark_service_status(&self, id: i64, alive: bool) {
        let services = self.services.read();
        if let Some(entry) = services.iter().find(|s| s.id() == id) {
            entry.set_online(alive);
        } else {
            tracing::debug!(id, "mark_service_status: no such service");
        }
    }

    /// Probe every service concurrently and record the result on its flag.
    ///
    /// A service without a `health` route, with unusable routes, or whose
    /// health endpoint does not accept a TCP connection within the probe
    /// timeout is marked offline. One failing probe never stops the others.
    pub async fn health_check(&self) -> HealthReport {
        let entries: Vec<Arc<PooledService>> = self.services.read().clone();
        let timeout = self.probe_timeout;

        let outcomes = futures::future::join_all(entries.iter().map(|entry| async move {
            let result = probe(entry.descriptor(), timeout).await;
            entry.set_online(result.is_ok());
            ProbeOutcome {
                id: entry.id(),
                base_url: entry.descriptor().base_url.clone(),
                result,
            }
        }))
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => tracing::info!(id = outcome.id, base_url = %outcome.base_url, "[up]"),
                Err(ProbeError::MissingHealthRoute) => tracing::warn!(
                    id = outcome.id,
                    base_url = %outcome.base_url,
                    "[down] no health route"
                ),
                Err(err) => tracing::info!(
                    id = outcome.id,
                    base_url = %outcome.base_url,
                    error = %err,
                    "[down]"
                ),
            }
        }

        HealthReport { outcomes }
    }

    /// Point-in-time copy of the entries.
    #[must_use]
    pub fn services(&self) -> Vec<Arc<PooledService>> {
        self.services.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    #[must_use]
    pub fn online_count(&self) -> usize {
        self.services.read().iter().filter(|s| s.is_online()).count()
    }
}

async fn probe(descriptor: &ServiceDescriptor, timeout: Duration) -> Result<(), ProbeError> {
    let url = descriptor.health_url()?;
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return Err(ProbeError::MissingAuthority(url.to_string()));
    };
    let addr = format!("{host}:{port}");
    tracing::debug!(%addr, "dial");

    match tokio::time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(source)) => Err(ProbeError::Unreachable { addr, source }),
        Err(_) => Err(ProbeError::Timeout { addr, timeout }),
    }
}

/// Run [`ServicePool::health_check`] every `interval` until `cancel` fires.
///
/// The first pass runs immediately. A zero `interval` is raised to
/// [`MIN_HEALTH_CHECK_INTERVAL`].
pub fn spawn_health_monitor(
    pool: Arc<ServicePool>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        tracing::warn!(
            min_secs = MIN_HEALTH_CHECK_INTERVAL.as_secs(),
            "zero health check interval, using the minimum"
        );
        MIN_HEALTH_CHECK_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("health monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = pool.health_check().await;
                    tracing::debug!(
                        checked = report.outcomes.len(),
                        online = report.online_count(),
                        "health check pass complete"
                    );
                }
            }
        }
    })
}
