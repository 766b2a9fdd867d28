#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Backend service bookkeeping for svckit services
//!
//! - [`ServicePool`]: round-robin selection over online services, with TCP
//!   health probing of each service's `health` route
//! - [`GatewayClient`]: signed one-shot registration at the API gateway
//! - [`Heartbeat`] / [`ServicePoolStatus`]: liveness documents

pub mod descriptor;
pub mod error;
pub mod heartbeat;
pub mod pool;
pub mod registration;

pub use descriptor::{HEALTH_ROUTE, RegistrationRequest, ServiceDescriptor};
pub use error::{ProbeError, RegistrationError};
pub use heartbeat::{Heartbeat, ServicePoolStatus};
pub use pool::{
    DEFAULT_PROBE_TIMEOUT, HealthReport, MIN_HEALTH_CHECK_INTERVAL, PooledService, ProbeOutcome,
    ServicePool, spawn_health_monitor,
};
pub use registration::{DEFAULT_REGISTER_TIMEOUT, GatewayClient, RegistrationOutcome};
