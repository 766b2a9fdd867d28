#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Svckit: building blocks for small HTTP microservices
//!
//! - [`MicroConfig`]: layered configuration (defaults, YAML, environment)
//! - [`logging::init_logging`]: `tracing` subscriber setup
//! - [`http`]: header copying, request ids, default headers, CORS and the
//!   standard middleware stack
//! - [`mapper`]: name to GUID substitution
//!
//! HMAC signing, the service pool and error bodies live in the companion
//! crates and are re-exported here.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod mapper;

pub use config::MicroConfig;
pub use error::ConfigError;

pub use svckit_auth as auth;
pub use svckit_errors as errors;
pub use svckit_registry as registry;
