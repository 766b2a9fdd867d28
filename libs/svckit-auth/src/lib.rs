#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HMAC request authentication for svckit services
//!
//! Requests are authenticated with a keyed SHA-256 digest carried base64-encoded
//! in the `X-HMAC-HASH` header. The digest covers a canonical message built
//! from a configured list of headers, the request body and the raw query string.
//!
//! Keys rotate through a [`KeySet`]: outbound requests are signed with the most
//! recently created key, inbound requests are accepted if any key in the set
//! reproduces the presented digest.
//!
//! # Example
//!
//! ```ignore
//! use svckit_auth::{HmacConfig, axum_ext::{HmacState, validate_hmac}};
//!
//! let config = HmacConfig::from_raw("Content-Type,X-Client-Id", &secrets_json)?;
//! let state = HmacState::from_config(config);
//!
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .layer(axum::middleware::from_fn_with_state(state, validate_hmac));
//! ```

// Core modules
pub mod config;
pub mod config_error;
pub mod errors;
pub mod keys;
pub mod secret;
pub mod signer;

#[cfg(feature = "axum-ext")]
pub mod axum_ext;

pub use config::{HmacConfig, parse_header_list};
pub use config_error::ConfigError;
pub use errors::AuthError;
pub use keys::{Key, KeyError, KeySet};
pub use secret::SecretString;
pub use signer::{HMAC_HEADER, HmacSigner, SigningInput};
