//! Error response types shared by svckit services
//!
//! Every failed request is rendered as the same small JSON document:
//!
//! ```json
//! {"requestId": "V1StGXR8_Z5jdHi6B-myT", "code": 401, "status": "forbidden"}
//! ```
//!
//! The HTTP status of the response always equals `code`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod response;

pub use response::ErrResponse;
