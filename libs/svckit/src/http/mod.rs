//! Request context propagation and the default middleware stack.

pub mod headers;
pub mod layers;
pub mod request_id;

pub use headers::copy_headers;
pub use layers::{apply_middleware_stack, cors_layer, default_headers};
pub use request_id::{MakeReqId, XRequestId, push_req_id_to_extensions, request_id_header};
