//! Request middleware.

pub mod interceptor;
pub mod request_id;

pub use interceptor::{intercept, Interceptor, RATE_LIMIT_BODY, X_PROCESS_TIME};
pub use request_id::{stamp_request_id, RequestIdStamper, X_REQUEST_ID};
