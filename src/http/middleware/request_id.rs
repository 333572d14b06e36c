//! Request ID stamping.
//!
//! Runs after the route handler: a short random identifier is logged and
//! returned to the client in `X-Request-ID` so a response can be matched
//! with its log line.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::Rng;

use crate::observability::LogSink;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Length of generated identifiers.
pub const REQUEST_ID_LEN: usize = 10;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random identifier made of ASCII letters.
pub fn generate_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..REQUEST_ID_LEN)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

pub struct RequestIdStamper {
    sink: Arc<dyn LogSink>,
}

impl RequestIdStamper {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

pub async fn stamp_request_id(
    State(stamper): State<Arc<RequestIdStamper>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let id = generate_request_id();
    stamper.sink.emit(&format!("Log {}", id));
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}
