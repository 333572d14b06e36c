//! Route handlers sitting behind the middleware stack.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

async fn health() -> &'static str {
    "ok"
}
