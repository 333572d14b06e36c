//! Rate-limited HTTP front end.
//!
//! Every request passes a per-client admission check (one request per
//! window), is timed, and leaves with an `X-Process-Time` header.

pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GateConfig;
pub use http::{HttpServer, Pipeline};
pub use lifecycle::Shutdown;
