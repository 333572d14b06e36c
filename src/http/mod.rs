//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, peer address capture)
//!     → pipeline.rs (layer composition)
//!     → middleware/interceptor.rs (admission control, timing)
//!     → middleware/request_id.rs (X-Request-ID)
//!     → routes.rs
//!     → Send to client
//! ```

pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod server;

pub use pipeline::Pipeline;
pub use server::HttpServer;
