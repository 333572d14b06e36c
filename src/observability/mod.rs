//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware produces:
//!     → logging.rs (LogSink lines, tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{LogSink, MemorySink, TracingSink};
