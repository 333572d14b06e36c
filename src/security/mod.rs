//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (one request per window per client IP)
//!     → Pass to route handlers
//!
//! Background:
//!     → sweeper.rs (optional eviction of idle records)
//! ```

pub mod rate_limit;
pub mod sweeper;

pub use rate_limit::{Admission, RateLimiter};
