//! Composition of the middleware stack around the routes.
//!
//! Layer order, outermost first:
//! ```text
//! TraceLayer → intercept → [timeout] → [request id] → routes
//! ```
//! The request ID layer sits inside the interceptor so throttled responses
//! leave without any extra headers.

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::http::middleware::{intercept, stamp_request_id, Interceptor, RequestIdStamper};
use crate::observability::LogSink;
use crate::security::rate_limit::RateLimiter;

/// Everything needed to wrap a router, constructed explicitly by the caller.
#[derive(Clone)]
pub struct Pipeline {
    interceptor: Arc<Interceptor>,
    request_ids: Option<Arc<RequestIdStamper>>,
    timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(interceptor: Arc<Interceptor>) -> Self {
        Self {
            interceptor,
            request_ids: None,
            timeout: None,
        }
    }

    /// Build the pipeline described by `config` on top of `clock` and `sink`.
    pub fn from_config(config: &GateConfig, clock: Arc<dyn Clock>, sink: Arc<dyn LogSink>) -> Self {
        let interceptor = if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
            Interceptor::new(limiter, clock, sink.clone())
        } else {
            Interceptor::timing_only(clock, sink.clone())
        };

        let mut pipeline = Self::new(Arc::new(interceptor));
        if config.request_id.enabled {
            pipeline = pipeline.with_request_ids(Arc::new(RequestIdStamper::new(sink)));
        }
        if let Some(timeout) = config.timeouts.request() {
            pipeline = pipeline.with_timeout(timeout);
        }
        pipeline
    }

    pub fn with_request_ids(mut self, stamper: Arc<RequestIdStamper>) -> Self {
        self.request_ids = Some(stamper);
        self
    }

    /// Bound downstream processing; slower handlers yield 408.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    /// Wrap `routes` with the configured layers.
    #[allow(deprecated)]
    pub fn apply(self, routes: Router) -> Router {
        let mut router = routes;
        if let Some(stamper) = self.request_ids {
            router = router.layer(middleware::from_fn_with_state(stamper, stamp_request_id));
        }
        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        router
            .layer(middleware::from_fn_with_state(self.interceptor, intercept))
            .layer(TraceLayer::new_for_http())
    }
}
