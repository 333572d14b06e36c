//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the routed, layered Axum router
//! - Bind to a listener with peer address info available to middleware
//! - Run the optional idle-record sweeper alongside the server
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::http::pipeline::Pipeline;
use crate::http::routes::routes;
use crate::observability::{LogSink, TracingSink};
use crate::security::rate_limit::RateLimiter;
use crate::security::sweeper::run_sweeper;

/// HTTP server fronted by the request interceptor.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    limiter: Option<Arc<RateLimiter>>,
    clock: Arc<dyn Clock>,
}

impl HttpServer {
    /// Create a server with the system clock and tracing-backed log sink.
    pub fn new(config: GateConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
        let pipeline = Pipeline::from_config(&config, clock, sink);
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server around a pipeline assembled by the caller.
    pub fn with_pipeline(config: GateConfig, pipeline: Pipeline) -> Self {
        let limiter = pipeline.interceptor().limiter().cloned();
        let clock = pipeline.interceptor().clock().clone();
        let router = pipeline.apply(routes());
        Self {
            router,
            config,
            limiter,
            clock,
        }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.enabled,
            window_ms = self.config.rate_limit.window_ms,
            "HTTP server starting"
        );

        if let (Some(limiter), Some(interval)) =
            (self.limiter.clone(), self.config.rate_limit.sweep_interval())
        {
            tokio::spawn(run_sweeper(
                limiter,
                self.clock.clone(),
                interval,
                shutdown.resubscribe(),
            ));
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
