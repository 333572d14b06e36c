//! Admission control and request timing.
//!
//! Every inbound request passes through here before reaching a route:
//! clients arriving more than once per rate window get a 429 and never reach
//! the handler; everyone else is timed and the response is stamped with
//! `X-Process-Time`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::clock::Clock;
use crate::observability::{metrics, LogSink};
use crate::security::rate_limit::{Admission, RateLimiter};

/// Response header carrying the downstream processing time in seconds.
pub const X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// Body of the response sent to throttled clients.
pub const RATE_LIMIT_BODY: &str = "Rate limit exceeded";

/// Key used for requests whose peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// State shared by every invocation of [`intercept`].
pub struct Interceptor {
    limiter: Option<Arc<RateLimiter>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LogSink>,
}

impl Interceptor {
    /// Interceptor enforcing `limiter` and timing every admitted request.
    pub fn new(limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            limiter: Some(limiter),
            clock,
            sink,
        }
    }

    /// Interceptor that admits everything but still times and logs.
    pub fn timing_only(clock: Arc<dyn Clock>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            limiter: None,
            clock,
            sink,
        }
    }

    pub fn limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn admit(&self, client: &str) -> Admission {
        match &self.limiter {
            Some(limiter) => limiter.check(client, self.clock.now()),
            None => Admission::Admitted,
        }
    }
}

/// Identifier used to key rate-limit state: the peer IP.
pub fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn rejection() -> Response {
    let mut response = Response::new(Body::from(RATE_LIMIT_BODY));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response
}

/// Middleware function gating and timing each request.
pub async fn intercept(
    State(interceptor): State<Arc<Interceptor>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request);
    let path = request.uri().path().to_string();

    if let Admission::Rejected { retry_after } = interceptor.admit(&client) {
        tracing::warn!(
            client = %client,
            path = %path,
            retry_after_ms = retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        return rejection();
    }

    interceptor.sink.emit(&format!("Request to {}", path));

    let start = interceptor.clock.now();
    let mut response = next.run(request).await;
    let elapsed = interceptor.clock.now().saturating_duration_since(start);
    let seconds = elapsed.as_secs_f64().to_string();

    if let Ok(value) = HeaderValue::from_str(&seconds) {
        response.headers_mut().append(X_PROCESS_TIME, value);
    }

    interceptor
        .sink
        .emit(&format!("Response for {} took {} seconds", path, seconds));
    metrics::record_request(response.status().as_u16(), elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observability::MemorySink;
    use axum::{middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    struct Fixture {
        clock: Arc<ManualClock>,
        limiter: Arc<RateLimiter>,
        sink: Arc<MemorySink>,
        app: Router,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_handler_delay(Duration::ZERO)
        }

        /// Handler advances the manual clock by `delay` to simulate work.
        fn with_handler_delay(delay: Duration) -> Self {
            let clock = Arc::new(ManualClock::new());
            let sink = Arc::new(MemorySink::new());
            let limiter = Arc::new(RateLimiter::default());
            let interceptor = Arc::new(Interceptor::new(
                limiter.clone(),
                clock.clone(),
                sink.clone(),
            ));

            let handler_clock = clock.clone();
            let app = Router::new()
                .route(
                    "/",
                    get(move || {
                        let clock = handler_clock.clone();
                        async move {
                            clock.advance(delay);
                            "Hello World!"
                        }
                    }),
                )
                .layer(middleware::from_fn_with_state(interceptor, intercept));

            Self {
                clock,
                limiter,
                sink,
                app,
            }
        }

        async fn send(&self, ip: [u8; 4], path: &str) -> Response {
            let mut request = Request::builder().uri(path).body(Body::empty()).unwrap();
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
            self.app.clone().oneshot(request).await.unwrap()
        }
    }

    fn process_time(response: &Response) -> Option<f64> {
        response
            .headers()
            .get(X_PROCESS_TIME)
            .map(|v| v.to_str().unwrap().parse::<f64>().unwrap())
    }

    #[tokio::test]
    async fn test_accepted_response_has_process_time() {
        let fixture = Fixture::new();
        let response = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let seconds = process_time(&response).unwrap();
        assert!(seconds >= 0.0);
    }

    #[tokio::test]
    async fn test_process_time_measures_downstream() {
        let fixture = Fixture::with_handler_delay(Duration::from_millis(250));
        let response = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(process_time(&response), Some(0.25));
    }

    #[tokio::test]
    async fn test_rejection_short_circuits() {
        let fixture = Fixture::new();
        fixture.send([1, 2, 3, 4], "/").await;
        fixture.sink.clear();

        let response = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(X_PROCESS_TIME).is_none());
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], RATE_LIMIT_BODY.as_bytes());
        assert!(fixture.sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_timeline() {
        let fixture = Fixture::new();
        let mut statuses = vec![];
        for ms in [0, 500, 1100] {
            fixture.clock.set_offset(Duration::from_millis(ms));
            statuses.push(fixture.send([1, 2, 3, 4], "/").await.status());
        }
        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS, StatusCode::OK]
        );
    }

    #[tokio::test]
    async fn test_record_written_before_handler_runs() {
        let fixture = Fixture::with_handler_delay(Duration::from_millis(800));
        let start = fixture.clock.now();

        let first = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(first.status(), StatusCode::OK);
        // The window opens when the request arrives, not when the handler finishes.
        assert_eq!(fixture.limiter.last_seen("1.2.3.4"), Some(start));

        fixture.clock.set_offset(Duration::from_millis(1000));
        let second = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(
            fixture.limiter.last_seen("1.2.3.4"),
            Some(start + Duration::from_millis(1000))
        );
    }

    #[tokio::test]
    async fn test_distinct_clients_same_instant() {
        let fixture = Fixture::new();
        assert_eq!(fixture.send([10, 0, 0, 1], "/").await.status(), StatusCode::OK);
        assert_eq!(fixture.send([10, 0, 0, 2], "/").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fallback_paths_are_gated_too() {
        let fixture = Fixture::new();
        let response = fixture.send([1, 2, 3, 4], "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(process_time(&response).is_some());

        let response = fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_log_lines() {
        let fixture = Fixture::with_handler_delay(Duration::from_millis(500));
        fixture.send([1, 2, 3, 4], "/").await;
        assert_eq!(
            fixture.sink.lines(),
            vec![
                "Request to /".to_string(),
                "Response for / took 0.5 seconds".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_connect_info_uses_shared_key() {
        let fixture = Fixture::new();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_id(&request), UNKNOWN_CLIENT);

        let response = fixture.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_timing_only_never_rejects() {
        let sink = Arc::new(MemorySink::new());
        let interceptor = Arc::new(Interceptor::timing_only(Arc::new(ManualClock::new()), sink));
        assert!(interceptor.limiter().is_none());
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(interceptor, intercept));

        for _ in 0..3 {
            let request = Request::builder().uri("/").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(process_time(&response).is_some());
        }
    }
}
