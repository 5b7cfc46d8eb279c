//! Request rate limiting.
//!
//! Fixed-window counters keyed by client IP. Three independent limiters guard the API surface
//! (`api`, `auth` and `public`, see [`crate::config::LimitsConfig`]). Counters live in process
//! memory, so each replica enforces its own budget.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{
    config::{LimitsConfig, RateLimitConfig},
    errors::Error,
};

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Container for all rate limiters. `None` means the limiter is disabled.
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    /// Every `/api/v1` request
    pub api: Option<Arc<RateLimiter>>,
    /// Authentication endpoints
    pub auth: Option<Arc<RateLimiter>>,
    /// Anonymous public menu reads
    pub public: Option<Arc<RateLimiter>>,
}

impl Limiters {
    pub fn new(config: &LimitsConfig) -> Self {
        Self {
            api: RateLimiter::new(&config.api).map(Arc::new),
            auth: RateLimiter::new(&config.auth).map(Arc::new),
            public: RateLimiter::new(&config.public).map(Arc::new),
        }
    }

    /// Drop expired windows from every limiter
    pub fn sweep(&self) -> usize {
        [&self.api, &self.auth, &self.public]
            .into_iter()
            .flatten()
            .map(|limiter| limiter.sweep())
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request against a limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
    skip_successful_requests: bool,
    message: String,
}

impl RateLimiter {
    /// Returns `None` when the limiter is disabled.
    pub fn new(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        Some(Self {
            windows: DashMap::new(),
            window: config.window,
            max_requests: config.max_requests,
            skip_successful_requests: config.skip_successful_requests,
            message: config.message.clone(),
        })
    }

    /// Count a request from `key` and decide whether it may proceed
    pub fn hit(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });

        if now.duration_since(window.started) >= self.window {
            *window = Window { started: now, count: 0 };
        }
        window.count = window.count.saturating_add(1);

        RateLimitDecision {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset: self.window.saturating_sub(now.duration_since(window.started)),
        }
    }

    /// Give back one request, used when successful requests don't count
    pub fn refund(&self, key: &str) {
        if let Some(mut window) = self.windows.get_mut(key) {
            window.count = window.count.saturating_sub(1);
        }
    }

    /// Remove windows that have closed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| now.duration_since(window.started) < self.window);
        before.saturating_sub(self.windows.len())
    }
}

/// Best-effort client address: first `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    // Report whole seconds, rounding a partial second up
    let reset_secs = decision.reset.as_secs() + u64::from(decision.reset.subsec_nanos() > 0);

    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
}

/// Enforce a [`RateLimiter`] on every request passing through this layer.
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let key = client_ip(request.headers(), request.extensions());
    let decision = limiter.hit(&key);

    if !decision.allowed {
        debug!(client = %key, limit = decision.limit, "Rate limit exceeded");
        let mut response = Error::TooManyRequests {
            message: limiter.message.clone(),
        }
        .into_response();
        apply_headers(response.headers_mut(), &decision);
        let retry_after = decision.reset.as_secs().max(1);
        response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    let mut response = next.run(request).await;

    if limiter.skip_successful_requests && response.status().as_u16() < 400 {
        trace!(client = %key, "Refunding successful request");
        limiter.refund(&key);
    }

    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorEnvelope;
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;

    fn limiter(max_requests: u32, window: Duration, skip_successful_requests: bool) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            window,
            max_requests,
            skip_successful_requests,
            message: "Slow down".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_disabled_returns_none() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(RateLimiter::new(&config).is_none());
    }

    #[test]
    fn test_counts_per_key() {
        let limiter = limiter(2, Duration::from_secs(60), false);

        let first = limiter.hit("1.1.1.1");
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        assert!(limiter.hit("1.1.1.1").allowed);
        let third = limiter.hit("1.1.1.1");
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);

        // Other clients have their own budget
        assert!(limiter.hit("2.2.2.2").allowed);
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1, Duration::from_millis(50), false);

        assert!(limiter.hit("client").allowed);
        assert!(!limiter.hit("client").allowed);

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.hit("client").allowed);
    }

    #[test]
    fn test_refund_and_sweep() {
        let limiter = limiter(1, Duration::from_millis(50), true);

        assert!(limiter.hit("client").allowed);
        limiter.refund("client");
        assert!(limiter.hit("client").allowed);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.sweep(), 0);
    }

    #[test]
    fn test_client_ip_resolution() {
        let mut headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        assert_eq!(client_ip(&headers, &extensions), "unknown");

        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5000))));
        assert_eq!(client_ip(&headers, &extensions), "10.0.0.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&headers, &extensions), "203.0.113.9");
    }

    fn app(limiter: RateLimiter) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/fail", get(|| async { StatusCode::UNAUTHORIZED }))
            .layer(from_fn_with_state(Arc::new(limiter), rate_limit))
    }

    #[tokio::test]
    async fn test_middleware_rejects_over_limit() {
        let server = TestServer::new(app(limiter(2, Duration::from_secs(60), false))).unwrap();

        let first = server.get("/ok").await;
        first.assert_status_ok();
        assert_eq!(first.header("ratelimit-limit"), "2");
        assert_eq!(first.header("ratelimit-remaining"), "1");

        server.get("/ok").await.assert_status_ok();

        let rejected = server.get("/ok").await;
        rejected.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejected.header("ratelimit-remaining"), "0");
        let body: ErrorEnvelope = rejected.json();
        assert_eq!(body.error.code, "RATE_LIMIT_EXCEEDED");
        assert_eq!(body.error.message, "Slow down");

        // A different forwarded client is unaffected
        server
            .get("/ok")
            .add_header("x-forwarded-for", "198.51.100.4")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_middleware_skips_successful_requests() {
        let server = TestServer::new(app(limiter(2, Duration::from_secs(60), true))).unwrap();

        for _ in 0..5 {
            server.get("/ok").await.assert_status_ok();
        }

        server.get("/fail").await.assert_status(StatusCode::UNAUTHORIZED);
        server.get("/fail").await.assert_status(StatusCode::UNAUTHORIZED);
        server.get("/fail").await.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }
}
