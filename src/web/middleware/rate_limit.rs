//! Per-IP rate limiting for the login endpoint.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login attempts allowed per client IP.
pub struct LoginRateLimit {
    limiter: KeyedLimiter,
    per_minute: u32,
}

impl LoginRateLimit {
    /// `per_minute` of zero is treated as one.
    pub fn new(per_minute: u32) -> Self {
        let burst = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(burst)),
            per_minute: burst.get(),
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Record an attempt from `ip`; false once the quota is spent.
    pub fn check(&self, ip: &str) -> bool {
        self.limiter.check_key(&ip.to_string()).is_ok()
    }

    /// Drop state for clients whose quota has fully replenished.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Run [`cleanup`](Self::cleanup) every five minutes.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
                tracing::debug!(tracked = self.limiter.len(), "Login rate limiter cleaned up");
            }
        });
    }
}

/// Client IP from proxy headers, then the socket, else "unknown".
fn client_ip(req: &Request<Body>) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    if let Some(forwarded) = header("X-Forwarded-For") {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }
    if let Some(real_ip) = header("X-Real-IP") {
        return real_ip.trim().to_string();
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

/// Reject login attempts over the per-IP quota with 429.
pub async fn login_rate_limit(
    state: Arc<LoginRateLimit>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);

    if !state.check(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quota_becomes_one() {
        assert_eq!(LoginRateLimit::new(0).per_minute(), 1);
    }

    #[test]
    fn test_quota_is_per_ip() {
        let state = LoginRateLimit::new(3);

        assert!(state.check("127.0.0.1"));
        assert!(state.check("127.0.0.1"));
        assert!(state.check("127.0.0.1"));
        assert!(!state.check("127.0.0.1"));

        assert!(state.check("192.168.1.1"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.7");

        let req = Request::builder()
            .header("X-Real-IP", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "10.0.0.2");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "unknown");
    }
}
