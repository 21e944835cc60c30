use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::state::AppState;

/// Per-client token bucket.
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter keyed by client IP.
pub struct ClientRateLimiter {
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
    burst: f64,
    per_sec: f64,
}

impl ClientRateLimiter {
    pub fn new(burst: usize, per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            burst: burst as f64,
            per_sec,
        }
    }

    /// Take one token for `ip`. Returns false when the client is over its limit.
    pub async fn try_acquire(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_sec).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Forget clients idle for longer than `max_idle`.
    pub async fn sweep(&self, max_idle: Duration) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < max_idle);
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Axum middleware rejecting requests from clients over their rate limit.
///
/// Requests without connection info (in-process calls) are attributed to
/// loopback.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ci| ci.0.ip());

    if !state.rate_limiter.try_acquire(ip).await {
        tracing::debug!(%ip, "Rate limited API request");
        return Err(AppError::TooManyRequests(
            "Too many requests, slow down".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// Periodically drop idle rate-limit buckets.
pub fn spawn_rate_limit_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            state.rate_limiter.sweep(Duration::from_secs(600)).await;
        }
    });
}
