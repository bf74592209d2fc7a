use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use super::error::ApiError;
use crate::AppState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

// Expired windows are swept once the map grows past this many clients.
const PRUNE_THRESHOLD: usize = 1024;

/// Fixed-window request counter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    // ip -> (requests in window, window start)
    windows: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Counts the request and reports whether it is within the limit.
    pub async fn check(&self, ip: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, (_, start)| now.duration_since(*start) <= window);
        }

        let entry = windows.entry(ip.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) > self.window {
            *entry = (1, now);
            log_debug!("Rate limit window reset for {ip}");
            return true;
        }

        entry.0 += 1;
        if entry.0 > self.max_requests {
            log_warn!("Rate limit exceeded for {ip}");
            false
        } else {
            true
        }
    }
}

pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.check(&ip).await {
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}
