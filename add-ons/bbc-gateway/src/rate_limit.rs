//! Per-client fixed-window request limits.
//!
//! Every route shares a daily and an hourly budget per IP. `POST /inscription`
//! has its own hourly budget instead of the shared ones.

use crate::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub(crate) const TOO_MANY_REQUESTS: &str = "Trop de requêtes, veuillez réessayer plus tard.";

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// `max` requests per `window`. A `max` of 0 disables the limit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limit {
    pub(crate) max: u32,
    pub(crate) window: Duration,
}

impl Limit {
    pub(crate) fn per_hour(max: u32) -> Self {
        Self { max, window: HOUR }
    }

    pub(crate) fn per_day(max: u32) -> Self {
        Self { max, window: DAY }
    }
}

/// Expired windows are swept at most this often.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.length
    }
}

/// Fixed-window counters keyed by (scope, client).
#[derive(Debug)]
pub(crate) struct RateLimiter {
    windows: DashMap<(&'static str, String), Window>,
    last_sweep: Mutex<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }
}

impl RateLimiter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Counts one hit for `client` in `scope`. Returns false once the window is full.
    pub(crate) fn hit(&self, scope: &'static str, client: &str, limit: Limit) -> bool {
        self.hit_at(scope, client, limit, Instant::now())
    }

    fn hit_at(&self, scope: &'static str, client: &str, limit: Limit, now: Instant) -> bool {
        if limit.max == 0 {
            return true;
        }
        self.sweep_at(now);
        let mut window = self
            .windows
            .entry((scope, client.to_string()))
            .or_insert(Window {
                started: now,
                length: limit.window,
                count: 0,
            });
        if window.expired(now) {
            window.started = now;
            window.length = limit.window;
            window.count = 0;
        }
        if window.count >= limit.max {
            return false;
        }
        window.count += 1;
        true
    }

    /// Drops expired windows, at most once per [`SWEEP_INTERVAL`].
    /// Must not be called while holding a map entry.
    fn sweep_at(&self, now: Instant) {
        {
            let mut last = self.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
            if now.saturating_duration_since(*last) < SWEEP_INTERVAL {
                return;
            }
            *last = now;
        }
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now));
        let dropped = before.saturating_sub(self.windows.len());
        if dropped > 0 {
            tracing::debug!(target: "bbc::gateway", dropped, "Expired rate-limit windows swept");
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.len()
    }
}

/// Peer IP as text, `unknown` when the server was not started with connect info.
pub(crate) fn client_ip(connect: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| bbc_core::UNKNOWN.to_string())
}

/// Middleware applying the configured limits before the handler runs.
pub(crate) async fn enforce(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(connect.as_ref());
    let config = &state.config;
    let limits: Vec<(&'static str, Limit)> =
        if req.method() == Method::POST && req.uri().path() == "/inscription" {
            vec![("inscription", Limit::per_hour(config.inscription_limit_per_hour))]
        } else {
            vec![
                ("day", Limit::per_day(config.rate_limit_per_day)),
                ("hour", Limit::per_hour(config.rate_limit_per_hour)),
            ]
        };

    for (scope, limit) in limits {
        if !state.limiter.hit(scope, &client, limit) {
            tracing::warn!(
                target: "bbc::gateway",
                client = %client,
                scope,
                path = %req.uri().path(),
                "Rate limit exceeded"
            );
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": TOO_MANY_REQUESTS })),
            )
                .into_response();
        }
    }
    next.run(req).await
}
