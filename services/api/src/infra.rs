use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fixed-window admission control keyed by client address. Applied as
/// middleware in front of the contact handler, so excess requests are turned
/// away before validation even runs.
pub(crate) struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    hits: Mutex<HashMap<IpAddr, WindowSlot>>,
}

struct WindowSlot {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    // Beyond this many tracked addresses, expired windows are swept on the
    // next check to keep the map bounded.
    const SWEEP_THRESHOLD: usize = 1024;

    pub(crate) fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().expect("rate limiter mutex poisoned");

        if hits.len() > Self::SWEEP_THRESHOLD {
            let window = self.window;
            hits.retain(|_, slot| now.duration_since(slot.started) < window);
        }

        let slot = hits.entry(ip).or_insert(WindowSlot {
            started: now,
            count: 0,
        });
        if now.duration_since(slot.started) >= self.window {
            slot.started = now;
            slot.count = 0;
        }
        slot.count += 1;
        slot.count <= self.max_per_window
    }
}

pub(crate) async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.allow(addr.ip()) {
        next.run(request).await
    } else {
        let payload = json!({ "error": "too many requests; please try again in a minute" });
        (StatusCode::TOO_MANY_REQUESTS, Json(payload)).into_response()
    }
}
