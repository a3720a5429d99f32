use crate::infra::{enforce_rate_limit, AppState, RateLimiter};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use cygnus::contact::{
    contact_router, ContactNotifier, ContactService, ContactStore, HumanVerifier,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// Filesystem locations of the rendered landing page and static assets.
pub(crate) struct SiteAssets {
    pub(crate) landing_page: PathBuf,
    pub(crate) static_dir: PathBuf,
}

pub(crate) fn app_router<V, S, N>(
    service: Arc<ContactService<V, S, N>>,
    limiter: Arc<RateLimiter>,
    assets: &SiteAssets,
) -> Router
where
    V: HumanVerifier + 'static,
    S: ContactStore + 'static,
    N: ContactNotifier + 'static,
{
    let contact = contact_router(service)
        .layer(middleware::from_fn_with_state(limiter, enforce_rate_limit));

    Router::new()
        .merge(contact)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route_service("/", ServeFile::new(&assets.landing_page))
        .nest_service("/static", ServeDir::new(&assets.static_dir))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use cygnus::contact::{
        NewContact, StorageError, ValidContact, VerificationError, VerificationResult,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::{IpAddr, SocketAddr};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::util::ServiceExt;

    struct AcceptAllVerifier;

    #[async_trait]
    impl HumanVerifier for AcceptAllVerifier {
        async fn verify(
            &self,
            _token: &str,
            _client_ip: IpAddr,
        ) -> Result<VerificationResult, VerificationError> {
            Ok(VerificationResult {
                accepted: true,
                confidence_score: 0.9,
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore;

    #[async_trait]
    impl ContactStore for MemoryStore {
        async fn store(&self, _contact: &NewContact) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl ContactNotifier for SilentNotifier {
        async fn notify(&self, _contact: &ValidContact) {}
    }

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn router(limit: u32, ready: bool) -> Router {
        let service = Arc::new(ContactService::new(
            Arc::new(AcceptAllVerifier),
            Arc::new(MemoryStore),
            Arc::new(SilentNotifier),
            0.5,
        ));
        let limiter = Arc::new(RateLimiter::new(limit, Duration::from_secs(60)));
        let assets = SiteAssets {
            landing_page: PathBuf::from("templates/index.html"),
            static_dir: PathBuf::from("static"),
        };
        app_router(service, limiter, &assets).layer(Extension(state(ready)))
    }

    fn contact_request(body: &str) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        let addr = SocketAddr::new(IpAddr::from([203, 0, 113, 5]), 40000);
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn valid_body() -> String {
        json!({
            "name": "Al",
            "email": "a@b.com",
            "website_url": null,
            "message": "Hello there, this is a test.",
            "recaptcha_token": "tok",
        })
        .to_string()
    }

    #[tokio::test]
    async fn healthcheck_returns_ok() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request builds");
        let response = router(5, true).oneshot(request).await.expect("route runs");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_the_flag() {
        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .expect("request builds");
        let response = router(5, false).oneshot(request).await.expect("route runs");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn contact_endpoint_accepts_a_valid_submission() {
        let response = router(5, true)
            .oneshot(contact_request(&valid_body()))
            .await
            .expect("route runs");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn contact_endpoint_rejects_invalid_fields() {
        let body = json!({
            "name": "A",
            "email": "a@b.com",
            "message": "Hello there, this is a test.",
            "recaptcha_token": "tok",
        })
        .to_string();
        let response = router(5, true)
            .oneshot(contact_request(&body))
            .await
            .expect("route runs");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn contact_endpoint_throttles_after_the_window_limit() {
        let app = router(2, true);
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(contact_request(&valid_body()))
                .await
                .expect("route runs");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(contact_request(&valid_body()))
            .await
            .expect("route runs");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
