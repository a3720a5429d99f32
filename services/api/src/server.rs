use crate::cli::ServeArgs;
use crate::infra::{AppState, RateLimiter};
use crate::routes::{app_router, SiteAssets};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cygnus::config::AppConfig;
use cygnus::contact::{ContactService, PgContactStore, RecaptchaVerifier, SendGridNotifier};
use cygnus::error::AppError;
use cygnus::telemetry;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verifier = Arc::new(RecaptchaVerifier::new(
        config.recaptcha.secret.clone(),
        config.recaptcha.verify_url.clone(),
    )?);
    let store = Arc::new(PgContactStore::new(config.database.url.clone()));
    if config.email.is_none() {
        info!("email configuration not set; contact notifications disabled");
    }
    let notifier = Arc::new(SendGridNotifier::new(
        config.email.clone(),
        SendGridNotifier::DEFAULT_ENDPOINT,
    )?);
    let service = Arc::new(ContactService::new(
        verifier,
        store,
        notifier,
        config.recaptcha.score_threshold,
    ));

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.contact_per_minute,
        Duration::from_secs(60),
    ));

    let app = app_router(service, limiter, &site_assets())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "cygnus contact backend ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn site_assets() -> SiteAssets {
    // Prefer the inlined-CSS variant of the landing page when the asset
    // pipeline has produced one.
    let critical = Path::new("templates/index.critical.html");
    let landing_page = if critical.exists() {
        critical.to_path_buf()
    } else {
        PathBuf::from("templates/index.html")
    };

    SiteAssets {
        landing_page,
        static_dir: PathBuf::from("static"),
    }
}
