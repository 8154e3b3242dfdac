use std::future::ready;
use std::path::Path;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    routing::{any, get, post},
    Router,
};
use instance::{ShutdownCoordinator, ShutdownTrigger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::track_metrics;

/// Value of the `Server` header on every response.
pub const SERVER_HEADER: &str = concat!("sentinel/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppState {
    pub shutdown: ShutdownCoordinator,
}

async fn index() -> &'static str {
    "sentinel"
}

async fn healthcheck() -> &'static str {
    "OK"
}

/// Readiness: flips to 503 as soon as shutdown has been triggered.
async fn status(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.shutdown.is_triggered() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    } else {
        (StatusCode::OK, "ready")
    }
}

async fn crud() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Not yet implemented")
}

async fn admin_shutdown(State(state): State<AppState>) -> &'static str {
    state.shutdown.trigger(ShutdownTrigger::AdminRequest);
    "server is shutting down..."
}

pub fn router(
    shutdown: ShutdownCoordinator,
    static_dir: &Path,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let state = AppState { shutdown };

    let mut router: Router<AppState> = Router::new()
        .route("/", get(index))
        .route("/healthcheck", get(healthcheck))
        .route("/status", get(status))
        .route("/crud", any(crud))
        .route("/crud/", any(crud))
        .route("/crud/*path", any(crud))
        .route("/admin/shutdown", post(admin_shutdown))
        .nest_service("/static", ServeDir::new(static_dir));

    // Don't install metrics unless asked to: the recorder is global, which does not
    // work well when the router is built several times in one process (tests).
    if let Some(recorder_handle) = metrics {
        router = router.route("/metrics", get(move || ready(recorder_handle.render())));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER_HEADER),
        ))
        .with_state(state)
}
