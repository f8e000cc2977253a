use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use photoshoot::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{album::GridAlbumCompositor, workers_ai::WorkersAiClient},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing photoshoot server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    // Initialize Workers AI client
    tracing::info!(model = %config.transform_model, "Initializing Cloudflare Workers AI client");
    let transform = WorkersAiClient::new(
        &config.cf_account_id,
        &config.cf_api_token,
        &config.transform_model,
        config.transform_timeout(),
    )
    .expect("Failed to initialize Workers AI client");

    let state = AppState::new(
        Arc::new(transform),
        GridAlbumCompositor::new(config.album_jpeg_quality),
        config.worker_count,
    );

    // Evict expired idle sessions
    let sessions = state.sessions.clone();
    let session_ttl = config.session_ttl();
    let sweep_every = config.session_sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sessions.evict_older_than(session_ttl);
        }
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/styles", get(routes::styles::list_styles))
        .route("/api/v1/sessions", post(routes::sessions::create_session))
        .route(
            "/api/v1/sessions/{session_id}",
            get(routes::sessions::get_session).delete(routes::sessions::delete_session),
        )
        .route(
            "/api/v1/sessions/{session_id}/runs",
            post(routes::jobs::start_run),
        )
        .route(
            "/api/v1/sessions/{session_id}/jobs/{name}/retry",
            post(routes::jobs::retry_job),
        )
        .route(
            "/api/v1/sessions/{session_id}/jobs/{name}/image",
            get(routes::jobs::download_image),
        )
        .route(
            "/api/v1/sessions/{session_id}/album",
            get(routes::album::download_album),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    tracing::info!(
        workers = config.worker_count,
        "Starting photoshoot on {}",
        config.bind_addr
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}
