//! Switchblade Server: HTTP surface over the query pipeline.
//!
//! - **REST (8080)**: `POST /api/v1/query`, `GET /api/v1/history/{user_id}`.
//! - **Observability**: `/health`, Prometheus `/metrics`, `errors.jsonl` and
//!   optional OTLP tracing.
use axum::{response::IntoResponse, routing::get, Json, Router};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use switchblade_common::config::AppConfig;
use switchblade_common::logging::{init_logging, LogSettings};
use switchblade_core::Pipeline;
use tracing::info;

pub mod api;

pub use api::AppState;

// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "switchblade_runs_total",
        "Pipeline runs by outcome status",
    );
    let counter = IntCounterVec::new(opts, &["status"]).expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static HISTORY_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    let opts = Opts::new(
        "switchblade_history_write_failures_total",
        "History records that could not be persisted",
    );
    let counter = IntCounter::with_opts(opts).expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static ACTIVE_RUNS: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new("switchblade_active_runs", "Pipeline runs in progress");
    let gauge = IntGauge::with_opts(opts).expect("valid metric definition");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric registered once");
    gauge
});

pub struct SwitchbladeServer {
    app_config_path: String,
    log_settings: LogSettings,
}

impl Default for SwitchbladeServer {
    fn default() -> Self {
        Self {
            app_config_path: "config/switchblade.yaml".to_string(),
            log_settings: LogSettings::server(),
        }
    }
}

impl SwitchbladeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app_config(mut self, app_config_path: &str) -> Self {
        self.app_config_path = app_config_path.to_string();
        self
    }

    pub fn with_log_dir(mut self, dir: &str) -> Self {
        self.log_settings = self.log_settings.with_log_dir(dir);
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app_config = AppConfig::from_file(&self.app_config_path)?;
        init_logging(&self.log_settings, &app_config.telemetry)?;

        let pipeline = Pipeline::from_config(&app_config).await?;
        let state = AppState::new(Arc::new(pipeline), app_config.history.default_list_limit);

        let addr: SocketAddr = app_config.server.listen_addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            "API server listening on {} (engine={}, workgroup={})",
            addr, app_config.engine.endpoint, app_config.engine.workgroup
        );

        axum::serve(listener, app(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        switchblade_common::telemetry::shutdown_telemetry();
        Ok(())
    }
}

/// Full router: health and metrics at the root, the API under `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api::create_api_router(state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics_handler() -> impl IntoResponse {
    // Touch the statics so every family shows up before the first run.
    Lazy::force(&RUNS_TOTAL);
    Lazy::force(&HISTORY_WRITE_FAILURES);
    Lazy::force(&ACTIVE_RUNS);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}
