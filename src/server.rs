// Metrics and liveness HTTP endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use crate::api::TibiaApi;
use crate::config::Config;
use crate::error::JobError;
use crate::metrics::Metrics;
use crate::store;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// ── Shared application state ─────────────────────────────────────────

pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn TibiaApi>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn TibiaApi>) -> Result<Self, JobError> {
        let metrics = Metrics::new()?;
        metrics.worlds_monitored.set(config.worlds.len() as i64);
        metrics.guilds_monitored.set(config.enemy_guilds.len() as i64);
        Ok(Self {
            config,
            api,
            metrics,
        })
    }
}

fn list_count(path: &std::path::Path) -> i64 {
    match store::load_list(path) {
        Ok(list) => list.len() as i64,
        Err(e) => {
            tracing::warn!("Could not count list: {e}");
            0
        }
    }
}

/// Recompute list sizes and enemy online counts.
pub async fn refresh_metrics(state: &AppState) {
    let started = Instant::now();
    let m = &state.metrics;

    m.trolls_total.set(list_count(&state.config.trolls_file()));
    m.bastex_total.set(list_count(&state.config.bastex_file()));

    let mut total_online = 0;
    for (guild, world) in &state.config.enemy_guilds {
        m.api_calls_total.inc();
        let online = match state.api.guild(guild).await {
            Some(g) => g.members.iter().filter(|mem| mem.status == "online").count() as i64,
            None => {
                m.api_errors_total.inc();
                0
            }
        };
        m.guild_online_members
            .with_label_values(&[guild.as_str(), world.as_str()])
            .set(online);
        total_online += online;
    }

    m.enemies_online.set(total_online);
    m.last_check_timestamp
        .set(chrono::Utc::now().timestamp_millis() as f64 / 1000.0);
    m.last_check_duration_seconds
        .set(started.elapsed().as_secs_f64());
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    refresh_metrics(&state).await;
    match state.metrics.gather() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], body),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_PLAIN)],
                String::new(),
            )
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "OK")
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serve `/metrics` and `/health` until the process is stopped.
pub async fn serve(state: Arc<AppState>) -> Result<(), JobError> {
    let port = state.config.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("Prometheus metrics server running on port {port}");
    tracing::info!("Metrics available at http://localhost:{port}/metrics");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
