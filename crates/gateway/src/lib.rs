//! HTTP API gateway for HybridRAG.
//!
//! Exposes a health check and the v1 API for answering queries,
//! reading session history and adding knowledge documents.
//!
//! Built on Axum.

pub mod api_v1;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use hybridrag_config::AppConfig;

pub use api_v1::{ApiV1State, SharedApiState};

/// Build the main router: `/health` plus the v1 API under `/v1`.
///
/// Layers:
/// - CORS for the local web origin
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static("http://localhost:8080")))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let components = hybridrag_router::build(&config).await?;

    let state = Arc::new(ApiV1State {
        router: components.router,
        memory: components.memory,
        knowledge: components.knowledge,
        start_time: chrono::Utc::now(),
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
    sources: Vec<&'static str>,
    memory: String,
    knowledge: String,
}

async fn health_handler(State(state): State<SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        sources: state
            .router
            .source_order()
            .into_iter()
            .map(|p| p.as_str())
            .collect(),
        memory: state.memory.name().to_string(),
        knowledge: state.knowledge.store().name().to_string(),
    })
}
