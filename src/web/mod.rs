use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::history::{self, HistoryRecord, HistoryRequest, TelemetryReader};
use crate::proxy::ForwardingProxy;
use crate::server::config::ProxyConfig;
use crate::web::error::AppError;

pub mod error;

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ForwardingProxy>,
    pub telemetry: Arc<dyn TelemetryReader>,
    pub config: Arc<ProxyConfig>,
}

async fn history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Json(payload): Json<HistoryRequest>,
) -> Result<Json<HistoryRecord>, AppError> {
    let record =
        history::create_history_record(&workspace_id, &payload, app_state.telemetry.as_ref())
            .await?;
    Ok(Json(record))
}

async fn proxy_handler(
    State(app_state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let value = app_state.proxy.request_api(path_and_query).await?;
    Ok(Json(value))
}

pub fn create_axum_router(
    proxy: Arc<ForwardingProxy>,
    telemetry: Arc<dyn TelemetryReader>,
    config: Arc<ProxyConfig>,
) -> Router {
    let app_state = Arc::new(AppState {
        proxy,
        telemetry,
        config,
    });

    // The TwinMaker web client runs on a different origin; allow everything.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route(
            "/workspaces/{workspace_id}/entity-properties/history",
            post(history_handler),
        )
        .route("/", get(proxy_handler))
        .route("/{*path}", get(proxy_handler))
        .with_state(app_state)
        .layer(cors)
}
