pub mod bins;
pub mod collectors;
pub mod payload;
pub mod requests;
pub mod trucks;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(requests::router())
        .merge(bins::router())
        .merge(collectors::router())
        .merge(trucks::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // consumed by browser dashboards on other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    requests: usize,
    bins: usize,
    collectors: usize,
    trucks: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        requests: state.requests.len(),
        bins: state.bins.len(),
        collectors: state.collectors.len(),
        trucks: state.trucks.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
