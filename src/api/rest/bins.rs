use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::payload::AppJson;
use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::bin::{Bin, BinStatus, BinType, Outcome, Priority};
use crate::models::GeoPoint;
use crate::state::AppState;
use crate::store::query::{paginate, ListQuery, Paged};
use crate::store::validate::Validator;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bins", get(list_bins).post(create_bin))
        .route(
            "/bins/:id",
            get(get_bin).patch(update_bin).delete(delete_bin),
        )
        .route("/bins/:id/assign", put(assign_bin))
        .route("/bins/:id/outcome", put(report_outcome))
}

#[derive(Deserialize)]
pub struct CreateBinBody {
    pub location: String,
    /// Defaults to the last comma segment of `location` when omitted.
    pub city: Option<String>,
    pub coordinates: Option<GeoPoint>,
    pub bin_type: BinType,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub reported_by: Option<String>,
}

async fn create_bin(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateBinBody>,
) -> Result<(StatusCode, Json<Bin>), AppError> {
    let mut validator = Validator::new();
    validator.require_non_empty("location", &payload.location);
    validator.require_max_len("location", &payload.location, 300);
    if let Some(city) = &payload.city {
        validator.require_non_empty("city", city);
    }
    validator.finish()?;

    let bin = Bin {
        id: Uuid::new_v4(),
        city: payload
            .city
            .unwrap_or_else(|| dispatch::derive_city(&payload.location)),
        location: payload.location,
        coordinates: payload.coordinates,
        status: BinStatus::Pending,
        bin_type: payload.bin_type,
        priority: payload.priority.unwrap_or(Priority::Normal),
        notes: payload.notes,
        collector_id: None,
        request_id: None,
        reported_by: payload.reported_by,
        reported_at: Utc::now(),
        collected_at: None,
        updated_at: None,
    };

    state.bins.insert(bin.id, bin.clone());
    tracing::info!(bin_id = %bin.id, city = %bin.city, "bin reported");

    Ok((StatusCode::CREATED, Json(bin)))
}

#[derive(Deserialize)]
pub struct BinListQuery {
    pub status: Option<BinStatus>,
    pub city: Option<String>,
    pub collector_id: Option<Uuid>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

async fn list_bins(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BinListQuery>,
) -> Json<Paged<Bin>> {
    let mut bins: Vec<Bin> = state
        .bins
        .iter()
        .filter(|entry| {
            let bin = entry.value();
            query.status.is_none_or(|status| bin.status == status)
                && query
                    .city
                    .as_deref()
                    .is_none_or(|city| bin.city.eq_ignore_ascii_case(city))
                && query
                    .collector_id
                    .is_none_or(|id| bin.collector_id == Some(id))
        })
        .map(|entry| entry.value().clone())
        .collect();

    let list = ListQuery {
        page: query.page,
        per_page: query.per_page,
        sort: query.sort,
    };
    match list.sort_key() {
        Some(("city", desc)) => {
            bins.sort_by(|a, b| a.city.cmp(&b.city));
            if desc {
                bins.reverse();
            }
        }
        Some(("reported_at", true)) => {
            bins.sort_by_key(|bin| std::cmp::Reverse(bin.reported_at));
        }
        _ => bins.sort_by_key(|bin| bin.reported_at),
    }

    Json(paginate(
        bins,
        &list,
        state.default_page_size,
        state.max_page_size,
    ))
}

async fn get_bin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bin>, AppError> {
    let bin = state
        .bins
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("bin {id} not found")))?;

    Ok(Json(bin.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateBinBody {
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

/// Status is deliberately not patchable; the lifecycle only advances through
/// assign and outcome.
async fn update_bin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateBinBody>,
) -> Result<Json<Bin>, AppError> {
    let mut bin = state
        .bins
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("bin {id} not found")))?;

    if let Some(priority) = payload.priority {
        bin.priority = priority;
    }
    if let Some(notes) = payload.notes {
        bin.notes = Some(notes);
    }
    if let Some(coordinates) = payload.coordinates {
        bin.coordinates = Some(coordinates);
    }
    bin.updated_at = Some(Utc::now());

    Ok(Json(bin.clone()))
}

async fn delete_bin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .bins
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("bin {id} not found")))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AssignBody {
    pub collector_id: Uuid,
}

async fn assign_bin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<AssignBody>,
) -> Result<Json<Bin>, AppError> {
    let bin = dispatch::assign_collector(&state, id, payload.collector_id)?;

    Ok(Json(bin))
}

#[derive(Deserialize)]
pub struct OutcomeBody {
    pub outcome: Outcome,
}

async fn report_outcome(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<OutcomeBody>,
) -> Result<Json<Bin>, AppError> {
    let bin = dispatch::report_outcome(&state, id, payload.outcome)?;

    Ok(Json(bin))
}
