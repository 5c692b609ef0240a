use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::payload::AppJson;
use crate::engine::{pairing, performance};
use crate::error::{AppError, FieldError};
use crate::models::collector::{Collector, CollectorStatus, Performance};
use crate::models::truck::Truck;
use crate::models::GeoPoint;
use crate::state::AppState;
use crate::store::query::{paginate, ListQuery, Paged};
use crate::store::validate::Validator;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/collectors", get(list_collectors).post(create_collector))
        .route(
            "/collectors/:id",
            get(get_collector)
                .patch(update_collector)
                .delete(delete_collector),
        )
        .route("/collectors/:id/location", patch(update_location))
        .route("/collectors/:id/performance", get(get_performance))
        .route("/collectors/:id/truck", put(bind_truck).delete(unbind_truck))
}

#[derive(Deserialize)]
pub struct CreateCollectorBody {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    /// Truck to pair with. When omitted the first free truck is taken;
    /// registration fails when the yard has none left.
    pub truck_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct PairResponse {
    pub collector: Collector,
    pub truck: Truck,
}

async fn create_collector(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateCollectorBody>,
) -> Result<(StatusCode, Json<Collector>), AppError> {
    let mut validator = Validator::new();
    validator.require_non_empty("name", &payload.name);
    validator.require_max_len("name", &payload.name, 100);
    validator.require_email("email", &payload.email);
    validator.require_non_empty("phone", &payload.phone);
    validator.require_non_empty("city", &payload.city);
    validator.finish()?;

    let now = Utc::now();
    let id = Uuid::new_v4();
    let collector = Collector {
        id,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        city: payload.city,
        status: CollectorStatus::Active,
        truck_id: None,
        assigned_bins: Vec::new(),
        last_location: None,
        last_seen_at: None,
        performance: Performance::default(),
        created_at: now,
        updated_at: now,
    };
    state.collectors.insert(id, collector);

    // a collector without a truck cannot work; pair before confirming the
    // registration and roll the record back when no truck can be taken
    let paired = match payload.truck_id {
        Some(truck_id) => pairing::bind(&state, id, truck_id).map(|_| ()),
        None => pairing::available_trucks(&state)
            .into_iter()
            .find_map(|truck| pairing::bind(&state, id, truck.id).ok())
            .map(|_| ())
            .ok_or_else(|| {
                AppError::ValidationFailed(vec![FieldError::new(
                    "truck_id",
                    "no truck available to pair; supply truck_id or free a truck",
                )])
            }),
    };

    if let Err(err) = paired {
        state.collectors.remove(&id);
        return Err(err);
    }

    let collector = state
        .collectors
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::Internal(format!("collector {id} vanished during creation")))?;

    tracing::info!(collector_id = %id, truck_id = ?collector.truck_id, "collector registered");

    Ok((StatusCode::CREATED, Json(collector)))
}

#[derive(Deserialize)]
pub struct CollectorListQuery {
    pub city: Option<String>,
    pub status: Option<CollectorStatus>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

async fn list_collectors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CollectorListQuery>,
) -> Json<Paged<Collector>> {
    let mut collectors: Vec<Collector> = state
        .collectors
        .iter()
        .filter(|entry| {
            let collector = entry.value();
            query
                .city
                .as_deref()
                .is_none_or(|city| collector.city.eq_ignore_ascii_case(city))
                && query.status.is_none_or(|status| collector.status == status)
        })
        .map(|entry| entry.value().clone())
        .collect();

    let list = ListQuery {
        page: query.page,
        per_page: query.per_page,
        sort: query.sort,
    };
    match list.sort_key() {
        Some(("name", desc)) => {
            collectors.sort_by(|a, b| a.name.cmp(&b.name));
            if desc {
                collectors.reverse();
            }
        }
        Some(("created_at", true)) => {
            collectors.sort_by_key(|collector| std::cmp::Reverse(collector.created_at));
        }
        _ => collectors.sort_by_key(|collector| collector.created_at),
    }

    Json(paginate(
        collectors,
        &list,
        state.default_page_size,
        state.max_page_size,
    ))
}

async fn get_collector(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collector>, AppError> {
    let collector = state
        .collectors
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("collector {id} not found")))?;

    Ok(Json(collector.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateCollectorBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub status: Option<CollectorStatus>,
}

async fn update_collector(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateCollectorBody>,
) -> Result<Json<Collector>, AppError> {
    let mut validator = Validator::new();
    if let Some(name) = &payload.name {
        validator.require_non_empty("name", name);
        validator.require_max_len("name", name, 100);
    }
    if let Some(email) = &payload.email {
        validator.require_email("email", email);
    }
    if let Some(city) = &payload.city {
        validator.require_non_empty("city", city);
    }
    validator.finish()?;

    let mut collector = state
        .collectors
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("collector {id} not found")))?;

    if let Some(name) = payload.name {
        collector.name = name;
    }
    if let Some(email) = payload.email {
        collector.email = email;
    }
    if let Some(phone) = payload.phone {
        collector.phone = phone;
    }
    if let Some(city) = payload.city {
        collector.city = city;
    }
    if let Some(status) = payload.status {
        collector.status = status;
    }
    collector.updated_at = Utc::now();

    Ok(Json(collector.clone()))
}

/// Removing a collector releases its truck. The record is claimed first;
/// once it is gone no racing bind can re-pair it, so the truck side can be
/// cleared without leaving a dangling holder.
async fn delete_collector(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (_, collector) = state
        .collectors
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("collector {id} not found")))?;

    if let Some(truck_id) = collector.truck_id {
        pairing::release_truck_of_removed(&state, id, truck_id);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UpdateLocationBody {
    pub location: GeoPoint,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateLocationBody>,
) -> Result<Json<Collector>, AppError> {
    let mut collector = state
        .collectors
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("collector {id} not found")))?;

    let now = Utc::now();
    collector.last_location = Some(payload.location);
    collector.last_seen_at = Some(now);
    collector.updated_at = now;

    Ok(Json(collector.clone()))
}

async fn get_performance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<performance::PerformanceSummary>, AppError> {
    let summary = performance::summarize(&state, id)?;

    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct BindTruckBody {
    pub truck_id: Uuid,
}

async fn bind_truck(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<BindTruckBody>,
) -> Result<Json<PairResponse>, AppError> {
    let (collector, truck) = pairing::bind(&state, id, payload.truck_id)?;

    Ok(Json(PairResponse { collector, truck }))
}

async fn unbind_truck(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collector>, AppError> {
    let collector = pairing::unbind(&state, id)?;

    Ok(Json(collector))
}
