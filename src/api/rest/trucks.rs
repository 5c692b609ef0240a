use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::payload::AppJson;
use crate::engine::pairing;
use crate::error::{AppError, FieldError};
use crate::models::truck::{Truck, TruckStatus};
use crate::state::AppState;
use crate::store::query::{paginate, ListQuery, Paged};
use crate::store::validate::Validator;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trucks", get(list_trucks).post(create_truck))
        .route("/trucks/available", get(available_trucks))
        .route(
            "/trucks/:id",
            get(get_truck).patch(update_truck).delete(delete_truck),
        )
}

#[derive(Deserialize)]
pub struct CreateTruckBody {
    pub plate_number: String,
    pub capacity: u32,
}

async fn create_truck(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateTruckBody>,
) -> Result<(StatusCode, Json<Truck>), AppError> {
    let plate = payload.plate_number.trim().to_string();

    let mut validator = Validator::new();
    validator.require_non_empty("plate_number", &plate);
    validator.require_max_len("plate_number", &plate, 20);
    validator.require_positive_u32("capacity", payload.capacity);
    validator.finish()?;

    let id = Uuid::new_v4();

    // claim the plate before the record exists; racing creates for the same
    // plate serialize on this entry and exactly one wins
    match state.plates.entry(plate.to_ascii_lowercase()) {
        Entry::Occupied(_) => {
            return Err(AppError::ValidationFailed(vec![FieldError::new(
                "plate_number",
                "already registered",
            )]));
        }
        Entry::Vacant(slot) => {
            slot.insert(id);
        }
    }

    let now = Utc::now();
    let truck = Truck {
        id,
        plate_number: plate,
        capacity: payload.capacity,
        status: TruckStatus::Active,
        assigned_to: None,
        created_at: now,
        updated_at: now,
    };

    state.trucks.insert(truck.id, truck.clone());
    tracing::info!(truck_id = %truck.id, plate = %truck.plate_number, "truck registered");

    Ok((StatusCode::CREATED, Json(truck)))
}

#[derive(Deserialize)]
pub struct TruckListQuery {
    pub status: Option<TruckStatus>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

async fn list_trucks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TruckListQuery>,
) -> Json<Paged<Truck>> {
    let mut trucks: Vec<Truck> = state
        .trucks
        .iter()
        .filter(|entry| query.status.is_none_or(|status| entry.value().status == status))
        .map(|entry| entry.value().clone())
        .collect();

    let list = ListQuery {
        page: query.page,
        per_page: query.per_page,
        sort: query.sort,
    };
    match list.sort_key() {
        Some(("plate_number", desc)) => {
            trucks.sort_by(|a, b| a.plate_number.cmp(&b.plate_number));
            if desc {
                trucks.reverse();
            }
        }
        _ => trucks.sort_by_key(|truck| truck.created_at),
    }

    Json(paginate(
        trucks,
        &list,
        state.default_page_size,
        state.max_page_size,
    ))
}

async fn available_trucks(State(state): State<Arc<AppState>>) -> Json<Vec<Truck>> {
    Json(pairing::available_trucks(&state))
}

async fn get_truck(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Truck>, AppError> {
    let truck = state
        .trucks
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("truck {id} not found")))?;

    Ok(Json(truck.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateTruckBody {
    pub plate_number: Option<String>,
    pub capacity: Option<u32>,
    pub status: Option<TruckStatus>,
}

async fn update_truck(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateTruckBody>,
) -> Result<Json<Truck>, AppError> {
    let plate = payload.plate_number.map(|plate| plate.trim().to_string());

    let mut validator = Validator::new();
    if let Some(plate) = &plate {
        validator.require_non_empty("plate_number", plate);
        validator.require_max_len("plate_number", plate, 20);
    }
    if let Some(capacity) = payload.capacity {
        validator.require_positive_u32("capacity", capacity);
    }
    validator.finish()?;

    // claim the new plate before touching the record; the index is never
    // mutated while a trucks guard is held
    let mut claimed = None;
    if let Some(plate) = &plate {
        let key = plate.to_ascii_lowercase();
        match state.plates.entry(key.clone()) {
            Entry::Occupied(slot) if *slot.get() != id => {
                return Err(AppError::ValidationFailed(vec![FieldError::new(
                    "plate_number",
                    "already registered",
                )]));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id);
                claimed = Some(key);
            }
        }
    }
    let release_claim = |claimed: &Option<String>| {
        if let Some(key) = claimed {
            state.plates.remove_if(key, |_, owner| *owner == id);
        }
    };

    let mut released_key = None;
    let updated = {
        let Some(mut truck) = state.trucks.get_mut(&id) else {
            release_claim(&claimed);
            return Err(AppError::NotFound(format!("truck {id} not found")));
        };

        if let Some(status) = payload.status {
            // in-use reflects the pairing and is owned by the pairing module
            if truck.assigned_to.is_some() {
                drop(truck);
                release_claim(&claimed);
                return Err(AppError::Conflict(format!(
                    "truck {id} is paired; unbind the collector before changing its status"
                )));
            }
            truck.status = status;
        }
        if let Some(plate) = plate {
            let old_key = truck.plate_number.to_ascii_lowercase();
            if old_key != plate.to_ascii_lowercase() {
                released_key = Some(old_key);
            }
            truck.plate_number = plate;
        }
        if let Some(capacity) = payload.capacity {
            truck.capacity = capacity;
        }
        truck.updated_at = Utc::now();
        truck.clone()
    };

    // free the previous plate only after the record carries the new one
    if let Some(old_key) = released_key {
        state.plates.remove_if(&old_key, |_, owner| *owner == id);
    }

    Ok(Json(updated))
}

async fn delete_truck(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // the pairing check has to happen under the removal itself, or a racing
    // bind could slip in between
    let removed = state
        .trucks
        .remove_if(&id, |_, truck| truck.assigned_to.is_none());
    match removed {
        Some((_, truck)) => {
            state
                .plates
                .remove_if(&truck.plate_number.to_ascii_lowercase(), |_, owner| {
                    *owner == truck.id
                });
            Ok(StatusCode::NO_CONTENT)
        }
        None if state.trucks.contains_key(&id) => Err(AppError::Conflict(format!(
            "truck {id} is paired; unbind the collector first"
        ))),
        None => Err(AppError::NotFound(format!("truck {id} not found"))),
    }
}
