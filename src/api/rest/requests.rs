use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::rest::payload::AppJson;
use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::bin::Bin;
use crate::models::request::{PickupRequest, RequestStatus, Requester, WasteCategory};
use crate::models::GeoPoint;
use crate::state::AppState;
use crate::store::query::{paginate, ListQuery, Paged};
use crate::store::validate::Validator;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route(
            "/requests/:id",
            get(get_request)
                .patch(update_request)
                .delete(delete_request),
        )
        .route("/requests/:id/approve", put(approve_request))
        .route("/requests/:id/reject", put(reject_request))
}

#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub requester: Requester,
    pub address: String,
    pub coordinates: Option<GeoPoint>,
    pub category: WasteCategory,
    pub description: String,
    pub type_price: f64,
    pub delivery_fee: f64,
    pub notes: Option<String>,
    pub submitted_by: Option<Uuid>,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateRequestBody>,
) -> Result<(StatusCode, Json<PickupRequest>), AppError> {
    let mut validator = Validator::new();
    validator.require_non_empty("requester.name", &payload.requester.name);
    validator.require_max_len("requester.name", &payload.requester.name, 100);
    validator.require_email("requester.email", &payload.requester.email);
    validator.require_non_empty("requester.phone", &payload.requester.phone);
    validator.require_non_empty("address", &payload.address);
    validator.require_max_len("address", &payload.address, 300);
    validator.require_max_len("description", &payload.description, 1000);
    validator.require_non_negative("type_price", payload.type_price);
    validator.require_non_negative("delivery_fee", payload.delivery_fee);
    validator.finish()?;

    let now = Utc::now();
    let request = PickupRequest {
        id: Uuid::new_v4(),
        requester: payload.requester,
        address: payload.address,
        coordinates: payload.coordinates,
        category: payload.category,
        description: payload.description,
        type_price: payload.type_price,
        delivery_fee: payload.delivery_fee,
        // never taken from the client
        total_price: payload.type_price + payload.delivery_fee,
        status: RequestStatus::Pending,
        notes: payload.notes,
        rating: None,
        submitted_by: payload.submitted_by,
        created_at: now,
        updated_at: now,
    };

    state.requests.insert(request.id, request.clone());
    tracing::info!(request_id = %request.id, total_price = request.total_price, "request submitted");

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Deserialize)]
pub struct RequestListQuery {
    pub status: Option<RequestStatus>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequestListQuery>,
) -> Json<Paged<PickupRequest>> {
    let mut requests: Vec<PickupRequest> = state
        .requests
        .iter()
        .filter(|entry| {
            query
                .status
                .as_ref()
                .is_none_or(|status| entry.value().status == *status)
        })
        .map(|entry| entry.value().clone())
        .collect();

    let list = ListQuery {
        page: query.page,
        per_page: query.per_page,
        sort: query.sort,
    };
    match list.sort_key() {
        Some(("total_price", desc)) => {
            requests.sort_by(|a, b| a.total_price.total_cmp(&b.total_price));
            if desc {
                requests.reverse();
            }
        }
        Some(("created_at", true)) => {
            requests.sort_by_key(|request| std::cmp::Reverse(request.created_at));
        }
        // unknown sort fields fall back to submission order
        _ => requests.sort_by_key(|request| request.created_at),
    }

    Json(paginate(
        requests,
        &list,
        state.default_page_size,
        state.max_page_size,
    ))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    Ok(Json(request.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateRequestBody {
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<RequestStatus>,
    pub rating: Option<f64>,
    pub coordinates: Option<GeoPoint>,
}

async fn update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateRequestBody>,
) -> Result<Json<PickupRequest>, AppError> {
    let mut validator = Validator::new();
    if let Some(description) = &payload.description {
        validator.require_max_len("description", description, 1000);
    }
    if let Some(rating) = payload.rating {
        validator.require_range_f64("rating", rating, 0.0, 5.0);
    }
    validator.finish()?;

    let mut request = state
        .requests
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    // absent fields are left untouched
    if let Some(description) = payload.description {
        request.description = description;
    }
    if let Some(notes) = payload.notes {
        request.notes = Some(notes);
    }
    if let Some(status) = payload.status {
        request.status = status;
    }
    if let Some(rating) = payload.rating {
        request.rating = Some(rating);
    }
    if let Some(coordinates) = payload.coordinates {
        request.coordinates = Some(coordinates);
    }
    request.updated_at = Utc::now();

    Ok(Json(request.clone()))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .requests
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Default)]
pub struct ApproveBody {
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub request: PickupRequest,
    pub bin: Bin,
}

async fn approve_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApproveBody>>,
) -> Result<Json<ApproveResponse>, AppError> {
    let notes = payload.and_then(|Json(body)| body.notes);
    let (request, bin) = dispatch::approve(&state, id, notes)?;

    Ok(Json(ApproveResponse { request, bin }))
}

async fn reject_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = dispatch::reject(&state, id)?;

    Ok(Json(json!({ "deleted_request_id": deleted })))
}
