use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WasteCategory {
    Organic,
    Recyclable,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RequestStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// Contact details of the citizen who filed the request. Submission may be
/// anonymous, in which case `submitted_by` on the request stays empty but the
/// contact block is still required so the crew can reach someone on site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A citizen-submitted ask for waste pickup, prior to administrative approval.
///
/// `total_price` is always `type_price + delivery_fee`, recomputed when the
/// request is created; it is never accepted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: Uuid,
    pub requester: Requester,
    /// Free-text address. The last comma-delimited token is treated as the
    /// city when the request is approved into a bin.
    pub address: String,
    pub coordinates: Option<GeoPoint>,
    pub category: WasteCategory,
    pub description: String,
    pub type_price: f64,
    pub delivery_fee: f64,
    pub total_price: f64,
    pub status: RequestStatus,
    pub notes: Option<String>,
    /// Post-completion feedback from the requester, 0.0..=5.0.
    pub rating: Option<f64>,
    pub submitted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
