use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::GeoPoint;

/// Forward-only lifecycle: Pending -> Assigned -> Collected | Skipped.
/// Collected and Skipped are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BinStatus {
    Pending,
    Assigned,
    Collected,
    Skipped,
}

impl BinStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BinStatus::Collected | BinStatus::Skipped)
    }
}

/// Terminal outcome reported from the field for an assigned bin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Outcome {
    Collected,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BinType {
    Household,
    Recycling,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

/// An approved, dispatchable collection task tied to a physical location.
///
/// `request_id` is set exactly when the bin was minted by approving a pickup
/// request; operator-created bins carry no provenance. Both `collector_id`
/// and `request_id` are lookup-only references resolved through the store,
/// never owning pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub id: Uuid,
    pub location: String,
    pub city: String,
    pub coordinates: Option<GeoPoint>,
    pub status: BinStatus,
    pub bin_type: BinType,
    pub priority: Priority,
    pub notes: Option<String>,
    pub collector_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub reported_by: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub collected_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
