use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TruckStatus {
    Active,
    Maintenance,
    Inactive,
    InUse,
}

/// A vehicle resource. `plate_number` is unique across the fleet.
/// `assigned_to` mirrors the holding collector's `truck_id` and is mutated
/// only by the pairing module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Truck {
    pub id: Uuid,
    pub plate_number: String,
    pub capacity: u32,
    pub status: TruckStatus,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
