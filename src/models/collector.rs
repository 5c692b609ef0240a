use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CollectorStatus {
    Active,
    Idle,
    Offline,
    OnDuty,
}

/// Cached projection of the collector's bin history. The bin list is the
/// authoritative source; these counters are bumped on every outcome report so
/// list views stay cheap, and the performance endpoint recomputes the rate
/// from the bins themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    pub total_collections: u32,
    pub total_skipped: u32,
    pub average_rating: f64,
}

/// A field operator. Holds at most one truck at a time; the pairing is
/// mirrored on the truck's `assigned_to` and both sides are only ever touched
/// by the pairing module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collector {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub status: CollectorStatus,
    pub truck_id: Option<Uuid>,
    /// Bins currently or historically assigned to this collector.
    pub assigned_bins: Vec<Uuid>,
    pub last_location: Option<GeoPoint>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub performance: Performance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
