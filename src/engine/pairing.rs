//! The collector<->truck pairing. Both sides of the pointer are owned here:
//! nothing else in the crate writes `Collector::truck_id` or
//! `Truck::assigned_to`. Every operation holds both entry guards at once
//! (collectors before trucks, per the global lock order) so racing binds for
//! the same truck serialize and exactly one wins.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::collector::Collector;
use crate::models::truck::{Truck, TruckStatus};
use crate::state::AppState;

/// Binds a collector to a truck. Re-binding the pair that already exists is
/// a no-op success; any other occupied side is a conflict.
pub fn bind(
    state: &AppState,
    collector_id: Uuid,
    truck_id: Uuid,
) -> Result<(Collector, Truck), AppError> {
    let mut collector = state
        .collectors
        .get_mut(&collector_id)
        .ok_or_else(|| AppError::NotFound(format!("collector {collector_id} not found")))?;
    let mut truck = state
        .trucks
        .get_mut(&truck_id)
        .ok_or_else(|| AppError::NotFound(format!("truck {truck_id} not found")))?;

    if let Some(holder) = truck.assigned_to {
        if holder != collector_id {
            return Err(AppError::Conflict(format!(
                "truck {truck_id} is already assigned to collector {holder}"
            )));
        }
    }
    if let Some(held) = collector.truck_id {
        if held != truck_id {
            return Err(AppError::Conflict(format!(
                "collector {collector_id} already holds truck {held}"
            )));
        }
    }

    let freshly_bound = truck.assigned_to.is_none();
    let now = Utc::now();

    collector.truck_id = Some(truck_id);
    collector.updated_at = now;
    truck.assigned_to = Some(collector_id);
    truck.status = TruckStatus::InUse;
    truck.updated_at = now;

    if freshly_bound {
        state.metrics.trucks_paired.inc();
        info!(collector_id = %collector_id, truck_id = %truck_id, "truck paired");
    }

    Ok((collector.clone(), truck.clone()))
}

/// Clears both sides of the pairing. Already-unbound collectors are a no-op
/// success, not an error.
pub fn unbind(state: &AppState, collector_id: Uuid) -> Result<Collector, AppError> {
    let mut collector = state
        .collectors
        .get_mut(&collector_id)
        .ok_or_else(|| AppError::NotFound(format!("collector {collector_id} not found")))?;

    let Some(truck_id) = collector.truck_id.take() else {
        return Ok(collector.clone());
    };

    collector.updated_at = Utc::now();
    if let Some(mut truck) = state.trucks.get_mut(&truck_id) {
        truck.assigned_to = None;
        truck.status = TruckStatus::Active;
        truck.updated_at = collector.updated_at;
    }

    state.metrics.trucks_paired.dec();
    info!(collector_id = %collector_id, truck_id = %truck_id, "truck unpaired");

    Ok(collector.clone())
}

/// Clears the truck side of a pairing whose collector record has already
/// been removed from the store. With the record gone no bind can re-pair it,
/// so the cleanup cannot race a concurrent `bind`.
pub fn release_truck_of_removed(state: &AppState, collector_id: Uuid, truck_id: Uuid) {
    if let Some(mut truck) = state.trucks.get_mut(&truck_id) {
        if truck.assigned_to == Some(collector_id) {
            truck.assigned_to = None;
            truck.status = TruckStatus::Active;
            truck.updated_at = Utc::now();
            state.metrics.trucks_paired.dec();
            info!(collector_id = %collector_id, truck_id = %truck_id, "truck released");
        }
    }
}

/// All trucks with no holder, used to gate collector registration.
pub fn available_trucks(state: &AppState) -> Vec<Truck> {
    state
        .trucks
        .iter()
        .filter(|entry| entry.value().assigned_to.is_none())
        .map(|entry| entry.value().clone())
        .collect()
}
