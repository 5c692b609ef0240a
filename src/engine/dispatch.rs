//! Request and bin lifecycles. Approval is the only place a bin gains a
//! request reference, so each approved request ends up with exactly one bin.
//! Bin status only moves forward: Pending -> Assigned -> Collected | Skipped.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::bin::{Bin, BinStatus, BinType, Outcome, Priority};
use crate::models::collector::CollectorStatus;
use crate::models::request::{PickupRequest, RequestStatus, WasteCategory};
use crate::state::AppState;

/// Last non-empty, trimmed, comma-separated segment of the address.
/// An address with no usable segment maps to "Unknown".
pub fn derive_city(address: &str) -> String {
    address
        .rsplit(',')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Confirms a pending request and mints its collection bin. Re-approving a
/// request that already left `Pending` is a conflict; anything else would
/// mint a second bin for the same request.
pub fn approve(
    state: &AppState,
    request_id: Uuid,
    notes: Option<String>,
) -> Result<(PickupRequest, Bin), AppError> {
    let mut request = state
        .requests
        .get_mut(&request_id)
        .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

    if request.status != RequestStatus::Pending {
        return Err(AppError::Conflict(format!(
            "request {request_id} is {:?}, only pending requests can be approved",
            request.status
        )));
    }

    let now = Utc::now();
    request.status = RequestStatus::Confirmed;
    request.updated_at = now;
    if let Some(extra) = notes {
        request.notes = Some(match request.notes.take() {
            Some(existing) => format!("{existing}\n{extra}"),
            None => extra,
        });
    }

    let bin_type = if request.category == WasteCategory::Recyclable {
        BinType::Recycling
    } else {
        BinType::Household
    };

    let bin = Bin {
        id: Uuid::new_v4(),
        location: request.address.clone(),
        city: derive_city(&request.address),
        coordinates: request.coordinates,
        status: BinStatus::Pending,
        bin_type,
        priority: Priority::Normal,
        notes: Some(format!("created from pickup request {request_id}")),
        collector_id: None,
        request_id: Some(request_id),
        reported_by: Some(request.requester.name.clone()),
        reported_at: now,
        collected_at: None,
        updated_at: None,
    };
    state.bins.insert(bin.id, bin.clone());

    state.metrics.approvals_total.inc();
    info!(request_id = %request_id, bin_id = %bin.id, city = %bin.city, "request approved");

    Ok((request.clone(), bin))
}

/// Permanently removes a rejected request. No tombstone is kept and no bin
/// is touched.
pub fn reject(state: &AppState, request_id: Uuid) -> Result<Uuid, AppError> {
    let (id, _removed) = state
        .requests
        .remove(&request_id)
        .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

    state.metrics.rejections_total.inc();
    info!(request_id = %id, "request rejected and removed");

    Ok(id)
}

/// Hands a pending bin to a collector. The collector must already hold a
/// truck; field work without a vehicle is a dispatch error, not a soft state.
/// On conflict every record is left exactly as it was.
pub fn assign_collector(state: &AppState, bin_id: Uuid, collector_id: Uuid) -> Result<Bin, AppError> {
    // lock order: bins before collectors
    let mut bin = state
        .bins
        .get_mut(&bin_id)
        .ok_or_else(|| AppError::NotFound(format!("bin {bin_id} not found")))?;
    let mut collector = state
        .collectors
        .get_mut(&collector_id)
        .ok_or_else(|| AppError::NotFound(format!("collector {collector_id} not found")))?;

    if bin.status != BinStatus::Pending {
        return Err(AppError::Conflict(format!(
            "bin {bin_id} is {:?}, only pending bins can be assigned",
            bin.status
        )));
    }
    if collector.truck_id.is_none() {
        return Err(AppError::Conflict(format!(
            "collector {collector_id} has no truck paired"
        )));
    }

    let now = Utc::now();
    bin.collector_id = Some(collector_id);
    bin.status = BinStatus::Assigned;
    bin.updated_at = Some(now);

    if !collector.assigned_bins.contains(&bin_id) {
        collector.assigned_bins.push(bin_id);
    }
    collector.status = CollectorStatus::OnDuty;
    collector.updated_at = now;

    state.metrics.assignments_total.inc();
    info!(bin_id = %bin_id, collector_id = %collector_id, "bin assigned");

    Ok(bin.clone())
}

/// Advances an assigned bin to its terminal state and bumps the owning
/// collector's cached counters. Bin and collector guards are held together
/// so no reader sees the transition without the counter update.
pub fn report_outcome(state: &AppState, bin_id: Uuid, outcome: Outcome) -> Result<Bin, AppError> {
    let mut bin = state
        .bins
        .get_mut(&bin_id)
        .ok_or_else(|| AppError::NotFound(format!("bin {bin_id} not found")))?;

    if bin.status != BinStatus::Assigned {
        return Err(AppError::Conflict(format!(
            "bin {bin_id} is {:?}, only assigned bins can report an outcome",
            bin.status
        )));
    }

    let now = Utc::now();
    match outcome {
        Outcome::Collected => {
            bin.status = BinStatus::Collected;
            bin.collected_at = Some(now);
        }
        Outcome::Skipped => {
            bin.status = BinStatus::Skipped;
        }
    }
    bin.updated_at = Some(now);

    if let Some(collector_id) = bin.collector_id {
        if let Some(mut collector) = state.collectors.get_mut(&collector_id) {
            match outcome {
                Outcome::Collected => collector.performance.total_collections += 1,
                Outcome::Skipped => collector.performance.total_skipped += 1,
            }
            collector.status = CollectorStatus::Idle;
            collector.updated_at = now;
        }
    }

    let label = match outcome {
        Outcome::Collected => "collected",
        Outcome::Skipped => "skipped",
    };
    state.metrics.outcomes_total.with_label_values(&[label]).inc();
    info!(bin_id = %bin_id, outcome = label, "outcome reported");

    Ok(bin.clone())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{approve, assign_collector, derive_city, reject, report_outcome};
    use crate::error::AppError;
    use crate::models::bin::{Bin, BinStatus, BinType, Outcome, Priority};
    use crate::models::collector::{Collector, CollectorStatus, Performance};
    use crate::models::request::{PickupRequest, RequestStatus, Requester, WasteCategory};
    use crate::state::AppState;

    fn seed_request(state: &AppState, address: &str, category: WasteCategory) -> Uuid {
        let id = Uuid::new_v4();
        state.requests.insert(
            id,
            PickupRequest {
                id,
                requester: Requester {
                    name: "Nimal Perera".to_string(),
                    email: "nimal@example.com".to_string(),
                    phone: "0771234567".to_string(),
                },
                address: address.to_string(),
                coordinates: None,
                category,
                description: "old cardboard".to_string(),
                type_price: 200.0,
                delivery_fee: 50.0,
                total_price: 250.0,
                status: RequestStatus::Pending,
                notes: None,
                rating: None,
                submitted_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    fn seed_collector(state: &AppState, with_truck: bool) -> Uuid {
        let id = Uuid::new_v4();
        state.collectors.insert(
            id,
            Collector {
                id,
                name: "Anil".to_string(),
                email: "anil@depot.test".to_string(),
                phone: "0770000000".to_string(),
                city: "Galle".to_string(),
                status: CollectorStatus::Active,
                truck_id: with_truck.then(Uuid::new_v4),
                assigned_bins: Vec::new(),
                last_location: None,
                last_seen_at: None,
                performance: Performance::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    fn seed_pending_bin(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        state.bins.insert(
            id,
            Bin {
                id,
                location: "12 Lotus Ave, Galle".to_string(),
                city: "Galle".to_string(),
                coordinates: None,
                status: BinStatus::Pending,
                bin_type: BinType::Household,
                priority: Priority::Normal,
                notes: None,
                collector_id: None,
                request_id: None,
                reported_by: None,
                reported_at: Utc::now(),
                collected_at: None,
                updated_at: None,
            },
        );
        id
    }

    #[test]
    fn city_is_the_last_comma_segment() {
        assert_eq!(derive_city("12 Lotus Ave, Galle"), "Galle");
        assert_eq!(derive_city("flat 3, 9 Temple Rd, Kandy "), "Kandy");
        assert_eq!(derive_city("no commas here"), "no commas here");
    }

    #[test]
    fn city_skips_empty_trailing_segments() {
        assert_eq!(derive_city("12 Lotus Ave, Galle, "), "Galle");
        assert_eq!(derive_city(",,, "), "Unknown");
        assert_eq!(derive_city(""), "Unknown");
    }

    #[test]
    fn approve_mints_exactly_one_bin_with_provenance() {
        let state = AppState::new(25, 200);
        let request_id = seed_request(&state, "12 Lotus Ave, Galle", WasteCategory::Recyclable);

        let (request, bin) = approve(&state, request_id, None).unwrap();

        assert_eq!(request.status, RequestStatus::Confirmed);
        assert_eq!(bin.request_id, Some(request_id));
        assert_eq!(bin.city, "Galle");
        assert_eq!(bin.bin_type, BinType::Recycling);
        assert_eq!(bin.status, BinStatus::Pending);
        assert_eq!(bin.location, "12 Lotus Ave, Galle");
        assert_eq!(bin.reported_by.as_deref(), Some("Nimal Perera"));

        let minted: Vec<_> = state
            .bins
            .iter()
            .filter(|entry| entry.value().request_id == Some(request_id))
            .collect();
        assert_eq!(minted.len(), 1);
    }

    #[test]
    fn organic_requests_become_household_bins() {
        let state = AppState::new(25, 200);
        let request_id = seed_request(&state, "5 Ocean Dr, Matara", WasteCategory::Organic);

        let (_, bin) = approve(&state, request_id, None).unwrap();
        assert_eq!(bin.bin_type, BinType::Household);
    }

    #[test]
    fn approve_appends_admin_notes() {
        let state = AppState::new(25, 200);
        let request_id = seed_request(&state, "12 Lotus Ave, Galle", WasteCategory::Other);

        let (request, _) = approve(&state, request_id, Some("crew of two".to_string())).unwrap();
        assert_eq!(request.notes.as_deref(), Some("crew of two"));
    }

    #[test]
    fn approving_twice_conflicts_and_mints_no_second_bin() {
        let state = AppState::new(25, 200);
        let request_id = seed_request(&state, "12 Lotus Ave, Galle", WasteCategory::Organic);

        approve(&state, request_id, None).unwrap();
        let err = approve(&state, request_id, None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.bins.len(), 1);
    }

    #[test]
    fn approve_missing_request_is_not_found() {
        let state = AppState::new(25, 200);
        let err = approve(&state, Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn reject_removes_the_request_for_good() {
        let state = AppState::new(25, 200);
        let request_id = seed_request(&state, "12 Lotus Ave, Galle", WasteCategory::Organic);

        let deleted = reject(&state, request_id).unwrap();
        assert_eq!(deleted, request_id);
        assert!(state.requests.get(&request_id).is_none());

        let err = reject(&state, request_id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn assign_moves_a_pending_bin_to_assigned() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let collector_id = seed_collector(&state, true);

        let bin = assign_collector(&state, bin_id, collector_id).unwrap();
        assert_eq!(bin.status, BinStatus::Assigned);
        assert_eq!(bin.collector_id, Some(collector_id));

        let collector = state.collectors.get(&collector_id).unwrap();
        assert!(collector.assigned_bins.contains(&bin_id));
        assert_eq!(collector.status, CollectorStatus::OnDuty);
    }

    #[test]
    fn assign_requires_a_paired_truck() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let collector_id = seed_collector(&state, false);

        let err = assign_collector(&state, bin_id, collector_id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let bin = state.bins.get(&bin_id).unwrap();
        assert_eq!(bin.status, BinStatus::Pending);
        assert!(bin.collector_id.is_none());
    }

    #[test]
    fn assigning_an_already_assigned_bin_conflicts_and_changes_nothing() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let first = seed_collector(&state, true);
        let second = seed_collector(&state, true);

        assign_collector(&state, bin_id, first).unwrap();
        let err = assign_collector(&state, bin_id, second).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let bin = state.bins.get(&bin_id).unwrap();
        assert_eq!(bin.collector_id, Some(first));
        let loser = state.collectors.get(&second).unwrap();
        assert!(loser.assigned_bins.is_empty());
    }

    #[test]
    fn collected_outcome_stamps_collected_at_and_bumps_counter() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let collector_id = seed_collector(&state, true);
        assign_collector(&state, bin_id, collector_id).unwrap();

        let bin = report_outcome(&state, bin_id, Outcome::Collected).unwrap();
        assert_eq!(bin.status, BinStatus::Collected);
        assert!(bin.collected_at.is_some());

        let collector = state.collectors.get(&collector_id).unwrap();
        assert_eq!(collector.performance.total_collections, 1);
        assert_eq!(collector.performance.total_skipped, 0);
        assert_eq!(collector.status, CollectorStatus::Idle);
    }

    #[test]
    fn skipped_outcome_stamps_updated_at_only() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let collector_id = seed_collector(&state, true);
        assign_collector(&state, bin_id, collector_id).unwrap();

        let bin = report_outcome(&state, bin_id, Outcome::Skipped).unwrap();
        assert_eq!(bin.status, BinStatus::Skipped);
        assert!(bin.collected_at.is_none());
        assert!(bin.updated_at.is_some());

        let collector = state.collectors.get(&collector_id).unwrap();
        assert_eq!(collector.performance.total_skipped, 1);
    }

    #[test]
    fn outcome_for_an_unassigned_or_terminal_bin_conflicts() {
        let state = AppState::new(25, 200);
        let bin_id = seed_pending_bin(&state);
        let collector_id = seed_collector(&state, true);

        // never assigned
        let err = report_outcome(&state, bin_id, Outcome::Collected).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assign_collector(&state, bin_id, collector_id).unwrap();
        report_outcome(&state, bin_id, Outcome::Collected).unwrap();

        // terminal bins never leave their state
        let err = report_outcome(&state, bin_id, Outcome::Skipped).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let bin = state.bins.get(&bin_id).unwrap();
        assert_eq!(bin.status, BinStatus::Collected);

        let collector = state.collectors.get(&collector_id).unwrap();
        assert_eq!(collector.performance.total_collections, 1);
        assert_eq!(collector.performance.total_skipped, 0);
    }
}
