//! Read-side projection of a collector's track record. The bin list is the
//! source of truth; the cached counters on the collector record are reported
//! alongside but never feed the rate.

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::bin::BinStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PerformanceSummary {
    pub collector_id: Uuid,
    pub total_collected: u32,
    pub total_skipped: u32,
    pub terminal_bins: u32,
    /// collected / (collected + skipped), rounded to a whole percent.
    /// Zero when the collector has no terminal bins yet.
    pub success_rate_percent: u32,
    pub average_rating: f64,
}

pub fn summarize(state: &AppState, collector_id: Uuid) -> Result<PerformanceSummary, AppError> {
    let (bin_ids, average_rating) = {
        let collector = state
            .collectors
            .get(&collector_id)
            .ok_or_else(|| AppError::NotFound(format!("collector {collector_id} not found")))?;
        (
            collector.assigned_bins.clone(),
            collector.performance.average_rating,
        )
    };

    let mut collected = 0u32;
    let mut skipped = 0u32;
    for bin_id in bin_ids {
        if let Some(bin) = state.bins.get(&bin_id) {
            match bin.status {
                BinStatus::Collected => collected += 1,
                BinStatus::Skipped => skipped += 1,
                BinStatus::Pending | BinStatus::Assigned => {}
            }
        }
    }

    let terminal = collected + skipped;
    let success_rate_percent = if terminal == 0 {
        0
    } else {
        ((f64::from(collected) / f64::from(terminal)) * 100.0).round() as u32
    };

    Ok(PerformanceSummary {
        collector_id,
        total_collected: collected,
        total_skipped: skipped,
        terminal_bins: terminal,
        success_rate_percent,
        average_rating,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::summarize;
    use crate::error::AppError;
    use crate::models::bin::{Bin, BinStatus, BinType, Priority};
    use crate::models::collector::{Collector, CollectorStatus, Performance};
    use crate::state::AppState;

    fn seed_collector_with_bins(state: &AppState, statuses: &[BinStatus]) -> Uuid {
        let collector_id = Uuid::new_v4();
        let mut assigned = Vec::new();

        for status in statuses {
            let bin_id = Uuid::new_v4();
            state.bins.insert(
                bin_id,
                Bin {
                    id: bin_id,
                    location: "12 Lotus Ave, Galle".to_string(),
                    city: "Galle".to_string(),
                    coordinates: None,
                    status: *status,
                    bin_type: BinType::Household,
                    priority: Priority::Normal,
                    notes: None,
                    collector_id: Some(collector_id),
                    request_id: None,
                    reported_by: None,
                    reported_at: Utc::now(),
                    collected_at: None,
                    updated_at: None,
                },
            );
            assigned.push(bin_id);
        }

        state.collectors.insert(
            collector_id,
            Collector {
                id: collector_id,
                name: "Anil".to_string(),
                email: "anil@depot.test".to_string(),
                phone: "0770000000".to_string(),
                city: "Galle".to_string(),
                status: CollectorStatus::Active,
                truck_id: None,
                assigned_bins: assigned,
                last_location: None,
                last_seen_at: None,
                performance: Performance::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        collector_id
    }

    #[test]
    fn no_terminal_bins_yields_zero_rate_not_a_division_error() {
        let state = AppState::new(25, 200);
        let id = seed_collector_with_bins(&state, &[BinStatus::Pending, BinStatus::Assigned]);

        let summary = summarize(&state, id).unwrap();
        assert_eq!(summary.terminal_bins, 0);
        assert_eq!(summary.success_rate_percent, 0);
    }

    #[test]
    fn rate_is_collected_over_terminal_rounded_to_whole_percent() {
        let state = AppState::new(25, 200);
        let id = seed_collector_with_bins(
            &state,
            &[BinStatus::Collected, BinStatus::Skipped, BinStatus::Skipped],
        );

        let summary = summarize(&state, id).unwrap();
        assert_eq!(summary.total_collected, 1);
        assert_eq!(summary.total_skipped, 2);
        assert_eq!(summary.success_rate_percent, 33);
    }

    #[test]
    fn open_bins_do_not_dilute_the_rate() {
        let state = AppState::new(25, 200);
        let id = seed_collector_with_bins(
            &state,
            &[
                BinStatus::Collected,
                BinStatus::Collected,
                BinStatus::Pending,
                BinStatus::Assigned,
            ],
        );

        let summary = summarize(&state, id).unwrap();
        assert_eq!(summary.success_rate_percent, 100);
    }

    #[test]
    fn unknown_collector_is_not_found() {
        let state = AppState::new(25, 200);
        let err = summarize(&state, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
