use dashmap::DashMap;
use uuid::Uuid;

use crate::models::bin::Bin;
use crate::models::collector::Collector;
use crate::models::request::PickupRequest;
use crate::models::truck::Truck;
use crate::observability::metrics::Metrics;

/// Entity store: one table per record type. Cross-entity mutations must hold
/// the entry guards of everything they touch at once, in the global lock
/// order bins -> collectors -> trucks, so concurrent writers serialize and
/// readers never see a half-applied pairing or transition.
pub struct AppState {
    pub requests: DashMap<Uuid, PickupRequest>,
    pub bins: DashMap<Uuid, Bin>,
    pub collectors: DashMap<Uuid, Collector>,
    pub trucks: DashMap<Uuid, Truck>,
    /// Lowercased plate -> truck id. A plate is claimed here via `entry()`
    /// before the truck record exists, which is what makes plate uniqueness
    /// hold under racing creates. Never touch this map while holding a
    /// trucks entry guard.
    pub plates: DashMap<String, Uuid>,
    pub metrics: Metrics,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl AppState {
    pub fn new(default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            requests: DashMap::new(),
            bins: DashMap::new(),
            collectors: DashMap::new(),
            trucks: DashMap::new(),
            plates: DashMap::new(),
            metrics: Metrics::new(),
            default_page_size,
            max_page_size,
        }
    }
}
