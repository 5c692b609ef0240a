pub mod bin;
pub mod collector;
pub mod request;
pub mod truck;

use serde::{Deserialize, Serialize};

/// WGS84 coordinates, optional on most records since citizens rarely supply them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}
