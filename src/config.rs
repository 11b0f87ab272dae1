//! Dataset locations and service tunables.

use std::path::{Path, PathBuf};

use crate::geo_utils::DEFAULT_WALKING_SPEED_MPS;
use crate::Bounds;

/// Grid polygons, one feature per cell with a `grid_id` property.
pub const GRID_FILE: &str = "grid_access_only.geojson";
/// Ranked nearest stops per grid cell.
pub const NEAREST_STOPS_FILE: &str = "grid_nearest_3stops.json";
/// Stop catalog.
pub const STOPS_FILE: &str = "bus_stops_list.json";
/// Slope score per grid cell.
pub const SLOPE_FILE: &str = "grid_slope_score.json";

/// Paths of the four static datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub grid: PathBuf,
    pub nearest_stops: PathBuf,
    pub stops: PathBuf,
    pub slope: PathBuf,
}

impl DataPaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            grid: dir.join(GRID_FILE),
            nearest_stops: dir.join(NEAREST_STOPS_FILE),
            stops: dir.join(STOPS_FILE),
            slope: dir.join(SLOPE_FILE),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

/// Query behaviour shared by every request.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    /// Default: 0.0.0.0
    pub host: String,

    /// Port the HTTP server listens on.
    /// Default: 8000
    pub port: u16,

    /// Walking speed used for stop durations (m/s).
    /// Default: 1.4
    pub walking_speed_mps: f64,

    /// Reject latitudes outside [-90, 90] and longitudes outside [-180, 180]
    /// before locating. Disabling restores the unchecked behaviour where any
    /// input falls through to the nearest centroid.
    /// Default: true
    pub validate_coordinates: bool,

    /// Area listed by the stop catalog when a request gives no bounds.
    /// Default: central Ankara (39.90-39.95N, 32.82-32.90E)
    pub default_bounds: Bounds,

    /// Default and maximum number of stops in a bounded listing.
    /// Default: 100 / 500
    pub list_limit: usize,
    pub max_list_limit: usize,

    /// Default and maximum number of stops in a radius search.
    /// Default: 20 / 100
    pub nearby_limit: usize,
    pub max_nearby_limit: usize,

    /// Default, minimum and maximum radius of a radius search (km).
    /// Default: 1.0 / 0.1 / 5.0
    pub nearby_radius_km: f64,
    pub min_radius_km: f64,
    pub max_radius_km: f64,

    /// Number of grids returned by hotspot aggregation.
    /// Default: 20
    pub max_hotspots: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            walking_speed_mps: DEFAULT_WALKING_SPEED_MPS,
            validate_coordinates: true,
            default_bounds: Bounds {
                min_lat: 39.90,
                max_lat: 39.95,
                min_lon: 32.82,
                max_lon: 32.90,
            },
            list_limit: 100,
            max_list_limit: 500,
            nearby_limit: 20,
            max_nearby_limit: 100,
            nearby_radius_km: 1.0,
            min_radius_km: 0.1,
            max_radius_km: 5.0,
            max_hotspots: 20,
        }
    }
}

impl ServiceConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
