//! # Grid Access
//!
//! Grid resolution and nearest-stop ranking for a municipal accessibility service.
//!
//! The city is partitioned into precomputed analysis cells. For any coordinate this
//! library finds the containing cell, then reports the cell's ranked nearest transit
//! stops (with walking distance and duration) and its terrain slope score.
//!
//! This library provides:
//! - Point-in-polygon grid location with a nearest-centroid fallback
//! - Stop ranking with live walking-duration estimates
//! - Stop catalog listing and radius search
//! - Hotspot aggregation of complaint locations per grid cell
//!
//! ## Features
//!
//! - **`parallel`** - Locate hotspot points in parallel with rayon
//! - **`http`** - Enable the axum router and the `grid-access-server` binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use grid_access::{ServiceConfig, SpatialIndex};
//! use grid_access::dataset::{parse_grid_features, parse_nearest_stops, parse_slope_scores, parse_stop_catalog};
//! use std::path::Path;
//!
//! let here = Path::new("inline");
//! let grid = parse_grid_features(here, r#"{"type": "FeatureCollection", "features": [{
//!     "type": "Feature", "properties": {"grid_id": 7},
//!     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
//! }]}"#).unwrap();
//! let nearest = parse_nearest_stops(here, r#"[{"grid_id": 7, "nearest_stops": [{"stop_id": 1, "distance": 500}]}]"#).unwrap();
//! let stops = parse_stop_catalog(here, r#"[{"stop_id": 1, "stop_name": "Central", "lat": 0.5, "lon": 0.5}]"#).unwrap();
//! let slope = parse_slope_scores(here, r#"[{"grid_id": 7, "slope_score": 3.2}]"#).unwrap();
//!
//! let index = SpatialIndex::from_records(grid, nearest, stops, slope).unwrap();
//! let info = index.accessibility_info(0.5, 0.5, &ServiceConfig::default()).unwrap();
//!
//! assert_eq!(info.grid_id, 7);
//! assert_eq!(info.nearest_stops[0].duration_min, 5.95);
//! ```

use serde::{Deserialize, Serialize};

pub mod access;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod geo_utils;
pub mod hotspot;
pub mod index;
pub mod locator;
pub mod stops;

#[cfg(feature = "http")]
pub mod server;

#[cfg(test)]
pub(crate) mod fixtures;

pub use access::AccessibilityInfo;
pub use catalog::{CatalogBounds, NearbyStop, StopListing};
pub use config::{DataPaths, ServiceConfig};
pub use dataset::{GridCell, NearestStopEntry, SlopeScore, StopDistance, StopRecord};
pub use error::{DataLoadError, LookupError};
pub use hotspot::{aggregate_hotspots, CategoryCount, ComplaintPoint, Hotspot, HotspotReport, Urgency};
pub use index::{IndexHandle, SpatialIndex};
pub use locator::{GridMatch, LocateMethod};
pub use stops::StopResult;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use grid_access::Coordinate;
/// let kizilay = Coordinate::new(39.9208, 32.8541);
/// assert!(kizilay.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the coordinate is finite and within lat/lon range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned lat/lon bounding box. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Whether `(lat, lon)` lies inside or on the edge of the box.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
