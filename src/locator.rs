//! # Point Locator
//!
//! Resolves a coordinate to the grid cell that contains it.
//!
//! ## Algorithm
//! 1. Build the query point as (x = lon, y = lat), matching the GeoJSON axis order
//! 2. Ask the cell R-tree for cells whose bounding box covers the point
//! 3. Test those candidates in load order with a point-in-polygon check; the first
//!    hit wins
//! 4. Otherwise return the cell whose centroid is nearest by haversine distance
//!
//! ## Containment Convention
//!
//! Containment follows `geo::Contains`: a point on a cell's boundary (or inside a
//! hole) is *not* contained. Such points fall through to the centroid step, so a
//! point on the shared edge of two cells resolves to whichever centroid is nearer.
//!
//! Cells are expected not to overlap. If they do, the cell loaded first wins; the
//! R-tree is only a prefilter and candidates are re-sorted into load order.
//!
//! The centroid step is a linear scan. Ties go to the cell loaded first.

use geo::{Contains, Point};
use log::debug;
use rstar::AABB;

use crate::geo_utils::haversine_distance_meters;
use crate::SpatialIndex;

/// How a grid was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMethod {
    /// The point lies inside the cell's polygon.
    Containment,
    /// No polygon contains the point; the cell has the nearest centroid.
    Centroid,
}

/// A resolved grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMatch {
    pub grid_id: i64,
    pub method: LocateMethod,
}

impl SpatialIndex {
    /// Resolve `(lat, lon)` to a grid id. `None` only when no cells are loaded
    /// (or the coordinate is not a number).
    pub fn locate_grid(&self, lat: f64, lon: f64) -> Option<i64> {
        self.locate(lat, lon).map(|m| m.grid_id)
    }

    /// Like [`locate_grid`](Self::locate_grid), also reporting which step matched.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<GridMatch> {
        if let Some(grid_id) = self.containing_grid(lat, lon) {
            return Some(GridMatch { grid_id, method: LocateMethod::Containment });
        }

        let grid_id = self.nearest_grid_by_centroid(lat, lon)?;
        debug!("[Locator] ({}, {}) is outside every cell, nearest centroid is grid {}", lat, lon, grid_id);
        Some(GridMatch { grid_id, method: LocateMethod::Centroid })
    }

    /// First cell, in load order, whose polygon strictly contains the point.
    pub fn containing_grid(&self, lat: f64, lon: f64) -> Option<i64> {
        let point = Point::new(lon, lat);

        let mut candidates: Vec<usize> = self
            .cell_tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .map(|envelope| envelope.position)
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .map(|position| &self.cells[position])
            .find(|cell| cell.geometry.contains(&point))
            .map(|cell| cell.grid_id)
    }

    /// Cell whose centroid is nearest to the point by great-circle distance.
    pub fn nearest_grid_by_centroid(&self, lat: f64, lon: f64) -> Option<i64> {
        let mut best: Option<(i64, f64)> = None;

        for cell in &self.cells {
            let distance =
                haversine_distance_meters(lat, lon, cell.centroid.latitude, cell.centroid.longitude);
            if best.map_or(distance.is_finite(), |(_, min)| distance < min) {
                best = Some((cell.grid_id, distance));
            }
        }

        best.map(|(grid_id, _)| grid_id)
    }
}
