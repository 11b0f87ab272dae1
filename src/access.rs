//! Grid accessibility lookup: locate, then attach slope score and stops.

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::LookupError;
use crate::geo_utils::round_to;
use crate::stops::StopResult;
use crate::{Coordinate, SpatialIndex};

/// Everything known about a grid cell's accessibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityInfo {
    pub grid_id: i64,
    /// Terrain slope, rounded to 2 decimals. Missing scores read as 0.
    pub slope_score: f64,
    pub nearest_stops: Vec<StopResult>,
}

/// Reject coordinates outside lat [-90, 90] / lon [-180, 180] when the
/// config asks for it.
pub fn check_coordinate(lat: f64, lon: f64, config: &ServiceConfig) -> Result<(), LookupError> {
    if config.validate_coordinates && !Coordinate::new(lat, lon).is_valid() {
        return Err(LookupError::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

impl SpatialIndex {
    /// Resolve `(lat, lon)` to a grid and its slope score.
    ///
    /// The slope defaults to 0 when the slope dataset has no entry for the grid.
    pub fn resolve_grid(&self, lat: f64, lon: f64, config: &ServiceConfig) -> Result<(i64, f64), LookupError> {
        check_coordinate(lat, lon, config)?;
        let grid_id = self.locate_grid(lat, lon).ok_or(LookupError::GridNotFound)?;
        Ok((grid_id, self.slope_score(grid_id).unwrap_or(0.0)))
    }

    /// Accessibility of the grid containing `(lat, lon)`.
    ///
    /// Fails with [`LookupError::NoStopData`] when the grid resolves but has no
    /// nearest-stop entries at all. Entries dropped for missing catalog stops do
    /// not count as "no data".
    pub fn accessibility_info(&self, lat: f64, lon: f64, config: &ServiceConfig) -> Result<AccessibilityInfo, LookupError> {
        let (grid_id, slope) = self.resolve_grid(lat, lon, config)?;

        if self.nearest_stops(grid_id).map_or(true, <[_]>::is_empty) {
            return Err(LookupError::NoStopData { grid_id });
        }

        Ok(AccessibilityInfo {
            grid_id,
            slope_score: round_to(slope, 2),
            nearest_stops: self.assemble_stops(grid_id, config.walking_speed_mps),
        })
    }

    /// Accessibility of a grid given by id, skipping the locator.
    ///
    /// A grid is known here only if the slope dataset has it. Its stop list may
    /// be empty.
    pub fn grid_info(&self, grid_id: i64, config: &ServiceConfig) -> Result<AccessibilityInfo, LookupError> {
        let slope = self.slope_score(grid_id).ok_or(LookupError::UnknownGrid { grid_id })?;

        Ok(AccessibilityInfo {
            grid_id,
            slope_score: round_to(slope, 2),
            nearest_stops: self.assemble_stops(grid_id, config.walking_speed_mps),
        })
    }
}
