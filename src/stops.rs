//! Stop ranking for a resolved grid cell.
//!
//! Joins a grid's precomputed nearest-stop list against the stop catalog. The
//! list order is authoritative and is never re-sorted. Walking duration is
//! always recomputed from the stored distance.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{round_to, walking_duration_minutes};
use crate::SpatialIndex;

/// A stop near a grid cell, ready for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopResult {
    pub stop_id: i64,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Straight-line distance, rounded to 2 decimals.
    pub distance_m: f64,
    /// Walking time at the configured speed, rounded to 2 decimals.
    pub duration_min: f64,
}

impl SpatialIndex {
    /// Detailed stops for `grid_id`, in the dataset's ranked order.
    ///
    /// Entries whose stop is missing from the catalog are skipped with a
    /// warning. A grid without a list yields an empty result.
    pub fn assemble_stops(&self, grid_id: i64, walking_speed_mps: f64) -> Vec<StopResult> {
        let Some(entries) = self.nearest_stops(grid_id) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let Some(stop) = self.stop(entry.stop_id) else {
                    warn!(
                        "[StopAssembler] Grid {} references stop {}, which is not in the catalog; skipping",
                        grid_id, entry.stop_id
                    );
                    return None;
                };

                Some(StopResult {
                    stop_id: entry.stop_id,
                    stop_name: stop.stop_name.clone(),
                    lat: stop.lat,
                    lon: stop.lon,
                    distance_m: round_to(entry.distance, 2),
                    duration_min: round_to(walking_duration_minutes(entry.distance, walking_speed_mps), 2),
                })
            })
            .collect()
    }
}
