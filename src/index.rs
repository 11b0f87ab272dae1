//! In-memory spatial index over the static datasets.
//!
//! [`SpatialIndex`] is an immutable snapshot: grid cells in file order with an
//! R-tree over their bounding boxes, the stop catalog with an R-tree over stop
//! positions, and hash lookups for nearest-stop lists and slope scores. It is
//! built once and shared by reference; nothing mutates it afterwards, so reads
//! need no locking.
//!
//! [`IndexHandle`] owns the current snapshot and can swap in a freshly loaded
//! one with [`IndexHandle::reload`]. Requests that already hold a snapshot keep
//! using it until they finish.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use geo::BoundingRect;
use log::{info, warn};
use rstar::{RTree, RTreeObject, AABB};

use crate::catalog::StopNode;
use crate::config::DataPaths;
use crate::dataset::{self, GridCell, NearestStopEntry, SlopeScore, StopDistance, StopRecord};
use crate::error::DataLoadError;

/// Bounding box of a grid cell, tagged with the cell's load position.
#[derive(Debug, Clone)]
pub(crate) struct CellEnvelope {
    pub(crate) position: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Query-ready snapshot of grid geometry, stops and slope scores.
#[derive(Debug)]
pub struct SpatialIndex {
    pub(crate) cells: Vec<GridCell>,
    pub(crate) cell_tree: RTree<CellEnvelope>,
    pub(crate) nearest: HashMap<i64, Vec<StopDistance>>,
    /// Catalog in file order.
    pub(crate) stops: Vec<StopRecord>,
    pub(crate) stop_positions: HashMap<i64, usize>,
    pub(crate) stop_tree: RTree<StopNode>,
    pub(crate) slope: HashMap<i64, f64>,
}

impl SpatialIndex {
    /// Load and validate all four datasets.
    pub fn load(paths: &DataPaths) -> Result<Self, DataLoadError> {
        let start = Instant::now();

        let cells = dataset::load_grid_features(&paths.grid)?;
        let nearest = dataset::load_nearest_stops(&paths.nearest_stops)?;
        let stops = dataset::load_stop_catalog(&paths.stops)?;
        let slope = dataset::load_slope_scores(&paths.slope)?;

        let index = Self::from_records(cells, nearest, stops, slope)?;

        info!(
            "[SpatialIndex] Loaded {} grid cells, {} nearest-stop lists, {} stops, {} slope scores in {:?}",
            index.cells.len(),
            index.nearest.len(),
            index.stops.len(),
            index.slope.len(),
            start.elapsed()
        );

        Ok(index)
    }

    /// Build an index from already-parsed records.
    ///
    /// Fails if a nearest-stop list or slope score names a grid that is not in
    /// the grid geometry.
    pub fn from_records(
        cells: Vec<GridCell>,
        nearest: Vec<NearestStopEntry>,
        stops: Vec<StopRecord>,
        slope: Vec<SlopeScore>,
    ) -> Result<Self, DataLoadError> {
        let known: HashMap<i64, usize> = cells
            .iter()
            .enumerate()
            .map(|(position, cell)| (cell.grid_id, position))
            .collect();

        let mut nearest_by_grid = HashMap::with_capacity(nearest.len());
        for entry in nearest {
            if !known.contains_key(&entry.grid_id) {
                return Err(DataLoadError::UnknownGrid { dataset: "nearest stops", grid_id: entry.grid_id });
            }
            nearest_by_grid.insert(entry.grid_id, entry.nearest_stops);
        }

        let mut slope_by_grid = HashMap::with_capacity(slope.len());
        for score in slope {
            if !known.contains_key(&score.grid_id) {
                return Err(DataLoadError::UnknownGrid { dataset: "slope", grid_id: score.grid_id });
            }
            slope_by_grid.insert(score.grid_id, score.slope_score);
        }

        let envelopes: Vec<CellEnvelope> = cells
            .iter()
            .enumerate()
            .filter_map(|(position, cell)| {
                cell.geometry.bounding_rect().map(|rect| CellEnvelope {
                    position,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        let stop_positions = stops
            .iter()
            .enumerate()
            .map(|(position, stop)| (stop.stop_id, position))
            .collect();
        let stop_nodes = stops
            .iter()
            .enumerate()
            .map(|(position, stop)| StopNode::new(position, stop))
            .collect();

        Ok(Self {
            cells,
            cell_tree: RTree::bulk_load(envelopes),
            nearest: nearest_by_grid,
            stops,
            stop_positions,
            stop_tree: RTree::bulk_load(stop_nodes),
            slope: slope_by_grid,
        })
    }

    /// Grid cells in load order.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Stop catalog in load order.
    pub fn stops(&self) -> &[StopRecord] {
        &self.stops
    }

    /// Look up a stop by id.
    pub fn stop(&self, stop_id: i64) -> Option<&StopRecord> {
        self.stop_positions.get(&stop_id).map(|&i| &self.stops[i])
    }

    /// A grid's ranked nearest-stop list, if the dataset has one.
    pub fn nearest_stops(&self, grid_id: i64) -> Option<&[StopDistance]> {
        self.nearest.get(&grid_id).map(Vec::as_slice)
    }

    /// A grid's slope score, if the dataset has one.
    pub fn slope_score(&self, grid_id: i64) -> Option<f64> {
        self.slope.get(&grid_id).copied()
    }
}

/// Shared owner of the current [`SpatialIndex`] snapshot.
#[derive(Debug)]
pub struct IndexHandle {
    paths: DataPaths,
    current: RwLock<Arc<SpatialIndex>>,
}

impl IndexHandle {
    /// Load the datasets at `paths`. Errors here should stop the service.
    pub fn open(paths: DataPaths) -> Result<Self, DataLoadError> {
        let index = SpatialIndex::load(&paths)?;
        Ok(Self::with_index(paths, index))
    }

    /// Wrap an already-built index. `paths` is used by later reloads.
    pub fn with_index(paths: DataPaths, index: SpatialIndex) -> Self {
        Self {
            paths,
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// The snapshot to serve the current request from.
    pub fn snapshot(&self) -> Arc<SpatialIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Reload every dataset from disk and swap it in.
    ///
    /// Loading happens outside the lock. On failure the previous snapshot stays
    /// in service and the error is returned.
    pub fn reload(&self) -> Result<Arc<SpatialIndex>, DataLoadError> {
        let fresh = match SpatialIndex::load(&self.paths) {
            Ok(index) => Arc::new(index),
            Err(e) => {
                warn!("[IndexHandle] Reload failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&fresh);
        Ok(fresh)
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::path::Path;

    #[test]
    fn test_from_records_builds_lookups() {
        let index = fixtures::city_index();
        assert_eq!(index.cells().len(), 3);
        assert_eq!(index.stop(1).map(|s| s.stop_name.as_str()), Some("Central"));
        assert_eq!(index.slope_score(7), Some(3.2));
        assert_eq!(index.nearest_stops(7).map(<[_]>::len), Some(3));
        assert!(index.nearest_stops(9).is_none());
    }

    #[test]
    fn test_from_records_rejects_unknown_slope_grid() {
        let origin = Path::new("slope.json");
        let slope = dataset::parse_slope_scores(origin, r#"[{"grid_id": 404, "slope_score": 1.0}]"#).unwrap();
        let err = SpatialIndex::from_records(fixtures::city_cells(), vec![], vec![], slope).unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownGrid { dataset: "slope", grid_id: 404 }));
    }

    #[test]
    fn test_from_records_rejects_unknown_nearest_grid() {
        let origin = Path::new("nearest.json");
        let nearest = dataset::parse_nearest_stops(origin, r#"[{"grid_id": 55, "nearest_stops": []}]"#).unwrap();
        let err = SpatialIndex::from_records(fixtures::city_cells(), nearest, vec![], vec![]).unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownGrid { dataset: "nearest stops", grid_id: 55 }));
    }

    #[test]
    fn test_open_missing_data_dir_fails() {
        let err = IndexHandle::open(DataPaths::in_dir("/nonexistent/grid-access")).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }

    #[test]
    fn test_open_and_reload_from_disk() {
        let dir = fixtures::write_city_dataset("open_and_reload");
        let handle = IndexHandle::open(DataPaths::in_dir(&dir)).unwrap();
        let first = handle.snapshot();
        assert_eq!(first.cells().len(), 3);

        let second = handle.reload().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &handle.snapshot()));
        assert_eq!(second.stops().len(), first.stops().len());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let handle = IndexHandle::with_index(DataPaths::in_dir("/nonexistent/grid-access"), fixtures::city_index());
        let before = handle.snapshot();

        assert!(handle.reload().is_err());

        let after = handle.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.cells().len(), 3);
    }
}
