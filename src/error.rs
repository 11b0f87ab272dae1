//! Error types for dataset loading and grid lookups.

use std::path::PathBuf;

use thiserror::Error;

/// A dataset could not be read or failed validation.
///
/// Loading is all-or-nothing: any of these aborts construction of the
/// [`SpatialIndex`](crate::SpatialIndex).
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid GeoJSON in {}: {message}", path.display())]
    GeoJson { path: PathBuf, message: String },

    #[error("invalid {dataset} record: {message}")]
    InvalidRecord { dataset: &'static str, message: String },

    #[error("duplicate id {id} in {dataset}")]
    DuplicateId { dataset: &'static str, id: i64 },

    #[error("{dataset} references grid {grid_id}, which is not in the grid geometry")]
    UnknownGrid { dataset: &'static str, grid_id: i64 },
}

/// A lookup could not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("coordinates out of range: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("could not find a grid for the given coordinates")]
    GridNotFound,

    #[error("no stop data found for grid_id {grid_id}")]
    NoStopData { grid_id: i64 },

    #[error("grid {grid_id} not found")]
    UnknownGrid { grid_id: i64 },

    #[error("invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}
