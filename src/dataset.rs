//! Typed records for the four static datasets, and their parsers.
//!
//! Every record is validated as it is parsed, so a [`SpatialIndex`](crate::SpatialIndex)
//! never holds a half-valid row. Parsers work on in-memory text; the `load_*`
//! functions add file reading on top.
//!
//! | Dataset | Shape |
//! |---------|-------|
//! | grid geometry | GeoJSON `FeatureCollection`, `Polygon`/`MultiPolygon` features with an integer `grid_id` property |
//! | nearest stops | `[{grid_id, nearest_stops: [{stop_id, distance}, ...]}, ...]` |
//! | stop catalog | `[{stop_id, stop_name, lat, lon}, ...]` |
//! | slope scores | `[{grid_id, slope_score}, ...]` |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use geo::{Centroid, Coord, LineString, MultiPolygon, Polygon};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use crate::error::DataLoadError;
use crate::Coordinate;

/// A polygonal analysis cell.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub grid_id: i64,
    /// Cell outline in (x = lon, y = lat), holes preserved.
    pub geometry: MultiPolygon<f64>,
    /// Area-weighted centroid of `geometry`.
    pub centroid: Coordinate,
}

/// One precomputed stop distance in a grid's ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopDistance {
    pub stop_id: i64,
    /// Straight-line distance from the cell to the stop, in meters.
    pub distance: f64,
}

/// A grid's ranked nearest stops, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStopEntry {
    pub grid_id: i64,
    pub nearest_stops: Vec<StopDistance>,
}

/// A transit stop in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub stop_id: i64,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
}

impl StopRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Terrain steepness of a grid cell. Higher is steeper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeScore {
    pub grid_id: i64,
    pub slope_score: f64,
}

// ============================================================================
// File loading
// ============================================================================

fn read(path: &Path) -> Result<String, DataLoadError> {
    std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load grid cells from a GeoJSON file, in file order.
pub fn load_grid_features(path: &Path) -> Result<Vec<GridCell>, DataLoadError> {
    parse_grid_features(path, &read(path)?)
}

/// Load ranked nearest-stop lists.
pub fn load_nearest_stops(path: &Path) -> Result<Vec<NearestStopEntry>, DataLoadError> {
    parse_nearest_stops(path, &read(path)?)
}

/// Load the stop catalog, in file order.
pub fn load_stop_catalog(path: &Path) -> Result<Vec<StopRecord>, DataLoadError> {
    parse_stop_catalog(path, &read(path)?)
}

/// Load slope scores.
pub fn load_slope_scores(path: &Path) -> Result<Vec<SlopeScore>, DataLoadError> {
    parse_slope_scores(path, &read(path)?)
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a grid `FeatureCollection`. `origin` only labels errors.
pub fn parse_grid_features(origin: &Path, text: &str) -> Result<Vec<GridCell>, DataLoadError> {
    let geojson_err = |message: String| DataLoadError::GeoJson {
        path: origin.to_path_buf(),
        message,
    };

    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| geojson_err(e.to_string()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(geojson_err("expected a FeatureCollection".to_string())),
    };

    let mut seen = HashSet::new();
    let mut cells = Vec::with_capacity(collection.features.len());

    for (position, feature) in collection.features.into_iter().enumerate() {
        let grid_id = feature
            .property("grid_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| invalid("grid", format!("feature {position} has no integer grid_id")))?;

        if !seen.insert(grid_id) {
            return Err(DataLoadError::DuplicateId { dataset: "grid", id: grid_id });
        }

        let geometry = feature
            .geometry
            .ok_or_else(|| invalid("grid", format!("grid {grid_id} has no geometry")))?;
        let geometry = to_multi_polygon(geometry.value)
            .map_err(|message| invalid("grid", format!("grid {grid_id}: {message}")))?;

        let centroid = geometry
            .centroid()
            .map(|p| Coordinate::new(p.y(), p.x()))
            .filter(|c| c.is_valid())
            .ok_or_else(|| invalid("grid", format!("grid {grid_id} has no centroid")))?;

        cells.push(GridCell { grid_id, geometry, centroid });
    }

    Ok(cells)
}

/// Parse ranked nearest-stop lists. List order is kept as authored.
pub fn parse_nearest_stops(origin: &Path, text: &str) -> Result<Vec<NearestStopEntry>, DataLoadError> {
    let entries: Vec<NearestStopEntry> = parse_json(origin, text)?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.grid_id) {
            return Err(DataLoadError::DuplicateId { dataset: "nearest stops", id: entry.grid_id });
        }
        for stop in &entry.nearest_stops {
            if !stop.distance.is_finite() || stop.distance < 0.0 {
                return Err(invalid(
                    "nearest stops",
                    format!("grid {} stop {} has distance {}", entry.grid_id, stop.stop_id, stop.distance),
                ));
            }
        }
    }

    Ok(entries)
}

/// Parse the stop catalog.
pub fn parse_stop_catalog(origin: &Path, text: &str) -> Result<Vec<StopRecord>, DataLoadError> {
    let stops: Vec<StopRecord> = parse_json(origin, text)?;

    let mut seen = HashSet::new();
    for stop in &stops {
        if !seen.insert(stop.stop_id) {
            return Err(DataLoadError::DuplicateId { dataset: "stops", id: stop.stop_id });
        }
        if !stop.coordinate().is_valid() {
            return Err(invalid(
                "stops",
                format!("stop {} has coordinates ({}, {})", stop.stop_id, stop.lat, stop.lon),
            ));
        }
    }

    Ok(stops)
}

/// Parse slope scores.
pub fn parse_slope_scores(origin: &Path, text: &str) -> Result<Vec<SlopeScore>, DataLoadError> {
    let scores: Vec<SlopeScore> = parse_json(origin, text)?;

    let mut seen = HashSet::new();
    for score in &scores {
        if !seen.insert(score.grid_id) {
            return Err(DataLoadError::DuplicateId { dataset: "slope", id: score.grid_id });
        }
        if !score.slope_score.is_finite() {
            return Err(invalid("slope", format!("grid {} has a non-finite score", score.grid_id)));
        }
    }

    Ok(scores)
}

fn parse_json<T: serde::de::DeserializeOwned>(origin: &Path, text: &str) -> Result<T, DataLoadError> {
    serde_json::from_str(text).map_err(|source| DataLoadError::Json {
        path: PathBuf::from(origin),
        source,
    })
}

fn invalid(dataset: &'static str, message: String) -> DataLoadError {
    DataLoadError::InvalidRecord { dataset, message }
}

// ============================================================================
// GeoJSON -> geo conversion
// ============================================================================

fn to_multi_polygon(value: geojson::Value) -> Result<MultiPolygon<f64>, String> {
    match value {
        geojson::Value::Polygon(rings) => Ok(MultiPolygon::new(vec![rings_to_polygon(&rings)?])),
        geojson::Value::MultiPolygon(polygons) => {
            if polygons.is_empty() {
                return Err("MultiPolygon is empty".to_string());
            }
            let polygons = polygons
                .iter()
                .map(|rings| rings_to_polygon(rings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        _ => Err("geometry is not a Polygon or MultiPolygon".to_string()),
    }
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, String> {
    let (exterior, interiors) = rings.split_first().ok_or("polygon has no rings")?;
    let exterior = ring_to_linestring(exterior)?;
    let interiors = interiors
        .iter()
        .map(|r| ring_to_linestring(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_to_linestring(ring: &[Vec<f64>]) -> Result<LineString<f64>, String> {
    if ring.len() < 3 {
        return Err(format!("ring has {} positions, need at least 3", ring.len()));
    }
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("bad position {position:?}")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}
