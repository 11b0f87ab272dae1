//! Shared test datasets.
//!
//! City layout (x = lon, y = lat):
//!
//! ```text
//!   grid 7: [0,0]-[1,1]   grid 8: [1,0]-[2,1]   grid 9: [5,5]-[6,6]
//! ```
//!
//! Grid 8 references stop 99, which is missing from the catalog. Grid 9 has
//! neither a nearest-stop list nor a slope score.

use std::path::{Path, PathBuf};

use crate::dataset::{parse_grid_features, parse_nearest_stops, parse_slope_scores, parse_stop_catalog, GridCell};
use crate::SpatialIndex;

pub const CITY_GRID: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"grid_id": 7},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
        {"type": "Feature", "properties": {"grid_id": 8},
         "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]]}},
        {"type": "Feature", "properties": {"grid_id": 9},
         "geometry": {"type": "Polygon", "coordinates": [[[5,5],[6,5],[6,6],[5,6],[5,5]]]}}
    ]
}"#;

pub const CITY_NEAREST: &str = r#"[
    {"grid_id": 7, "nearest_stops": [
        {"stop_id": 1, "distance": 500},
        {"stop_id": 3, "distance": 800.456},
        {"stop_id": 2, "distance": 1200}
    ]},
    {"grid_id": 8, "nearest_stops": [
        {"stop_id": 2, "distance": 300},
        {"stop_id": 99, "distance": 400},
        {"stop_id": 1, "distance": 900}
    ]}
]"#;

pub const CITY_STOPS: &str = r#"[
    {"stop_id": 3, "stop_name": "Library", "lat": 0.8, "lon": 0.2},
    {"stop_id": 2, "stop_name": "Market", "lat": 0.5, "lon": 1.5},
    {"stop_id": 1, "stop_name": "Central", "lat": 0.5, "lon": 0.5}
]"#;

pub const CITY_SLOPE: &str = r#"[
    {"grid_id": 7, "slope_score": 3.2},
    {"grid_id": 8, "slope_score": 1.456}
]"#;

fn origin() -> &'static Path {
    Path::new("fixture")
}

pub fn city_cells() -> Vec<GridCell> {
    parse_grid_features(origin(), CITY_GRID).unwrap()
}

pub fn city_index() -> SpatialIndex {
    SpatialIndex::from_records(
        city_cells(),
        parse_nearest_stops(origin(), CITY_NEAREST).unwrap(),
        parse_stop_catalog(origin(), CITY_STOPS).unwrap(),
        parse_slope_scores(origin(), CITY_SLOPE).unwrap(),
    )
    .unwrap()
}

pub fn empty_index() -> SpatialIndex {
    SpatialIndex::from_records(vec![], vec![], vec![], vec![]).unwrap()
}

/// Write the city dataset under a fresh temp directory and return it.
pub fn write_city_dataset(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("grid-access-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(crate::config::GRID_FILE), CITY_GRID).unwrap();
    std::fs::write(dir.join(crate::config::NEAREST_STOPS_FILE), CITY_NEAREST).unwrap();
    std::fs::write(dir.join(crate::config::STOPS_FILE), CITY_STOPS).unwrap();
    std::fs::write(dir.join(crate::config::SLOPE_FILE), CITY_SLOPE).unwrap();
    dir
}
