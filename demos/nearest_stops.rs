//! Look up the grid cell and nearest stops for a few points.
//!
//! Run with: cargo run --example nearest_stops

use grid_access::dataset::{parse_grid_features, parse_nearest_stops, parse_slope_scores, parse_stop_catalog};
use grid_access::{LookupError, ServiceConfig, SpatialIndex};
use std::path::Path;

fn main() {
    // Two cells around Kizilay, Ankara
    let here = Path::new("demo");
    let grid = parse_grid_features(here, r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"grid_id": 101},
         "geometry": {"type": "Polygon", "coordinates": [[[32.850,39.918],[32.855,39.918],[32.855,39.923],[32.850,39.923],[32.850,39.918]]]}},
        {"type": "Feature", "properties": {"grid_id": 102},
         "geometry": {"type": "Polygon", "coordinates": [[[32.855,39.918],[32.860,39.918],[32.860,39.923],[32.855,39.923],[32.855,39.918]]]}}
    ]}"#).unwrap();
    let nearest = parse_nearest_stops(here, r#"[
        {"grid_id": 101, "nearest_stops": [{"stop_id": 10, "distance": 210.4}, {"stop_id": 11, "distance": 380.0}]},
        {"grid_id": 102, "nearest_stops": [{"stop_id": 14, "distance": 640.75}]}
    ]"#).unwrap();
    let stops = parse_stop_catalog(here, r#"[
        {"stop_id": 10, "stop_name": "Kizilay", "lat": 39.9208, "lon": 32.8541},
        {"stop_id": 11, "stop_name": "Guvenpark", "lat": 39.9230, "lon": 32.8520},
        {"stop_id": 14, "stop_name": "Sihhiye", "lat": 39.9300, "lon": 32.8560}
    ]"#).unwrap();
    let slope = parse_slope_scores(here, r#"[{"grid_id": 101, "slope_score": 2.345}, {"grid_id": 102, "slope_score": 4.1}]"#).unwrap();

    let index = SpatialIndex::from_records(grid, nearest, stops, slope).unwrap();
    let config = ServiceConfig::default();

    println!("Nearest Stop Examples\n");
    println!("Config: walking_speed={} m/s\n", config.walking_speed_mps);

    let points = [
        ("Inside grid 101", 39.9200, 32.8520),
        ("Inside grid 102", 39.9200, 32.8580),
        ("Outside every cell", 39.9400, 32.8700),
        ("Out of range", 95.0, 32.8500),
    ];

    for (i, (label, lat, lon)) in points.iter().enumerate() {
        println!("{}. {} ({}, {}):", i + 1, label, lat, lon);
        match index.accessibility_info(*lat, *lon, &config) {
            Ok(info) => {
                println!("   Grid: {} (slope {})", info.grid_id, info.slope_score);
                for stop in &info.nearest_stops {
                    println!("   - {} {}m, {} min", stop.stop_name, stop.distance_m, stop.duration_min);
                }
                println!();
            }
            Err(LookupError::NoStopData { grid_id }) => println!("   Grid {} has no stops\n", grid_id),
            Err(e) => println!("   Error: {}\n", e),
        }
    }
}
