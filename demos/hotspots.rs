//! Aggregate complaint locations into grid hotspots.
//!
//! Run with: cargo run --example hotspots --features parallel

use grid_access::dataset::parse_grid_features;
use grid_access::{aggregate_hotspots, ComplaintPoint, ServiceConfig, SpatialIndex, Urgency};
use std::path::Path;

fn main() {
    // A 4x4 block of 0.005 degree cells starting at Kizilay
    let mut features = Vec::new();
    for row in 0..4 {
        for col in 0..4 {
            let lon = 32.85 + col as f64 * 0.005;
            let lat = 39.91 + row as f64 * 0.005;
            features.push(format!(
                r#"{{"type": "Feature", "properties": {{"grid_id": {}}},
                    "geometry": {{"type": "Polygon", "coordinates": [[[{lon},{lat}],[{e},{lat}],[{e},{n}],[{lon},{n}],[{lon},{lat}]]]}}}}"#,
                row * 4 + col,
                e = lon + 0.005,
                n = lat + 0.005,
            ));
        }
    }
    let collection = format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(","));
    let cells = parse_grid_features(Path::new("demo"), &collection).unwrap();
    let index = SpatialIndex::from_records(cells, vec![], vec![], vec![]).unwrap();

    // Scatter complaints deterministically, with a cluster near the first cell
    let categories = ["kaldirim_bozuk", "rampa_eksik", "isik_yanmiyor", "yangin", "cop_toplama"];
    let complaints: Vec<ComplaintPoint> = (0..500)
        .map(|i| {
            let clustered = i % 3 == 0;
            let spread = if clustered { 0.004 } else { 0.02 };
            let lat = 39.9101 + ((i * 37) % 100) as f64 / 100.0 * spread;
            let lon = 32.8501 + ((i * 53) % 100) as f64 / 100.0 * spread;
            let category = categories[i % categories.len()];
            ComplaintPoint {
                lat,
                lon,
                urgency: (i % 50 == 0).then_some(Urgency::Red),
                category: category.to_string(),
            }
        })
        .collect();

    let config = ServiceConfig { max_hotspots: 5, ..ServiceConfig::default() };
    let report = aggregate_hotspots(&index, &complaints, &config);

    println!("Hotspot Aggregation\n");
    println!("{} complaints over {} cells\n", complaints.len(), report.total_grids_with_complaints);

    for hotspot in &report.hotspots {
        println!(
            "Grid {:>2}: {:>3} total (red {}, yellow {}, green {})",
            hotspot.grid_id, hotspot.total, hotspot.red, hotspot.yellow, hotspot.green
        );
        for c in &hotspot.top_categories {
            println!("   {} x{}", c.category, c.count);
        }
    }
}
