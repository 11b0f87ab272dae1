//! Stop catalog queries: bounded listing, radius search and catalog extent.
//!
//! ## Two-Stage Radius Search
//!
//! 1. **R-tree filter**: stops inside a square lon/lat envelope around the
//!    centre, sized from the radius with [`meters_to_degrees`]
//! 2. **Haversine filter**: exact great-circle distance against the radius
//!
//! Envelopes do not wrap across the antimeridian.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::access::check_coordinate;
use crate::config::ServiceConfig;
use crate::dataset::StopRecord;
use crate::error::LookupError;
use crate::geo_utils::{compute_bounds, haversine_distance_meters, meters_to_degrees, round_to};
use crate::{Bounds, SpatialIndex};

// ============================================================================
// Stop Spatial Node
// ============================================================================

/// A catalog stop's position in the stop R-tree, as `[lon, lat]`.
#[derive(Debug, Clone)]
pub(crate) struct StopNode {
    pub(crate) position: usize,
    point: [f64; 2],
}

impl StopNode {
    pub(crate) fn new(position: usize, stop: &StopRecord) -> Self {
        Self {
            position,
            point: [stop.lon, stop.lat],
        }
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ============================================================================
// Queries and results
// ============================================================================

/// A plain `{lat, lon}` pair as it appears in responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Bounded listing request. Missing edges fall back to the configured default area.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundsQuery {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopListing {
    pub total: usize,
    pub bounds: Bounds,
    pub stops: Vec<StopRecord>,
}

/// Radius search request.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

/// A stop with its distance from the search centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStop {
    #[serde(flatten)]
    pub stop: StopRecord,
    /// Rounded to 3 decimals.
    pub distance_km: f64,
    /// Rounded to 1 decimal.
    pub distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStops {
    pub center: LatLon,
    pub radius_km: f64,
    pub total: usize,
    pub stops: Vec<NearbyStop>,
}

/// Extent of the whole stop catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBounds {
    pub total_stops: usize,
    pub bounds: Bounds,
    pub center: LatLon,
    pub default_bounds: Bounds,
}

fn check_limit(requested: Option<usize>, default: usize, max: usize) -> Result<usize, LookupError> {
    let limit = requested.unwrap_or(default);
    if limit == 0 || limit > max {
        return Err(LookupError::InvalidParameter {
            name: "limit",
            message: format!("{limit} is outside 1..={max}"),
        });
    }
    Ok(limit)
}

impl SpatialIndex {
    /// Stops inside `query`'s box (edges inclusive), in catalog order, up to the limit.
    pub fn list_stops(&self, query: &BoundsQuery, config: &ServiceConfig) -> Result<StopListing, LookupError> {
        let limit = check_limit(query.limit, config.list_limit, config.max_list_limit)?;
        let defaults = config.default_bounds;
        let bounds = Bounds {
            min_lat: query.min_lat.unwrap_or(defaults.min_lat),
            max_lat: query.max_lat.unwrap_or(defaults.max_lat),
            min_lon: query.min_lon.unwrap_or(defaults.min_lon),
            max_lon: query.max_lon.unwrap_or(defaults.max_lon),
        };

        let stops: Vec<StopRecord> = self
            .stops
            .iter()
            .filter(|stop| bounds.contains(stop.lat, stop.lon))
            .take(limit)
            .cloned()
            .collect();

        Ok(StopListing {
            total: stops.len(),
            bounds,
            stops,
        })
    }

    /// Stops within `radius_km` of the centre, nearest first, up to the limit.
    pub fn nearby_stops(&self, query: &NearbyQuery, config: &ServiceConfig) -> Result<NearbyStops, LookupError> {
        check_coordinate(query.lat, query.lon, config)?;
        let radius_km = query.radius_km.unwrap_or(config.nearby_radius_km);
        if !(config.min_radius_km..=config.max_radius_km).contains(&radius_km) {
            return Err(LookupError::InvalidParameter {
                name: "radius_km",
                message: format!("{radius_km} is outside {}..={}", config.min_radius_km, config.max_radius_km),
            });
        }
        let limit = check_limit(query.limit, config.nearby_limit, config.max_nearby_limit)?;

        let pad = meters_to_degrees(radius_km * 1000.0, query.lat);
        let envelope = AABB::from_corners(
            [query.lon - pad, query.lat - pad],
            [query.lon + pad, query.lat + pad],
        );

        let mut candidates: Vec<(usize, f64)> = self
            .stop_tree
            .locate_in_envelope(&envelope)
            .map(|node| {
                let stop = &self.stops[node.position];
                let meters = haversine_distance_meters(query.lat, query.lon, stop.lat, stop.lon);
                (node.position, meters / 1000.0)
            })
            .filter(|&(_, km)| km <= radius_km)
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        candidates.truncate(limit);

        let stops: Vec<NearbyStop> = candidates
            .into_iter()
            .map(|(position, km)| NearbyStop {
                stop: self.stops[position].clone(),
                distance_km: round_to(km, 3),
                distance_m: round_to(km * 1000.0, 1),
            })
            .collect();

        Ok(NearbyStops {
            center: LatLon { lat: query.lat, lon: query.lon },
            radius_km,
            total: stops.len(),
            stops,
        })
    }

    /// Extent of the catalog, or `None` when it is empty.
    pub fn catalog_bounds(&self, config: &ServiceConfig) -> Option<CatalogBounds> {
        let points: Vec<_> = self.stops.iter().map(StopRecord::coordinate).collect();
        let bounds = compute_bounds(&points)?;
        let center = bounds.center();

        Some(CatalogBounds {
            total_stops: self.stops.len(),
            bounds,
            center: LatLon { lat: center.latitude, lon: center.longitude },
            default_bounds: config.default_bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_stop_catalog;
    use crate::fixtures;
    use std::path::Path;

    /// Stops around Kizilay, Ankara.
    fn ankara_index() -> SpatialIndex {
        let stops = parse_stop_catalog(Path::new("stops"), r#"[
            {"stop_id": 10, "stop_name": "Kizilay", "lat": 39.9208, "lon": 32.8541},
            {"stop_id": 11, "stop_name": "Guvenpark", "lat": 39.9230, "lon": 32.8520},
            {"stop_id": 12, "stop_name": "Ulus", "lat": 39.9420, "lon": 32.8540},
            {"stop_id": 13, "stop_name": "Cankaya", "lat": 39.8890, "lon": 32.8600},
            {"stop_id": 14, "stop_name": "Sihhiye", "lat": 39.9300, "lon": 32.8560}
        ]"#).unwrap();
        SpatialIndex::from_records(vec![], vec![], stops, vec![]).unwrap()
    }

    #[test]
    fn test_list_stops_default_bounds() {
        let index = ankara_index();
        let listing = index.list_stops(&BoundsQuery::default(), &ServiceConfig::default()).unwrap();
        // Cankaya (39.889) is south of the default area.
        let ids: Vec<i64> = listing.stops.iter().map(|s| s.stop_id).collect();
        assert_eq!(ids, vec![10, 11, 12, 14]);
        assert_eq!(listing.total, 4);
        assert_eq!(listing.bounds, ServiceConfig::default().default_bounds);
    }

    #[test]
    fn test_list_stops_custom_bounds_and_limit() {
        let index = ankara_index();
        let query = BoundsQuery {
            min_lat: Some(39.88),
            max_lat: Some(39.925),
            limit: Some(2),
            ..BoundsQuery::default()
        };
        let listing = index.list_stops(&query, &ServiceConfig::default()).unwrap();
        let ids: Vec<i64> = listing.stops.iter().map(|s| s.stop_id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(listing.bounds.min_lon, 32.82);
    }

    #[test]
    fn test_list_stops_rejects_bad_limit() {
        let index = ankara_index();
        for limit in [0, 501] {
            let query = BoundsQuery { limit: Some(limit), ..BoundsQuery::default() };
            assert!(matches!(
                index.list_stops(&query, &ServiceConfig::default()),
                Err(LookupError::InvalidParameter { name: "limit", .. })
            ));
        }
    }

    #[test]
    fn test_nearby_sorted_by_distance() {
        let index = ankara_index();
        let query = NearbyQuery { lat: 39.9210, lon: 32.8540, radius_km: Some(1.5), limit: None };
        let result = index.nearby_stops(&query, &ServiceConfig::default()).unwrap();

        let ids: Vec<i64> = result.stops.iter().map(|s| s.stop.stop_id).collect();
        assert_eq!(ids, vec![10, 11, 14]);
        assert!(result.stops.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
        assert_eq!(result.total, 3);
        assert_eq!(result.center, LatLon { lat: 39.9210, lon: 32.8540 });
    }

    #[test]
    fn test_nearby_distance_fields() {
        let index = ankara_index();
        let query = NearbyQuery { lat: 39.9208, lon: 32.8541, radius_km: None, limit: Some(1) };
        let result = index.nearby_stops(&query, &ServiceConfig::default()).unwrap();
        assert_eq!(result.radius_km, 1.0);
        assert_eq!(result.stops.len(), 1);
        assert_eq!(result.stops[0].stop.stop_id, 10);
        assert_eq!(result.stops[0].distance_km, 0.0);
        assert_eq!(result.stops[0].distance_m, 0.0);
    }

    #[test]
    fn test_nearby_rejects_radius_out_of_range() {
        let index = ankara_index();
        for radius in [0.05, 5.5] {
            let query = NearbyQuery { lat: 39.92, lon: 32.85, radius_km: Some(radius), limit: None };
            assert!(matches!(
                index.nearby_stops(&query, &ServiceConfig::default()),
                Err(LookupError::InvalidParameter { name: "radius_km", .. })
            ));
        }
    }

    #[test]
    fn test_nearby_rejects_bad_center() {
        let index = ankara_index();
        let query = NearbyQuery { lat: 39.92, lon: 200.0, radius_km: None, limit: None };
        assert!(matches!(
            index.nearby_stops(&query, &ServiceConfig::default()),
            Err(LookupError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_catalog_bounds() {
        let index = ankara_index();
        let extent = index.catalog_bounds(&ServiceConfig::default()).unwrap();
        assert_eq!(extent.total_stops, 5);
        assert_eq!(extent.bounds.min_lat, 39.8890);
        assert_eq!(extent.bounds.max_lat, 39.9420);
        assert_eq!(extent.bounds.min_lon, 32.8520);
        assert_eq!(extent.bounds.max_lon, 32.8600);
        assert!((extent.center.lat - 39.9155).abs() < 1e-9);
    }

    #[test]
    fn test_catalog_bounds_empty() {
        assert!(fixtures::empty_index().catalog_bounds(&ServiceConfig::default()).is_none());
    }

    #[test]
    fn test_nearby_stop_serializes_flat() {
        let stop = NearbyStop {
            stop: StopRecord { stop_id: 1, stop_name: "A".into(), lat: 1.0, lon: 2.0 },
            distance_km: 0.25,
            distance_m: 250.0,
        };
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json["stop_id"], 1);
        assert_eq!(json["distance_m"], 250.0);
    }
}
