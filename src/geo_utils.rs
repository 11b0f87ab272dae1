//! # Geographic Utilities
//!
//! Distance, duration and rounding helpers shared by the locator, the stop
//! assembler and the catalog queries.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance_meters`] | Great-circle distance between two lat/lon pairs |
//! | [`haversine_distance`] | Same, over [`Coordinate`] values |
//! | [`walking_duration_minutes`] | Linear walking-time model |
//! | [`round_to`] | Round a value to a fixed number of decimals |
//! | [`compute_bounds`] | Bounding box of a set of coordinates |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use grid_access::{Coordinate, geo_utils};
//!
//! let a = Coordinate::new(0.0, 0.0);
//! let b = Coordinate::new(0.0, 1.0);
//!
//! let meters = geo_utils::haversine_distance(&a, &b);
//! assert!((meters - 111_195.0).abs() < 50.0);
//!
//! let minutes = geo_utils::walking_duration_minutes(1400.0, geo_utils::DEFAULT_WALKING_SPEED_MPS);
//! assert_eq!(geo_utils::round_to(minutes, 2), 16.67);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances assume a spherical Earth with radius [`EARTH_RADIUS_M`]. The central
//! angle is computed with `atan2`, which stays well conditioned for both very
//! short and near-antipodal separations.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Walking Duration
//!
//! Duration is `distance / speed / 60`. Terrain is not factored in, even though a
//! slope score exists per grid cell.

use crate::{Bounds, Coordinate};

/// Mean Earth radius used for all great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default pedestrian speed in meters per second.
pub const DEFAULT_WALKING_SPEED_MPS: f64 = 1.4;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between `(lat1, lon1)` and `(lat2, lon2)`.
///
/// Inputs are in degrees. The result is symmetric in its two points and zero
/// for identical points.
///
/// # Example
///
/// ```rust
/// use grid_access::geo_utils::haversine_distance_meters;
///
/// let ab = haversine_distance_meters(39.92, 32.85, 39.93, 32.86);
/// let ba = haversine_distance_meters(39.93, 32.86, 39.92, 32.85);
/// assert!((ab - ba).abs() < 1e-6);
/// ```
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Great-circle distance in meters between two coordinates.
#[inline]
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_distance_meters(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Walking duration in minutes for `distance_m` meters at `speed_mps`.
///
/// # Example
///
/// ```rust
/// use grid_access::geo_utils::walking_duration_minutes;
///
/// assert_eq!(walking_duration_minutes(0.0, 1.4), 0.0);
/// assert!((walking_duration_minutes(840.0, 1.4) - 10.0).abs() < 1e-9);
/// ```
#[inline]
pub fn walking_duration_minutes(distance_m: f64, speed_mps: f64) -> f64 {
    distance_m / speed_mps / 60.0
}

/// Round `value` to `decimals` decimal places. Exact ties go to the even
/// digit, so 500.125 rounds to 500.12.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale at `latitude`, which is never smaller than the
/// latitude scale, so the result is safe to use for square search envelopes.
/// The cosine is floored at 0.1 to keep envelopes finite near the poles.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of coordinates.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use grid_access::{Coordinate, geo_utils};
///
/// let bounds = geo_utils::compute_bounds(&[
///     Coordinate::new(39.90, 32.82),
///     Coordinate::new(39.95, 32.90),
/// ]).unwrap();
/// assert_eq!(bounds.min_lat, 39.90);
/// assert_eq!(bounds.max_lon, 32.90);
/// ```
pub fn compute_bounds(points: &[Coordinate]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lon = f64::MAX;
    let mut max_lon = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lon = min_lon.min(p.longitude);
        max_lon = max_lon.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lon, max_lon })
}

// =============================================================================
// Unit Tests
// =============================================================================
