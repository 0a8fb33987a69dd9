//! # Geographic Utilities
//!
//! Core geographic computations for GPS track points.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`polyline_length`] | Total length of a track in meters |
//! | [`compute_bounds`] | Bounding box of a track, for fitting the viewport |
//!
//! ## Example
//!
//! ```rust
//! use track_editor::{GeoCoordinate, geo_utils};
//!
//! let track = vec![
//!     GeoCoordinate::new(47.8095, 13.0550),
//!     GeoCoordinate::new(47.8100, 13.0560),
//!     GeoCoordinate::new(47.8110, 13.0565),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! println!("Track length: {:.0}m", length);
//!
//! let bounds = geo_utils::compute_bounds(&track).unwrap();
//! println!("Bounds: {:.4}N to {:.4}N", bounds.min_lat, bounds.max_lat);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere with the mean Earth radius of
//! 6,371,000 m, the same radius web map libraries use for point-to-point distances,
//! so values shown next to a marker match what the map reports.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::{BoundingRect, MultiPoint, Point};
use crate::{Bounds, GeoCoordinate};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates using the Haversine formula.
///
/// Returns meters along the surface of a sphere of radius [`EARTH_RADIUS_METERS`].
/// The result is symmetric in its arguments and exactly zero for identical inputs.
/// NaN coordinates propagate to a NaN result.
///
/// # Example
///
/// ```rust
/// use track_editor::{GeoCoordinate, geo_utils};
///
/// let london = GeoCoordinate::new(51.5074, -0.1278);
/// let paris = GeoCoordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally outside [0, 1] for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive coordinates. Empty or
/// single-point tracks return 0.0.
pub fn polyline_length(points: &[GeoCoordinate]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of coordinates.
///
/// Returns `None` for empty input, so callers never fit a viewport to an
/// inverted MIN/MAX box.
///
/// # Example
///
/// ```rust
/// use track_editor::{GeoCoordinate, geo_utils};
///
/// let track = vec![
///     GeoCoordinate::new(51.5000, -0.1300),
///     GeoCoordinate::new(51.5100, -0.1200),
///     GeoCoordinate::new(51.5050, -0.1250),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[GeoCoordinate]) -> Option<Bounds> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();

    let rect = multi.bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
