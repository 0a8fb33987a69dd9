//! Per-point deltas and aggregate track metrics.
//!
//! Deltas are computed once per load over the full track in file order. Elevation
//! gain is recomputed from scratch over whichever points are enabled every time
//! the enabled set changes.

use crate::geo_utils::{haversine_distance, polyline_length};
use crate::{GeoCoordinate, GeoPoint};

/// Fill in `distance_from_previous` and `elevation_delta_from_previous` for every point.
///
/// The first point has no predecessor and gets zero for both fields. Existing values
/// are overwritten, so running this twice is harmless.
///
/// # Example
/// ```
/// use track_editor::{GeoPoint, compute_deltas};
///
/// let mut points = vec![
///     GeoPoint::new(0, 47.0000, 13.0, 100.0),
///     GeoPoint::new(1, 47.0001, 13.0, 98.5),
/// ];
/// compute_deltas(&mut points);
/// assert_eq!(points[0].distance_from_previous, 0.0);
/// assert!(points[1].distance_from_previous > 11.0);
/// assert_eq!(points[1].elevation_delta_from_previous, -1.5);
/// ```
pub fn compute_deltas(points: &mut [GeoPoint]) {
    let mut prev: Option<(GeoCoordinate, f64)> = None;

    for point in points.iter_mut() {
        let coord = point.coordinate();
        match prev {
            Some((prev_coord, prev_ele)) => {
                point.distance_from_previous = haversine_distance(&prev_coord, &coord);
                point.elevation_delta_from_previous = point.elevation - prev_ele;
            }
            None => {
                point.distance_from_previous = 0.0;
                point.elevation_delta_from_previous = 0.0;
            }
        }
        prev = Some((coord, point.elevation));
    }
}

/// Sum of positive elevation changes between consecutive points of `points`.
///
/// Pass only the points that should count (usually the enabled ones); pairs are
/// formed over the sequence as given, not over the original track. Sequences of
/// fewer than two points yield 0.
///
/// # Example
/// ```
/// use track_editor::{GeoPoint, compute_elevation_gain};
///
/// let points: Vec<GeoPoint> = [100.0, 105.0, 103.0, 110.0, 108.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &ele)| GeoPoint::new(i, 47.0, 13.0, ele))
///     .collect();
/// assert_eq!(compute_elevation_gain(&points), 12.0);
/// ```
pub fn compute_elevation_gain<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a GeoPoint>,
{
    let mut gain = 0.0;
    let mut prev_ele: Option<f64> = None;

    for point in points {
        if let Some(prev) = prev_ele {
            if point.elevation > prev {
                gain += point.elevation - prev;
            }
        }
        prev_ele = Some(point.elevation);
    }

    gain
}

/// Aggregate figures for a loaded track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSummary {
    /// All points owned by the track, enabled or not
    pub point_count: usize,
    pub enabled_count: usize,
    /// Points flagged at load time, enabled or not
    pub outlier_count: usize,
    /// Length of the polyline through the enabled points in meters
    pub enabled_distance: f64,
    /// Elevation gain over the enabled points in meters
    pub elevation_gain: f64,
}

impl TrackSummary {
    /// Summarize a track. Distance and gain only consider enabled points.
    pub fn from_points(points: &[GeoPoint]) -> Self {
        let enabled: Vec<&GeoPoint> = points.iter().filter(|p| p.enabled).collect();
        let path: Vec<GeoCoordinate> = enabled.iter().map(|p| p.coordinate()).collect();

        Self {
            point_count: points.len(),
            enabled_count: enabled.len(),
            outlier_count: points.iter().filter(|p| p.is_outlier).count(),
            enabled_distance: polyline_length(&path),
            elevation_gain: compute_elevation_gain(enabled),
        }
    }
}
