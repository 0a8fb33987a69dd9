//! Outlier detection for loaded tracks.
//!
//! Two strategies are available, selected through [`OutlierConfig::strategy`]:
//!
//! - [`OutlierStrategy::MeanDistance`] flags points that are unusually far from their
//!   predecessor compared to the average point spacing. Cheap and good at catching GPS
//!   jumps, but one very large gap inflates the average and can hide smaller ones.
//! - [`OutlierStrategy::SmoothedResidual`] fits a LOWESS curve of elevation over time and
//!   flags points whose elevation is far from it. Needs a timestamp on every point; if any
//!   is missing or time runs backwards, nothing is flagged.
//!
//! Detection runs once when a track is loaded. Flags are not revisited when points are
//! later disabled.

use log::{debug, info, warn};

use crate::lowess::Lowess;
use crate::metrics::compute_deltas;
use crate::GeoPoint;

/// Which heuristic decides whether a point is an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum OutlierStrategy {
    /// Distance from the previous point above `distance_factor` times the average.
    #[default]
    MeanDistance,
    /// Elevation more than `residual_threshold` away from a smoothed elevation profile.
    SmoothedResidual,
}

/// Configuration for outlier detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlierConfig {
    /// Heuristic to run.
    /// Default: MeanDistance
    pub strategy: OutlierStrategy,

    /// Multiple of the average point distance above which a point is flagged.
    /// Default: 2.0
    pub distance_factor: f64,

    /// Fraction of the points used for each local fit of the elevation curve.
    /// Default: 0.2
    pub smoothing_bandwidth: f64,

    /// Bisquare reweighting passes of the elevation curve fit.
    /// Default: 2
    pub robustness_iterations: u32,

    /// Fraction of the track duration below which fits are interpolated instead of computed.
    /// Default: 0.01
    pub smoothing_delta_fraction: f64,

    /// Elevation residual in meters above which a point is flagged.
    /// Default: 20.0
    pub residual_threshold: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            strategy: OutlierStrategy::MeanDistance,
            distance_factor: 2.0,
            smoothing_bandwidth: 0.2,
            robustness_iterations: 2,
            smoothing_delta_fraction: 0.01,
            residual_threshold: 20.0,
        }
    }
}

/// Flags outlier points according to an [`OutlierConfig`].
#[derive(Debug, Clone, Default)]
pub struct OutlierDetector {
    config: OutlierConfig,
}

impl OutlierDetector {
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Set `is_outlier` on every point and return how many were flagged.
    ///
    /// Previous flags are cleared first. The mean-distance strategy refreshes the
    /// distance deltas itself, so the points do not need to be prepared.
    ///
    /// # Example
    /// ```
    /// use track_editor::{GeoPoint, OutlierDetector};
    ///
    /// let mut points: Vec<GeoPoint> = [0.0, 0.0001, 0.0002, 0.0003, 0.0020, 0.0021]
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, &dlat)| GeoPoint::new(i, 47.0 + dlat, 13.0, 500.0))
    ///     .collect();
    ///
    /// let flagged = OutlierDetector::default().detect(&mut points);
    /// assert_eq!(flagged, 1);
    /// assert!(points[4].is_outlier);
    /// ```
    pub fn detect(&self, points: &mut [GeoPoint]) -> usize {
        for point in points.iter_mut() {
            point.is_outlier = false;
        }

        let flagged = match self.config.strategy {
            OutlierStrategy::MeanDistance => self.detect_by_mean_distance(points),
            OutlierStrategy::SmoothedResidual => self.detect_by_smoothed_residual(points),
        };

        debug!(
            "[TrackEditor] {:?} flagged {} of {} points",
            self.config.strategy,
            flagged,
            points.len()
        );
        flagged
    }

    fn detect_by_mean_distance(&self, points: &mut [GeoPoint]) -> usize {
        if points.is_empty() {
            return 0;
        }

        compute_deltas(points);

        let total_distance: f64 = points.iter().map(|p| p.distance_from_previous).sum();
        let average_distance = total_distance / points.len() as f64;
        info!(
            "[TrackEditor] Total distance {:.1}m, average point distance {:.2}m",
            total_distance, average_distance
        );

        let threshold = average_distance * self.config.distance_factor;
        let mut flagged = 0;
        for point in points.iter_mut() {
            if point.distance_from_previous > threshold {
                point.is_outlier = true;
                flagged += 1;
            }
        }
        flagged
    }

    fn detect_by_smoothed_residual(&self, points: &mut [GeoPoint]) -> usize {
        let Some(times) = seconds_since_start(points) else {
            warn!("[TrackEditor] Timestamps missing or out of order, skipping elevation outlier detection");
            return 0;
        };
        if times.is_empty() {
            return 0;
        }

        let elevations: Vec<f64> = points.iter().map(|p| p.elevation).collect();
        let duration = times[times.len() - 1] - times[0];
        let lowess = Lowess {
            bandwidth: self.config.smoothing_bandwidth,
            robustness_iterations: self.config.robustness_iterations,
            delta: duration * self.config.smoothing_delta_fraction,
        };

        let Some(smoothed) = lowess.smooth(&times, &elevations) else {
            warn!("[TrackEditor] Elevation profile could not be smoothed, skipping elevation outlier detection");
            return 0;
        };

        let mut flagged = 0;
        for (point, fitted) in points.iter_mut().zip(&smoothed) {
            if (point.elevation - fitted).abs() > self.config.residual_threshold {
                point.is_outlier = true;
                flagged += 1;
            }
        }
        flagged
    }
}

/// Seconds elapsed since the first point, or `None` if any timestamp is missing
/// or earlier than its predecessor.
fn seconds_since_start(points: &[GeoPoint]) -> Option<Vec<f64>> {
    let start = match points.first() {
        Some(first) => first.timestamp?,
        None => return Some(Vec::new()),
    };

    let mut times = Vec::with_capacity(points.len());
    let mut prev = start;
    for point in points {
        let ts = point.timestamp?;
        if ts < prev {
            return None;
        }
        times.push((ts - start).num_milliseconds() as f64 / 1000.0);
        prev = ts;
    }
    Some(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::EARTH_RADIUS_METERS;
    use chrono::{Duration, TimeZone, Utc};

    /// Points due north of each other with the given spacing in meters.
    fn track_with_spacing(distances: &[f64]) -> Vec<GeoPoint> {
        let mut lat = 47.0;
        distances
            .iter()
            .enumerate()
            .map(|(i, d)| {
                lat += (d / EARTH_RADIUS_METERS).to_degrees();
                GeoPoint::new(i, lat, 13.0, 400.0)
            })
            .collect()
    }

    fn timed_track(elevations: &[f64]) -> Vec<GeoPoint> {
        let start = Utc.with_ymd_and_hms(2020, 5, 17, 8, 0, 0).unwrap();
        elevations
            .iter()
            .enumerate()
            .map(|(i, &ele)| {
                GeoPoint::new(i, 47.0 + i as f64 * 0.00005, 13.0, ele)
                    .with_timestamp(start + Duration::seconds(i as i64))
            })
            .collect()
    }

    fn smoothed_detector() -> OutlierDetector {
        OutlierDetector::new(OutlierConfig {
            strategy: OutlierStrategy::SmoothedResidual,
            ..OutlierConfig::default()
        })
    }

    fn flagged_indices(points: &[GeoPoint]) -> Vec<usize> {
        points.iter().filter(|p| p.is_outlier).map(|p| p.index).collect()
    }

    #[test]
    fn test_default_strategy_is_mean_distance() {
        assert_eq!(OutlierDetector::default().config().strategy, OutlierStrategy::MeanDistance);
    }

    #[test]
    fn test_mean_distance_flags_large_jump() {
        // average 40m, threshold 80m
        let mut points = track_with_spacing(&[0.0, 10.0, 10.0, 10.0, 200.0, 10.0]);
        let flagged = OutlierDetector::default().detect(&mut points);

        assert_eq!(flagged, 1);
        assert_eq!(flagged_indices(&points), vec![4]);
        assert!((points[4].distance_from_previous - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_distance_large_gap_masks_smaller_ones() {
        // The 50m gap is five times the usual spacing but the 5000m gap pushes the
        // threshold to ~1454m, so only the largest jump is reported.
        let mut points = track_with_spacing(&[0.0, 10.0, 10.0, 50.0, 10.0, 10.0, 5000.0]);
        OutlierDetector::default().detect(&mut points);
        assert_eq!(flagged_indices(&points), vec![6]);
    }

    #[test]
    fn test_mean_distance_uniform_track_has_no_outliers() {
        let mut points = track_with_spacing(&[0.0, 10.0, 10.0, 10.0, 10.0]);
        assert_eq!(OutlierDetector::default().detect(&mut points), 0);
    }

    #[test]
    fn test_mean_distance_empty_and_single() {
        let mut empty: Vec<GeoPoint> = vec![];
        assert_eq!(OutlierDetector::default().detect(&mut empty), 0);

        let mut single = track_with_spacing(&[0.0]);
        assert_eq!(OutlierDetector::default().detect(&mut single), 0);
        assert!(!single[0].is_outlier);
    }

    #[test]
    fn test_custom_distance_factor() {
        let mut points = track_with_spacing(&[0.0, 10.0, 10.0, 10.0, 200.0, 10.0]);
        let detector = OutlierDetector::new(OutlierConfig {
            distance_factor: 6.0,
            ..OutlierConfig::default()
        });
        assert_eq!(detector.detect(&mut points), 0);
    }

    #[test]
    fn test_detect_clears_previous_flags() {
        let mut points = track_with_spacing(&[0.0, 10.0, 10.0, 10.0]);
        points[1].is_outlier = true;
        OutlierDetector::default().detect(&mut points);
        assert!(points.iter().all(|p| !p.is_outlier));
    }

    #[test]
    fn test_smoothed_residual_flags_elevation_spike() {
        let mut elevations: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.5).collect();
        elevations[25] += 60.0;
        let mut points = timed_track(&elevations);

        let flagged = smoothed_detector().detect(&mut points);
        assert_eq!(flagged, 1);
        assert_eq!(flagged_indices(&points), vec![25]);
    }

    #[test]
    fn test_smoothed_residual_ignores_gradual_climb() {
        let elevations: Vec<f64> = (0..200)
            .map(|i| 300.0 + i as f64 * 0.8 + (i as f64 * 0.05).sin() * 4.0)
            .collect();
        let mut points = timed_track(&elevations);
        assert_eq!(smoothed_detector().detect(&mut points), 0);
    }

    #[test]
    fn test_smoothed_residual_fails_closed_without_timestamps() {
        let mut elevations: Vec<f64> = (0..30).map(|_| 100.0).collect();
        elevations[10] = 400.0;
        let mut points = timed_track(&elevations);
        points[5].timestamp = None;

        assert_eq!(smoothed_detector().detect(&mut points), 0);
        assert!(points.iter().all(|p| !p.is_outlier));
    }

    #[test]
    fn test_smoothed_residual_fails_closed_on_time_going_backwards() {
        let mut elevations: Vec<f64> = (0..30).map(|_| 100.0).collect();
        elevations[10] = 400.0;
        let mut points = timed_track(&elevations);
        points[20].timestamp = points[3].timestamp;

        assert_eq!(smoothed_detector().detect(&mut points), 0);
    }

    #[test]
    fn test_smoothed_residual_empty_track() {
        let mut empty: Vec<GeoPoint> = vec![];
        assert_eq!(smoothed_detector().detect(&mut empty), 0);
    }

    #[test]
    fn test_seconds_since_start() {
        let points = timed_track(&[1.0, 2.0, 3.0]);
        assert_eq!(seconds_since_start(&points), Some(vec![0.0, 1.0, 2.0]));
    }
}
