//! # Track Editor
//!
//! Point metrics, outlier detection and editable track state for cleaning GPS tracks.
//!
//! This library provides:
//! - Great-circle distance and bounds for GPS coordinates
//! - Per-point distance/elevation deltas and cumulative elevation gain
//! - Outlier flagging by mean point spacing or by elevation residual against a LOWESS curve
//! - An owned, editable track with soft point removal and change observers
//!
//! File parsing, map rendering and charting are left to the host application. It hands
//! the crate a list of [`RawPoint`]s and reads back the enabled points to redraw or export.
//!
//! ## Features
//!
//! - **`serialize`** - Derive serde traits on public data and config types
//!
//! ## Quick Start
//!
//! ```rust
//! use track_editor::{RawPoint, TrackConfig, TrackState};
//!
//! let raw = vec![
//!     RawPoint::new(47.8095, 13.0550, 100.0),
//!     RawPoint::new(47.8096, 13.0551, 105.0),
//!     RawPoint::new(47.8097, 13.0552, 103.0),
//!     RawPoint::new(47.8098, 13.0553, 110.0),
//! ];
//!
//! let mut track = TrackState::new(TrackConfig::default());
//! track.load_track(&raw).unwrap();
//! assert_eq!(track.elevation_gain(), 12.0);
//!
//! track.disable_point(2);
//! assert_eq!(track.elevation_gain(), 10.0);
//! assert_eq!(track.enabled_points().count(), 3);
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod geo_utils;
pub mod lowess;
pub mod metrics;
pub mod outliers;
pub mod track;
pub mod view;

pub use metrics::{compute_deltas, compute_elevation_gain, TrackSummary};
pub use outliers::{OutlierConfig, OutlierDetector, OutlierStrategy};
pub use track::{
    IngestPolicy, LoadReport, ObserverId, SkippedPoint, TrackConfig, TrackEvent,
    TrackObserver, TrackState, TrackStatus,
};

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use track_editor::GeoCoordinate;
/// let salzburg = GeoCoordinate::new(47.8095, 13.0550);
/// assert!(salzburg.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the coordinate is finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of coordinates, used for fitting the map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoCoordinate {
        GeoCoordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// One sample of a loaded track.
///
/// Position and time come from the source file. The delta fields and `is_outlier`
/// are filled in at load time by [`metrics::compute_deltas`] and [`OutlierDetector`].
/// `enabled` is the only field that changes afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    /// Position in the raw input sequence. Stable for the lifetime of the loaded track.
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Great-circle distance to the previous point in meters (0 for the first point)
    pub distance_from_previous: f64,
    /// Signed elevation change from the previous point in meters (0 for the first point)
    pub elevation_delta_from_previous: f64,
    pub is_outlier: bool,
    /// `false` once the point has been removed by the user
    pub enabled: bool,
}

impl GeoPoint {
    /// Create an enabled point with empty derived fields.
    pub fn new(index: usize, latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            index,
            latitude,
            longitude,
            elevation,
            timestamp: None,
            distance_from_previous: 0.0,
            elevation_delta_from_previous: 0.0,
            is_outlier: false,
            enabled: true,
        }
    }

    /// Attach a timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The point's position as a plain coordinate.
    #[inline]
    pub fn coordinate(&self) -> GeoCoordinate {
        GeoCoordinate::new(self.latitude, self.longitude)
    }
}

/// A track point as extracted from the source file, before validation.
///
/// Every field is optional so that incomplete records can be reported instead of
/// turning into NaN further down the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    /// ISO-8601 time as found in the file, e.g. `2020-05-17T08:12:31Z`
    pub timestamp: Option<String>,
}

impl RawPoint {
    /// Create a complete record without a timestamp.
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            elevation: Some(elevation),
            timestamp: None,
        }
    }

    /// Attach a timestamp string.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a raw point could not be turned into a [`GeoPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MalformedReason {
    MissingLatitude,
    MissingLongitude,
    MissingElevation,
    InvalidCoordinate,
    NonFiniteElevation,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            MalformedReason::MissingLatitude => "missing latitude",
            MalformedReason::MissingLongitude => "missing longitude",
            MalformedReason::MissingElevation => "missing elevation",
            MalformedReason::InvalidCoordinate => "coordinate out of range or not finite",
            MalformedReason::NonFiniteElevation => "elevation is not finite",
        };
        f.write_str(msg)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("malformed track point at position {position}: {reason}")]
    MalformedPoint {
        position: usize,
        reason: MalformedReason,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(GeoCoordinate::new(47.8095, 13.0550).is_valid());
        assert!(!GeoCoordinate::new(91.0, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, -181.0).is_valid());
        assert!(!GeoCoordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_new_point_defaults() {
        let p = GeoPoint::new(3, 47.0, 13.0, 420.0);
        assert_eq!(p.index, 3);
        assert!(p.enabled);
        assert!(!p.is_outlier);
        assert_eq!(p.distance_from_previous, 0.0);
        assert_eq!(p.elevation_delta_from_previous, 0.0);
        assert_eq!(p.coordinate(), GeoCoordinate::new(47.0, 13.0));
    }

    #[test]
    fn test_bounds_center() {
        let b = Bounds { min_lat: 47.0, max_lat: 48.0, min_lng: 13.0, max_lng: 14.0 };
        assert_eq!(b.center(), GeoCoordinate::new(47.5, 13.5));
    }

    #[test]
    fn test_error_message() {
        let err = TrackError::MalformedPoint {
            position: 4,
            reason: MalformedReason::MissingElevation,
        };
        assert_eq!(err.to_string(), "malformed track point at position 4: missing elevation");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_raw_point_json() {
        let json = r#"{"latitude":47.1,"longitude":13.2,"elevation":null,"timestamp":"2020-05-17T08:12:31Z"}"#;
        let raw: RawPoint = serde_json::from_str(json).unwrap();
        assert_eq!(raw.latitude, Some(47.1));
        assert_eq!(raw.elevation, None);
        assert_eq!(raw.timestamp.as_deref(), Some("2020-05-17T08:12:31Z"));
    }
}
