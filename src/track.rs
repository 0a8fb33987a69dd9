//! Editable track state.
//!
//! [`TrackState`] owns the points of the currently loaded track. Loading runs the
//! metrics and outlier pipeline once; afterwards the only edit is soft removal of
//! single points, which refreshes the elevation gain and notifies observers.
//!
//! ```text
//!   Empty ──load_track──▶ Loaded ──disable_point──▶ Loaded
//!     ▲                     │  ▲                      │
//!     └──────clear──────────┘  └──────load_track──────┘
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::geo_utils::compute_bounds;
use crate::metrics::{compute_deltas, compute_elevation_gain, TrackSummary};
use crate::outliers::{OutlierConfig, OutlierDetector};
use crate::{Bounds, GeoCoordinate, GeoPoint, MalformedReason, RawPoint, TrackError};

// ============================================================================
// Configuration
// ============================================================================

/// What to do with raw records that lack a position or elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum IngestPolicy {
    /// Drop malformed records and load the rest.
    #[default]
    SkipMalformed,
    /// Refuse the whole track on the first malformed record.
    Reject,
}

/// Configuration for a [`TrackState`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackConfig {
    /// Outlier detection run at load time.
    pub outliers: OutlierConfig,
    /// Handling of malformed raw records.
    /// Default: SkipMalformed
    pub ingest: IngestPolicy,
}

// ============================================================================
// Load results and change notifications
// ============================================================================

/// A raw record dropped during a lenient load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedPoint {
    /// Position in the raw input
    pub position: usize,
    pub reason: MalformedReason,
}

/// Outcome of a successful [`TrackState::load_track`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadReport {
    /// Points now owned by the track
    pub accepted: usize,
    pub skipped: Vec<SkippedPoint>,
    /// Points whose timestamp string could not be parsed; they load without a time
    pub unparsed_timestamps: usize,
    pub outliers: usize,
}

/// What changed in a [`TrackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Loaded,
    PointDisabled { index: usize },
    Cleared,
}

/// Receives change notifications from a [`TrackState`].
///
/// Called synchronously after the mutation has completed, so the state passed in
/// already reflects the change. Closures taking `(&TrackEvent, &TrackState)` implement
/// this trait.
pub trait TrackObserver {
    fn track_changed(&mut self, event: &TrackEvent, state: &TrackState);
}

impl<F> TrackObserver for F
where
    F: FnMut(&TrackEvent, &TrackState),
{
    fn track_changed(&mut self, event: &TrackEvent, state: &TrackState) {
        self(event, state)
    }
}

/// Handle returned by [`TrackState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Whether a track is currently loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Empty,
    Loaded,
}

// ============================================================================
// Track State
// ============================================================================

/// Points and derived values of the loaded track.
#[derive(Debug)]
struct Track {
    /// Sorted by `index`, which is strictly increasing
    points: Vec<GeoPoint>,
    elevation_gain: f64,
    needs_initial_fit: bool,
}

/// Owner of the currently loaded track.
///
/// # Example
/// ```
/// use track_editor::{RawPoint, TrackConfig, TrackEvent, TrackState};
///
/// let mut state = TrackState::new(TrackConfig::default());
/// state.subscribe(|event: &TrackEvent, state: &TrackState| {
///     println!("{:?}: gain now {:.0}m", event, state.elevation_gain());
/// });
///
/// state.load_track(&[
///     RawPoint::new(47.80, 13.05, 420.0),
///     RawPoint::new(47.81, 13.05, 433.0),
/// ]).unwrap();
/// assert_eq!(state.elevation_gain(), 13.0);
/// ```
pub struct TrackState {
    detector: OutlierDetector,
    ingest: IngestPolicy,
    track: Option<Track>,
    observers: Vec<(ObserverId, Box<dyn TrackObserver>)>,
    next_observer_id: u64,
}

impl Default for TrackState {
    fn default() -> Self {
        Self::new(TrackConfig::default())
    }
}

impl std::fmt::Debug for TrackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackState")
            .field("detector", &self.detector)
            .field("ingest", &self.ingest)
            .field("track", &self.track)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TrackState {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            detector: OutlierDetector::new(config.outliers),
            ingest: config.ingest,
            track: None,
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Replace the current track with `raw`.
    ///
    /// Each accepted record keeps its position in `raw` as its `index`. Deltas, outlier
    /// flags and the elevation gain are computed before observers are notified.
    ///
    /// With [`IngestPolicy::Reject`] the first malformed record aborts the load and the
    /// previous track stays in place. An input without any valid record still loads, as
    /// an empty track with zero gain and no outliers.
    pub fn load_track(&mut self, raw: &[RawPoint]) -> Result<LoadReport, TrackError> {
        let mut report = LoadReport::default();
        let mut points = Vec::with_capacity(raw.len());

        for (position, record) in raw.iter().enumerate() {
            match validate(position, record) {
                Ok((point, timestamp_ok)) => {
                    if !timestamp_ok {
                        report.unparsed_timestamps += 1;
                    }
                    points.push(point);
                }
                Err(reason) => match self.ingest {
                    IngestPolicy::Reject => {
                        warn!("[TrackEditor] Rejecting track: point {} is malformed ({})", position, reason);
                        return Err(TrackError::MalformedPoint { position, reason });
                    }
                    IngestPolicy::SkipMalformed => {
                        warn!("[TrackEditor] Skipping point {}: {}", position, reason);
                        report.skipped.push(SkippedPoint { position, reason });
                    }
                },
            }
        }

        compute_deltas(&mut points);
        report.outliers = self.detector.detect(&mut points);
        report.accepted = points.len();

        let elevation_gain = compute_elevation_gain(&points);
        info!(
            "[TrackEditor] Loaded {} points ({} skipped, {} outliers), elevation gain {:.1}m",
            report.accepted,
            report.skipped.len(),
            report.outliers,
            elevation_gain
        );

        self.track = Some(Track {
            points,
            elevation_gain,
            needs_initial_fit: true,
        });
        self.notify(TrackEvent::Loaded);

        Ok(report)
    }

    /// Soft-remove the point with the given `index`.
    ///
    /// Returns `false` without side effects if no track is loaded, no point has that
    /// index, or the point is already disabled. Distances and outlier flags are left as
    /// computed at load time.
    pub fn disable_point(&mut self, index: usize) -> bool {
        let Some(track) = self.track.as_mut() else {
            debug!("[TrackEditor] disable_point({}) ignored: no track loaded", index);
            return false;
        };

        let Ok(pos) = track.points.binary_search_by_key(&index, |p| p.index) else {
            debug!("[TrackEditor] disable_point({}) ignored: unknown index", index);
            return false;
        };

        let point = &mut track.points[pos];
        if !point.enabled {
            debug!("[TrackEditor] disable_point({}) ignored: already disabled", index);
            return false;
        }
        point.enabled = false;

        track.elevation_gain = compute_elevation_gain(track.points.iter().filter(|p| p.enabled));
        debug!(
            "[TrackEditor] Disabled point {}, elevation gain now {:.1}m",
            index, track.elevation_gain
        );

        self.notify(TrackEvent::PointDisabled { index });
        true
    }

    /// Drop the loaded track. A no-op when already empty.
    pub fn clear(&mut self) {
        if self.track.take().is_some() {
            info!("[TrackEditor] Track cleared");
            self.notify(TrackEvent::Cleared);
        }
    }

    pub fn status(&self) -> TrackStatus {
        match self.track {
            Some(_) => TrackStatus::Loaded,
            None => TrackStatus::Empty,
        }
    }

    /// All owned points, enabled or not, in original order.
    pub fn points(&self) -> &[GeoPoint] {
        match &self.track {
            Some(track) => &track.points,
            None => &[],
        }
    }

    /// Enabled points in original order.
    pub fn enabled_points(&self) -> impl Iterator<Item = &GeoPoint> + '_ {
        self.points().iter().filter(|p| p.enabled)
    }

    /// Look up a point by its stable index.
    pub fn point(&self, index: usize) -> Option<&GeoPoint> {
        let points = self.points();
        points
            .binary_search_by_key(&index, |p| p.index)
            .ok()
            .map(|pos| &points[pos])
    }

    /// Indices of removed points, for dropping their source elements on export.
    pub fn disabled_indices(&self) -> Vec<usize> {
        self.points()
            .iter()
            .filter(|p| !p.enabled)
            .map(|p| p.index)
            .collect()
    }

    /// Elevation gain over the enabled points, 0 when empty.
    pub fn elevation_gain(&self) -> f64 {
        self.track.as_ref().map_or(0.0, |t| t.elevation_gain)
    }

    pub fn summary(&self) -> TrackSummary {
        TrackSummary::from_points(self.points())
    }

    /// Bounds of the enabled points the first time this is called after a load.
    ///
    /// The map view fits itself to the track once per load and then keeps whatever
    /// zoom and position the user picks, even as points are removed.
    pub fn take_initial_fit(&mut self) -> Option<Bounds> {
        let track = self.track.as_mut()?;
        if !track.needs_initial_fit {
            return None;
        }
        track.needs_initial_fit = false;

        let path: Vec<GeoCoordinate> = track
            .points
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.coordinate())
            .collect();
        compute_bounds(&path)
    }

    /// Register an observer, invoked after every load, removal and clear.
    pub fn subscribe<O>(&mut self, observer: O) -> ObserverId
    where
        O: TrackObserver + 'static,
    {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: TrackEvent) {
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            observer.track_changed(&event, self);
        }
        self.observers = observers;
    }
}

/// Turn a raw record into an enabled point with empty derived fields.
///
/// The flag in the result is `false` when a timestamp string was present but could
/// not be parsed.
fn validate(position: usize, raw: &RawPoint) -> Result<(GeoPoint, bool), MalformedReason> {
    let latitude = raw.latitude.ok_or(MalformedReason::MissingLatitude)?;
    let longitude = raw.longitude.ok_or(MalformedReason::MissingLongitude)?;
    let elevation = raw.elevation.ok_or(MalformedReason::MissingElevation)?;

    if !GeoCoordinate::new(latitude, longitude).is_valid() {
        return Err(MalformedReason::InvalidCoordinate);
    }
    if !elevation.is_finite() {
        return Err(MalformedReason::NonFiniteElevation);
    }

    let mut point = GeoPoint::new(position, latitude, longitude, elevation);
    let mut timestamp_ok = true;
    if let Some(text) = raw.timestamp.as_deref() {
        match parse_timestamp(text) {
            Some(ts) => point.timestamp = Some(ts),
            None => timestamp_ok = false,
        }
    }
    Ok((point, timestamp_ok))
}

/// Parse a GPX `<time>` value (RFC 3339, with or without fractional seconds).
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
