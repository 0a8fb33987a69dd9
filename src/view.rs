//! Small helpers shared with the map view and export collaborators.

/// Marker radius in pixels for a map zoom level.
///
/// Markers stay at the minimum size until zoom 16 and grow by 3px per level after,
/// so individual points only become prominent when zoomed in far enough to pick them.
///
/// # Example
/// ```
/// use track_editor::view::marker_radius;
/// assert_eq!(marker_radius(12.0), 1.0);
/// assert_eq!(marker_radius(19.0), 9.0);
/// ```
pub fn marker_radius(zoom: f64) -> f64 {
    ((zoom - 16.0) * 3.0).max(1.0)
}

/// Marker colour for a point, as a CSS hex string.
pub fn marker_color(is_outlier: bool) -> &'static str {
    if is_outlier {
        "#ff0000"
    } else {
        "#3388ff"
    }
}

/// File name offered for the cleaned track: `ride.gpx` becomes `ride_fixed.gpx`.
///
/// Names without a `.gpx` extension get the suffix appended.
pub fn export_file_name(original: &str) -> String {
    match original.strip_suffix(".gpx") {
        Some(stem) => format!("{stem}_fixed.gpx"),
        None => format!("{original}_fixed.gpx"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_radius() {
        assert_eq!(marker_radius(0.0), 1.0);
        assert_eq!(marker_radius(16.0), 1.0);
        assert_eq!(marker_radius(17.0), 3.0);
        assert_eq!(marker_radius(25.0), 27.0);
    }

    #[test]
    fn test_marker_color() {
        assert_eq!(marker_color(true), "#ff0000");
        assert_eq!(marker_color(false), "#3388ff");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("ride.gpx"), "ride_fixed.gpx");
        assert_eq!(export_file_name("morning.run.gpx"), "morning.run_fixed.gpx");
        assert_eq!(export_file_name("track"), "track_fixed.gpx");
    }
}
