//! Load a short track with a GPS jump, remove the flagged point and print the result.
//!
//! Run with: cargo run --example clean_track

use track_editor::{view, RawPoint, TrackConfig, TrackEvent, TrackState};

fn main() {
    // A short climb near Salzburg, one sample per second
    let raw: Vec<RawPoint> = [
        (47.80950, 13.05500, 424.0),
        (47.80960, 13.05505, 425.5),
        (47.80970, 13.05510, 427.0),
        (47.80980, 13.05515, 426.0),
        (47.81250, 13.05900, 428.5), // receiver jump
        (47.80990, 13.05520, 429.0),
        (47.81000, 13.05525, 431.5),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(lat, lon, ele))| {
        RawPoint::new(lat, lon, ele).with_timestamp(format!("2020-05-17T08:12:{:02}Z", 30 + i))
    })
    .collect();

    let mut state = TrackState::new(TrackConfig::default());
    state.subscribe(|event: &TrackEvent, state: &TrackState| {
        println!(
            "{:?}: {} enabled points, elevation gain {:.1}m",
            event,
            state.enabled_points().count(),
            state.elevation_gain()
        );
    });

    let report = match state.load_track(&raw) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Could not load track: {}", e);
            return;
        }
    };
    println!("Loaded {} points, {} flagged as outliers\n", report.accepted, report.outliers);

    if let Some(bounds) = state.take_initial_fit() {
        let center = bounds.center();
        println!("Fit map to {:.5},{:.5} .. {:.5},{:.5} (center {:.5},{:.5})\n",
            bounds.min_lat, bounds.min_lng, bounds.max_lat, bounds.max_lng,
            center.latitude, center.longitude);
    }

    for p in state.points() {
        println!(
            "  #{:<2} distance {:>7.1}m  elevation diff {:>5.1}m  {}",
            p.index,
            p.distance_from_previous,
            p.elevation_delta_from_previous,
            view::marker_color(p.is_outlier)
        );
    }
    println!();

    let outliers: Vec<usize> = state
        .points()
        .iter()
        .filter(|p| p.is_outlier)
        .map(|p| p.index)
        .collect();
    for index in outliers {
        state.disable_point(index);
    }

    let summary = state.summary();
    println!("\nCleaned track: {} of {} points, {:.0}m, +{:.1}m",
        summary.enabled_count, summary.point_count, summary.enabled_distance, summary.elevation_gain);
    println!("Export as {} without points {:?}",
        view::export_file_name("morning_climb.gpx"), state.disabled_indices());
}
