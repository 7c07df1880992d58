//! Coordinate parsing and formatting.
//!
//! Operators enter coordinates as `"lat,lng"` decimal degrees (the format
//! directions providers accept). Driver packets show them as
//! degrees-minutes-seconds.

use geo::Point;

use crate::models::types::{Result, TransportError};

/// Parse a `"lat,lng"` pair such as `"43.7030,-72.2895"`.
///
/// Whitespace around either component is ignored. The returned point follows
/// the `geo` convention of x = longitude, y = latitude.
pub fn parse_lat_lng(value: &str) -> Result<Point> {
    let invalid = || TransportError::Validation(format!("invalid coordinates '{}'", value));

    let (lat, lng) = value.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(TransportError::Validation(format!(
            "coordinates out of range '{}'",
            value
        )));
    }

    Ok(Point::new(lng, lat))
}

/// Render a point as the `"lat,lng"` string providers expect.
pub fn format_lat_lng(point: Point) -> String {
    format!("{},{}", point.y(), point.x())
}

/// Render a point in degrees-minutes-seconds, e.g. `43°44'10.5"N 72°15'06.8"W`.
pub fn format_dms(point: Point) -> String {
    let lat_hemisphere = if point.y() >= 0.0 { 'N' } else { 'S' };
    let lng_hemisphere = if point.x() >= 0.0 { 'E' } else { 'W' };

    format!(
        "{}{} {}{}",
        dms_component(point.y()),
        lat_hemisphere,
        dms_component(point.x()),
        lng_hemisphere
    )
}

fn dms_component(degrees: f64) -> String {
    // Work in tenths of an arc second so rounding carries into minutes/degrees.
    let tenths = (degrees.abs() * 36_000.0).round() as u64;
    let whole_degrees = tenths / 36_000;
    let minutes = (tenths % 36_000) / 600;
    let seconds = tenths % 600;

    format!(
        "{}°{:02}'{:02}.{}\"",
        whole_degrees,
        minutes,
        seconds / 10,
        seconds % 10
    )
}
