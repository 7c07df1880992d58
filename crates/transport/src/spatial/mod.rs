//! Coordinate utilities.

pub mod coordinates;

pub use coordinates::{format_dms, format_lat_lng, parse_lat_lng};
