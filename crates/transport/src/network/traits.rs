//! Pluggable routing provider.
//!
//! External crates implement this to supply travel times. The crate ships a
//! Google Directions implementation in [`crate::network::google`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::models::stop::Location;
use crate::models::types::ProviderError;

/// One leg as reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderLeg {
    pub duration: Duration,
}

/// A route through all requested locations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRoute {
    pub legs: Vec<ProviderLeg>,
    /// Order the provider visited the intermediate waypoints in.
    pub waypoint_order: Vec<usize>,
}

/// Route through `locations` in the given order: the first is the origin, the
/// last the destination, the rest waypoints.
pub trait DirectionsProvider: Send + Sync {
    fn route<'a>(
        &'a self,
        locations: &'a [Location],
    ) -> Pin<Box<dyn Future<Output = Result<ProviderRoute, ProviderError>> + Send + 'a>>;
}
