//! Core enums and errors for transport scheduling.

use std::time::Duration;

use crate::identifiers::*;
use crate::models::itinerary::ItineraryKey;

// ============================================================================
// Enums
// ============================================================================

/// Service category of a route.
///
/// INTERNAL routes shuttle trips between the origin, their trailheads and the
/// secondary anchor. EXTERNAL routes bring individual passengers to and from
/// the origin before and after the program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteCategory {
    Internal,
    External,
}

/// The three legs every obligation is transported on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Taken from the origin to its dropoff stop.
    Dropoff,
    /// Collected from its pickup stop and brought to the secondary anchor.
    Pickup,
    /// Brought back from the secondary anchor to the origin.
    Return,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Dropoff, Phase::Pickup, Phase::Return];

    /// Days after the section start date on which this phase runs.
    pub fn offset_days(self) -> i64 {
        match self {
            Phase::Dropoff => 2,
            Phase::Pickup => 4,
            Phase::Return => 5,
        }
    }

    /// Stop role served by this phase at an intermediate stop, if any.
    ///
    /// Returns travel origin to anchor and back, so they never get a StopOrder.
    pub fn role(self) -> Option<StopRole> {
        match self {
            Phase::Dropoff => Some(StopRole::Dropoff),
            Phase::Pickup => Some(StopRole::Pickup),
            Phase::Return => None,
        }
    }
}

/// Whether a StopOrder boards or unloads its obligation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StopRole {
    Pickup,
    Dropoff,
}

impl StopRole {
    pub fn phase(self) -> Phase {
        match self {
            StopRole::Pickup => Phase::Pickup,
            StopRole::Dropoff => Phase::Dropoff,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure talking to the directions provider. Always retryable.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Api { status: String, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("expected {expected} legs, provider returned {actual}")]
    LegCountMismatch { expected: usize, actual: usize },

    #[error("waypoints out of order: {0:?}")]
    WaypointsReordered(Vec<usize>),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Directions need at least 2 stops, got {0}")]
    InsufficientStops(usize),

    #[error("Directions provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Stop not found: {0}")]
    StopNotFound(StopId),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    #[error("Section not found: {0}")]
    SectionNotFound(SectionId),

    #[error("Obligation not found: {0}")]
    ObligationNotFound(ObligationId),

    #[error("Itinerary not found: {0}")]
    ItineraryNotFound(ItineraryKey),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl TransportError {
    /// Provider failures leave the itinerary dirty and may be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
