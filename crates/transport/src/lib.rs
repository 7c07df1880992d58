//! # orientation-transport
//!
//! Bus itinerary scheduling for multi-day orientation trips.
//!
//! ## Features
//!
//! - **Itinerary building**: Ordered stop visits per route and date
//! - **Time resolution**: Real travel times from a pluggable directions provider
//! - **Capacity checks**: Running load against the assigned vehicle
//! - **Explicit invalidation**: Cached times stay valid until a trigger dirties them
//! - **Section buses**: Fixed-schedule external routes to and from the origin
//!
//! ## Example
//!
//! ```
//! use orientation_transport::prelude::*;
//!
//! let provider = StaticScheduleProvider::new();
//! provider.insert_vehicle(Vehicle::new("bus", "Blue Bird", 24));
//! provider.insert_route(Route::new("north", "North", RouteCategory::Internal, "bus"));
//! provider
//!     .insert_stop(Stop::new("lyme", "Lyme", 10).with_address("Lyme, NH").on_route("north"))
//!     .unwrap();
//! provider
//!     .insert_stop(Stop::new("orford", "Orford", 20).with_address("Orford, NH").on_route("north"))
//!     .unwrap();
//!
//! let graph = StopGraph::new(&provider);
//! let stops = graph.ordered_stops(&RouteId::new("north"));
//! assert_eq!(stops[0].id, StopId::new("lyme"));
//! assert_eq!(provider.route_capacity(&RouteId::new("north")).unwrap(), 24);
//! ```

pub mod graph;
pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;
pub mod schedule;
pub mod settings;
pub mod spatial;
pub mod telemetry;

// Re-exports for convenience
pub mod prelude {
    pub use crate::graph::{Anchors, StopGraph};
    pub use crate::identifiers::*;
    pub use crate::models::{
        itinerary::*, obligation::*, stop::*, traits::*, types::*,
    };
    pub use crate::network::{
        DirectionsClient, DirectionsProvider, GoogleDirectionsProvider, Leg, ProviderLeg,
        ProviderRoute,
    };
    pub use crate::provider::StaticScheduleProvider;
    pub use crate::schedule::{
        CapacityReport, Direction, ExternalItinerary, ItineraryStatus, Resolution, Riders,
        Scheduler, StopVisit, TimedLeg, TransportIssue, VisitKind,
    };
    pub use crate::settings::TransportSettings;
    pub use crate::telemetry::{init_logging, AlertSink, TracingAlertSink};
}

pub use prelude::*;
