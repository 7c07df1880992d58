//! Itinerary building, timing, capacity and invalidation.

pub mod builder;
pub mod capacity;
pub mod external;
pub mod matrix;
pub mod resolver;
pub mod scheduler;
pub mod staleness;

pub use builder::{build_visits, StopVisit, VisitKind};
pub use capacity::{check_capacity, CapacityReport, Manifest, StopLoad};
pub use external::{Direction, ExternalItinerary, ExternalVisit};
pub use matrix::{Riders, TransportIssue};
pub use resolver::{Resolution, TimedLeg};
pub use scheduler::{ItineraryCell, ItineraryStatus, Scheduler};
