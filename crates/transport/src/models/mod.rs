//! Transport data models, types, and traits.

pub mod itinerary;
pub mod obligation;
pub mod stop;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use itinerary::{ItineraryKey, StopOrder, StopOrderKey, TransportConfig};
pub use obligation::{Obligation, Passenger, Section};
pub use stop::{Location, Route, Stop, Vehicle};
pub use traits::ScheduleSource;
pub use types::{Phase, ProviderError, Result, RouteCategory, StopRole, TransportError};
