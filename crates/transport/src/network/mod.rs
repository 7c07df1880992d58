//! Directions provider abstraction and client.

pub mod directions;
pub mod google;
pub mod traits;

pub use directions::{chunk_bounds, DirectionsClient, Leg};
pub use google::GoogleDirectionsProvider;
pub use traits::{DirectionsProvider, ProviderLeg, ProviderRoute};
