//! Logging setup and failure alerts.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{
    filter::FilterFn, fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::models::itinerary::ItineraryKey;
use crate::models::types::TransportError;

/// Install a fmt subscriber for this crate's events. Safe to call repeatedly;
/// only the first call has an effect, and it leaves an existing global
/// subscriber alone.
pub fn init_logging(max_level: Level) {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        let filter = FilterFn::new(move |meta| {
            meta.module_path()
                .unwrap_or_default()
                .starts_with("orientation_transport")
                && *meta.level() <= max_level
        });
        let layer = tracing_subscriber::fmt::layer()
            .event_format(Format::default().with_target(true))
            .with_ansi(false);
        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init();
    })
}

/// Receives provider failures that leave an itinerary stale.
pub trait AlertSink: Send + Sync {
    fn provider_failure(&self, key: &ItineraryKey, error: &TransportError);
}

/// Default sink: reports through `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn provider_failure(&self, key: &ItineraryKey, error: &TransportError) {
        tracing::error!(itinerary = %key, "directions unavailable, itinerary left stale: {error}");
    }
}
