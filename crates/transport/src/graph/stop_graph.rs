//! Per-route stop topology.
//!
//! Stops on a route are ordered by their distance from the origin, with the
//! stop id as tie-break so the order is total and stable.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::stop::Stop;
use crate::models::traits::ScheduleSource;
use crate::models::types::*;

/// The two fixed stops of every internal itinerary in a period.
#[derive(Clone, Debug)]
pub struct Anchors {
    pub origin: Arc<Stop>,
    pub secondary: Arc<Stop>,
}

impl Anchors {
    pub fn is_anchor(&self, stop: &StopId) -> bool {
        &self.origin.id == stop || &self.secondary.id == stop
    }
}

#[derive(Clone, Copy)]
pub struct StopGraph<'a> {
    source: &'a dyn ScheduleSource,
}

impl<'a> StopGraph<'a> {
    pub fn new(source: &'a dyn ScheduleSource) -> Self {
        Self { source }
    }

    /// Total order used for every stop sequence.
    pub fn compare(a: &Stop, b: &Stop) -> Ordering {
        a.distance.cmp(&b.distance).then_with(|| a.id.cmp(&b.id))
    }

    /// Stops on `route`, nearest to the origin first.
    pub fn ordered_stops(&self, route: &RouteId) -> Vec<Arc<Stop>> {
        let mut stops = self.source.stops_on_route(route);
        stops.sort_by(|a, b| Self::compare(a, b));
        stops
    }

    pub fn anchors(&self, period: &PeriodId) -> Result<Anchors> {
        let config = self.source.transport_config(period).ok_or_else(|| {
            TransportError::Validation(format!("no transport config for period {}", period))
        })?;

        let lookup = |id: &StopId| {
            self.source.get_stop(id).ok_or_else(|| {
                TransportError::Validation(format!("anchor stop {} does not exist", id))
            })
        };

        Ok(Anchors {
            origin: lookup(&config.origin)?,
            secondary: lookup(&config.secondary)?,
        })
    }
}
