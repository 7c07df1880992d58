//! Read interface to the schedule's reference data and obligations.
//!
//! The engine never owns stops, routes or trips. It reads them through this
//! trait, so the backing store can be in-memory, database-backed, or remote.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::identifiers::*;
use crate::models::itinerary::TransportConfig;
use crate::models::obligation::{Obligation, Passenger, Section};
use crate::models::stop::{Route, Stop, Vehicle};
use crate::models::types::*;

pub trait ScheduleSource: Send + Sync {
    fn get_stop(&self, id: &StopId) -> Option<Arc<Stop>>;
    fn get_route(&self, id: &RouteId) -> Option<Arc<Route>>;
    fn get_vehicle(&self, id: &VehicleId) -> Option<Arc<Vehicle>>;
    fn get_section(&self, id: &SectionId) -> Option<Arc<Section>>;
    fn get_obligation(&self, id: &ObligationId) -> Option<Arc<Obligation>>;

    /// Anchors for a period, if configured.
    fn transport_config(&self, period: &PeriodId) -> Option<Arc<TransportConfig>>;

    /// Stops whose default route is `route`, in no particular order.
    fn stops_on_route(&self, route: &RouteId) -> Vec<Arc<Stop>>;

    fn all_routes(&self) -> Vec<Arc<Route>>;

    fn all_obligations(&self, period: &PeriodId) -> Vec<Arc<Obligation>>;

    fn sections(&self, period: &PeriodId) -> Vec<Arc<Section>>;

    /// Obligations riding `route` on `date` for the given phase.
    fn obligations_for(
        &self,
        period: &PeriodId,
        phase: Phase,
        route: &RouteId,
        date: NaiveDate,
    ) -> Vec<Arc<Obligation>> {
        self.all_obligations(period)
            .into_iter()
            .filter(|o| o.date_for(phase) == date)
            .filter(|o| o.route_for(phase, self).as_ref() == Some(route))
            .collect()
    }

    /// Passengers riding `route` to the origin with `section`.
    fn passengers_to_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>>;

    /// Passengers riding `route` home from the origin with `section`.
    fn passengers_from_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>>;

    /// Capacity of the vehicle assigned to `route`.
    fn route_capacity(&self, route: &RouteId) -> Result<u32> {
        let route = self
            .get_route(route)
            .ok_or_else(|| TransportError::RouteNotFound(route.clone()))?;
        let vehicle = self
            .get_vehicle(&route.vehicle_id)
            .ok_or_else(|| TransportError::VehicleNotFound(route.vehicle_id.clone()))?;
        Ok(vehicle.capacity)
    }
}
