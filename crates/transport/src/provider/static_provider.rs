//! In-memory schedule source.
//!
//! Stores reference data and obligations in lookup maps behind a lock so the
//! configuration layer can edit them while the scheduler reads. Mutators
//! return the previous value, which is what the invalidation triggers need.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::identifiers::*;
use crate::models::itinerary::TransportConfig;
use crate::models::obligation::{Obligation, Passenger, Section};
use crate::models::stop::{Route, Stop, Vehicle};
use crate::models::traits::ScheduleSource;
use crate::models::types::*;

#[derive(Default)]
struct Inner {
    stops: HashMap<StopId, Arc<Stop>>,
    routes: HashMap<RouteId, Arc<Route>>,
    vehicles: HashMap<VehicleId, Arc<Vehicle>>,
    sections: HashMap<SectionId, Arc<Section>>,
    obligations: HashMap<ObligationId, Arc<Obligation>>,
    passengers: HashMap<PassengerId, Arc<Passenger>>,
    configs: HashMap<PeriodId, Arc<TransportConfig>>,
}

/// In-memory schedule source with protect-on-delete for stops.
#[derive(Default)]
pub struct StaticScheduleProvider {
    inner: RwLock<Inner>,
}

fn sorted_by_id<T, K: Ord>(values: impl Iterator<Item = Arc<T>>, key: impl Fn(&T) -> &K) -> Vec<Arc<T>> {
    let mut values: Vec<_> = values.collect();
    values.sort_by(|a, b| key(a).cmp(key(b)));
    values
}

impl StaticScheduleProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer never leaves the maps half-updated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a stop after validating it against its route's category.
    pub fn insert_stop(&self, stop: Stop) -> Result<Option<Arc<Stop>>> {
        let mut inner = self.write();
        let category = stop
            .route_id
            .as_ref()
            .and_then(|id| inner.routes.get(id))
            .map(|route| route.category);
        stop.validate(category)?;

        Ok(inner.stops.insert(stop.id.clone(), Arc::new(stop)))
    }

    /// Remove a stop unless something still references it.
    pub fn remove_stop(&self, id: &StopId) -> Result<Arc<Stop>> {
        let mut inner = self.write();

        let referenced_by_obligation = inner
            .obligations
            .values()
            .find(|o| &o.dropoff_stop == id || o.pickup_stop.as_ref() == Some(id));
        if let Some(obligation) = referenced_by_obligation {
            return Err(TransportError::Validation(format!(
                "stop {} is used by obligation {}",
                id, obligation.id
            )));
        }

        let referenced_by_passenger = inner
            .passengers
            .values()
            .find(|p| p.stop_to_origin.as_ref() == Some(id) || p.stop_from_origin.as_ref() == Some(id));
        if let Some(passenger) = referenced_by_passenger {
            return Err(TransportError::Validation(format!(
                "stop {} is used by passenger {}",
                id, passenger.id
            )));
        }

        if let Some(config) = inner.configs.values().find(|c| c.is_anchor(id)) {
            return Err(TransportError::Validation(format!(
                "stop {} is an anchor for period {}",
                id, config.period
            )));
        }

        inner
            .stops
            .remove(id)
            .ok_or_else(|| TransportError::StopNotFound(id.clone()))
    }

    pub fn insert_route(&self, route: Route) -> Option<Arc<Route>> {
        self.write().routes.insert(route.id.clone(), Arc::new(route))
    }

    pub fn insert_vehicle(&self, vehicle: Vehicle) -> Option<Arc<Vehicle>> {
        self.write().vehicles.insert(vehicle.id.clone(), Arc::new(vehicle))
    }

    pub fn insert_section(&self, section: Section) -> Option<Arc<Section>> {
        self.write().sections.insert(section.id.clone(), Arc::new(section))
    }

    pub fn insert_obligation(&self, obligation: Obligation) -> Option<Arc<Obligation>> {
        self.write()
            .obligations
            .insert(obligation.id.clone(), Arc::new(obligation))
    }

    pub fn remove_obligation(&self, id: &ObligationId) -> Option<Arc<Obligation>> {
        self.write().obligations.remove(id)
    }

    pub fn insert_passenger(&self, passenger: Passenger) -> Option<Arc<Passenger>> {
        self.write()
            .passengers
            .insert(passenger.id.clone(), Arc::new(passenger))
    }

    /// Anchor stops must exist.
    pub fn set_transport_config(&self, config: TransportConfig) -> Result<Option<Arc<TransportConfig>>> {
        let mut inner = self.write();
        for stop in [&config.origin, &config.secondary] {
            if !inner.stops.contains_key(stop) {
                return Err(TransportError::StopNotFound(stop.clone()));
            }
        }
        Ok(inner.configs.insert(config.period.clone(), Arc::new(config)))
    }

    fn passengers_where(
        &self,
        section: &SectionId,
        on_route: impl Fn(&Passenger) -> Option<RouteId>,
        route: &RouteId,
    ) -> Vec<Arc<Passenger>> {
        let candidates: Vec<_> = self
            .read()
            .passengers
            .values()
            .filter(|p| &p.section == section)
            .cloned()
            .collect();

        // The stop lookup inside `on_route` takes the read lock again.
        sorted_by_id(
            candidates
                .into_iter()
                .filter(|p| on_route(p).as_ref() == Some(route)),
            |p| &p.id,
        )
    }
}

impl ScheduleSource for StaticScheduleProvider {
    fn get_stop(&self, id: &StopId) -> Option<Arc<Stop>> {
        self.read().stops.get(id).cloned()
    }

    fn get_route(&self, id: &RouteId) -> Option<Arc<Route>> {
        self.read().routes.get(id).cloned()
    }

    fn get_vehicle(&self, id: &VehicleId) -> Option<Arc<Vehicle>> {
        self.read().vehicles.get(id).cloned()
    }

    fn get_section(&self, id: &SectionId) -> Option<Arc<Section>> {
        self.read().sections.get(id).cloned()
    }

    fn get_obligation(&self, id: &ObligationId) -> Option<Arc<Obligation>> {
        self.read().obligations.get(id).cloned()
    }

    fn transport_config(&self, period: &PeriodId) -> Option<Arc<TransportConfig>> {
        self.read().configs.get(period).cloned()
    }

    fn stops_on_route(&self, route: &RouteId) -> Vec<Arc<Stop>> {
        let inner = self.read();
        sorted_by_id(
            inner
                .stops
                .values()
                .filter(|s| s.route_id.as_ref() == Some(route))
                .cloned(),
            |s| &s.id,
        )
    }

    fn all_routes(&self) -> Vec<Arc<Route>> {
        sorted_by_id(self.read().routes.values().cloned(), |r| &r.id)
    }

    fn all_obligations(&self, period: &PeriodId) -> Vec<Arc<Obligation>> {
        let inner = self.read();
        sorted_by_id(
            inner
                .obligations
                .values()
                .filter(|o| &o.period == period)
                .cloned(),
            |o| &o.id,
        )
    }

    fn sections(&self, period: &PeriodId) -> Vec<Arc<Section>> {
        let inner = self.read();
        sorted_by_id(
            inner
                .sections
                .values()
                .filter(|s| &s.period == period)
                .cloned(),
            |s| &s.id,
        )
    }

    fn passengers_to_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>> {
        self.passengers_where(section, |p| p.route_to_origin(self), route)
    }

    fn passengers_from_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>> {
        self.passengers_where(section, |p| p.route_from_origin(self), route)
    }
}
