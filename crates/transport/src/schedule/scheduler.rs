//! Itinerary registry and resolve pipeline.
//!
//! Each itinerary is an independent cell. Writers (StopOrder edits, stop
//! order synchronization and the resolver across its provider call) serialize
//! on the cell's async mutex. A clean itinerary is served from its cached
//! resolution without touching that mutex.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::identifiers::*;
use crate::models::itinerary::{ItineraryKey, StopOrder, StopOrderKey};
use crate::models::traits::ScheduleSource;
use crate::models::types::*;
use crate::network::directions::DirectionsClient;
use crate::schedule::builder::{build_visits, StopVisit};
use crate::schedule::capacity::{check_capacity, CapacityReport};
use crate::schedule::resolver::{self, Resolution};
use crate::settings::TransportSettings;
use crate::telemetry::{AlertSink, TracingAlertSink};

#[derive(Debug, Default)]
pub struct ItineraryState {
    pub stop_orders: BTreeMap<StopOrderKey, StopOrder>,
}

pub struct ItineraryCell {
    key: ItineraryKey,
    pub(crate) state: Mutex<ItineraryState>,
    dirty: AtomicBool,
    /// Bumped by every invalidation, so a resolve that raced one stays dirty.
    generation: AtomicU64,
    cache: RwLock<Option<Arc<Resolution>>>,
    manual_override: AtomicBool,
}

impl ItineraryCell {
    fn new(key: ItineraryKey) -> Self {
        Self {
            key,
            state: Mutex::new(ItineraryState::default()),
            dirty: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            cache: RwLock::new(None),
            manual_override: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &ItineraryKey {
        &self.key
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn manual_override(&self) -> bool {
        self.manual_override.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_dirty(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The cached resolution, if it is still current.
    pub fn cached(&self) -> Option<Arc<Resolution>> {
        if self.is_dirty() {
            return None;
        }
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn commit(&self, generation: u64, resolution: Arc<Resolution>) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(resolution);
        self.dirty.store(false, Ordering::SeqCst);
        if self.generation() != generation {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }
}

/// Outcome of a resolve that tolerates provider outages.
#[derive(Clone, Debug)]
pub enum ItineraryStatus {
    Resolved(Arc<Resolution>),
    /// The provider failed; the itinerary stays dirty and can be retried.
    NeedsRecomputation { reason: String },
}

pub struct Scheduler {
    pub(crate) source: Arc<dyn ScheduleSource>,
    pub(crate) client: DirectionsClient,
    pub(crate) settings: TransportSettings,
    alerts: Arc<dyn AlertSink>,
    itineraries: RwLock<HashMap<ItineraryKey, Arc<ItineraryCell>>>,
}

impl Scheduler {
    pub fn new(source: Arc<dyn ScheduleSource>, client: DirectionsClient, settings: TransportSettings) -> Self {
        Self {
            source,
            client,
            settings,
            alerts: Arc::new(TracingAlertSink),
            itineraries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn source(&self) -> &dyn ScheduleSource {
        self.source.as_ref()
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    pub(crate) fn cells(&self) -> Vec<Arc<ItineraryCell>> {
        self.itineraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn cell(&self, key: &ItineraryKey) -> Result<Arc<ItineraryCell>> {
        self.itineraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| TransportError::ItineraryNotFound(key.clone()))
    }

    pub(crate) fn find_cell(&self, key: &ItineraryKey) -> Option<Arc<ItineraryCell>> {
        self.cell(key).ok()
    }

    /// Register an itinerary for an INTERNAL route and sync its StopOrders.
    pub async fn register(&self, key: ItineraryKey) -> Result<Arc<ItineraryCell>> {
        let route = self
            .source
            .get_route(&key.route)
            .ok_or_else(|| TransportError::RouteNotFound(key.route.clone()))?;
        route.category.require(RouteCategory::Internal, &route.id)?;

        let cell = {
            let mut itineraries = self.itineraries.write().unwrap_or_else(PoisonError::into_inner);
            if itineraries.contains_key(&key) {
                return Err(TransportError::Validation(format!(
                    "an itinerary for {} already exists",
                    key
                )));
            }
            let cell = Arc::new(ItineraryCell::new(key.clone()));
            itineraries.insert(key.clone(), cell.clone());
            cell
        };

        if let Err(error) = self.sync_stop_orders(&cell).await {
            self.remove(&key)?;
            return Err(error);
        }
        info!(itinerary = %key, "registered itinerary");
        Ok(cell)
    }

    pub fn remove(&self, key: &ItineraryKey) -> Result<()> {
        self.itineraries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| TransportError::ItineraryNotFound(key.clone()))
    }

    pub fn itinerary(&self, key: &ItineraryKey) -> Option<Arc<ItineraryCell>> {
        self.find_cell(key)
    }

    pub fn keys(&self) -> Vec<ItineraryKey> {
        let mut keys: Vec<_> = self
            .itineraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn keys_in_period(&self, period: &PeriodId) -> Vec<ItineraryKey> {
        self.keys().into_iter().filter(|k| &k.period == period).collect()
    }

    pub fn is_dirty(&self, key: &ItineraryKey) -> Result<bool> {
        Ok(self.cell(key)?.is_dirty())
    }

    /// Ordered stop visits for an itinerary.
    pub async fn build(&self, key: &ItineraryKey) -> Result<Vec<StopVisit>> {
        let cell = self.cell(key)?;
        let state = cell.state.lock().await;
        build_visits(self.source.as_ref(), key, state.stop_orders.values())
    }

    /// Recompute times if the itinerary is dirty. A clean itinerary returns
    /// its cached resolution without calling the provider.
    pub async fn resolve(&self, key: &ItineraryKey) -> Result<Arc<Resolution>> {
        let cell = self.cell(key)?;
        if let Some(cached) = cell.cached() {
            return Ok(cached);
        }

        let mut state = cell.state.lock().await;
        // Another resolver may have finished while we waited.
        if let Some(cached) = cell.cached() {
            return Ok(cached);
        }

        let generation = cell.generation();
        let visits = build_visits(self.source.as_ref(), key, state.stop_orders.values())?;

        let resolution = if visits.len() < 2 {
            Resolution::empty()
        } else {
            let locations = visits
                .iter()
                .map(|visit| visit.stop.location())
                .collect::<Result<Vec<_>>>()?;
            let legs = self.client.get_directions(&locations).await?;

            let mut resolution = resolver::compute(key.date, &visits, &legs, &self.settings);
            if resolution.runs_past(key.date) {
                warn!(itinerary = %key, finish = ?resolution.finish, "itinerary runs past midnight");
            }
            if cell.manual_override() {
                resolver::apply_manual_legs(&mut resolution, &state.stop_orders);
            }
            resolution
        };

        for (order_key, order) in state.stop_orders.iter_mut() {
            order.computed_time = resolution.times.get(order_key).copied();
        }

        info!(
            itinerary = %key,
            visits = visits.len(),
            departure = ?resolution.departure,
            "resolved itinerary"
        );

        let resolution = Arc::new(resolution);
        cell.commit(generation, resolution.clone());
        Ok(resolution)
    }

    /// Like [`Scheduler::resolve`], but a provider outage is reported to the
    /// alert sink and returned as a status instead of an error.
    pub async fn resolve_or_stale(&self, key: &ItineraryKey) -> Result<ItineraryStatus> {
        match self.resolve(key).await {
            Ok(resolution) => Ok(ItineraryStatus::Resolved(resolution)),
            Err(error) if error.is_retryable() => {
                self.alerts.provider_failure(key, &error);
                Ok(ItineraryStatus::NeedsRecomputation {
                    reason: error.to_string(),
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Running load of the built itinerary against its vehicle.
    pub async fn check_capacity(&self, key: &ItineraryKey) -> Result<CapacityReport> {
        let capacity = self.source.route_capacity(&key.route)?;
        let visits = self.build(key).await?;
        Ok(check_capacity(&visits, capacity))
    }

    pub async fn stop_orders(&self, key: &ItineraryKey) -> Result<Vec<StopOrder>> {
        let cell = self.cell(key)?;
        let state = cell.state.lock().await;
        Ok(state.stop_orders.values().cloned().collect())
    }

    /// Time reported for a StopOrder. In manual mode an operator override wins.
    pub async fn time_for(&self, key: &ItineraryKey, order: &StopOrderKey) -> Result<Option<NaiveTime>> {
        let cell = self.cell(key)?;
        if cell.manual_override() {
            let state = cell.state.lock().await;
            let custom = state.stop_orders.get(order).and_then(|o| o.custom_time);
            if custom.is_some() {
                return Ok(custom);
            }
        }

        let resolution = self.resolve(key).await?;
        Ok(resolution.times.get(order).copied())
    }

    async fn edit_stop_order(
        &self,
        key: &ItineraryKey,
        order: &StopOrderKey,
        edit: impl FnOnce(&mut StopOrder),
    ) -> Result<()> {
        let cell = self.cell(key)?;
        {
            let mut state = cell.state.lock().await;
            let stop_order = state.stop_orders.get_mut(order).ok_or_else(|| {
                TransportError::Validation(format!(
                    "{} has no {:?} stop order for {}",
                    key, order.role, order.obligation
                ))
            })?;
            edit(stop_order);
        }
        self.stop_order_changed(key)
    }

    /// Move a StopOrder within the visit sequence.
    pub async fn set_order(&self, key: &ItineraryKey, order: &StopOrderKey, position: u32) -> Result<()> {
        self.edit_stop_order(key, order, |o| o.order = position).await
    }

    pub async fn set_custom_time(
        &self,
        key: &ItineraryKey,
        order: &StopOrderKey,
        time: Option<NaiveTime>,
    ) -> Result<()> {
        self.edit_stop_order(key, order, |o| o.custom_time = time).await
    }

    pub fn set_manual_override(&self, key: &ItineraryKey, enabled: bool) -> Result<()> {
        let cell = self.cell(key)?;
        if cell.manual_override.swap(enabled, Ordering::SeqCst) != enabled {
            debug!(itinerary = %key, enabled, "manual override changed");
            cell.mark_dirty();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn cell() -> ItineraryCell {
        ItineraryCell::new(ItineraryKey::new(
            "2025",
            "north",
            NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
        ))
    }

    #[test]
    fn test_new_cell_is_dirty() {
        let cell = cell();
        assert!(cell.is_dirty());
        assert!(cell.cached().is_none());
    }

    #[test]
    fn test_commit_cleans() {
        let cell = cell();
        let generation = cell.generation();
        cell.commit(generation, Arc::new(Resolution::empty()));

        assert!(!cell.is_dirty());
        assert!(cell.cached().is_some());
    }

    #[test]
    fn test_invalidation_during_resolve_keeps_dirty() {
        let cell = cell();
        let generation = cell.generation();
        cell.mark_dirty();
        cell.commit(generation, Arc::new(Resolution::empty()));

        assert!(cell.is_dirty());
        assert!(cell.cached().is_none());
    }

    #[test]
    fn test_mark_dirty_hides_cache() {
        let cell = cell();
        cell.commit(cell.generation(), Arc::new(Resolution::empty()));
        cell.mark_dirty();
        assert!(cell.cached().is_none());
    }
}
