//! Invalidation triggers and StopOrder synchronization.
//!
//! Nothing is recomputed here. Triggers mark the affected itineraries dirty
//! (and resync their StopOrders where the assignment changed); the resolver
//! picks the work up on the next read. Fan-out is best-effort: a failure on
//! one itinerary is logged and the others are still marked.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::identifiers::*;
use crate::models::itinerary::{ItineraryKey, StopOrder, StopOrderKey, TransportConfig};
use crate::models::obligation::Obligation;
use crate::models::stop::Stop;
use crate::models::types::*;
use crate::schedule::scheduler::{ItineraryCell, Scheduler};

impl Scheduler {
    /// Bring an itinerary's StopOrders in line with the obligations currently
    /// assigned to it. Returns whether anything changed; changes mark the
    /// itinerary dirty.
    ///
    /// The assignment is read while the cell's lock is held, so two
    /// concurrent syncs apply their snapshots in the order they were taken.
    pub(crate) async fn sync_stop_orders(&self, cell: &ItineraryCell) -> Result<bool> {
        let key = cell.key();
        let mut state = cell.state.lock().await;

        let mut desired = BTreeMap::new();
        for phase in [Phase::Dropoff, Phase::Pickup] {
            let Some(role) = phase.role() else { continue };
            for obligation in self.source.obligations_for(&key.period, phase, &key.route, key.date) {
                let stop_id = obligation.stop_for(role);
                let stop = self
                    .source
                    .get_stop(stop_id)
                    .ok_or_else(|| TransportError::StopNotFound(stop_id.clone()))?;
                desired.insert(StopOrderKey::new(obligation.id.clone(), role), stop);
            }
        }

        let before = state.stop_orders.len();
        state.stop_orders.retain(|order_key, _| desired.contains_key(order_key));
        let mut changed = state.stop_orders.len() != before;

        for (order_key, stop) in desired {
            match state.stop_orders.get_mut(&order_key) {
                Some(order) if order.stop == stop.id => {}
                Some(order) => {
                    order.stop = stop.id.clone();
                    order.order = stop.distance;
                    order.computed_time = None;
                    changed = true;
                }
                None => {
                    let order = StopOrder::new(
                        order_key.obligation.clone(),
                        order_key.role,
                        stop.id.clone(),
                        stop.distance,
                    );
                    state.stop_orders.insert(order_key, order);
                    changed = true;
                }
            }
        }
        if changed {
            debug!(itinerary = %key, "stop orders resynchronized");
            cell.mark_dirty();
        }
        drop(state);
        Ok(changed)
    }

    /// Resync (best-effort) and dirty each registered itinerary in `keys`.
    async fn resync_all(&self, keys: impl IntoIterator<Item = ItineraryKey>) -> Vec<ItineraryKey> {
        let mut marked = Vec::new();
        for key in keys {
            let Some(cell) = self.find_cell(&key) else { continue };
            if let Err(error) = self.sync_stop_orders(&cell).await {
                warn!(itinerary = %key, "failed to resync stop orders: {error}");
            }
            cell.mark_dirty();
            marked.push(key);
        }
        marked
    }

    /// A StopOrder on `key` was created, edited or deleted.
    pub fn stop_order_changed(&self, key: &ItineraryKey) -> Result<()> {
        self.cell(key)?.mark_dirty();
        Ok(())
    }

    /// A stop was edited. Location changes dirty every itinerary that visits
    /// it; route changes move its trips between itineraries.
    pub async fn stop_changed(&self, old: &Stop, new: &Stop) -> Vec<ItineraryKey> {
        let mut marked = BTreeSet::new();

        if old.location_differs(new) {
            for cell in self.cells() {
                let key = cell.key();
                let is_anchor = self
                    .source
                    .transport_config(&key.period)
                    .is_some_and(|config| config.is_anchor(&new.id));
                let visits = is_anchor || {
                    let state = cell.state.lock().await;
                    state.stop_orders.values().any(|order| order.stop == new.id)
                };
                if visits {
                    cell.mark_dirty();
                    marked.insert(key.clone());
                }
            }
        }

        if old.route_id != new.route_id {
            let routes: Vec<&RouteId> = old.route_id.iter().chain(new.route_id.iter()).collect();
            let affected = self
                .cells()
                .into_iter()
                .map(|cell| cell.key().clone())
                .filter(|key| routes.contains(&&key.route));
            marked.extend(self.resync_all(affected).await);
        }

        marked.into_iter().collect()
    }

    /// An obligation was created (`old` is `None`), edited, or deleted (`new`
    /// is `None`). Both its old and new itineraries are resynced and dirtied.
    pub async fn obligation_changed(
        &self,
        old: Option<&Obligation>,
        new: Option<&Obligation>,
    ) -> Vec<ItineraryKey> {
        let source = self.source.as_ref();
        let mut affected = BTreeSet::new();

        for obligation in old.into_iter().chain(new) {
            for (_, route, date) in obligation.assignments(source) {
                affected.insert(ItineraryKey {
                    period: obligation.period.clone(),
                    route,
                    date,
                });
            }
        }

        // Itineraries still holding StopOrders for it, in case `old` is stale.
        let ids: Vec<&ObligationId> = old.iter().chain(new.iter()).map(|o| &o.id).collect();
        for cell in self.cells() {
            let state = cell.state.lock().await;
            if state.stop_orders.keys().any(|k| ids.contains(&&k.obligation)) {
                affected.insert(cell.key().clone());
            }
        }

        self.resync_all(affected).await
    }

    /// The anchors of a period were set or changed.
    pub fn config_changed(
        &self,
        period: &PeriodId,
        old: Option<&TransportConfig>,
        new: &TransportConfig,
    ) -> Vec<ItineraryKey> {
        let unchanged = old.is_some_and(|old| old.origin == new.origin && old.secondary == new.secondary);
        if unchanged {
            return Vec::new();
        }

        let keys = self.keys_in_period(period);
        for key in &keys {
            if let Some(cell) = self.find_cell(key) {
                cell.mark_dirty();
            }
        }
        debug!(%period, itineraries = keys.len(), "transport config changed");
        keys
    }
}
