//! Builds the ordered stop visits for one internal itinerary.
//!
//! A vehicle leaves the origin carrying every dropoff-phase trip, visits the
//! dropoff and pickup stops in StopOrder order, continues to the secondary
//! anchor when it has pickups or returns, and brings returns back to the
//! origin.

use std::cmp::Ordering;
use std::sync::Arc;

use itertools::Itertools;

use crate::graph::stop_graph::StopGraph;
use crate::models::itinerary::{ItineraryKey, StopOrder};
use crate::models::obligation::Obligation;
use crate::models::stop::Stop;
use crate::models::traits::ScheduleSource;
use crate::models::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitKind {
    /// The origin, where dropoff trips board.
    Departure,
    /// A trailhead where trips are dropped off or picked up.
    Intermediate,
    /// Pickups get off, returns board.
    SecondaryAnchor,
    /// Back at the origin with the returns.
    Return,
}

#[derive(Clone, Debug)]
pub struct StopVisit {
    pub stop: Arc<Stop>,
    /// Obligations boarding here.
    pub picked_up: Vec<Arc<Obligation>>,
    /// Obligations leaving the vehicle here.
    pub dropped_off: Vec<Arc<Obligation>>,
    pub kind: VisitKind,
}

impl StopVisit {
    fn new(stop: Arc<Stop>, kind: VisitKind) -> Self {
        Self {
            stop,
            picked_up: Vec::new(),
            dropped_off: Vec::new(),
            kind,
        }
    }
}

struct Entry<'a> {
    order: &'a StopOrder,
    stop: Arc<Stop>,
    obligation: Arc<Obligation>,
}

/// Ordered visits for `key` given its current StopOrders.
pub fn build_visits<'a>(
    source: &dyn ScheduleSource,
    key: &ItineraryKey,
    stop_orders: impl IntoIterator<Item = &'a StopOrder>,
) -> Result<Vec<StopVisit>> {
    let anchors = StopGraph::new(source).anchors(&key.period)?;

    let entries = stop_orders
        .into_iter()
        .map(|order| {
            let stop = source
                .get_stop(&order.stop)
                .ok_or_else(|| TransportError::StopNotFound(order.stop.clone()))?;
            let obligation = source
                .get_obligation(&order.obligation)
                .ok_or_else(|| TransportError::ObligationNotFound(order.obligation.clone()))?;
            Ok(Entry { order, stop, obligation })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut departure = StopVisit::new(anchors.origin.clone(), VisitKind::Departure);
    let mut pickups = Vec::new();

    let intermediate = entries
        .into_iter()
        .into_group_map_by(|entry| entry.stop.id.clone())
        .into_values()
        .map(|group| {
            let first_order = group.iter().map(|e| e.order.order).min().unwrap_or_default();
            let mut visit = StopVisit::new(group[0].stop.clone(), VisitKind::Intermediate);
            for entry in group {
                match entry.order.role {
                    StopRole::Dropoff => {
                        departure.picked_up.push(entry.obligation.clone());
                        visit.dropped_off.push(entry.obligation);
                    }
                    StopRole::Pickup => {
                        pickups.push(entry.obligation.clone());
                        visit.picked_up.push(entry.obligation);
                    }
                }
            }
            (first_order, visit)
        })
        .sorted_by(|(a_order, a), (b_order, b)| {
            a_order
                .cmp(b_order)
                .then_with(|| StopGraph::compare(&a.stop, &b.stop))
        })
        .map(|(_, visit)| visit)
        .collect::<Vec<_>>();

    let returns = source.obligations_for(&key.period, Phase::Return, &key.route, key.date);

    let mut visits = Vec::with_capacity(intermediate.len() + 3);
    visits.push(departure);
    visits.extend(intermediate);

    if !pickups.is_empty() || !returns.is_empty() {
        let mut anchor = StopVisit::new(anchors.secondary.clone(), VisitKind::SecondaryAnchor);
        anchor.dropped_off = pickups;
        anchor.picked_up = returns.clone();
        visits.push(anchor);
    }

    if !returns.is_empty() {
        let mut back = StopVisit::new(anchors.origin, VisitKind::Return);
        back.dropped_off = returns;
        visits.push(back);
    }

    for visit in &mut visits {
        visit.picked_up.sort_by(by_id);
        visit.dropped_off.sort_by(by_id);
    }

    Ok(visits)
}

fn by_id(a: &Arc<Obligation>, b: &Arc<Obligation>) -> Ordering {
    a.id.cmp(&b.id)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::identifiers::*;
    use crate::models::itinerary::TransportConfig;
    use crate::models::obligation::Section;
    use crate::models::stop::{Route, Vehicle};
    use crate::provider::static_provider::StaticScheduleProvider;

    fn section() -> Section {
        Section::new("A", "2025", "A", NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())
    }

    fn provider() -> StaticScheduleProvider {
        let provider = StaticScheduleProvider::new();
        provider.insert_vehicle(Vehicle::new("bus", "Bus", 20));
        provider.insert_route(Route::new("north", "North", RouteCategory::Internal, "bus"));
        provider.insert_stop(Stop::new("hanover", "Hanover", 0).with_address("Hanover")).unwrap();
        provider.insert_stop(Stop::new("lodge", "Lodge", 60).with_address("Lodge")).unwrap();
        for (id, distance) in [("lyme", 10), ("orford", 20), ("piermont", 30)] {
            provider
                .insert_stop(Stop::new(id, id, distance).with_address(id).on_route("north"))
                .unwrap();
        }
        provider
            .set_transport_config(TransportConfig::new("2025", "hanover", "lodge"))
            .unwrap();
        provider
    }

    fn key(day: u32) -> ItineraryKey {
        ItineraryKey::new("2025", "north", NaiveDate::from_ymd_opt(2025, 9, day).unwrap())
    }

    fn order(obligation: &str, role: StopRole, stop: &str, order: u32) -> StopOrder {
        StopOrder::new(obligation.into(), role, stop.into(), order)
    }

    fn ids(obligations: &[Arc<Obligation>]) -> Vec<String> {
        obligations.iter().map(|o| o.id.to_string()).collect()
    }

    #[test]
    fn test_dropoffs_only_skip_secondary_anchor() {
        let provider = provider();
        provider.insert_obligation(Obligation::new("t1", &section(), 8, "orford"));
        provider.insert_obligation(Obligation::new("t2", &section(), 6, "lyme"));

        let orders = vec![
            order("t1", StopRole::Dropoff, "orford", 20),
            order("t2", StopRole::Dropoff, "lyme", 10),
        ];
        let visits = build_visits(&provider, &key(3), &orders).unwrap();

        let stops: Vec<_> = visits.iter().map(|v| v.stop.id.to_string()).collect();
        assert_eq!(stops, vec!["hanover", "lyme", "orford"]);
        assert_eq!(visits[0].kind, VisitKind::Departure);
        assert_eq!(ids(&visits[0].picked_up), vec!["t1", "t2"]);
        assert_eq!(ids(&visits[1].dropped_off), vec!["t2"]);
        assert_eq!(ids(&visits[2].dropped_off), vec!["t1"]);
    }

    #[test]
    fn test_groups_roles_at_one_stop() {
        let provider = provider();
        provider.insert_obligation(Obligation::new("t1", &section(), 8, "lyme"));
        let earlier = Section::new("Z", "2025", "Z", NaiveDate::from_ymd_opt(2025, 8, 30).unwrap());
        provider.insert_obligation(Obligation::new("t0", &earlier, 5, "lyme"));

        let orders = vec![
            order("t1", StopRole::Dropoff, "lyme", 10),
            order("t0", StopRole::Pickup, "lyme", 10),
        ];
        let visits = build_visits(&provider, &key(3), &orders).unwrap();

        assert_eq!(visits.len(), 3);
        assert_eq!(ids(&visits[1].picked_up), vec!["t0"]);
        assert_eq!(ids(&visits[1].dropped_off), vec!["t1"]);
        assert_eq!(visits[2].kind, VisitKind::SecondaryAnchor);
        assert_eq!(ids(&visits[2].dropped_off), vec!["t0"]);
    }

    #[test]
    fn test_order_key_beats_distance() {
        let provider = provider();
        provider.insert_obligation(Obligation::new("t1", &section(), 8, "piermont"));
        provider.insert_obligation(Obligation::new("t2", &section(), 6, "lyme"));

        let orders = vec![
            order("t1", StopRole::Dropoff, "piermont", 1),
            order("t2", StopRole::Dropoff, "lyme", 10),
        ];
        let visits = build_visits(&provider, &key(3), &orders).unwrap();
        assert_eq!(visits[1].stop.id, StopId::new("piermont"));
        assert_eq!(visits[2].stop.id, StopId::new("lyme"));
    }

    #[test]
    fn test_returns_board_at_anchor() {
        let provider = provider();
        // Section A returns on the 6th.
        provider.insert_obligation(Obligation::new("t1", &section(), 8, "lyme").with_return_route("north"));

        let visits = build_visits(&provider, &key(6), std::iter::empty()).unwrap();

        let kinds: Vec<_> = visits.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![VisitKind::Departure, VisitKind::SecondaryAnchor, VisitKind::Return]
        );
        assert_eq!(ids(&visits[1].picked_up), vec!["t1"]);
        assert_eq!(ids(&visits[2].dropped_off), vec!["t1"]);
        assert_eq!(visits[2].stop.id, StopId::new("hanover"));
    }

    #[test]
    fn test_empty_itinerary() {
        let provider = provider();
        let visits = build_visits(&provider, &key(3), std::iter::empty()).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].kind, VisitKind::Departure);
    }

    #[test]
    fn test_unknown_obligation_fails() {
        let provider = provider();
        let orders = vec![order("ghost", StopRole::Dropoff, "lyme", 10)];
        assert!(matches!(
            build_visits(&provider, &key(3), &orders),
            Err(TransportError::ObligationNotFound(_))
        ));
    }
}
