//! Turns provider legs into departure, arrival and StopOrder times.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::identifiers::StopId;
use crate::models::itinerary::{StopOrder, StopOrderKey};
use crate::models::types::StopRole;
use crate::network::directions::Leg;
use crate::schedule::builder::{StopVisit, VisitKind};
use crate::settings::TransportSettings;

/// A leg between two visits with its schedule, if it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedLeg {
    pub from: StopId,
    pub to: StopId,
    pub duration: TimeDelta,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

/// Result of a successful recompute. Cached until the itinerary is dirtied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    pub departure: Option<NaiveTime>,
    pub legs: Vec<TimedLeg>,
    /// Computed time for every StopOrder on a timed leg.
    pub times: HashMap<StopOrderKey, NaiveTime>,
    pub anchor_arrival: Option<NaiveTime>,
    /// End of the last timed leg. Wall-clock times above drop the date, so
    /// this is where a run past midnight shows up.
    pub finish: Option<NaiveDateTime>,
}

impl Resolution {
    /// Resolution of an itinerary with nowhere to go.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the timed part of the itinerary ends after `date`.
    pub fn runs_past(&self, date: NaiveDate) -> bool {
        self.finish.is_some_and(|finish| finish.date() > date)
    }
}

fn since_midnight(time: NaiveTime) -> TimeDelta {
    time.signed_duration_since(NaiveTime::MIN)
}

/// Departure from the origin. Itineraries that visit the secondary anchor
/// leave late enough not to arrive there before the floor.
pub fn departure_time(visits: &[StopVisit], legs: &[Leg], settings: &TransportSettings) -> NaiveTime {
    let departure = settings.default_departure;

    let Some(anchor) = anchor_index(visits) else {
        return departure;
    };
    if anchor == 0 {
        return departure;
    }

    let travel: TimeDelta = legs[..anchor.min(legs.len())]
        .iter()
        .map(|leg| leg.duration)
        .sum();
    let loading = settings.loading_time() * (anchor as i32 - 1);
    let total = travel + loading;

    if since_midnight(departure) + total < since_midnight(settings.secondary_floor) {
        settings.secondary_floor - total
    } else {
        departure
    }
}

fn anchor_index(visits: &[StopVisit]) -> Option<usize> {
    visits.iter().position(|v| v.kind == VisitKind::SecondaryAnchor)
}

/// Walk the legs up to the secondary anchor (all of them if it is not
/// visited), stamping StopOrder times along the way. `legs[i]` runs from
/// `visits[i]` to `visits[i + 1]`. The walk runs on `date`'s calendar.
pub fn compute(date: NaiveDate, visits: &[StopVisit], legs: &[Leg], settings: &TransportSettings) -> Resolution {
    let departure = departure_time(visits, legs, settings);
    let timed = anchor_index(visits).unwrap_or(legs.len()).min(legs.len());

    let mut times = HashMap::new();
    let mut timed_legs = Vec::with_capacity(legs.len());
    let mut time = date.and_time(departure);
    let mut anchor_arrival = None;
    let mut finish = None;

    for (i, (leg, pair)) in legs.iter().zip(visits.windows(2)).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);

        if i >= timed {
            timed_legs.push(TimedLeg {
                from: from.stop.id.clone(),
                to: to.stop.id.clone(),
                duration: leg.duration,
                start_time: None,
                end_time: None,
            });
            continue;
        }

        if i > 0 {
            for obligation in &from.picked_up {
                times.insert(StopOrderKey::new(obligation.id.clone(), StopRole::Pickup), time.time());
            }
            time = time + settings.loading_time();
        }

        let start_time = time;
        time = time + leg.duration;

        if to.kind == VisitKind::Intermediate {
            for obligation in &to.dropped_off {
                times.insert(StopOrderKey::new(obligation.id.clone(), StopRole::Dropoff), time.time());
            }
        }
        if to.kind == VisitKind::SecondaryAnchor {
            anchor_arrival = Some(time.time());
        }
        finish = Some(time);

        timed_legs.push(TimedLeg {
            from: from.stop.id.clone(),
            to: to.stop.id.clone(),
            duration: leg.duration,
            start_time: Some(start_time.time()),
            end_time: Some(time.time()),
        });
    }

    Resolution {
        departure: Some(departure),
        legs: timed_legs,
        times,
        anchor_arrival,
        finish,
    }
}

/// In manual mode legs only show what the operator entered: the override
/// shared by every StopOrder at the bounding stop, or nothing.
pub fn apply_manual_legs(resolution: &mut Resolution, stop_orders: &BTreeMap<StopOrderKey, StopOrder>) {
    let mut overrides: HashMap<&StopId, Option<NaiveTime>> = HashMap::new();
    for order in stop_orders.values() {
        overrides
            .entry(&order.stop)
            .and_modify(|shared| {
                if *shared != order.custom_time {
                    *shared = None;
                }
            })
            .or_insert(order.custom_time);
    }
    let at = |stop: &StopId| overrides.get(stop).copied().flatten();

    for leg in &mut resolution.legs {
        leg.start_time = at(&leg.from);
        leg.end_time = at(&leg.to);
    }
}
