//! Section buses on EXTERNAL routes.
//!
//! External stops run on fixed published times, so legs are anchored on the
//! stop schedule rather than on a departure: inbound legs leave at the start
//! stop's pickup time, outbound legs arrive at the end stop's dropoff time.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use itertools::Itertools;

use crate::graph::stop_graph::StopGraph;
use crate::identifiers::*;
use crate::models::obligation::Passenger;
use crate::models::stop::Stop;
use crate::models::traits::ScheduleSource;
use crate::models::types::*;
use crate::network::directions::Leg;
use crate::schedule::capacity::{check_capacity, CapacityReport, Manifest};
use crate::schedule::resolver::TimedLeg;
use crate::schedule::scheduler::Scheduler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From home stops to the origin when the section starts.
    ToOrigin,
    /// From the origin back to home stops when the section ends.
    FromOrigin,
}

#[derive(Clone, Debug)]
pub struct ExternalVisit {
    pub stop: Arc<Stop>,
    pub boarding: Vec<Arc<Passenger>>,
    pub alighting: Vec<Arc<Passenger>>,
}

impl Manifest for ExternalVisit {
    fn stop_id(&self) -> &StopId {
        &self.stop.id
    }

    fn boarding(&self) -> u32 {
        u32::try_from(self.boarding.len()).unwrap_or(u32::MAX)
    }

    fn alighting(&self) -> u32 {
        u32::try_from(self.alighting.len()).unwrap_or(u32::MAX)
    }
}

#[derive(Clone, Debug)]
pub struct ExternalItinerary {
    pub route: RouteId,
    pub section: SectionId,
    pub direction: Direction,
    pub date: NaiveDate,
    pub visits: Vec<ExternalVisit>,
    pub legs: Vec<TimedLeg>,
    pub capacity: CapacityReport,
}

/// Group passengers by stop and order the stops for `direction`: farthest
/// first when heading in, nearest first when heading out.
fn passenger_visits(
    source: &dyn ScheduleSource,
    passengers: &[Arc<Passenger>],
    direction: Direction,
) -> Result<Vec<ExternalVisit>> {
    let stop_of = |p: &Passenger| match direction {
        Direction::ToOrigin => p.stop_to_origin.clone(),
        Direction::FromOrigin => p.stop_from_origin.clone(),
    };

    passengers
        .iter()
        .filter_map(|p| stop_of(p.as_ref()).map(|stop| (stop, p.clone())))
        .into_group_map()
        .into_iter()
        .map(|(stop_id, riders)| {
            let stop = source
                .get_stop(&stop_id)
                .ok_or_else(|| TransportError::StopNotFound(stop_id.clone()))?;
            let (boarding, alighting) = match direction {
                Direction::ToOrigin => (riders, Vec::new()),
                Direction::FromOrigin => (Vec::new(), riders),
            };
            Ok(ExternalVisit { stop, boarding, alighting })
        })
        .collect::<Result<Vec<_>>>()
        .map(|visits| {
            visits
                .into_iter()
                .sorted_by(|a, b| match direction {
                    Direction::ToOrigin => StopGraph::compare(&b.stop, &a.stop),
                    Direction::FromOrigin => StopGraph::compare(&a.stop, &b.stop),
                })
                .collect()
        })
}

/// Attach fixed-schedule times to provider legs.
pub fn time_external_legs(visits: &[ExternalVisit], legs: &[Leg], direction: Direction) -> Vec<TimedLeg> {
    legs.iter()
        .zip(visits.windows(2))
        .map(|(leg, pair)| {
            let (from, to) = (&pair[0].stop, &pair[1].stop);
            let (start_time, end_time): (Option<NaiveTime>, Option<NaiveTime>) = match direction {
                Direction::ToOrigin => {
                    let start = from.pickup_time;
                    (start, start.map(|t| t + leg.duration))
                }
                Direction::FromOrigin => {
                    let end = to.dropoff_time;
                    (end.map(|t| t - leg.duration), end)
                }
            };
            TimedLeg {
                from: from.id.clone(),
                to: to.id.clone(),
                duration: leg.duration,
                start_time,
                end_time,
            }
        })
        .collect()
}

impl Scheduler {
    /// Stops, legs and load of a section's bus on an external route. Computed
    /// on every call.
    pub async fn external_directions(
        &self,
        route: &RouteId,
        section: &SectionId,
        direction: Direction,
    ) -> Result<ExternalItinerary> {
        let source = self.source.as_ref();
        let route_entry = source
            .get_route(route)
            .ok_or_else(|| TransportError::RouteNotFound(route.clone()))?;
        route_entry.category.require(RouteCategory::External, route)?;
        let section_entry = source
            .get_section(section)
            .ok_or_else(|| TransportError::SectionNotFound(section.clone()))?;
        let origin = StopGraph::new(source).anchors(&section_entry.period)?.origin;

        let (passengers, date) = match direction {
            Direction::ToOrigin => (
                source.passengers_to_origin(route, section),
                section_entry.travelers_arrive(),
            ),
            Direction::FromOrigin => (
                source.passengers_from_origin(route, section),
                section_entry.return_to_campus(),
            ),
        };

        let stops = passenger_visits(source, &passengers, direction)?;
        // Passengers without a stop in this direction don't ride.
        let riders: Vec<_> = stops
            .iter()
            .flat_map(|v| v.boarding.iter().chain(&v.alighting))
            .cloned()
            .collect();

        let mut visits = Vec::with_capacity(stops.len() + 1);
        match direction {
            Direction::ToOrigin => {
                visits.extend(stops);
                visits.push(ExternalVisit {
                    stop: origin,
                    boarding: Vec::new(),
                    alighting: riders,
                });
            }
            Direction::FromOrigin => {
                visits.push(ExternalVisit {
                    stop: origin,
                    boarding: riders,
                    alighting: Vec::new(),
                });
                visits.extend(stops);
            }
        }

        let legs = if visits.len() < 2 {
            Vec::new()
        } else {
            let locations = visits
                .iter()
                .map(|v| v.stop.location())
                .collect::<Result<Vec<_>>>()?;
            let legs = self.client.get_directions(&locations).await?;
            time_external_legs(&visits, &legs, direction)
        };

        let capacity = check_capacity(&visits, source.route_capacity(route)?);

        Ok(ExternalItinerary {
            route: route.clone(),
            section: section.clone(),
            direction,
            date,
            visits,
            legs,
            capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::models::stop::Location;

    fn hms(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn stop(id: &str, pickup: Option<NaiveTime>, dropoff: Option<NaiveTime>) -> ExternalVisit {
        let mut stop = Stop::new(id, id, 0).with_address(id);
        stop.pickup_time = pickup;
        stop.dropoff_time = dropoff;
        ExternalVisit {
            stop: Arc::new(stop),
            boarding: Vec::new(),
            alighting: Vec::new(),
        }
    }

    fn leg(minutes: i64) -> Leg {
        Leg {
            start: Location::Address("a".into()),
            end: Location::Address("b".into()),
            duration: TimeDelta::minutes(minutes),
        }
    }

    #[test]
    fn test_inbound_legs_leave_at_pickup_time() {
        let visits = [
            stop("boston", Some(hms(7, 0)), None),
            stop("lebanon", Some(hms(9, 30)), None),
            stop("hanover", None, None),
        ];
        let legs = time_external_legs(&visits, &[leg(120), leg(15)], Direction::ToOrigin);

        assert_eq!(legs[0].start_time, Some(hms(7, 0)));
        assert_eq!(legs[0].end_time, Some(hms(9, 0)));
        assert_eq!(legs[1].start_time, Some(hms(9, 30)));
        assert_eq!(legs[1].end_time, Some(hms(9, 45)));
    }

    #[test]
    fn test_outbound_legs_arrive_at_dropoff_time() {
        let visits = [
            stop("hanover", None, None),
            stop("lebanon", None, Some(hms(13, 0))),
            stop("boston", None, Some(hms(16, 0))),
        ];
        let legs = time_external_legs(&visits, &[leg(15), leg(120)], Direction::FromOrigin);

        assert_eq!(legs[0].start_time, Some(hms(12, 45)));
        assert_eq!(legs[0].end_time, Some(hms(13, 0)));
        assert_eq!(legs[1].start_time, Some(hms(14, 0)));
        assert_eq!(legs[1].end_time, Some(hms(16, 0)));
    }

    #[test]
    fn test_passenger_counts() {
        let mut visit = stop("boston", None, None);
        let passenger = Arc::new(Passenger::new("p1", "Pat", "A"));
        visit.boarding = vec![passenger.clone(), passenger];
        assert_eq!(Manifest::boarding(&visit), 2);
        assert_eq!(Manifest::alighting(&visit), 0);
    }
}
