//! Sections, obligations and passengers: the demand side of the schedule.

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};

use crate::identifiers::*;
use crate::models::traits::ScheduleSource;
use crate::models::types::*;

/// A cohort of trips that share a start date.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub id: SectionId,
    pub period: PeriodId,
    pub name: Arc<str>,
    /// Date the leaders arrive. All other dates are offsets from this one.
    pub leaders_arrive: NaiveDate,
}

impl Section {
    pub fn new(
        id: impl Into<SectionId>,
        period: impl Into<PeriodId>,
        name: impl AsRef<str>,
        leaders_arrive: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            period: period.into(),
            name: name.as_ref().into(),
            leaders_arrive,
        }
    }

    /// External passengers ride in on this day.
    pub fn travelers_arrive(&self) -> NaiveDate {
        self.leaders_arrive + TimeDelta::days(1)
    }

    pub fn date_for(&self, phase: Phase) -> NaiveDate {
        self.leaders_arrive + TimeDelta::days(phase.offset_days())
    }

    /// External passengers ride home on this day.
    pub fn return_to_campus(&self) -> NaiveDate {
        self.date_for(Phase::Return)
    }
}

/// A scheduled trip: a group with a headcount that must be dropped off at one
/// stop, picked up from another and returned to the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Obligation {
    pub id: ObligationId,
    pub period: PeriodId,
    pub name: Arc<str>,
    pub headcount: u32,
    pub section_start: NaiveDate,

    pub dropoff_stop: StopId,
    /// Falls back to the dropoff stop when unset.
    pub pickup_stop: Option<StopId>,

    /// Template default for the return leg.
    pub default_return_route: Option<RouteId>,

    // Per-obligation overrides.
    pub dropoff_route: Option<RouteId>,
    pub pickup_route: Option<RouteId>,
    pub return_route: Option<RouteId>,
}

impl Obligation {
    pub fn new(
        id: impl Into<ObligationId>,
        section: &Section,
        headcount: u32,
        dropoff_stop: impl Into<StopId>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().into(),
            id,
            period: section.period.clone(),
            headcount,
            section_start: section.leaders_arrive,
            dropoff_stop: dropoff_stop.into(),
            pickup_stop: None,
            default_return_route: None,
            dropoff_route: None,
            pickup_route: None,
            return_route: None,
        }
    }

    pub fn with_pickup_stop(mut self, stop: impl Into<StopId>) -> Self {
        self.pickup_stop = Some(stop.into());
        self
    }

    pub fn with_return_route(mut self, route: impl Into<RouteId>) -> Self {
        self.default_return_route = Some(route.into());
        self
    }

    pub fn date_for(&self, phase: Phase) -> NaiveDate {
        self.section_start + TimeDelta::days(phase.offset_days())
    }

    pub fn stop_for(&self, role: StopRole) -> &StopId {
        match role {
            StopRole::Dropoff => &self.dropoff_stop,
            StopRole::Pickup => self.pickup_stop.as_ref().unwrap_or(&self.dropoff_stop),
        }
    }

    fn override_for(&self, phase: Phase) -> Option<&RouteId> {
        match phase {
            Phase::Dropoff => self.dropoff_route.as_ref(),
            Phase::Pickup => self.pickup_route.as_ref(),
            Phase::Return => self.return_route.as_ref(),
        }
    }

    /// Route this obligation rides for a phase: the override if set, else the
    /// template default. For dropoff and pickup the default is the route of
    /// the stop being served.
    pub fn route_for<S: ScheduleSource + ?Sized>(&self, phase: Phase, source: &S) -> Option<RouteId> {
        if let Some(route) = self.override_for(phase) {
            return Some(route.clone());
        }

        match phase.role() {
            Some(role) => source
                .get_stop(self.stop_for(role))
                .and_then(|stop| stop.route_id.clone()),
            None => self.default_return_route.clone(),
        }
    }

    /// Every `(phase, route, date)` this obligation occupies.
    pub fn assignments<S: ScheduleSource + ?Sized>(&self, source: &S) -> Vec<(Phase, RouteId, NaiveDate)> {
        Phase::ALL
            .into_iter()
            .filter_map(|phase| {
                self.route_for(phase, source)
                    .map(|route| (phase, route, self.date_for(phase)))
            })
            .collect()
    }
}

/// An individual traveler riding an external route to or from the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Passenger {
    pub id: PassengerId,
    pub name: Arc<str>,
    pub section: SectionId,

    pub stop_to_origin: Option<StopId>,
    pub stop_from_origin: Option<StopId>,

    // Override the stop's route.
    pub route_to_origin: Option<RouteId>,
    pub route_from_origin: Option<RouteId>,
}

impl Passenger {
    pub fn new(id: impl Into<PassengerId>, name: impl AsRef<str>, section: impl Into<SectionId>) -> Self {
        Self {
            id: id.into(),
            name: name.as_ref().into(),
            section: section.into(),
            stop_to_origin: None,
            stop_from_origin: None,
            route_to_origin: None,
            route_from_origin: None,
        }
    }

    pub fn to_origin_from(mut self, stop: impl Into<StopId>) -> Self {
        self.stop_to_origin = Some(stop.into());
        self
    }

    pub fn from_origin_to(mut self, stop: impl Into<StopId>) -> Self {
        self.stop_from_origin = Some(stop.into());
        self
    }

    pub fn route_to_origin<S: ScheduleSource + ?Sized>(&self, source: &S) -> Option<RouteId> {
        resolve_route(self.route_to_origin.as_ref(), self.stop_to_origin.as_ref(), source)
    }

    pub fn route_from_origin<S: ScheduleSource + ?Sized>(&self, source: &S) -> Option<RouteId> {
        resolve_route(self.route_from_origin.as_ref(), self.stop_from_origin.as_ref(), source)
    }
}

fn resolve_route<S: ScheduleSource + ?Sized>(
    route: Option<&RouteId>,
    stop: Option<&StopId>,
    source: &S,
) -> Option<RouteId> {
    match (route, stop) {
        (Some(route), _) => Some(route.clone()),
        (None, Some(stop)) => source.get_stop(stop).and_then(|s| s.route_id.clone()),
        (None, None) => None,
    }
}
