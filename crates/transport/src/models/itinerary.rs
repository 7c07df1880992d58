//! Itinerary keys, stop orders and per-period transport configuration.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::identifiers::*;
use crate::models::types::*;

/// Identifies one vehicle itinerary: an INTERNAL route driven on a date.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItineraryKey {
    pub period: PeriodId,
    pub route: RouteId,
    pub date: NaiveDate,
}

impl ItineraryKey {
    pub fn new(period: impl Into<PeriodId>, route: impl Into<RouteId>, date: NaiveDate) -> Self {
        Self {
            period: period.into(),
            route: route.into(),
            date,
        }
    }
}

impl fmt::Display for ItineraryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.route, self.date)
    }
}

/// Identifies a stop order within its itinerary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopOrderKey {
    pub obligation: ObligationId,
    pub role: StopRole,
}

impl StopOrderKey {
    pub fn new(obligation: impl Into<ObligationId>, role: StopRole) -> Self {
        Self {
            obligation: obligation.into(),
            role,
        }
    }
}

/// One obligation being picked up or dropped off at a stop.
#[derive(Clone, Debug, PartialEq)]
pub struct StopOrder {
    pub obligation: ObligationId,
    pub role: StopRole,
    pub stop: StopId,

    /// Position in the visit sequence. Starts as the stop's distance.
    pub order: u32,

    /// Written by the resolver after a successful recompute.
    pub computed_time: Option<NaiveTime>,
    /// Operator override, reported instead of the computed time in manual mode.
    pub custom_time: Option<NaiveTime>,
}

impl StopOrder {
    pub fn new(obligation: ObligationId, role: StopRole, stop: StopId, order: u32) -> Self {
        Self {
            obligation,
            role,
            stop,
            order,
            computed_time: None,
            custom_time: None,
        }
    }

    pub fn key(&self) -> StopOrderKey {
        StopOrderKey {
            obligation: self.obligation.clone(),
            role: self.role,
        }
    }
}

/// Anchors for every internal itinerary in a period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    pub period: PeriodId,
    /// Where every itinerary starts and where returns end.
    pub origin: StopId,
    /// Where pickups are brought and returns board.
    pub secondary: StopId,
}

impl TransportConfig {
    pub fn new(period: impl Into<PeriodId>, origin: impl Into<StopId>, secondary: impl Into<StopId>) -> Self {
        Self {
            period: period.into(),
            origin: origin.into(),
            secondary: secondary.into(),
        }
    }

    pub fn is_anchor(&self, stop: &StopId) -> bool {
        &self.origin == stop || &self.secondary == stop
    }
}
