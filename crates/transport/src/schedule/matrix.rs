//! Which internal route/date pairs have riders, and which of them have
//! problems.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::identifiers::*;
use crate::models::itinerary::ItineraryKey;
use crate::models::obligation::Obligation;
use crate::models::types::*;
use crate::schedule::scheduler::Scheduler;

/// Obligations riding one internal route on one date, by phase.
#[derive(Clone, Debug, Default)]
pub struct Riders {
    pub dropoffs: Vec<Arc<Obligation>>,
    pub pickups: Vec<Arc<Obligation>>,
    pub returns: Vec<Arc<Obligation>>,
}

impl Riders {
    fn push(&mut self, phase: Phase, obligation: Arc<Obligation>) {
        match phase {
            Phase::Dropoff => self.dropoffs.push(obligation),
            Phase::Pickup => self.pickups.push(obligation),
            Phase::Return => self.returns.push(obligation),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dropoffs.is_empty() && self.pickups.is_empty() && self.returns.is_empty()
    }

    pub fn headcount(&self) -> u32 {
        self.dropoffs
            .iter()
            .chain(&self.pickups)
            .chain(&self.returns)
            .map(|o| o.headcount)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportIssue {
    /// Riders are assigned but no itinerary has been registered.
    Unscheduled,
    OverCapacity { stop: StopId, peak: u32, capacity: u32 },
}

impl Scheduler {
    /// Riders per INTERNAL `(route, date)` in a period.
    pub fn rider_matrix(&self, period: &PeriodId) -> BTreeMap<(RouteId, NaiveDate), Riders> {
        let source = self.source.as_ref();
        let mut matrix: BTreeMap<(RouteId, NaiveDate), Riders> = BTreeMap::new();

        for obligation in source.all_obligations(period) {
            for (phase, route, date) in obligation.assignments(source) {
                let internal = source
                    .get_route(&route)
                    .is_some_and(|r| r.category == RouteCategory::Internal);
                if internal {
                    matrix
                        .entry((route, date))
                        .or_default()
                        .push(phase, obligation.clone());
                }
            }
        }

        matrix
    }

    /// Route/date pairs in a period that need attention.
    pub async fn issues(&self, period: &PeriodId) -> Result<Vec<(ItineraryKey, TransportIssue)>> {
        let mut issues = Vec::new();

        for (route, date) in self.rider_matrix(period).into_keys() {
            let key = ItineraryKey {
                period: period.clone(),
                route,
                date,
            };

            if self.find_cell(&key).is_none() {
                issues.push((key, TransportIssue::Unscheduled));
                continue;
            }

            let report = self.check_capacity(&key).await?;
            if let Some(stop) = report.first_violation.clone() {
                let peak = report.peak();
                issues.push((
                    key,
                    TransportIssue::OverCapacity {
                        stop,
                        peak,
                        capacity: report.capacity,
                    },
                ));
            }
        }

        Ok(issues)
    }
}
