//! Running load check against vehicle capacity.
//!
//! Everyone boarding at a stop is counted before anyone gets off, so the peak
//! at each stop is an upper bound on the real load.

use crate::identifiers::StopId;
use crate::schedule::builder::StopVisit;

/// Headcounts getting on and off at one stop.
pub trait Manifest {
    fn stop_id(&self) -> &StopId;
    fn boarding(&self) -> u32;
    fn alighting(&self) -> u32;
}

impl Manifest for StopVisit {
    fn stop_id(&self) -> &StopId {
        &self.stop.id
    }

    fn boarding(&self) -> u32 {
        self.picked_up
            .iter()
            .fold(0u32, |total, o| total.saturating_add(o.headcount))
    }

    fn alighting(&self) -> u32 {
        self.dropped_off
            .iter()
            .fold(0u32, |total, o| total.saturating_add(o.headcount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopLoad {
    pub stop: StopId,
    pub boarding: u32,
    pub alighting: u32,
    /// Load after boarding, before anyone gets off.
    pub peak: u32,
    /// Load when the vehicle leaves.
    pub load: u32,
    pub over_capacity: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityReport {
    pub capacity: u32,
    pub over_capacity: bool,
    pub first_violation: Option<StopId>,
    pub loads: Vec<StopLoad>,
}

impl CapacityReport {
    pub fn peak(&self) -> u32 {
        self.loads.iter().map(|l| l.peak).max().unwrap_or(0)
    }
}

pub fn check_capacity<M: Manifest>(visits: &[M], capacity: u32) -> CapacityReport {
    let mut load = 0u32;
    let mut first_violation = None;

    let loads = visits
        .iter()
        .map(|visit| {
            let boarding = visit.boarding();
            let alighting = visit.alighting();

            let peak = load.saturating_add(boarding);
            load = peak.saturating_sub(alighting);

            let over_capacity = peak > capacity;
            if over_capacity && first_violation.is_none() {
                first_violation = Some(visit.stop_id().clone());
            }

            StopLoad {
                stop: visit.stop_id().clone(),
                boarding,
                alighting,
                peak,
                load,
                over_capacity,
            }
        })
        .collect();

    CapacityReport {
        capacity,
        over_capacity: first_violation.is_some(),
        first_violation,
        loads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counts(StopId, u32, u32);

    impl Manifest for Counts {
        fn stop_id(&self) -> &StopId {
            &self.0
        }

        fn boarding(&self) -> u32 {
            self.1
        }

        fn alighting(&self) -> u32 {
            self.2
        }
    }

    fn visit(stop: &str, boarding: u32, alighting: u32) -> Counts {
        Counts(StopId::new(stop), boarding, alighting)
    }

    #[test]
    fn test_within_capacity() {
        let visits = [visit("origin", 10, 0), visit("a", 0, 4), visit("b", 0, 6)];
        let report = check_capacity(&visits, 10);

        assert!(!report.over_capacity);
        assert_eq!(report.first_violation, None);
        let loads: Vec<_> = report.loads.iter().map(|l| l.load).collect();
        assert_eq!(loads, vec![10, 6, 0]);
        assert_eq!(report.peak(), 10);
    }

    #[test]
    fn test_huge_headcounts_saturate() {
        let visits = [visit("origin", u32::MAX, 0), visit("a", 10, 0), visit("anchor", 0, u32::MAX)];
        let report = check_capacity(&visits, 50);

        assert_eq!(report.first_violation, Some(StopId::new("origin")));
        assert_eq!(report.loads[1].peak, u32::MAX);
        assert_eq!(report.loads[2].load, 0);
    }

    #[test]
    fn test_visit_headcount_sum_saturates() {
        use std::sync::Arc;

        use chrono::NaiveDate;

        use crate::models::obligation::{Obligation, Section};
        use crate::models::stop::Stop;
        use crate::schedule::builder::VisitKind;

        let section = Section::new("A", "2025", "A", NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        let trip = |id: &str| Arc::new(Obligation::new(id, &section, u32::MAX, "lyme"));
        let visit = StopVisit {
            stop: Arc::new(Stop::new("hanover", "Hanover", 0)),
            picked_up: vec![trip("t1"), trip("t2")],
            dropped_off: Vec::new(),
            kind: VisitKind::Departure,
        };

        assert_eq!(visit.boarding(), u32::MAX);
        assert_eq!(visit.alighting(), 0);
    }

    #[test]
    fn test_boarding_counts_before_alighting() {
        // A swap at one stop peaks above the net load.
        let visits = [visit("origin", 8, 0), visit("swap", 5, 8), visit("anchor", 0, 5)];
        let report = check_capacity(&visits, 10);

        assert!(report.over_capacity);
        assert_eq!(report.first_violation, Some(StopId::new("swap")));
        assert_eq!(report.loads[1].peak, 13);
        assert_eq!(report.loads[1].load, 5);
        assert!(!report.loads[2].over_capacity);
    }

    #[test]
    fn test_walk_continues_past_violation() {
        let visits = [visit("origin", 3, 0), visit("a", 4, 0), visit("b", 0, 7)];
        let report = check_capacity(&visits, 2);

        assert_eq!(report.first_violation, Some(StopId::new("origin")));
        assert!(report.loads[1].over_capacity);
        assert_eq!(report.loads[1].peak, 7);
        assert_eq!(report.loads[2].load, 0);
    }

    #[test]
    fn test_alighting_never_underflows() {
        let report = check_capacity(&[visit("a", 1, 5)], 4);
        assert_eq!(report.loads[0].load, 0);
    }

    #[test]
    fn test_empty() {
        let report = check_capacity::<Counts>(&[], 4);
        assert!(!report.over_capacity);
        assert_eq!(report.peak(), 0);
    }
}
