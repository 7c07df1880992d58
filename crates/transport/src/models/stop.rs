//! Stops, routes and vehicles: shared reference data owned by configuration.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveTime;
use geo::Point;

use crate::identifiers::*;
use crate::models::types::*;
use crate::spatial::coordinates::{format_lat_lng, parse_lat_lng};

/// Where a directions provider should route to.
#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    Coordinates(Point),
    Address(Arc<str>),
}

impl Location {
    /// String form sent to the directions provider.
    pub fn as_query(&self) -> String {
        match self {
            Location::Coordinates(point) => format_lat_lng(*point),
            Location::Address(address) => address.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query())
    }
}

/// A physical pickup/dropoff point or bus stop.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: Arc<str>,
    pub address: Option<Arc<str>>,
    pub coordinates: Option<Point>,

    /// Rough distance from the origin, used for ordering stops on a route.
    pub distance: u32,

    /// Default route serving this stop.
    pub route_id: Option<RouteId>,

    // Rider-facing costs, in cents. EXTERNAL stops only.
    pub cost_one_way: Option<u32>,
    pub cost_round_trip: Option<u32>,

    // Fixed schedule, mostly for EXTERNAL stops.
    pub pickup_time: Option<NaiveTime>,
    pub dropoff_time: Option<NaiveTime>,
}

impl Stop {
    pub fn new(id: impl Into<StopId>, name: impl AsRef<str>, distance: u32) -> Self {
        Self {
            id: id.into(),
            name: name.as_ref().into(),
            address: None,
            coordinates: None,
            distance,
            route_id: None,
            cost_one_way: None,
            cost_round_trip: None,
            pickup_time: None,
            dropoff_time: None,
        }
    }

    pub fn with_address(mut self, address: impl AsRef<str>) -> Self {
        self.address = Some(address.as_ref().into());
        self
    }

    /// Set coordinates from a `"lat,lng"` string.
    pub fn with_lat_lng(mut self, lat_lng: &str) -> Result<Self> {
        self.coordinates = Some(parse_lat_lng(lat_lng)?);
        Ok(self)
    }

    pub fn on_route(mut self, route_id: impl Into<RouteId>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    /// Coordinates are more precise than addresses, so they win when both exist.
    pub fn location(&self) -> Result<Location> {
        match (&self.coordinates, &self.address) {
            (Some(point), _) => Ok(Location::Coordinates(*point)),
            (None, Some(address)) if !address.trim().is_empty() => {
                Ok(Location::Address(address.clone()))
            }
            _ => Err(TransportError::Validation(format!(
                "{} must set either coordinates or an address",
                self.name
            ))),
        }
    }

    /// True when a directions provider would see a different place.
    pub fn location_differs(&self, other: &Stop) -> bool {
        self.address != other.address || self.coordinates != other.coordinates
    }

    /// Validate this stop against the category of the route it belongs to.
    pub fn validate(&self, category: Option<RouteCategory>) -> Result<()> {
        let mut problems = Vec::new();

        if self.location().is_err() {
            problems.push(format!("{} must set either coordinates or an address", self.name));
        }
        if let Some(category) = category {
            problems.extend(category.stop_violations(self));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TransportError::Validation(problems.join("; ")))
        }
    }
}

impl RouteCategory {
    /// Category-specific rules for stops on a route of this category.
    pub fn stop_violations(self, stop: &Stop) -> Vec<String> {
        let mut problems = Vec::new();
        match self {
            RouteCategory::External => {
                if stop.cost_round_trip.is_none() {
                    problems.push("external stops require a round-trip cost".to_string());
                }
                if stop.cost_one_way.is_none() {
                    problems.push("external stops require a one-way cost".to_string());
                }
                if stop.pickup_time.is_none() {
                    problems.push("external stops require a pickup time".to_string());
                }
                if stop.dropoff_time.is_none() {
                    problems.push("external stops require a dropoff time".to_string());
                }
            }
            RouteCategory::Internal => {
                if stop.cost_round_trip.is_some() || stop.cost_one_way.is_some() {
                    problems.push("internal stops cannot have a cost".to_string());
                }
            }
        }
        problems
    }

    /// Reject scheduling a route of this category where `expected` is needed.
    pub fn require(self, expected: RouteCategory, route: &RouteId) -> Result<()> {
        if self == expected {
            Ok(())
        } else {
            Err(TransportError::Validation(format!(
                "route {} is {:?}, expected {:?}",
                route, self, expected
            )))
        }
    }
}

/// A template grouping the stops that one vehicle visits together.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub name: Arc<str>,
    pub category: RouteCategory,
    pub vehicle_id: VehicleId,
}

impl Route {
    pub fn new(
        id: impl Into<RouteId>,
        name: impl AsRef<str>,
        category: RouteCategory,
        vehicle_id: impl Into<VehicleId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.as_ref().into(),
            category,
            vehicle_id: vehicle_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: Arc<str>,
    pub capacity: u32,
    /// Chartered through a bus company rather than run in-house.
    pub chartered: bool,
}

impl Vehicle {
    pub fn new(id: impl Into<VehicleId>, name: impl AsRef<str>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.as_ref().into(),
            capacity,
            chartered: false,
        }
    }
}
