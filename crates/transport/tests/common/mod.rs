#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use orientation_transport::prelude::*;

pub const LEG_MINUTES: u64 = 30;

/// Directions provider with fixed leg durations that counts its calls.
#[derive(Default)]
pub struct FakeProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DirectionsProvider for FakeProvider {
    fn route<'a>(
        &'a self,
        locations: &'a [Location],
    ) -> Pin<Box<dyn Future<Output = std::result::Result<ProviderRoute, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::Transport("connection refused".into()));
            }
            Ok(ProviderRoute {
                legs: vec![
                    ProviderLeg {
                        duration: Duration::from_secs(LEG_MINUTES * 60),
                    };
                    locations.len() - 1
                ],
                waypoint_order: (0..locations.len() - 2).collect(),
            })
        })
    }
}

/// Alert sink that remembers which itineraries went stale.
#[derive(Default)]
pub struct RecordingAlerts {
    pub alerts: Mutex<Vec<ItineraryKey>>,
}

impl AlertSink for RecordingAlerts {
    fn provider_failure(&self, key: &ItineraryKey, _error: &TransportError) {
        self.alerts.lock().unwrap().push(key.clone());
    }
}

/// Schedule source whose next `obligations_for` call stalls, after reading
/// its result, until the test releases it.
pub struct GatedSource {
    pub inner: Arc<StaticScheduleProvider>,
    gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
}

impl GatedSource {
    pub fn new(inner: Arc<StaticScheduleProvider>) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
        }
    }

    /// Returns a receiver signalled once the stalled call holds its result,
    /// and the sender that lets it continue.
    pub fn arm(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }
}

impl ScheduleSource for GatedSource {
    fn get_stop(&self, id: &StopId) -> Option<Arc<Stop>> {
        self.inner.get_stop(id)
    }

    fn get_route(&self, id: &RouteId) -> Option<Arc<Route>> {
        self.inner.get_route(id)
    }

    fn get_vehicle(&self, id: &VehicleId) -> Option<Arc<Vehicle>> {
        self.inner.get_vehicle(id)
    }

    fn get_section(&self, id: &SectionId) -> Option<Arc<Section>> {
        self.inner.get_section(id)
    }

    fn get_obligation(&self, id: &ObligationId) -> Option<Arc<Obligation>> {
        self.inner.get_obligation(id)
    }

    fn transport_config(&self, period: &PeriodId) -> Option<Arc<TransportConfig>> {
        self.inner.transport_config(period)
    }

    fn stops_on_route(&self, route: &RouteId) -> Vec<Arc<Stop>> {
        self.inner.stops_on_route(route)
    }

    fn all_routes(&self) -> Vec<Arc<Route>> {
        self.inner.all_routes()
    }

    fn all_obligations(&self, period: &PeriodId) -> Vec<Arc<Obligation>> {
        self.inner.all_obligations(period)
    }

    fn sections(&self, period: &PeriodId) -> Vec<Arc<Section>> {
        self.inner.sections(period)
    }

    fn obligations_for(
        &self,
        period: &PeriodId,
        phase: Phase,
        route: &RouteId,
        date: NaiveDate,
    ) -> Vec<Arc<Obligation>> {
        let snapshot = self.inner.obligations_for(period, phase, route, date);
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }
        snapshot
    }

    fn passengers_to_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>> {
        self.inner.passengers_to_origin(route, section)
    }

    fn passengers_from_origin(&self, route: &RouteId, section: &SectionId) -> Vec<Arc<Passenger>> {
        self.inner.passengers_from_origin(route, section)
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
}

pub fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

pub fn section_a() -> Section {
    // Dropoffs on the 3rd, pickups on the 5th, returns on the 6th.
    Section::new("A", "2025", "Section A", date(1))
}

pub fn key(route: &str, day: u32) -> ItineraryKey {
    ItineraryKey::new("2025", route, date(day))
}

pub struct Fixture {
    pub source: Arc<StaticScheduleProvider>,
    pub provider: Arc<FakeProvider>,
    pub scheduler: Scheduler,
}

impl Fixture {
    /// Two internal routes out of Hanover with the lodge as secondary anchor.
    pub fn new() -> Self {
        let source = Arc::new(StaticScheduleProvider::new());
        source.insert_vehicle(Vehicle::new("bus", "Bus", 20));
        source.insert_vehicle(Vehicle::new("van", "Van", 2));
        source.insert_route(Route::new("north", "North", RouteCategory::Internal, "bus"));
        source.insert_route(Route::new("south", "South", RouteCategory::Internal, "bus"));
        source.insert_route(Route::new("shuttle", "Shuttle", RouteCategory::Internal, "van"));

        let stops = [
            ("hanover", 0, None),
            ("lodge", 60, None),
            ("lyme", 10, Some("north")),
            ("orford", 20, Some("north")),
            ("piermont", 30, Some("north")),
            ("canaan", 15, Some("south")),
            ("enfield", 25, Some("south")),
            ("etna", 5, Some("shuttle")),
        ];
        for (id, distance, route) in stops {
            let mut stop = Stop::new(id, id, distance).with_address(format!("{id}, NH"));
            stop.route_id = route.map(RouteId::new);
            source.insert_stop(stop).unwrap();
        }
        source
            .set_transport_config(TransportConfig::new("2025", "hanover", "lodge"))
            .unwrap();
        source.insert_section(section_a());

        let provider = Arc::new(FakeProvider::default());
        let client = DirectionsClient::new(provider.clone(), 8, Duration::from_secs(10));
        let scheduler = Scheduler::new(source.clone(), client, TransportSettings::default());

        Self {
            source,
            provider,
            scheduler,
        }
    }

    pub fn add_trip(&self, id: &str, headcount: u32, dropoff: &str, pickup: &str) -> Obligation {
        let trip = Obligation::new(id, &section_a(), headcount, dropoff)
            .with_pickup_stop(pickup)
            .with_return_route("north");
        self.source.insert_obligation(trip.clone());
        trip
    }
}
