//! Directions client: splits a stop sequence into provider-sized requests and
//! splices the answers back into one leg per consecutive pair.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::debug;

use crate::models::stop::Location;
use crate::models::types::*;
use crate::network::traits::{DirectionsProvider, ProviderRoute};
use crate::settings::TransportSettings;

/// Travel between two consecutive locations.
#[derive(Clone, Debug, PartialEq)]
pub struct Leg {
    pub start: Location,
    pub end: Location,
    pub duration: TimeDelta,
}

/// Inclusive `(start, end)` index ranges covering `count` locations, each
/// with at most `max_waypoints` locations between its endpoints. Each chunk
/// starts where the previous one ended.
pub fn chunk_bounds(count: usize, max_waypoints: usize) -> Vec<(usize, usize)> {
    let span = max_waypoints + 1;
    let mut bounds = Vec::new();
    let mut start = 0;
    while start + 1 < count {
        let end = (start + span).min(count - 1);
        bounds.push((start, end));
        start = end;
    }
    bounds
}

#[derive(Clone)]
pub struct DirectionsClient {
    provider: Arc<dyn DirectionsProvider>,
    max_waypoints: usize,
    timeout: Duration,
}

impl DirectionsClient {
    pub fn new(provider: Arc<dyn DirectionsProvider>, max_waypoints: usize, timeout: Duration) -> Self {
        Self {
            provider,
            max_waypoints: max_waypoints.max(1),
            timeout,
        }
    }

    pub fn from_settings(provider: Arc<dyn DirectionsProvider>, settings: &TransportSettings) -> Self {
        Self::new(provider, settings.max_waypoints, settings.request_timeout())
    }

    /// Legs for visiting `locations` in order. Stateless; every call hits the
    /// provider. The timeout bounds the whole request, however many chunks
    /// it takes.
    pub async fn get_directions(&self, locations: &[Location]) -> Result<Vec<Leg>> {
        if locations.len() < 2 {
            return Err(TransportError::InsufficientStops(locations.len()));
        }

        tokio::time::timeout(self.timeout, self.fetch_legs(locations))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
    }

    async fn fetch_legs(&self, locations: &[Location]) -> Result<Vec<Leg>> {
        let mut legs = Vec::with_capacity(locations.len() - 1);
        for (start, end) in chunk_bounds(locations.len(), self.max_waypoints) {
            let chunk = &locations[start..=end];
            debug!(start, end, "requesting directions for {} locations", chunk.len());

            let route = self.provider.route(chunk).await?;
            check_route(&route, chunk.len())?;

            for (pair, leg) in chunk.windows(2).zip(&route.legs) {
                let duration = TimeDelta::from_std(leg.duration)
                    .map_err(|e| ProviderError::Malformed(e.to_string()))?;
                legs.push(Leg {
                    start: pair[0].clone(),
                    end: pair[1].clone(),
                    duration,
                });
            }
        }

        Ok(legs)
    }
}

// The provider must answer with one leg per pair and must not have optimized
// the waypoint order.
fn check_route(route: &ProviderRoute, locations: usize) -> std::result::Result<(), ProviderError> {
    let expected = locations - 1;
    if route.legs.len() != expected {
        return Err(ProviderError::LegCountMismatch {
            expected,
            actual: route.legs.len(),
        });
    }
    if route.waypoint_order.iter().enumerate().any(|(i, &w)| i != w) {
        return Err(ProviderError::WaypointsReordered(route.waypoint_order.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::network::traits::ProviderLeg;

    /// Every leg takes one minute per character of its destination.
    #[derive(Default)]
    struct ScriptedProvider {
        requests: Mutex<Vec<Vec<String>>>,
        reorder: bool,
        drop_leg: bool,
        delay: Option<Duration>,
    }

    impl DirectionsProvider for ScriptedProvider {
        fn route<'a>(
            &'a self,
            locations: &'a [Location],
        ) -> Pin<Box<dyn Future<Output = std::result::Result<ProviderRoute, ProviderError>> + Send + 'a>>
        {
            Box::pin(async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                self.requests
                    .lock()
                    .unwrap()
                    .push(locations.iter().map(Location::as_query).collect());

                let mut legs: Vec<_> = locations[1..]
                    .iter()
                    .map(|l| ProviderLeg {
                        duration: Duration::from_secs(60 * l.as_query().len() as u64),
                    })
                    .collect();
                if self.drop_leg {
                    legs.pop();
                }

                let mut waypoint_order: Vec<_> = (0..locations.len() - 2).collect();
                if self.reorder {
                    waypoint_order.reverse();
                }
                Ok(ProviderRoute { legs, waypoint_order })
            })
        }
    }

    fn locations(count: usize) -> Vec<Location> {
        (0..count)
            .map(|i| Location::Address(format!("stop {}", "x".repeat(i)).into()))
            .collect()
    }

    fn client(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, DirectionsClient) {
        let provider = Arc::new(provider);
        let client = DirectionsClient::new(provider.clone(), 8, Duration::from_secs(10));
        (provider, client)
    }

    #[test]
    fn test_chunk_bounds() {
        assert_eq!(chunk_bounds(2, 8), vec![(0, 1)]);
        assert_eq!(chunk_bounds(10, 8), vec![(0, 9)]);
        assert_eq!(chunk_bounds(11, 8), vec![(0, 9), (9, 10)]);
        assert_eq!(chunk_bounds(26, 8), vec![(0, 9), (9, 18), (18, 25)]);
        assert!(chunk_bounds(1, 8).is_empty());
    }

    #[tokio::test]
    async fn test_requires_two_locations() {
        let (_, client) = client(ScriptedProvider::default());
        let result = client.get_directions(&locations(1)).await;
        assert!(matches!(result, Err(TransportError::InsufficientStops(1))));
    }

    #[tokio::test]
    async fn test_splices_chunks() {
        let (provider, client) = client(ScriptedProvider::default());
        let locations = locations(26);

        let legs = client.get_directions(&locations).await.unwrap();

        assert_eq!(legs.len(), 25);
        assert_eq!(provider.requests.lock().unwrap().len(), 3);
        for (i, leg) in legs.iter().enumerate() {
            assert_eq!(leg.start, locations[i]);
            assert_eq!(leg.end, locations[i + 1]);
            assert_eq!(leg.duration, TimeDelta::minutes(5 + i as i64 + 1));
        }
        for pair in legs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[tokio::test]
    async fn test_rejects_reordered_waypoints() {
        let (_, client) = client(ScriptedProvider {
            reorder: true,
            ..Default::default()
        });
        let result = client.get_directions(&locations(5)).await;
        assert!(matches!(
            result,
            Err(TransportError::Provider(ProviderError::WaypointsReordered(_)))
        ));
    }

    #[tokio::test]
    async fn test_rejects_missing_legs() {
        let (_, client) = client(ScriptedProvider {
            drop_leg: true,
            ..Default::default()
        });
        let result = client.get_directions(&locations(4)).await;
        assert!(matches!(
            result,
            Err(TransportError::Provider(ProviderError::LegCountMismatch { expected: 3, actual: 2 }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retryable() {
        let (_, client) = client(ScriptedProvider {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let err = client.get_directions(&locations(3)).await.unwrap_err();
        assert!(matches!(err, TransportError::Provider(ProviderError::Timeout(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_covers_all_chunks() {
        // Each chunk alone fits in the timeout; three of them do not.
        let (provider, client) = client(ScriptedProvider {
            delay: Some(Duration::from_secs(4)),
            ..Default::default()
        });
        let err = client.get_directions(&locations(26)).await.unwrap_err();
        assert!(matches!(err, TransportError::Provider(ProviderError::Timeout(_))));
        assert_eq!(provider.requests.lock().unwrap().len(), 2);
    }
}
