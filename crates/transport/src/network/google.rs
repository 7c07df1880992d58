//! Google Directions JSON API provider.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::models::stop::Location;
use crate::models::types::*;
use crate::network::traits::{DirectionsProvider, ProviderLeg, ProviderRoute};
use crate::settings::TransportSettings;

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteJson>,
}

#[derive(Debug, Deserialize)]
struct RouteJson {
    legs: Vec<LegJson>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct LegJson {
    duration: ValueJson,
}

#[derive(Debug, Deserialize)]
struct ValueJson {
    /// Seconds.
    value: u64,
}

pub struct GoogleDirectionsProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleDirectionsProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Settings(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &TransportSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| TransportError::Settings("no directions API key configured".into()))?;
        Self::new(&settings.provider_url, api_key, settings.request_timeout())
    }

    /// Request URL for routing through `locations` in order.
    pub fn request_url(&self, locations: &[Location]) -> std::result::Result<reqwest::Url, ProviderError> {
        let (first, rest) = locations
            .split_first()
            .ok_or_else(|| ProviderError::Malformed("no locations".into()))?;
        let (last, waypoints) = rest
            .split_last()
            .ok_or_else(|| ProviderError::Malformed("no destination".into()))?;

        let mut params = vec![
            ("origin", first.as_query()),
            ("destination", last.as_query()),
        ];
        if !waypoints.is_empty() {
            let joined = waypoints
                .iter()
                .map(Location::as_query)
                .collect::<Vec<_>>()
                .join("|");
            params.push(("waypoints", joined));
        }
        params.push(("key", self.api_key.clone()));

        reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn fetch(&self, locations: &[Location]) -> std::result::Result<ProviderRoute, ProviderError> {
        let url = self.request_url(locations)?;
        debug!(locations = locations.len(), "querying directions");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.to_string(),
                message: body,
            });
        }

        parse_response(&body)
    }
}

fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Transport(format!("timed out: {error}"))
    } else {
        ProviderError::Transport(error.to_string())
    }
}

/// Parse a Directions API body into legs and waypoint order.
pub fn parse_response(body: &str) -> std::result::Result<ProviderRoute, ProviderError> {
    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if response.status != "OK" {
        return Err(ProviderError::Api {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    let mut routes = response.routes;
    if routes.len() != 1 {
        return Err(ProviderError::Malformed(format!(
            "expected exactly one route, got {}",
            routes.len()
        )));
    }
    let route = routes.remove(0);

    Ok(ProviderRoute {
        legs: route
            .legs
            .iter()
            .map(|leg| ProviderLeg {
                duration: Duration::from_secs(leg.duration.value),
            })
            .collect(),
        waypoint_order: route.waypoint_order,
    })
}

impl DirectionsProvider for GoogleDirectionsProvider {
    fn route<'a>(
        &'a self,
        locations: &'a [Location],
    ) -> Pin<Box<dyn Future<Output = std::result::Result<ProviderRoute, ProviderError>> + Send + 'a>> {
        Box::pin(self.fetch(locations))
    }
}
