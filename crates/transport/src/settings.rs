//! Engine settings loaded from TOML.
//!
//! ```toml
//! default_departure = "07:30"
//! secondary_floor = "11:00"
//! loading_minutes = 15
//! max_waypoints = 8
//! request_timeout_secs = 10
//! provider_url = "https://maps.googleapis.com/maps/api/directions/json"
//! ```
//!
//! Every field is optional. The directions API key is usually left out of the
//! file and supplied through `TRANSPORT_DIRECTIONS_KEY`.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Deserializer};

use crate::models::types::*;

pub const API_KEY_ENV: &str = "TRANSPORT_DIRECTIONS_KEY";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Departure from the origin when nothing forces it later.
    #[serde(deserialize_with = "deserialize_time")]
    pub default_departure: NaiveTime,

    /// Earliest arrival at the secondary anchor.
    #[serde(deserialize_with = "deserialize_time")]
    pub secondary_floor: NaiveTime,

    /// Time spent loading at each intermediate pickup stop.
    pub loading_minutes: u32,

    /// Waypoints the provider accepts per request, not counting endpoints.
    pub max_waypoints: usize,

    /// Bound on one directions request, across all of its chunks.
    pub request_timeout_secs: u64,

    pub provider_url: String,

    pub api_key: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            default_departure: NaiveTime::from_hms_opt(7, 30, 0).unwrap_or(NaiveTime::MIN),
            secondary_floor: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or(NaiveTime::MIN),
            loading_minutes: 15,
            max_waypoints: 8,
            request_timeout_secs: 10,
            provider_url: "https://maps.googleapis.com/maps/api/directions/json".to_string(),
            api_key: None,
        }
    }
}

fn deserialize_time<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<NaiveTime, D::Error> {
    let value = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
        .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", value, e)))
}

impl TransportSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).map_err(|e| TransportError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a file and apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TransportError::Settings(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_toml_str(&contents)?.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_waypoints == 0 {
            return Err(TransportError::Settings("max_waypoints must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(TransportError::Settings("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn loading_time(&self) -> TimeDelta {
        TimeDelta::minutes(self.loading_minutes.into())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
