// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-aircraft detail enrichment.
//!
//! Selecting an aircraft fetches its extended record and, when the schedule
//! carries airport coordinates, the current weather at origin and
//! destination. Forecast failures only drop that one field; a failed detail
//! fetch is reported to the caller since there is no fallback for it.

mod forecast;
mod selection;

pub use forecast::{
    describe_weather_code, CityForecast, CurrentWeather, ForecastResponse, DEFAULT_FORECAST_URL,
};
pub use selection::{DetailState, SelectionTracker};

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::fetch::{FetchError, HttpFetcher, DEFAULT_FEED_URL, DEFAULT_TIMEOUT};
use crate::model::{AircraftDetail, AircraftState, Airport};

/// Errors from a detail lookup.
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("aircraft identity is empty")]
    EmptyIdentity,

    #[error("detail fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Configuration for detail and forecast lookups.
#[derive(Debug, Clone)]
pub struct DetailConfig {
    /// Feed server base URL; details live under `/api/flights/{icao24}`.
    pub base_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Identity of the aircraft to enrich.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailRequest {
    pub icao24: String,
    pub callsign: Option<String>,
    /// Upstream flight id, forwarded when the feed supplied one.
    pub id: Option<String>,
}

impl DetailRequest {
    #[must_use]
    pub fn new(icao24: impl Into<String>) -> Self {
        Self {
            icao24: icao24.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = Some(callsign.into());
        self
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![(
            "callsign",
            self.callsign
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_owned(),
        )];
        if let Some(id) = &self.id {
            query.push(("id", id.clone()));
        }
        query
    }
}

impl From<&AircraftState> for DetailRequest {
    fn from(state: &AircraftState) -> Self {
        Self {
            icao24: state.icao24.clone(),
            callsign: state.trimmed_callsign().map(str::to_owned),
            id: state.id.clone(),
        }
    }
}

/// Composed view model for the detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub detail: AircraftDetail,
    pub origin_weather: Option<CityForecast>,
    pub destination_weather: Option<CityForecast>,
}

/// Backend for detail and forecast lookups.
pub trait DetailSource: Send + Sync + 'static {
    fn fetch_detail(
        &self,
        request: &DetailRequest,
    ) -> impl Future<Output = Result<AircraftDetail, FetchError>> + Send;

    fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<CurrentWeather, FetchError>> + Send;
}

/// HTTP client for the detail endpoint and Open-Meteo.
#[derive(Debug, Clone)]
pub struct DetailClient {
    http: HttpFetcher,
    flights_url: String,
    forecast_url: String,
}

impl DetailClient {
    pub fn new(config: &DetailConfig) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(HttpFetcher::new(config.timeout)?, config))
    }

    #[must_use]
    pub fn with_fetcher(http: HttpFetcher, config: &DetailConfig) -> Self {
        Self {
            http,
            flights_url: format!("{}/api/flights", config.base_url.trim_end_matches('/')),
            forecast_url: config.forecast_url.clone(),
        }
    }
}

impl DetailSource for DetailClient {
    async fn fetch_detail(&self, request: &DetailRequest) -> Result<AircraftDetail, FetchError> {
        let url = format!("{}/{}", self.flights_url, request.icao24.trim());
        self.http.get_json(&url, &request.query()).await
    }

    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeather, FetchError> {
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current_weather", "true".to_string()),
        ];
        let response: ForecastResponse = self.http.get_json(&self.forecast_url, &query).await?;
        Ok(response.current_weather)
    }
}

/// Fetch the detail record for `request` and attach airport forecasts.
pub async fn enrich<S: DetailSource>(
    source: &S,
    request: &DetailRequest,
) -> Result<DetailView, DetailError> {
    if request.icao24.trim().is_empty() {
        return Err(DetailError::EmptyIdentity);
    }

    let detail = source.fetch_detail(request).await?;
    debug!("Fetched detail for {}", request.icao24);

    let (origin_weather, destination_weather) = match &detail.schedule {
        Some(schedule) => {
            tokio::join!(
                airport_forecast(source, &schedule.origin),
                airport_forecast(source, &schedule.destination)
            )
        }
        None => (None, None),
    };

    Ok(DetailView {
        detail,
        origin_weather,
        destination_weather,
    })
}

async fn airport_forecast<S: DetailSource>(source: &S, airport: &Airport) -> Option<CityForecast> {
    let [lat, lon] = airport.coords?;
    match source.fetch_forecast(lat, lon).await {
        Ok(current) => Some(CityForecast::new(airport.city.clone(), current)),
        Err(e) => {
            warn!("Forecast for {} ({}) unavailable: {}", airport.code, airport.city, e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fetch::test_server::{self, Reply};

    pub(crate) const DETAIL_JSON: &str = r#"{
        "icao24": "abc123",
        "callsign": "RYR123",
        "latitude": 45.0,
        "longitude": 9.0,
        "schedule": {
            "origin": {"code": "FCO", "city": "Rome", "coords": [41.8, 12.25]},
            "destination": {"code": "LHR", "city": "London", "coords": [51.47, -0.45]},
            "status": "On Time",
            "progress_percent": 40
        }
    }"#;

    /// In-memory source with per-aircraft delays and failing forecast points.
    #[derive(Default)]
    pub(crate) struct StubSource {
        pub(crate) delays: HashMap<String, Duration>,
        pub(crate) missing: Vec<String>,
        pub(crate) failing_latitudes: Vec<f64>,
    }

    impl DetailSource for StubSource {
        async fn fetch_detail(
            &self,
            request: &DetailRequest,
        ) -> Result<AircraftDetail, FetchError> {
            if let Some(delay) = self.delays.get(&request.icao24) {
                tokio::time::sleep(*delay).await;
            }
            if self.missing.contains(&request.icao24) {
                return Err(FetchError::Status(reqwest::StatusCode::NOT_FOUND));
            }
            let mut detail: AircraftDetail = serde_json::from_str(DETAIL_JSON).unwrap();
            detail.state.icao24.clone_from(&request.icao24);
            Ok(detail)
        }

        async fn fetch_forecast(
            &self,
            latitude: f64,
            _longitude: f64,
        ) -> Result<CurrentWeather, FetchError> {
            if self.failing_latitudes.iter().any(|l| (l - latitude).abs() < 1e-6) {
                return Err(FetchError::Timeout(DEFAULT_TIMEOUT));
            }
            Ok(CurrentWeather {
                temperature: latitude / 2.0,
                weathercode: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_enrich_attaches_both_forecasts() {
        let view = enrich(&StubSource::default(), &DetailRequest::new("abc123"))
            .await
            .unwrap();
        assert_eq!(view.origin_weather.as_ref().unwrap().city, "Rome");
        assert_eq!(view.destination_weather.as_ref().unwrap().city, "London");
        assert_eq!(view.origin_weather.unwrap().temperature_c, 20.9);
    }

    #[tokio::test]
    async fn test_forecast_failure_degrades() {
        let source = StubSource {
            failing_latitudes: vec![51.47],
            ..Default::default()
        };
        let view = enrich(&source, &DetailRequest::new("abc123")).await.unwrap();
        assert!(view.origin_weather.is_some());
        assert!(view.destination_weather.is_none());
        assert_eq!(view.detail.state.icao24, "abc123");
    }

    #[tokio::test]
    async fn test_primary_failure_surfaces() {
        let source = StubSource {
            missing: vec!["abc123".to_string()],
            ..Default::default()
        };
        let err = enrich(&source, &DetailRequest::new("abc123")).await.unwrap_err();
        assert!(matches!(err, DetailError::Fetch(FetchError::Status(_))));
    }

    #[tokio::test]
    async fn test_empty_identity_rejected() {
        let err = enrich(&StubSource::default(), &DetailRequest::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DetailError::EmptyIdentity));
    }

    #[test]
    fn test_request_from_state() {
        let state = AircraftState {
            icao24: "abc123".to_string(),
            callsign: Some(" RYR123 ".to_string()),
            id: Some("3a9f".to_string()),
            ..Default::default()
        };
        let request = DetailRequest::from(&state);
        assert_eq!(request.callsign.as_deref(), Some("RYR123"));
        assert_eq!(
            request.query(),
            vec![("callsign", "RYR123".to_string()), ("id", "3a9f".to_string())]
        );
    }

    #[tokio::test]
    async fn test_client_requests() {
        let detail_server = test_server::start(Reply::json(DETAIL_JSON)).await;
        let forecast_server = test_server::start(Reply::json(
            r#"{"current_weather":{"temperature":12.5,"weathercode":61}}"#,
        ))
        .await;

        let config = DetailConfig {
            base_url: detail_server.base_url.clone(),
            forecast_url: format!("{}/v1/forecast", forecast_server.base_url),
            timeout: Duration::from_secs(2),
        };
        let client = DetailClient::with_fetcher(test_server::fetcher(config.timeout), &config);

        let view = enrich(&client, &DetailRequest::new("abc123").with_callsign("RYR123"))
            .await
            .unwrap();

        assert_eq!(
            detail_server.last_request(),
            "GET /api/flights/abc123?callsign=RYR123 HTTP/1.1"
        );
        assert_eq!(forecast_server.hits(), 2);
        assert!(forecast_server
            .last_request()
            .contains("current_weather=true"));
        assert_eq!(view.origin_weather.unwrap().description(), "Rain");
    }
}
