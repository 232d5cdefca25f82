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

use std::future::Future;

use log::{debug, info, warn};
use tokio::sync::watch;

use super::{FetchConfig, FetchError, HttpFetcher};
use crate::model::{AircraftState, BoundingBox, FeedResponse};

/// Static snapshot served when the live feed cannot be reached.
pub const FALLBACK_SNAPSHOT: &str = include_str!("../../assets/fallback_flights.json");

/// Source of raw aircraft batches for the poll scheduler.
///
/// Implementations never fail: a source that cannot reach its upstream is
/// expected to substitute fallback data itself.
pub trait FlightSource: Send + Sync + 'static {
    fn fetch_flights(&self) -> impl Future<Output = Vec<AircraftState>> + Send;
}

/// Aircraft feed client with transparent fallback to a bundled snapshot.
#[derive(Debug)]
pub struct FlightFeed {
    http: HttpFetcher,
    flights_url: String,
    bbox: Option<BoundingBox>,
    fallback: Vec<AircraftState>,
    demo_mode: watch::Sender<bool>,
}

impl FlightFeed {
    /// Create a feed client using the bundled fallback snapshot.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let http = HttpFetcher::new(config.timeout)?;
        Self::with_fetcher(http, config, FALLBACK_SNAPSHOT)
    }

    /// Create a feed client with an explicit fetcher and snapshot document.
    ///
    /// The snapshot must have the same shape as a live feed response.
    pub fn with_fetcher(
        http: HttpFetcher,
        config: &FetchConfig,
        snapshot: &str,
    ) -> Result<Self, FetchError> {
        let fallback: FeedResponse = serde_json::from_str(snapshot).map_err(FetchError::Snapshot)?;
        let (demo_mode, _) = watch::channel(false);

        Ok(Self {
            http,
            flights_url: format!("{}/api/flights/", config.base_url.trim_end_matches('/')),
            bbox: config.bbox,
            fallback: fallback.flights,
            demo_mode,
        })
    }

    /// Fetch from the live feed only, reporting any failure.
    pub async fn fetch_live(&self) -> Result<Vec<AircraftState>, FetchError> {
        let query: Vec<(&str, String)> = self
            .bbox
            .iter()
            .map(|bbox| ("bbox", bbox.to_string()))
            .collect();

        let response: FeedResponse = self.http.get_json(&self.flights_url, &query).await?;
        Ok(response.flights)
    }

    /// Fetch the current batch, falling back to the snapshot on any failure.
    pub async fn fetch(&self) -> Vec<AircraftState> {
        match self.fetch_live().await {
            Ok(flights) => {
                self.leave_demo_mode(flights.len());
                flights
            }
            Err(e) => {
                self.enter_demo_mode(&e);
                self.fallback.clone()
            }
        }
    }

    fn enter_demo_mode(&self, err: &FetchError) {
        let first = self.demo_mode.send_if_modified(|active| {
            if *active {
                false
            } else {
                *active = true;
                true
            }
        });

        if first {
            warn!(
                "Live feed unavailable ({}), switching to demo mode with {} bundled aircraft",
                err,
                self.fallback.len()
            );
        } else {
            debug!("Live feed still unavailable: {}", err);
        }
    }

    fn leave_demo_mode(&self, live: usize) {
        let recovered = self
            .demo_mode
            .send_if_modified(|active| std::mem::replace(active, false));
        if recovered {
            info!("Live feed recovered with {} aircraft, leaving demo mode", live);
        }
    }

    /// Watch the demo-mode indicator. It is `true` while the snapshot is
    /// being served and returns to `false` once a live fetch succeeds.
    #[must_use]
    pub fn demo_mode(&self) -> watch::Receiver<bool> {
        self.demo_mode.subscribe()
    }

    #[must_use]
    pub fn is_demo_mode(&self) -> bool {
        *self.demo_mode.borrow()
    }

    #[cfg(test)]
    pub(crate) fn fallback_records(&self) -> &[AircraftState] {
        &self.fallback
    }
}

impl FlightSource for FlightFeed {
    async fn fetch_flights(&self) -> Vec<AircraftState> {
        self.fetch().await
    }
}
