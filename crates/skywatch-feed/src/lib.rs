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

//! Live aircraft feed pipeline.
//!
//! This library polls an aircraft feed, deduplicates and filters the result,
//! animates a weather overlay and enriches a selected aircraft with schedule
//! and airport weather. It is organised in layers that can be used on their
//! own or wired together through [`Client`]:
//!
//! - **Fetch layer**: bounded-time HTTP with fallback to a bundled snapshot
//! - **Ingest / filter**: unique-by-identity fleets and the visible subset
//! - **Poller**: fixed-cadence refresh owned by a cancellable handle
//! - **Weather**: one-shot manifest load and frame animation
//! - **Detail**: selection tracking with stale-result discard
//!
//! # Quick Start
//!
//! ```no_run
//! use skywatch_feed::{Client, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::spawn(ClientConfig::default()).expect("client");
//!
//!     loop {
//!         let view = client.map_view();
//!         println!("{}", view.stats);
//!         for marker in client.markers() {
//!             println!("{} at {:.3},{:.3}", marker.icao24, marker.latitude, marker.longitude);
//!         }
//!         tokio::time::sleep(Duration::from_secs(10)).await;
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ```
//! use skywatch_feed::filter::{apply_filter, FilterCriteria};
//! use skywatch_feed::ingest::{Fleet, IngestPolicy};
//! use skywatch_feed::model::AircraftState;
//!
//! let batch = vec![AircraftState {
//!     icao24: "abc123".to_string(),
//!     callsign: Some("RYR123 ".to_string()),
//!     latitude: Some(45.0),
//!     longitude: Some(9.0),
//!     geo_altitude: Some(3500.0),
//!     ..Default::default()
//! }];
//!
//! let fleet = Fleet::ingest(batch, IngestPolicy::default());
//! let visible = apply_filter(fleet.as_slice(), &FilterCriteria::new(0.0, "ryr"));
//! assert_eq!(visible.len(), 1);
//! ```

pub mod detail;
pub mod fetch;
pub mod filter;
pub mod ingest;
pub mod model;
pub mod poller;
pub mod presentation;
pub mod settings;
pub mod units;
pub mod weather;

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

pub use detail::{DetailClient, DetailConfig, DetailError, DetailRequest, DetailState, DetailView};
pub use fetch::{FetchConfig, FetchError, FlightFeed, HttpFetcher};
pub use filter::{FilterCriteria, FilterEngine};
pub use ingest::{Fleet, IngestPolicy};
pub use model::{AircraftDetail, AircraftState, BoundingBox};
pub use poller::{FleetSnapshot, PollConfig, PollHandle, PollScheduler};
pub use presentation::{AirportMarker, FlightStats, Marker, Telemetry};
pub use settings::{DisplaySettings, MapStyle};
pub use units::UnitSystem;
pub use weather::{RainViewer, WeatherConfig, WeatherHandle, WeatherLayer, WeatherView};

use detail::SelectionTracker;

/// Configuration for the full-stack client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub fetch: FetchConfig,
    pub poll: PollConfig,
    pub weather: WeatherConfig,
    pub detail: DetailConfig,
    /// Settings in effect at startup.
    pub settings: DisplaySettings,
}

/// Filtered aircraft set ready for the rendering surface.
#[derive(Debug, Clone, Default)]
pub struct MapView {
    /// Poll cycle the view was derived from.
    pub generation: u64,
    pub visible: Arc<Vec<AircraftState>>,
    pub stats: FlightStats,
}

/// Full-stack client that wires all layers together.
///
/// Dropping the client cancels every background task it started.
pub struct Client {
    feed: Arc<FlightFeed>,
    settings_tx: watch::Sender<DisplaySettings>,
    layer_tx: watch::Sender<WeatherLayer>,
    poll: PollHandle,
    weather: WeatherHandle,
    selection: SelectionTracker<DetailClient>,
    map_rx: watch::Receiver<MapView>,
    bbox: Option<BoundingBox>,
    view_guard: DropGuard,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("poll", &self.poll)
            .field("weather", &self.weather)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Spawn a new client. Must be called from within a Tokio runtime.
    ///
    /// This starts background tasks for polling, weather animation and view
    /// derivation.
    pub fn spawn(config: ClientConfig) -> Result<Self, FetchError> {
        let client = HttpFetcher::build_client(config.fetch.timeout)?;
        Self::spawn_with_client(config, &client)
    }

    /// Spawn a client sharing an existing HTTP connection pool.
    pub fn spawn_with_client(
        config: ClientConfig,
        client: &reqwest::Client,
    ) -> Result<Self, FetchError> {
        let feed = Arc::new(FlightFeed::with_fetcher(
            HttpFetcher::with_client(client.clone(), config.fetch.timeout),
            &config.fetch,
            fetch::FALLBACK_SNAPSHOT,
        )?);
        let manifest = Arc::new(RainViewer::new(
            HttpFetcher::with_client(client.clone(), config.weather.timeout),
            config.weather.manifest_url.clone(),
        ));
        let details = Arc::new(DetailClient::with_fetcher(
            HttpFetcher::with_client(client.clone(), config.detail.timeout),
            &config.detail,
        ));

        let (settings_tx, settings_rx) = watch::channel(config.settings.clone());
        let (layer_tx, layer_rx) = watch::channel(config.settings.weather_layer);

        let poll = PollScheduler::start(Arc::clone(&feed), config.poll);
        let weather = weather::WeatherAnimator::start(manifest, &config.weather, layer_rx);
        let selection = SelectionTracker::new(details);

        let (map_tx, map_rx) = watch::channel(MapView::default());
        let view_cancel = CancellationToken::new();
        let task_cancel = view_cancel.clone();
        let fleet_rx = poll.subscribe();
        tokio::spawn(async move {
            view_loop(fleet_rx, settings_rx, map_tx, task_cancel).await;
        });

        info!(
            "Client started (feed {}, poll every {:?})",
            config.fetch.base_url, config.poll.interval
        );

        Ok(Self {
            feed,
            settings_tx,
            layer_tx,
            poll,
            weather,
            selection,
            map_rx,
            bbox: config.fetch.bbox,
            view_guard: view_cancel.drop_guard(),
        })
    }

    /// Current display settings.
    #[must_use]
    pub fn settings(&self) -> DisplaySettings {
        self.settings_tx.borrow().clone()
    }

    /// Replace the display settings as a whole.
    pub fn set_settings(&self, settings: DisplaySettings) {
        let layer = settings.weather_layer;
        self.settings_tx.send_if_modified(|current| {
            if *current == settings {
                return false;
            }
            *current = settings;
            true
        });
        self.layer_tx.send_if_modified(|current| {
            let changed = *current != layer;
            *current = layer;
            changed
        });
    }

    /// Derive new settings from the current ones.
    pub fn update_settings(&self, update: impl FnOnce(DisplaySettings) -> DisplaySettings) {
        self.set_settings(update(self.settings()));
    }

    /// Latest filtered view.
    #[must_use]
    pub fn map_view(&self) -> MapView {
        self.map_rx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_map(&self) -> watch::Receiver<MapView> {
        self.map_rx.clone()
    }

    /// Latest unfiltered aircraft set.
    #[must_use]
    pub fn fleet(&self) -> FleetSnapshot {
        self.poll.latest()
    }

    #[must_use]
    pub fn weather(&self) -> WeatherView {
        self.weather.current()
    }

    #[must_use]
    pub fn subscribe_weather(&self) -> watch::Receiver<WeatherView> {
        self.weather.subscribe()
    }

    #[must_use]
    pub fn detail(&self) -> DetailState {
        self.selection.state()
    }

    #[must_use]
    pub fn subscribe_detail(&self) -> watch::Receiver<DetailState> {
        self.selection.subscribe()
    }

    /// Whether the feed is currently serving the bundled snapshot.
    #[must_use]
    pub fn is_demo_mode(&self) -> bool {
        self.feed.is_demo_mode()
    }

    #[must_use]
    pub fn demo_mode(&self) -> watch::Receiver<bool> {
        self.feed.demo_mode()
    }

    /// Select an aircraft by identity and start enriching it.
    ///
    /// The callsign and flight id are taken from the latest poll when the
    /// aircraft is known. Returns the selection token.
    pub fn select(&self, icao24: &str) -> u64 {
        let icao24 = icao24.trim();
        let request = self
            .poll
            .latest()
            .fleet
            .get(icao24)
            .map_or_else(|| DetailRequest::new(icao24), DetailRequest::from);
        debug!("Selecting {}", request.icao24);
        self.selection.select(request)
    }

    pub fn clear_selection(&self) {
        self.selection.clear();
    }

    /// Markers for the current view, with the selection highlighted.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        let selected = self.selection.selected();
        presentation::markers(&self.map_view().visible, selected.as_deref())
    }

    /// Airport markers inside the feed area, with the selected flight's
    /// origin and destination flagged once its detail has loaded.
    #[must_use]
    pub fn airport_markers(&self) -> Vec<AirportMarker> {
        let detail = self.selection.state();
        let schedule = match &detail {
            DetailState::Ready(view) => view.detail.schedule.as_ref(),
            _ => None,
        };
        presentation::airport_markers(self.bbox.as_ref(), schedule)
    }

    /// Formatted telemetry for an aircraft in the latest poll.
    #[must_use]
    pub fn telemetry(&self, icao24: &str) -> Option<Telemetry> {
        let units = self.settings_tx.borrow().units;
        self.poll
            .latest()
            .fleet
            .get(icao24)
            .map(|a| Telemetry::new(a, units))
    }

    /// Stop all background tasks and wait for the timers to be released.
    pub async fn shutdown(self) {
        let Self {
            poll,
            weather,
            selection,
            view_guard,
            ..
        } = self;

        drop(view_guard);
        drop(selection);
        poll.stop().await;
        weather.stop().await;
        info!("Client shut down");
    }
}

async fn view_loop(
    mut fleet_rx: watch::Receiver<FleetSnapshot>,
    mut settings_rx: watch::Receiver<DisplaySettings>,
    map_tx: watch::Sender<MapView>,
    cancel_token: CancellationToken,
) {
    let mut engine = FilterEngine::new();

    loop {
        let snapshot = fleet_rx.borrow_and_update().clone();
        let filters = settings_rx.borrow_and_update().filters.clone();

        let (visible, recomputed) =
            engine.update(snapshot.generation, snapshot.fleet.as_slice(), &filters);
        if recomputed {
            let stats = FlightStats {
                visible: visible.iter().filter(|a| a.has_position()).count(),
                total: snapshot.fleet.len(),
            };
            debug!("View for generation {}: {}", snapshot.generation, stats);
            map_tx.send_replace(MapView {
                generation: snapshot.generation,
                visible: Arc::new(visible.to_vec()),
                stats,
            });
        }

        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            changed = fleet_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("View task stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fetch::test_server::{self, Reply};

    const FEED: &str = r#"{"count":3,"flights":[
        {"icao24":"abc123","callsign":"RYR123 ","latitude":45.0,"longitude":9.0,"geo_altitude":3000.0},
        {"icao24":"abc123","callsign":"RYR123 ","latitude":45.1,"longitude":9.1,"geo_altitude":3500.0},
        {"icao24":"3c6589","callsign":"DLH9AU","latitude":48.3,"longitude":11.7,"geo_altitude":9000.0,"true_track":91.0}
    ]}"#;

    fn config(base_url: &str, timeout: Duration) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.fetch.base_url = base_url.to_string();
        config.fetch.timeout = timeout;
        config.weather.manifest_url = format!("{base_url}/no-manifest");
        config.weather.timeout = timeout;
        config.detail.base_url = base_url.to_string();
        config
    }

    fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    async fn wait_for_view(
        rx: &mut watch::Receiver<MapView>,
        ready: impl FnMut(&MapView) -> bool,
    ) -> MapView {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(ready))
            .await
            .unwrap()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_pipeline_dedups_and_filters() {
        let base = test_server::spawn(Reply::json(FEED)).await;
        let client_config = config(&base, Duration::from_secs(2));
        let client = Client::spawn_with_client(client_config, &local_client()).unwrap();
        let mut rx = client.subscribe_map();

        let view = wait_for_view(&mut rx, |v| v.generation >= 1).await;
        assert_eq!(view.stats, FlightStats { visible: 2, total: 2 });
        assert!(!client.is_demo_mode());

        client.update_settings(|s| s.with_filters(FilterCriteria::new(4000.0, "")));
        let view = wait_for_view(&mut rx, |v| v.stats.visible == 1).await;
        assert_eq!(view.visible[0].icao24, "3c6589");
        assert_eq!(view.stats.total, 2);

        let markers = client.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rotation_deg, 91.0);

        let telemetry = client.telemetry("abc123").unwrap();
        assert_eq!(telemetry.altitude, "11483 ft");

        let airports = client.airport_markers();
        assert_eq!(airports.len(), 6);
        assert!(airports.iter().all(|a| !a.on_route));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_feed_serves_snapshot() {
        let base = test_server::spawn(Reply::Hang).await;
        let client_config = config(&base, Duration::from_millis(100));
        let client = Client::spawn_with_client(client_config, &local_client()).unwrap();
        let mut rx = client.subscribe_map();

        let view = wait_for_view(&mut rx, |v| v.generation >= 1).await;
        assert!(client.is_demo_mode());
        assert_eq!(view.stats.total, 8);
        assert!(client.fleet().fleet.get("4691c3").unwrap().is_emergency());
    }

    #[tokio::test]
    async fn test_weather_layer_follows_settings() {
        let base = test_server::spawn(Reply::status(404)).await;
        let client_config = config(&base, Duration::from_secs(2));
        let client = Client::spawn_with_client(client_config, &local_client()).unwrap();

        client.update_settings(|s| s.with_weather_layer(WeatherLayer::Radar));
        assert_eq!(client.settings().weather_layer, WeatherLayer::Radar);
        assert_eq!(*client.layer_tx.borrow(), WeatherLayer::Radar);

        // The manifest request fails, so the overlay never animates.
        let mut weather = client.subscribe_weather();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(weather.borrow_and_update().tile_url.is_none());
    }
}
