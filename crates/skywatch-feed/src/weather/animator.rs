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

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ManifestSource, WeatherLayer, DEFAULT_MANIFEST_URL};
use crate::fetch::DEFAULT_TIMEOUT;
use crate::model::WeatherFrame;

/// Default time between frame advances.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(2);

const MIN_CADENCE: Duration = Duration::from_millis(250);

/// Configuration for the weather animation.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub manifest_url: String,
    /// Time between frame advances. Kept well above the upstream refresh rate.
    pub cadence: Duration,
    /// Append forecast frames after the historical ones.
    pub include_nowcast: bool,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            cadence: DEFAULT_CADENCE,
            include_nowcast: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Position in the loaded frame sequence.
///
/// Starts on the newest frame and wraps back to the oldest after the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCursor {
    frames: Vec<WeatherFrame>,
    index: usize,
}

impl FrameCursor {
    /// Returns `None` when there is nothing to animate.
    #[must_use]
    pub fn new(frames: Vec<WeatherFrame>) -> Option<Self> {
        let index = frames.len().checked_sub(1)?;
        Some(Self { frames, index })
    }

    /// Step to the next frame, wrapping around.
    pub fn advance(&mut self) -> &WeatherFrame {
        self.index = (self.index + 1) % self.frames.len();
        &self.frames[self.index]
    }

    #[must_use]
    pub fn current(&self) -> &WeatherFrame {
        &self.frames[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Layer off, or no frames available.
    #[default]
    Idle,
    ManifestLoading,
    Animating,
}

/// What the renderer should currently show for the weather overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeatherView {
    pub state: DriverState,
    pub layer: WeatherLayer,
    /// Cursor position, kept while the layer is off.
    pub frame_index: Option<usize>,
    pub frame_count: usize,
    /// Tile template for the current frame, only while animating.
    pub tile_url: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl WeatherView {
    fn from_cursor(layer: WeatherLayer, cursor: &FrameCursor) -> Self {
        let frame = cursor.current();
        let tile_url = layer.tile_url(frame);
        Self {
            state: if tile_url.is_some() {
                DriverState::Animating
            } else {
                DriverState::Idle
            },
            layer,
            frame_index: Some(cursor.index()),
            frame_count: cursor.len(),
            captured_at: tile_url.as_ref().map(|_| frame.captured_at),
            tile_url,
        }
    }
}

/// Entry point for the weather animation.
#[derive(Debug)]
pub struct WeatherAnimator;

impl WeatherAnimator {
    /// Load the manifest once, then animate whenever `layer_rx` holds an
    /// enabled layer.
    #[must_use]
    pub fn start<M: ManifestSource>(
        source: Arc<M>,
        config: &WeatherConfig,
        layer_rx: watch::Receiver<WeatherLayer>,
    ) -> WeatherHandle {
        let (view_tx, view_rx) = watch::channel(WeatherView::default());
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let cadence = config.cadence.max(MIN_CADENCE);
        let include_nowcast = config.include_nowcast;
        let task = tokio::spawn(async move {
            driver_loop(source, cadence, include_nowcast, layer_rx, view_tx, task_cancel).await;
        });

        WeatherHandle {
            view_rx,
            cancel_token,
            task: Some(task),
        }
    }
}

/// Owned handle to a running weather animation.
pub struct WeatherHandle {
    view_rx: watch::Receiver<WeatherView>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WeatherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherHandle")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl WeatherHandle {
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WeatherView> {
        self.view_rx.clone()
    }

    #[must_use]
    pub fn current(&self) -> WeatherView {
        self.view_rx.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Cancel the animation and wait for the task to finish.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WeatherHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn frame_ticker(cadence: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn driver_loop<M: ManifestSource>(
    source: Arc<M>,
    cadence: Duration,
    include_nowcast: bool,
    mut layer_rx: watch::Receiver<WeatherLayer>,
    view_tx: watch::Sender<WeatherView>,
    cancel_token: CancellationToken,
) {
    view_tx.send_modify(|view| view.state = DriverState::ManifestLoading);

    let manifest = tokio::select! {
        biased;
        () = cancel_token.cancelled() => return,
        manifest = source.fetch_manifest() => manifest,
    };

    let cursor = match manifest {
        Ok(manifest) => FrameCursor::new(manifest.frames(include_nowcast)),
        Err(e) => {
            warn!("Failed to load weather manifest: {}", e);
            None
        }
    };

    let Some(mut cursor) = cursor else {
        info!("No weather frames available, overlay stays idle");
        view_tx.send_modify(|view| view.state = DriverState::Idle);
        cancel_token.cancelled().await;
        return;
    };

    info!("Loaded {} weather frames", cursor.len());

    let mut layer = *layer_rx.borrow_and_update();
    let mut ticker = frame_ticker(cadence);
    view_tx.send_replace(WeatherView::from_cursor(layer, &cursor));

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            changed = layer_rx.changed() => {
                if changed.is_err() {
                    debug!("Weather layer selector dropped");
                    break;
                }
                let next = *layer_rx.borrow_and_update();
                if next == layer {
                    continue;
                }
                debug!("Weather layer changed from {} to {}", layer, next);
                layer = next;
                ticker = frame_ticker(cadence);
                view_tx.send_replace(WeatherView::from_cursor(layer, &cursor));
            }
            _ = ticker.tick(), if layer.is_enabled() => {
                cursor.advance();
                view_tx.send_replace(WeatherView::from_cursor(layer, &cursor));
            }
        }
    }

    debug!("Weather animation stopped");
}
