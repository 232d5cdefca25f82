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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{enrich, DetailRequest, DetailSource, DetailView};

/// Detail panel state for the current selection.
#[derive(Debug, Clone, Default)]
pub enum DetailState {
    /// Nothing selected.
    #[default]
    Empty,
    Loading { icao24: String },
    Ready(Arc<DetailView>),
    /// The detail fetch failed; the panel should show an empty state.
    Failed { icao24: String, message: String },
}

impl DetailState {
    /// Identity the state refers to, if any.
    #[must_use]
    pub fn icao24(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Loading { icao24 } | Self::Failed { icao24, .. } => Some(icao24.as_str()),
            Self::Ready(view) => Some(view.detail.state.icao24.as_str()),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// Tracks the selected aircraft and applies only the newest enrichment.
///
/// Every selection takes a new token. A completed enrichment is published
/// only if its token is still current; otherwise it is dropped.
pub struct SelectionTracker<S> {
    source: Arc<S>,
    state_tx: Arc<watch::Sender<DetailState>>,
    token: Arc<AtomicU64>,
    cancel_token: CancellationToken,
}

impl<S> std::fmt::Debug for SelectionTracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionTracker")
            .field("token", &self.token)
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl<S: DetailSource> SelectionTracker<S> {
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        let (state_tx, _) = watch::channel(DetailState::Empty);
        Self {
            source,
            state_tx: Arc::new(state_tx),
            token: Arc::new(AtomicU64::new(0)),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Select an aircraft and start enriching it in the background.
    ///
    /// Returns the selection token.
    pub fn select(&self, request: DetailRequest) -> u64 {
        let mut token = 0;
        self.state_tx.send_modify(|state| {
            token = self.token.fetch_add(1, Ordering::SeqCst) + 1;
            *state = DetailState::Loading {
                icao24: request.icao24.clone(),
            };
        });

        let source = Arc::clone(&self.source);
        let state_tx = Arc::clone(&self.state_tx);
        let current = Arc::clone(&self.token);
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel_token.cancelled() => return,
                result = enrich(&*source, &request) => result,
            };

            state_tx.send_if_modified(|state| {
                if current.load(Ordering::SeqCst) != token {
                    debug!("Discarding stale detail for {}", request.icao24);
                    return false;
                }
                *state = match result {
                    Ok(view) => DetailState::Ready(Arc::new(view)),
                    Err(e) => {
                        warn!("Detail for {} unavailable: {}", request.icao24, e);
                        DetailState::Failed {
                            icao24: request.icao24.clone(),
                            message: e.to_string(),
                        }
                    }
                };
                true
            });
        });

        token
    }

    /// Clear the selection. Any in-flight enrichment is discarded on arrival.
    pub fn clear(&self) {
        self.state_tx.send_modify(|state| {
            self.token.fetch_add(1, Ordering::SeqCst);
            *state = DetailState::Empty;
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> DetailState {
        self.state_tx.borrow().clone()
    }

    /// Identity of the current selection.
    #[must_use]
    pub fn selected(&self) -> Option<String> {
        self.state_tx.borrow().icao24().map(str::to_owned)
    }
}

impl<S> Drop for SelectionTracker<S> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
