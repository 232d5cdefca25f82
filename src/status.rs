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

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use skywatch_feed::weather::DriverState;
use skywatch_feed::{DetailState, FlightStats, MapView, WeatherView};

const MAX_DIAGNOSTICS: usize = 50;

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// Feed, overlay and selection status shown alongside the map.
#[derive(Debug)]
pub struct SystemStatus {
    /// Serving the bundled snapshot instead of live data.
    pub demo_mode: bool,

    pub stats: FlightStats,

    pub weather_state: DriverState,
    pub weather_frames: usize,
    /// The manifest load has finished, successfully or not.
    weather_settled: bool,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            demo_mode: false,
            stats: FlightStats::default(),
            weather_state: DriverState::Idle,
            weather_frames: 0,
            weather_settled: false,
            diagnostics: VecDeque::with_capacity(MAX_DIAGNOSTICS),
        }
    }

    /// Track the feed switching to or away from the bundled snapshot.
    pub fn set_demo_mode(&mut self, demo_mode: bool) {
        match (self.demo_mode, demo_mode) {
            (false, true) => self.add_diagnostic(
                DiagnosticLevel::Warning,
                "Live feed unavailable, showing demo flights".to_string(),
            ),
            (true, false) => self.add_diagnostic(
                DiagnosticLevel::Info,
                "Live feed recovered".to_string(),
            ),
            _ => {}
        }
        self.demo_mode = demo_mode;
    }

    /// Update flight statistics from a new map view
    pub fn record_view(&mut self, view: &MapView) {
        self.stats = view.stats;
    }

    /// Update the overlay state. The load outcome is reported once, on the
    /// first view past `ManifestLoading`, which may be the first view seen.
    pub fn record_weather(&mut self, view: &WeatherView) {
        self.weather_state = view.state;
        self.weather_frames = view.frame_count;

        if self.weather_settled || view.state == DriverState::ManifestLoading {
            return;
        }
        self.weather_settled = true;

        if view.frame_count == 0 {
            self.add_diagnostic(
                DiagnosticLevel::Warning,
                "Weather frames unavailable, overlay disabled".to_string(),
            );
        } else {
            self.add_diagnostic(
                DiagnosticLevel::Info,
                format!("Weather frames loaded: {}", view.frame_count),
            );
        }
    }

    pub fn record_detail(&mut self, state: &DetailState) {
        if let DetailState::Failed { icao24, message } = state {
            self.add_diagnostic(
                DiagnosticLevel::Error,
                format!("Detail for {icao24} unavailable: {message}"),
            );
        }
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        let diagnostic = DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        };

        self.diagnostics.push_back(diagnostic);

        // Keep only the last N messages
        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }

    /// One-line summary for the status bar
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = self.stats.to_string();
        if self.demo_mode {
            line.push_str(" [DEMO]");
        }
        if self.weather_state == DriverState::Animating {
            let _ = write!(line, " | weather {} frames", self.weather_frames);
        }
        line
    }
}

/// Thread-safe wrapper for SystemStatus
pub type SharedSystemStatus = Arc<Mutex<SystemStatus>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_mode_logged_once() {
        let mut status = SystemStatus::new();
        status.set_demo_mode(true);
        status.set_demo_mode(true);

        assert!(status.demo_mode);
        assert_eq!(status.diagnostics.len(), 1);
        assert_eq!(status.diagnostics[0].level, DiagnosticLevel::Warning);
    }

    #[test]
    fn test_demo_mode_clears_on_recovery() {
        let mut status = SystemStatus::new();
        status.set_demo_mode(true);
        status.set_demo_mode(false);
        assert!(!status.summary().contains("[DEMO]"));
        assert_eq!(status.diagnostics[1].message, "Live feed recovered");

        status.set_demo_mode(true);
        assert_eq!(status.diagnostics.len(), 3);
        assert_eq!(status.diagnostics[2].level, DiagnosticLevel::Warning);
    }

    #[test]
    fn test_diagnostics_capped() {
        let mut status = SystemStatus::new();
        for i in 0..60 {
            status.add_diagnostic(DiagnosticLevel::Info, format!("message {i}"));
        }
        assert_eq!(status.diagnostics.len(), MAX_DIAGNOSTICS);
        assert_eq!(status.diagnostics[0].message, "message 10");
    }

    #[test]
    fn test_weather_transitions() {
        let mut status = SystemStatus::new();
        status.record_weather(&WeatherView {
            state: DriverState::ManifestLoading,
            ..Default::default()
        });
        status.record_weather(&WeatherView::default());
        assert_eq!(status.diagnostics.len(), 1);
        assert!(status.diagnostics[0].message.contains("unavailable"));

        let mut status = SystemStatus::new();
        status.record_weather(&WeatherView {
            state: DriverState::ManifestLoading,
            ..Default::default()
        });
        status.record_weather(&WeatherView {
            state: DriverState::Animating,
            frame_count: 12,
            ..Default::default()
        });
        assert_eq!(status.diagnostics[0].message, "Weather frames loaded: 12");
        assert_eq!(status.summary(), "0 / 0 flights | weather 12 frames");
    }

    #[test]
    fn test_weather_outcome_without_loading_state() {
        // The loading state can be coalesced away by the watch channel.
        let mut status = SystemStatus::new();
        status.record_weather(&WeatherView {
            state: DriverState::Idle,
            frame_count: 5,
            frame_index: Some(4),
            ..Default::default()
        });
        assert_eq!(status.diagnostics.len(), 1);
        assert_eq!(status.diagnostics[0].message, "Weather frames loaded: 5");

        // Later ticks and toggles do not repeat it.
        status.record_weather(&WeatherView {
            state: DriverState::Animating,
            frame_count: 5,
            ..Default::default()
        });
        assert_eq!(status.diagnostics.len(), 1);

        let mut status = SystemStatus::new();
        status.record_weather(&WeatherView::default());
        assert_eq!(status.diagnostics.len(), 1);
        assert_eq!(status.diagnostics[0].level, DiagnosticLevel::Warning);
    }

    #[test]
    fn test_summary_with_demo() {
        let mut status = SystemStatus::new();
        status.record_view(&MapView {
            generation: 3,
            stats: FlightStats { visible: 3, total: 8 },
            ..Default::default()
        });
        status.set_demo_mode(true);
        assert_eq!(status.summary(), "3 / 8 flights [DEMO]");
    }
}
