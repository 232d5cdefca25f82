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

//! RainViewer frame manifest and tile URL construction.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::DateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::fetch::{FetchError, HttpFetcher};
use crate::model::WeatherFrame;

/// Public RainViewer manifest endpoint.
pub const DEFAULT_MANIFEST_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";

/// Attribution the renderer must show while an overlay is visible.
pub const ATTRIBUTION: &str = "Weather data © RainViewer";

/// Available weather overlay layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherLayer {
    #[default]
    None,
    Radar,
    Cloud,
}

impl WeatherLayer {
    /// RainViewer colour scheme for the layer, `None` when the overlay is off.
    #[must_use]
    pub fn color_scheme(self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Radar => Some(2),
            Self::Cloud => Some(0),
        }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// Name used in configuration and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Radar => "radar",
            Self::Cloud => "cloud",
        }
    }

    /// Get human-readable display name
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "Off",
            Self::Radar => "Precipitation Radar",
            Self::Cloud => "Cloud Cover",
        }
    }

    /// Slippy-map tile template for `frame`, with `{z}/{x}/{y}` left for the
    /// renderer. `None` when the overlay is off.
    #[must_use]
    pub fn tile_url(self, frame: &WeatherFrame) -> Option<String> {
        self.color_scheme()
            .map(|scheme| format!("{}/256/{{z}}/{{x}}/{{y}}/{}/1_1.png", frame.url, scheme))
    }
}

impl fmt::Display for WeatherLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown weather layer name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weather layer '{0}', expected none, radar or cloud")]
pub struct ParseLayerError(pub String);

impl FromStr for WeatherLayer {
    type Err = ParseLayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "radar" => Ok(Self::Radar),
            "cloud" | "satellite" => Ok(Self::Cloud),
            _ => Err(ParseLayerError(s.to_owned())),
        }
    }
}

/// One entry of the manifest's frame lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestFrame {
    pub path: String,
    /// Capture time, seconds since the Unix epoch.
    pub time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RadarFrames {
    #[serde(default)]
    pub past: Vec<ManifestFrame>,
    #[serde(default)]
    pub nowcast: Vec<ManifestFrame>,
}

/// Body of the RainViewer `weather-maps.json` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherManifest {
    pub host: String,
    #[serde(default)]
    pub radar: RadarFrames,
}

impl WeatherManifest {
    /// Resolve the manifest into ordered frames, oldest first.
    ///
    /// Forecast frames follow the historical ones when `include_nowcast` is
    /// set. Entries with an unrepresentable timestamp are skipped.
    #[must_use]
    pub fn frames(&self, include_nowcast: bool) -> Vec<WeatherFrame> {
        let nowcast: &[ManifestFrame] = if include_nowcast {
            self.radar.nowcast.as_slice()
        } else {
            &[]
        };

        self.radar
            .past
            .iter()
            .chain(nowcast)
            .filter_map(|frame| {
                let captured_at = DateTime::from_timestamp(frame.time, 0)?;
                Some(WeatherFrame {
                    url: format!("{}{}", self.host, frame.path),
                    captured_at,
                })
            })
            .collect()
    }
}

/// Source of the weather frame manifest.
pub trait ManifestSource: Send + Sync + 'static {
    fn fetch_manifest(&self) -> impl Future<Output = Result<WeatherManifest, FetchError>> + Send;
}

/// RainViewer manifest client.
#[derive(Debug, Clone)]
pub struct RainViewer {
    http: HttpFetcher,
    manifest_url: String,
}

impl RainViewer {
    #[must_use]
    pub fn new(http: HttpFetcher, manifest_url: impl Into<String>) -> Self {
        Self {
            http,
            manifest_url: manifest_url.into(),
        }
    }

    #[must_use]
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }
}

impl ManifestSource for RainViewer {
    async fn fetch_manifest(&self) -> Result<WeatherManifest, FetchError> {
        let manifest: WeatherManifest = self.http.get_json(&self.manifest_url, &[]).await?;
        debug!(
            "Weather manifest from {}: {} past, {} nowcast frames",
            manifest.host,
            manifest.radar.past.len(),
            manifest.radar.nowcast.len()
        );
        Ok(manifest)
    }
}
