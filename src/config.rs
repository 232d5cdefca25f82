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

//! Application configuration management.
//!
//! Settings are persisted as TOML. Every field has a serde default, so a
//! config written by an older version still loads.

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use skywatch_feed::detail::DEFAULT_FORECAST_URL;
use skywatch_feed::fetch::DEFAULT_FEED_URL;
use skywatch_feed::weather::DEFAULT_MANIFEST_URL;
use skywatch_feed::{BoundingBox, ClientConfig, DisplaySettings, IngestPolicy};

const APP_NAME: &str = "skywatch";
const CONFIG_NAME: &str = "config";

const CONFIG_VERSION: u32 = 1;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Feed server base URL
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Weather frame manifest
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Current-weather endpoint used for airport forecasts
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Hard budget for any single request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Time between weather frame advances
    #[serde(default = "default_animation_cadence_secs")]
    pub animation_cadence_secs: u64,

    /// Area requested from the feed
    #[serde(default)]
    pub bbox: BoundingBox,

    /// Append forecast radar frames after the historical ones
    #[serde(default)]
    pub include_nowcast: bool,

    #[serde(default)]
    pub ingest_policy: IngestPolicy,

    /// Display settings restored at startup
    #[serde(default)]
    pub display: DisplaySettings,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_animation_cadence_secs() -> u64 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            feed_url: default_feed_url(),
            manifest_url: default_manifest_url(),
            forecast_url: default_forecast_url(),
            timeout_ms: default_timeout_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            animation_cadence_secs: default_animation_cadence_secs(),
            bbox: BoundingBox::default(),
            include_nowcast: false,
            ingest_policy: IngestPolicy::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        let mut config: Self = confy::load(APP_NAME, CONFIG_NAME)?;

        if config.config_version < CONFIG_VERSION {
            info!(
                "Upgrading configuration from version {} to {}",
                config.config_version, CONFIG_VERSION
            );
            config.config_version = CONFIG_VERSION;
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Build the library configuration.
    #[must_use]
    pub fn to_client_config(&self) -> ClientConfig {
        let timeout = Duration::from_millis(self.timeout_ms);
        let mut config = ClientConfig::default();

        config.fetch.base_url.clone_from(&self.feed_url);
        config.fetch.bbox = Some(self.bbox);
        config.fetch.timeout = timeout;

        config.poll.interval = Duration::from_secs(self.poll_interval_secs);
        config.poll.policy = self.ingest_policy;

        config.weather.manifest_url.clone_from(&self.manifest_url);
        config.weather.cadence = Duration::from_secs(self.animation_cadence_secs);
        config.weather.include_nowcast = self.include_nowcast;
        config.weather.timeout = timeout;

        config.detail.base_url.clone_from(&self.feed_url);
        config.detail.forecast_url.clone_from(&self.forecast_url);
        config.detail.timeout = timeout;

        config.settings = self.display.clone();
        config
    }
}
