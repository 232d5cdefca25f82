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

//! User display settings.
//!
//! [`DisplaySettings`] is an immutable value. Changing a setting produces a
//! new value which is then published as a whole; components never mutate a
//! shared settings object in place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::FilterCriteria;
use crate::units::UnitSystem;
use crate::weather::WeatherLayer;

/// Base map imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    Dark,
    Light,
    Satellite,
}

impl MapStyle {
    /// Slippy-map tile template. `{s}` is a subdomain placeholder.
    #[must_use]
    pub fn tile_url(self) -> &'static str {
        match self {
            Self::Dark => "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
            Self::Light => "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
            Self::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    #[must_use]
    pub fn attribution(self) -> &'static str {
        match self {
            Self::Dark | Self::Light => "© OpenStreetMap contributors, © CARTO",
            Self::Satellite => "Tiles © Esri",
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dark => "dark",
            Self::Light => "light",
            Self::Satellite => "satellite",
        })
    }
}

/// Everything the user can change about the view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub map_style: MapStyle,
    pub weather_layer: WeatherLayer,
    pub units: UnitSystem,
    pub filters: FilterCriteria,
}

impl DisplaySettings {
    #[must_use]
    pub fn with_map_style(self, map_style: MapStyle) -> Self {
        Self { map_style, ..self }
    }

    #[must_use]
    pub fn with_weather_layer(self, weather_layer: WeatherLayer) -> Self {
        Self {
            weather_layer,
            ..self
        }
    }

    #[must_use]
    pub fn with_units(self, units: UnitSystem) -> Self {
        Self { units, ..self }
    }

    #[must_use]
    pub fn with_filters(self, filters: FilterCriteria) -> Self {
        Self { filters, ..self }
    }
}
