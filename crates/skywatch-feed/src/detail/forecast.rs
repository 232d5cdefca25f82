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

//! Open-Meteo point forecast types.

use serde::{Deserialize, Serialize};

/// Public Open-Meteo forecast endpoint.
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Body of a `current_weather=true` forecast request.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub current_weather: CurrentWeather,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Air temperature in °C.
    pub temperature: f64,
    /// WMO weather interpretation code.
    #[serde(default)]
    pub weathercode: u16,
}

/// Current conditions at an airport, labelled with its city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityForecast {
    pub city: String,
    pub temperature_c: f64,
    pub weather_code: u16,
}

impl CityForecast {
    #[must_use]
    pub fn new(city: impl Into<String>, current: CurrentWeather) -> Self {
        Self {
            city: city.into(),
            temperature_c: current.temperature,
            weather_code: current.weathercode,
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        describe_weather_code(self.weather_code)
    }

    /// Short label such as `Rome 18°C`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {:.0}°C", self.city, self.temperature_c)
    }
}

/// Short description for a WMO weather interpretation code.
#[must_use]
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}
