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

//! Wire and domain types for the aircraft feed and detail endpoints.
//!
//! All stored values are metric (meters, m/s, degrees). Conversion to display
//! units happens in [`crate::units`] and never mutates these records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Squawk code for a general emergency.
pub const EMERGENCY_SQUAWK: &str = "7700";

/// State vector for one tracked aircraft, as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AircraftState {
    /// ICAO 24-bit address (hex string). Empty when the feed omitted it.
    #[serde(default)]
    pub icao24: String,
    /// Upstream flight identifier, passed back on detail requests when present.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Barometric altitude in meters.
    #[serde(default)]
    pub baro_altitude: Option<f64>,
    /// Geometric altitude in meters.
    #[serde(default)]
    pub geo_altitude: Option<f64>,
    /// Ground speed in m/s.
    #[serde(default)]
    pub velocity: Option<f64>,
    /// Track angle in degrees (0-360, north = 0).
    #[serde(default)]
    pub true_track: Option<f64>,
    /// Vertical rate in m/s (positive = climb).
    #[serde(default)]
    pub vertical_rate: Option<f64>,
    #[serde(default)]
    pub squawk: Option<String>,
    #[serde(default)]
    pub on_ground: bool,
}

impl AircraftState {
    /// Position as `(lat, lon)` when both coordinates are known.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Whether this record can be placed on the map.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.position().is_some()
    }

    /// Altitude used for filtering and display: geometric, then barometric, then 0.
    #[must_use]
    pub fn effective_altitude(&self) -> f64 {
        self.geo_altitude.or(self.baro_altitude).unwrap_or(0.0)
    }

    /// Whether the transponder is squawking a general emergency.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.squawk.as_deref().map(str::trim) == Some(EMERGENCY_SQUAWK)
    }

    /// Callsign with surrounding whitespace removed, or `None` if blank.
    #[must_use]
    pub fn trimmed_callsign(&self) -> Option<&str> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|cs| !cs.is_empty())
    }

    /// Trim identity and callsign in place. Blank callsigns become `None`.
    pub(crate) fn normalize(&mut self) {
        let icao = self.icao24.trim();
        if icao.len() != self.icao24.len() {
            self.icao24 = icao.to_owned();
        }
        self.callsign = self.trimmed_callsign().map(str::to_owned);
    }
}

/// Body of `GET /api/flights/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub flights: Vec<AircraftState>,
}

/// Geographic rectangle, serialized as `min_lat,min_lon,max_lat,max_lon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Central Europe, wide enough to cover Italy, France and Germany.
    pub const CENTRAL_EUROPE: Self = Self {
        min_lat: 35.0,
        min_lon: -10.0,
        max_lat: 55.0,
        max_lon: 25.0,
    };

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::CENTRAL_EUROPE
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?},{:?},{:?},{:?}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// Error returned when a bounding box string does not have four numeric parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bounding box '{0}', expected min_lat,min_lon,max_lat,max_lon")]
pub struct BoundingBoxParseError(pub String);

impl FromStr for BoundingBox {
    type Err = BoundingBoxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_parse| BoundingBoxParseError(s.to_owned()))?;

        match parts.as_slice() {
            &[min_lat, min_lon, max_lat, max_lon] if min_lat <= max_lat && min_lon <= max_lon => {
                Ok(Self {
                    min_lat,
                    min_lon,
                    max_lat,
                    max_lon,
                })
            }
            _ => Err(BoundingBoxParseError(s.to_owned())),
        }
    }
}

/// Aircraft photo lookup result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AircraftImage {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub photographer: Option<String>,
}

/// Origin or destination airport on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    #[serde(default)]
    pub city: String,
    /// `[lat, lon]` when known; forecasts are only fetched for airports with coordinates.
    #[serde(default)]
    pub coords: Option<[f64; 2]>,
}

/// Schedule status as reported by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlightStatus {
    OnTime,
    Delayed,
    /// Any other status string (landed, diverted, ...), kept verbatim.
    Other(String),
    #[default]
    Unknown,
}

impl From<String> for FlightStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "" => Self::Unknown,
            s if s.eq_ignore_ascii_case("on time") => Self::OnTime,
            s if s.eq_ignore_ascii_case("delayed") => Self::Delayed,
            s => Self::Other(s.to_owned()),
        }
    }
}

impl From<FlightStatus> for String {
    fn from(value: FlightStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnTime => f.write_str("On Time"),
            Self::Delayed => f.write_str("Delayed"),
            Self::Other(s) => f.write_str(s),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Route and timing for a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub origin: Airport,
    pub destination: Airport,
    #[serde(default)]
    pub scheduled_departure: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_arrival: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(default)]
    pub delay_minutes: u32,
    #[serde(default)]
    pub progress_percent: u8,
}

impl Schedule {
    /// Progress through the flight, clamped to 0-100.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress_percent.min(100)
    }

    /// Badge text such as `On Time` or `Delayed +25m`.
    #[must_use]
    pub fn status_badge(&self) -> String {
        if self.delay_minutes > 0 {
            format!("{} +{}m", self.status, self.delay_minutes)
        } else {
            self.status.to_string()
        }
    }
}

/// Body of `GET /api/flights/{icao24}`: the state vector plus extended fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AircraftDetail {
    #[serde(flatten)]
    pub state: AircraftState,
    #[serde(default)]
    pub image: Option<AircraftImage>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

impl AircraftDetail {
    /// Photo URL, only when the lookup reported a hit.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.image
            .as_ref()
            .filter(|img| img.found)
            .and_then(|img| img.url.as_deref())
    }
}

/// One historical capture of the weather overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherFrame {
    /// Base URL (`{host}{path}`) the tile template is appended to.
    pub url: String,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_altitude_prefers_geo() {
        let mut a = AircraftState {
            baro_altitude: Some(1000.0),
            ..Default::default()
        };
        assert_eq!(a.effective_altitude(), 1000.0);
        a.geo_altitude = Some(1200.0);
        assert_eq!(a.effective_altitude(), 1200.0);
        a.geo_altitude = None;
        a.baro_altitude = None;
        assert_eq!(a.effective_altitude(), 0.0);
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let a: AircraftState = serde_json::from_str(
            r#"{"icao24":"4b1805","callsign":"SWR12  ","latitude":null,"time_position":1700000000}"#,
        )
        .unwrap();
        assert_eq!(a.icao24, "4b1805");
        assert_eq!(a.trimmed_callsign(), Some("SWR12"));
        assert!(!a.has_position());
        assert!(!a.on_ground);
    }

    #[test]
    fn test_emergency_squawk() {
        let a = AircraftState {
            squawk: Some("7700".to_string()),
            ..Default::default()
        };
        assert!(a.is_emergency());
        let b = AircraftState {
            squawk: Some("1000".to_string()),
            ..Default::default()
        };
        assert!(!b.is_emergency());
    }

    #[test]
    fn test_bbox_parse_and_display() {
        let bbox: BoundingBox = "35.0,-10.0,55.0,25.0".parse().unwrap();
        assert_eq!(bbox, BoundingBox::CENTRAL_EUROPE);
        assert_eq!(bbox.to_string(), "35.0,-10.0,55.0,25.0");
        assert!(bbox.contains(45.0, 9.0));
        assert!(!bbox.contains(60.0, 9.0));

        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("55,0,35,10".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_detail_deserialize() {
        let json = r#"{
            "icao24": "abc123",
            "callsign": "RYR123",
            "image": {"found": true, "url": "https://img.example/1.jpg", "photographer": "J. Doe"},
            "schedule": {
                "origin": {"code": "FCO", "city": "Rome", "coords": [41.8003, 12.2389]},
                "destination": {"code": "LHR", "city": "London"},
                "scheduled_departure": "2025-03-01T10:15:00.123456+00:00",
                "scheduled_arrival": "2025-03-01T12:40:00+00:00",
                "status": "Delayed",
                "delay_minutes": 25,
                "progress_percent": 40
            },
            "trail": []
        }"#;
        let detail: AircraftDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.state.icao24, "abc123");
        assert_eq!(detail.photo_url(), Some("https://img.example/1.jpg"));

        let schedule = detail.schedule.unwrap();
        assert_eq!(schedule.status, FlightStatus::Delayed);
        assert_eq!(schedule.status_badge(), "Delayed +25m");
        assert_eq!(schedule.origin.coords, Some([41.8003, 12.2389]));
        assert!(schedule.destination.coords.is_none());
        assert!(schedule.scheduled_departure.is_some());
    }

    #[test]
    fn test_flight_status_parsing() {
        assert_eq!(FlightStatus::from("On Time".to_string()), FlightStatus::OnTime);
        assert_eq!(FlightStatus::from(String::new()), FlightStatus::Unknown);
        assert_eq!(
            FlightStatus::from("Diverted".to_string()),
            FlightStatus::Other("Diverted".to_string())
        );
    }
}
