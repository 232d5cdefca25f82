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

//! Descriptors handed to the rendering surface.

use std::fmt;

use crate::model::{AircraftState, BoundingBox, Schedule};
use crate::units::{format_heading, UnitSystem};

/// Vertical rates below this magnitude (m/s) count as level flight.
const LEVEL_THRESHOLD_MPS: f64 = 0.5;

/// Distances (degrees) of the recent-track hint points behind the aircraft.
const TRACK_HINT_OFFSETS: [f64; 2] = [0.5, 0.2];

/// Icon placement for one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub icao24: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Icon rotation, clockwise from north.
    pub rotation_deg: f64,
    pub selected: bool,
    /// Squawking 7700; the renderer highlights these.
    pub emergency: bool,
}

/// Build markers for the visible aircraft that have a position.
#[must_use]
pub fn markers(visible: &[AircraftState], selected: Option<&str>) -> Vec<Marker> {
    visible
        .iter()
        .filter_map(|a| {
            let (latitude, longitude) = a.position()?;
            Some(Marker {
                icao24: a.icao24.clone(),
                latitude,
                longitude,
                rotation_deg: a.true_track.unwrap_or(0.0).rem_euclid(360.0),
                selected: selected == Some(a.icao24.as_str()),
                emergency: a.is_emergency(),
            })
        })
        .collect()
}

/// Airports drawn as fixed markers: code, city, latitude, longitude.
const AIRPORTS: [(&str, &str, f64, f64); 6] = [
    ("FCO", "Rome", 41.8003, 12.2389),
    ("MXP", "Milan", 45.6301, 8.7255),
    ("LIN", "Milan", 45.4451, 9.2767),
    ("VCE", "Venice", 45.5053, 12.3519),
    ("LHR", "London", 51.4700, -0.4543),
    ("CDG", "Paris", 49.0097, 2.5479),
];

/// Fixed airport marker.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportMarker {
    pub code: &'static str,
    pub city: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    /// Origin or destination of the selected flight.
    pub on_route: bool,
}

/// Airport markers inside `bounds` (all of them when `None`), flagging
/// those on the route of `schedule`.
#[must_use]
pub fn airport_markers(
    bounds: Option<&BoundingBox>,
    schedule: Option<&Schedule>,
) -> Vec<AirportMarker> {
    let on_route = |code: &str| {
        schedule.is_some_and(|s| {
            s.origin.code.eq_ignore_ascii_case(code)
                || s.destination.code.eq_ignore_ascii_case(code)
        })
    };

    AIRPORTS
        .iter()
        .filter(|(_, _, lat, lon)| match bounds {
            Some(b) => b.contains(*lat, *lon),
            None => true,
        })
        .map(|&(code, city, latitude, longitude)| AirportMarker {
            code,
            city,
            latitude,
            longitude,
            on_route: on_route(code),
        })
        .collect()
}

/// Counts for the "flights in range" overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlightStats {
    pub visible: usize,
    pub total: usize,
}

impl fmt::Display for FlightStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} flights", self.visible, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalTrend {
    Climbing,
    Descending,
    Level,
}

impl VerticalTrend {
    #[must_use]
    pub fn from_rate(rate_mps: f64) -> Self {
        if rate_mps >= LEVEL_THRESHOLD_MPS {
            Self::Climbing
        } else if rate_mps <= -LEVEL_THRESHOLD_MPS {
            Self::Descending
        } else {
            Self::Level
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Climbing => "↑",
            Self::Descending => "↓",
            Self::Level => "→",
        }
    }
}

/// Formatted telemetry for the detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telemetry {
    pub callsign: String,
    pub altitude: String,
    pub speed: String,
    pub vertical_rate: String,
    pub heading: String,
    pub trend: Option<VerticalTrend>,
    pub squawk: String,
    pub emergency: bool,
}

impl Telemetry {
    #[must_use]
    pub fn new(aircraft: &AircraftState, units: UnitSystem) -> Self {
        const NA: &str = "N/A";

        let altitude = if aircraft.on_ground {
            "Ground".to_string()
        } else {
            aircraft
                .geo_altitude
                .or(aircraft.baro_altitude)
                .map_or_else(|| NA.to_string(), |m| units.format_altitude(m))
        };

        Self {
            callsign: aircraft
                .trimmed_callsign()
                .map_or_else(|| aircraft.icao24.to_uppercase(), str::to_owned),
            altitude,
            speed: aircraft
                .velocity
                .map_or_else(|| NA.to_string(), |v| units.format_speed(v)),
            vertical_rate: aircraft
                .vertical_rate
                .map_or_else(|| NA.to_string(), |v| units.format_vertical_rate(v)),
            heading: aircraft
                .true_track
                .map_or_else(|| NA.to_string(), format_heading),
            trend: aircraft.vertical_rate.map(VerticalTrend::from_rate),
            squawk: aircraft.squawk.clone().unwrap_or_else(|| NA.to_string()),
            emergency: aircraft.is_emergency(),
        }
    }
}

/// Cosmetic three-point trail ending at the aircraft's position.
///
/// Points are projected backwards along the current track, or along the
/// south-west diagonal when the track is unknown. Not a reconstructed history.
#[must_use]
pub fn track_hint(aircraft: &AircraftState) -> Option<Vec<(f64, f64)>> {
    let (lat, lon) = aircraft.position()?;

    let (dlat, dlon) = match aircraft.true_track {
        Some(track) => {
            let rad = track.to_radians();
            (rad.cos(), rad.sin())
        }
        None => (1.0, 1.0),
    };

    let mut points: Vec<(f64, f64)> = TRACK_HINT_OFFSETS
        .iter()
        .map(|d| (lat - d * dlat, lon - d * dlon))
        .collect();
    points.push((lat, lon));
    Some(points)
}
