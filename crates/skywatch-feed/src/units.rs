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

//! Display unit conversion.
//!
//! Stored values stay metric; these functions only produce numbers and strings
//! for presentation.

use serde::{Deserialize, Serialize};

pub const FEET_PER_METER: f64 = 3.28084;
pub const KNOTS_PER_MPS: f64 = 1.94384;
pub const KMH_PER_MPS: f64 = 3.6;
pub const FPM_PER_MPS: f64 = 196.85;

/// Unit system used for telemetry display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    /// Meters, km/h, m/s.
    Metric,
    /// Feet, knots, feet per minute.
    #[default]
    Nautical,
}

#[must_use]
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

#[must_use]
pub fn feet_to_meters(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

#[must_use]
pub fn mps_to_knots(mps: f64) -> f64 {
    mps * KNOTS_PER_MPS
}

#[must_use]
pub fn knots_to_mps(knots: f64) -> f64 {
    knots / KNOTS_PER_MPS
}

#[must_use]
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * KMH_PER_MPS
}

#[must_use]
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / KMH_PER_MPS
}

#[must_use]
pub fn mps_to_fpm(mps: f64) -> f64 {
    mps * FPM_PER_MPS
}

#[must_use]
pub fn fpm_to_mps(fpm: f64) -> f64 {
    fpm / FPM_PER_MPS
}

// Round half away from zero, folding -0 into 0 so "-0 ft" never shows up.
fn display_round(value: f64) -> f64 {
    let rounded = value.round();
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl UnitSystem {
    /// Altitude for display: meters in metric, feet otherwise.
    #[must_use]
    pub fn altitude(self, meters: f64) -> f64 {
        match self {
            Self::Metric => display_round(meters),
            Self::Nautical => display_round(meters_to_feet(meters)),
        }
    }

    /// Speed for display: km/h in metric, knots otherwise.
    #[must_use]
    pub fn speed(self, mps: f64) -> f64 {
        match self {
            Self::Metric => display_round(mps_to_kmh(mps)),
            Self::Nautical => display_round(mps_to_knots(mps)),
        }
    }

    /// Vertical rate for display: m/s in metric, feet per minute otherwise.
    #[must_use]
    pub fn vertical_rate(self, mps: f64) -> f64 {
        match self {
            Self::Metric => display_round(mps),
            Self::Nautical => display_round(mps_to_fpm(mps)),
        }
    }

    #[must_use]
    pub fn altitude_unit(self) -> &'static str {
        match self {
            Self::Metric => "m",
            Self::Nautical => "ft",
        }
    }

    #[must_use]
    pub fn speed_unit(self) -> &'static str {
        match self {
            Self::Metric => "km/h",
            Self::Nautical => "kts",
        }
    }

    #[must_use]
    pub fn vertical_rate_unit(self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Nautical => "fpm",
        }
    }

    #[must_use]
    pub fn format_altitude(self, meters: f64) -> String {
        format!("{:.0} {}", self.altitude(meters), self.altitude_unit())
    }

    #[must_use]
    pub fn format_speed(self, mps: f64) -> String {
        format!("{:.0} {}", self.speed(mps), self.speed_unit())
    }

    #[must_use]
    pub fn format_vertical_rate(self, mps: f64) -> String {
        format!("{:.0} {}", self.vertical_rate(mps), self.vertical_rate_unit())
    }
}

/// Heading for display, normalized into `0..360`.
#[must_use]
pub fn format_heading(degrees: f64) -> String {
    let normalized = display_round(degrees).rem_euclid(360.0);
    format!("{normalized:.0}°")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_round_trips() {
        for x in [0.0, 1.0, 250.5, 10668.0, -12.75] {
            assert_close(meters_to_feet(feet_to_meters(x)), x);
            assert_close(mps_to_knots(knots_to_mps(x)), x);
            assert_close(mps_to_kmh(kmh_to_mps(x)), x);
            assert_close(mps_to_fpm(fpm_to_mps(x)), x);
        }
    }

    #[test]
    fn test_nautical_formatting() {
        let units = UnitSystem::Nautical;
        assert_eq!(units.format_altitude(10668.0), "35000 ft");
        assert_eq!(units.format_speed(231.5), "450 kts");
        assert_eq!(units.format_vertical_rate(6.1), "1201 fpm");
        assert_eq!(units.format_vertical_rate(-0.001), "0 fpm");
    }

    #[test]
    fn test_metric_formatting() {
        let units = UnitSystem::Metric;
        assert_eq!(units.format_altitude(10668.4), "10668 m");
        assert_eq!(units.format_speed(231.5), "833 km/h");
        assert_eq!(units.format_vertical_rate(-6.2), "-6 m/s");
    }

    #[test]
    fn test_heading_wraps() {
        assert_eq!(format_heading(274.4), "274°");
        assert_eq!(format_heading(359.7), "0°");
        assert_eq!(format_heading(-90.0), "270°");
    }
}
