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

//! Visible-subset derivation.

use serde::{Deserialize, Serialize};

use crate::model::AircraftState;

/// User-controlled filter criteria.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Minimum altitude in meters. `0` disables the altitude check.
    pub min_altitude: f64,
    /// Case-insensitive callsign substring. Empty disables the airline check.
    pub airline: String,
}

impl FilterCriteria {
    #[must_use]
    pub fn new(min_altitude: f64, airline: impl Into<String>) -> Self {
        Self {
            min_altitude: min_altitude.max(0.0),
            airline: airline.into(),
        }
    }

    /// Whether any check is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.min_altitude > 0.0 || !self.airline.trim().is_empty()
    }

    /// Test one aircraft against both checks.
    #[must_use]
    pub fn matches(&self, aircraft: &AircraftState) -> bool {
        self.passes_altitude(aircraft) && self.passes_airline(aircraft)
    }

    fn passes_altitude(&self, aircraft: &AircraftState) -> bool {
        self.min_altitude <= 0.0 || aircraft.effective_altitude() >= self.min_altitude
    }

    fn passes_airline(&self, aircraft: &AircraftState) -> bool {
        let needle = self.airline.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        aircraft
            .callsign
            .as_deref()
            .is_some_and(|cs| cs.to_lowercase().contains(&needle))
    }
}

/// Return the aircraft passing `criteria`, in input order.
#[must_use]
pub fn apply_filter(aircraft: &[AircraftState], criteria: &FilterCriteria) -> Vec<AircraftState> {
    aircraft
        .iter()
        .filter(|a| criteria.matches(a))
        .cloned()
        .collect()
}

/// Memoizing wrapper around [`apply_filter`].
///
/// Recomputes only when the fleet generation or the criteria differ from the
/// previous call.
#[derive(Debug, Default)]
pub struct FilterEngine {
    last: Option<(u64, FilterCriteria)>,
    visible: Vec<AircraftState>,
}

impl FilterEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter `aircraft` (identified by `generation`). Returns the visible set
    /// and whether it was recomputed.
    pub fn update(
        &mut self,
        generation: u64,
        aircraft: &[AircraftState],
        criteria: &FilterCriteria,
    ) -> (&[AircraftState], bool) {
        let unchanged = self
            .last
            .as_ref()
            .is_some_and(|(seen, last)| *seen == generation && last == criteria);

        if !unchanged {
            self.visible = apply_filter(aircraft, criteria);
            self.last = Some((generation, criteria.clone()));
        }

        (&self.visible, !unchanged)
    }

    #[must_use]
    pub fn visible(&self) -> &[AircraftState] {
        &self.visible
    }
}
