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

//! Batch ingestion and deduplication.
//!
//! Each poll produces a fresh [`Fleet`] from the feed's records. Nothing is
//! carried over from the previous cycle: a fleet is replaced wholesale, never
//! merged.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::AircraftState;

/// What to do with records that have no usable position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IngestPolicy {
    /// Drop unpositioned records before they enter the fleet, so totals only
    /// count aircraft that can be drawn.
    #[default]
    PositionedOnly,
    /// Keep unpositioned records; they count toward totals but never reach the map.
    RetainUnpositioned,
}

/// The set of aircraft from one poll, unique by `icao24`.
///
/// Iteration order follows the first appearance of each identity in the
/// source batch. When an identity repeats, the later record replaces the
/// earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    aircraft: Vec<AircraftState>,
    index: HashMap<String, usize>,
}

impl Fleet {
    /// Normalize, validate and deduplicate one batch of raw records.
    #[must_use]
    pub fn ingest<I>(records: I, policy: IngestPolicy) -> Self
    where
        I: IntoIterator<Item = AircraftState>,
    {
        let mut fleet = Self::default();
        let mut dropped = 0usize;
        let mut duplicates = 0usize;

        for mut record in records {
            record.normalize();

            if record.icao24.is_empty() {
                dropped += 1;
                continue;
            }
            if policy == IngestPolicy::PositionedOnly && !record.has_position() {
                dropped += 1;
                continue;
            }

            match fleet.index.get(&record.icao24) {
                Some(&slot) => {
                    fleet.aircraft[slot] = record;
                    duplicates += 1;
                }
                None => {
                    fleet.index.insert(record.icao24.clone(), fleet.aircraft.len());
                    fleet.aircraft.push(record);
                }
            }
        }

        debug!(
            "Ingested {} aircraft ({} dropped, {} duplicates replaced)",
            fleet.aircraft.len(),
            dropped,
            duplicates
        );

        fleet
    }

    /// Number of aircraft, including unpositioned ones when retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    #[must_use]
    pub fn get(&self, icao24: &str) -> Option<&AircraftState> {
        self.index.get(icao24).map(|&slot| &self.aircraft[slot])
    }

    #[must_use]
    pub fn as_slice(&self) -> &[AircraftState] {
        &self.aircraft
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftState> {
        self.aircraft.iter()
    }
}

impl<'a> IntoIterator for &'a Fleet {
    type Item = &'a AircraftState;
    type IntoIter = std::slice::Iter<'a, AircraftState>;

    fn into_iter(self) -> Self::IntoIter {
        self.aircraft.iter()
    }
}
