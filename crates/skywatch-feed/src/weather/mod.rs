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

//! Weather overlay animation.
//!
//! The frame manifest is fetched once per driver. While the selected layer is
//! enabled the driver advances through the frames on a fixed cadence and
//! publishes the current tile template; turning the layer off pauses the
//! cursor where it is.

mod animator;
pub mod rainviewer;

pub use animator::{
    DriverState, FrameCursor, WeatherAnimator, WeatherConfig, WeatherHandle, WeatherView,
    DEFAULT_CADENCE,
};
pub use rainviewer::{
    ManifestFrame, ManifestSource, ParseLayerError, RadarFrames, RainViewer, WeatherLayer,
    WeatherManifest, ATTRIBUTION, DEFAULT_MANIFEST_URL,
};
