// Copyright 2025 the Strata authors
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

//! # Strata Control
//!
//! The performance-adaptive throttle controller: converts live performance
//! samples into a single quality scalar through a hysteretic level state
//! machine, and pushes that scalar to every registered subsystem.

#![warn(missing_docs)]

pub mod controller;
pub mod history;
pub mod level;
pub mod regression;

pub use controller::{FrameInputs, PerformanceThrottleController, ThrottleDecision};
pub use history::SampleHistory;
pub use level::ThrottleThresholds;
pub use regression::RegressionDetector;
