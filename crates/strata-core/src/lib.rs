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

//! # Strata Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the environmental direction architecture.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod math;
pub mod quality;
pub mod registry;
pub mod request;
pub mod subsystem;
pub mod telemetry;

pub use config::EnvironmentConfig;
pub use quality::{QualityLevel, QualitySink, ThrottleLevel};
pub use registry::SubsystemRegistry;
pub use request::{GenerationParams, GenerationRequest, RequestId, RequestStatus};
pub use subsystem::{EnvironmentSubsystem, GenerationJob, SubsystemKind};
