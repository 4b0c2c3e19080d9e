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

//! # Strata Runtime
//!
//! The [`EnvironmentDirector`] owns the whole direction core and advances
//! it with one cooperative tick per frame: performance sampling, quality
//! propagation, generation scheduling, subsystem updates and periodic
//! distance cleanup.

#![warn(missing_docs)]

pub mod director;

pub use director::EnvironmentDirector;
pub use strata_control::FrameInputs;
