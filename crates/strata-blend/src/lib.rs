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

//! # Strata Blend
//!
//! The transition engine: named effects animate sets of scalar parameters
//! toward target values over eased transitions, and concurrent effects are
//! resolved by blending the two highest-priority ones at fixed dominant and
//! secondary weights.

#![warn(missing_docs)]

pub mod blender;
pub mod effect;

pub use blender::{TransitionBlender, DOMINANT_WEIGHT, SECONDARY_WEIGHT};
pub use effect::{EffectOrigin, ParamSet, TransitionEffect};
