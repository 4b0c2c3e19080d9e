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

//! Transition effect descriptions.

use std::collections::BTreeMap;
use strata_core::config::TransitionTuning;
use strata_core::math::Vec3;

/// The scalar parameters an effect drives, keyed by name.
///
/// A `BTreeMap` keeps iteration deterministic, so blending is reproducible
/// across runs.
pub type ParamSet = BTreeMap<String, f32>;

/// What triggered a transition effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOrigin {
    /// The observer crossed into a new zone.
    Zone,
    /// A gameplay event (combat, scripted moment).
    Gameplay,
    /// Registered directly by a caller.
    Manual,
}

impl EffectOrigin {
    /// The tuning class name in the configuration.
    pub fn class(self) -> &'static str {
        match self {
            EffectOrigin::Zone => "zone",
            EffectOrigin::Gameplay => "gameplay",
            EffectOrigin::Manual => "manual",
        }
    }
}

/// A named transition toward a set of parameter targets.
#[derive(Debug, Clone)]
pub struct TransitionEffect {
    /// Stable identifier; re-registering the same id supersedes the running
    /// transition.
    pub id: String,
    /// What triggered this effect.
    pub origin: EffectOrigin,
    /// Blend priority: higher takes the dominant slot.
    pub priority: i32,
    /// Transition duration in seconds. Non-positive snaps immediately.
    pub duration: f32,
    /// The parameter values this effect drives toward.
    pub targets: ParamSet,
    /// World position of the effect source, if it is spatial. Spatial
    /// effects are subject to distance cleanup.
    pub position: Option<Vec3>,
}

impl TransitionEffect {
    /// Creates an effect with explicit duration and priority.
    pub fn new(
        id: impl Into<String>,
        origin: EffectOrigin,
        duration: f32,
        priority: i32,
        targets: ParamSet,
    ) -> Self {
        Self {
            id: id.into(),
            origin,
            priority,
            duration,
            targets,
            position: None,
        }
    }

    /// Creates an effect tuned by the configured class values.
    pub fn from_tuning(
        id: impl Into<String>,
        origin: EffectOrigin,
        tuning: TransitionTuning,
        targets: ParamSet,
    ) -> Self {
        Self::new(id, origin, tuning.duration, tuning.priority, targets)
    }

    /// Marks the effect as spatial, anchored at `position`.
    pub fn at_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }
}
