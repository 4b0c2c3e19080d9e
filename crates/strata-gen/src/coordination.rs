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

//! Cross-subsystem coordination after successful generations.
//!
//! A completed generation ripples outward: the other subsystems receive
//! small staggered side effects (a lighting pulse, a fog shift, an ambience
//! nudge) so the world reacts as a whole. Steps are scheduled on the
//! planner's clock and applied through the registry when due.

use strata_core::registry::SubsystemRegistry;
use strata_core::subsystem::{CoordinationEffect, SubsystemKind};

/// Intensity delta of the post-generation lighting pulse.
pub const LIGHTING_PULSE_INTENSITY: f32 = 0.25;
/// Density delta of the post-generation fog adjustment.
pub const FOG_DENSITY_SHIFT: f32 = -0.1;
/// Volume delta of the post-generation ambience nudge.
pub const AMBIENCE_VOLUME_SHIFT: f32 = 0.15;
/// Upper bound on outstanding steps; bursts past it are dropped.
const MAX_PENDING_STEPS: usize = 16;

struct PendingStep {
    due_at: f32,
    effect: CoordinationEffect,
}

/// Schedules and applies staggered coordination effects.
pub struct CoordinationPlanner {
    enabled: bool,
    delay: f32,
    clock: f32,
    steps: Vec<PendingStep>,
}

impl CoordinationPlanner {
    /// Creates a planner with the given step delay.
    pub fn new(enabled: bool, delay: f32) -> Self {
        Self {
            enabled,
            delay: delay.max(0.0),
            clock: 0.0,
            steps: Vec::new(),
        }
    }

    /// Number of steps waiting to fire.
    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }

    /// Schedules the coordination ripple for a generation completed by
    /// `source`. The source subsystem is excluded from its own ripple.
    pub fn schedule(&mut self, source: SubsystemKind) {
        if !self.enabled {
            return;
        }
        let effects = [
            CoordinationEffect::LightingPulse {
                intensity: LIGHTING_PULSE_INTENSITY,
            },
            CoordinationEffect::FogAdjustment {
                density_shift: FOG_DENSITY_SHIFT,
            },
            CoordinationEffect::AmbienceNudge {
                volume_shift: AMBIENCE_VOLUME_SHIFT,
            },
        ];
        let mut stagger = 0;
        for effect in effects {
            if effect.target() == source {
                continue;
            }
            if self.steps.len() >= MAX_PENDING_STEPS {
                log::warn!(
                    "Coordination: Step buffer full ({MAX_PENDING_STEPS}); dropping ripple from {source}."
                );
                return;
            }
            stagger += 1;
            self.steps.push(PendingStep {
                due_at: self.clock + stagger as f32 * self.delay,
                effect,
            });
        }
        log::debug!("Coordination: Scheduled ripple from {source} ({stagger} steps).");
    }

    /// Advances the planner clock and applies every due step through the
    /// registry. Steps whose target subsystem is missing are discarded.
    pub fn advance(&mut self, dt: f32, registry: &mut SubsystemRegistry) {
        self.clock += dt.max(0.0);
        let clock = self.clock;
        let mut due = Vec::new();
        self.steps.retain(|step| {
            if step.due_at <= clock {
                due.push(step.effect);
                false
            } else {
                true
            }
        });
        for effect in due {
            if let Some(handler) = registry.get_mut(effect.target()) {
                handler.apply_coordination(&effect);
            }
        }
    }
}
