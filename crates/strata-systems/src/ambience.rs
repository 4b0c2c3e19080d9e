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

//! Ambient audio.
//!
//! The ambience system drives `volume` and `lowpass` through the blender.
//! Coordination nudges shift volume relative to its current value.

use serde_json::json;
use strata_blend::{EffectOrigin, ParamSet, TransitionBlender, TransitionEffect};
use strata_core::config::{EnvironmentConfig, TransitionTuning};
use strata_core::error::GenerationError;
use strata_core::math::Vec3;
use strata_core::quality::QualityLevel;
use strata_core::request::{GenerationRequest, GenerationResult};
use strata_core::subsystem::{
    CoordinationEffect, EnvironmentState, EnvironmentSubsystem, GenerationJob, SubsystemKind,
};

use crate::{numeric_targets, params_position, zone_signature};

/// Baseline cost of an active ambience system.
const BASE_COST: f32 = 0.01;
/// Cost of each running ambience transition.
const COST_PER_TRANSITION: f32 = 0.02;

/// Drives ambient audio parameters.
pub struct AmbienceSystem {
    active: bool,
    quality: QualityLevel,
    blender: TransitionBlender,
    manual_tuning: TransitionTuning,
    gameplay_tuning: TransitionTuning,
    zone_tuning: TransitionTuning,
    last_zone: Option<String>,
}

impl AmbienceSystem {
    /// Creates an inactive ambience system; `initialize` activates it.
    pub fn new() -> Self {
        Self {
            active: false,
            quality: QualityLevel::FULL,
            blender: TransitionBlender::new(),
            manual_tuning: TransitionTuning {
                duration: 1.0,
                priority: 6,
            },
            gameplay_tuning: TransitionTuning {
                duration: 0.8,
                priority: 8,
            },
            zone_tuning: TransitionTuning {
                duration: 2.0,
                priority: 5,
            },
            last_zone: None,
        }
    }

    /// Current blended ambient volume, if any transition has driven it.
    pub fn volume(&self) -> Option<f32> {
        self.blender.value("volume")
    }
}

impl Default for AmbienceSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentSubsystem for AmbienceSystem {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Audio
    }

    fn initialize(&mut self, config: &EnvironmentConfig) -> anyhow::Result<()> {
        self.manual_tuning = config.manual_transition;
        self.gameplay_tuning = config.gameplay_transition;
        self.zone_tuning = config.zone_transition;
        self.active = true;
        log::info!("Ambience: Initialized.");
        Ok(())
    }

    fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
        let Some(spec) = request.params.get("audio").and_then(|v| v.as_object()) else {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "audio request without an audio parameter object".into(),
            )));
        };
        let targets = numeric_targets(spec);
        if targets.is_empty() {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "audio request carries no numeric targets".into(),
            )));
        }
        let mut effect = TransitionEffect::from_tuning(
            format!("request:{}", request.id),
            EffectOrigin::Manual,
            self.manual_tuning,
            targets.clone(),
        );
        if let Some(position) = params_position(spec) {
            effect = effect.at_position(position);
        }
        self.blender.register_effect(effect);
        GenerationJob::ready(Ok(GenerationResult {
            subsystem: SubsystemKind::Audio,
            payload: json!({"targets": targets}),
        }))
    }

    fn update_generation(&mut self, dt: f32, env: &EnvironmentState) {
        if env.zone != self.last_zone {
            self.last_zone = env.zone.clone();
            if let Some(zone) = self.last_zone.as_deref() {
                let signature = zone_signature(zone);
                let mut targets = ParamSet::new();
                targets.insert("volume".into(), 0.3 + 0.5 * signature);
                targets.insert("lowpass".into(), 1.0 - 0.5 * signature);
                log::debug!("Ambience: Zone transition into '{zone}'.");
                self.blender.register_effect(TransitionEffect::from_tuning(
                    "zone",
                    EffectOrigin::Zone,
                    self.zone_tuning,
                    targets,
                ));
            }
        }
        self.blender.update(dt);
    }

    fn cleanup_distant_content(&mut self, distance: f32, reference: Vec3) {
        self.blender.cleanup_distant(distance, reference);
    }

    fn set_quality_level(&mut self, quality: QualityLevel) {
        self.quality = quality;
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn performance_cost(&self) -> f32 {
        (BASE_COST + self.blender.active_count() as f32 * COST_PER_TRANSITION).min(1.0)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn apply_coordination(&mut self, effect: &CoordinationEffect) {
        if let CoordinationEffect::AmbienceNudge { volume_shift } = effect {
            let shift = volume_shift * self.quality.value();
            let current = self.volume().unwrap_or(0.0);
            let mut targets = ParamSet::new();
            targets.insert("volume".into(), (current + shift).clamp(0.0, 1.0));
            self.blender.register_effect(TransitionEffect::from_tuning(
                "coordination:nudge",
                EffectOrigin::Gameplay,
                self.gameplay_tuning,
                targets,
            ));
        }
    }
}
