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

//! Environmental lighting.
//!
//! Lighting parameters (`intensity`, `warmth`) move through the blender.
//! Generation requests register manual-class transitions, zone changes
//! register zone-class ones, and coordination pulses arrive at gameplay
//! priority so they briefly dominate.

use serde_json::json;
use strata_blend::{EffectOrigin, TransitionBlender, TransitionEffect};
use strata_core::config::{EnvironmentConfig, TransitionTuning};
use strata_core::error::GenerationError;
use strata_core::math::Vec3;
use strata_core::quality::QualityLevel;
use strata_core::request::{GenerationRequest, GenerationResult};
use strata_core::subsystem::{
    CoordinationEffect, EnvironmentState, EnvironmentSubsystem, GenerationJob, SubsystemKind,
};

use crate::{numeric_targets, params_position, zone_signature};

/// Baseline cost of an active lighting system.
const BASE_COST: f32 = 0.02;
/// Cost of each running lighting transition.
const COST_PER_TRANSITION: f32 = 0.03;

/// Drives environmental lighting parameters.
pub struct LightingSystem {
    active: bool,
    quality: QualityLevel,
    blender: TransitionBlender,
    manual_tuning: TransitionTuning,
    gameplay_tuning: TransitionTuning,
    zone_tuning: TransitionTuning,
    last_zone: Option<String>,
}

impl LightingSystem {
    /// Creates an inactive lighting system; `initialize` activates it.
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

    /// Current blended light intensity, if any transition has driven it.
    pub fn intensity(&self) -> Option<f32> {
        self.blender.value("intensity")
    }

    /// Current blended color warmth, if any transition has driven it.
    pub fn warmth(&self) -> Option<f32> {
        self.blender.value("warmth")
    }

    fn react_to_zone(&mut self, zone: &str) {
        let signature = zone_signature(zone);
        let mut targets = strata_blend::ParamSet::new();
        targets.insert("intensity".into(), 0.4 + 0.5 * signature);
        targets.insert("warmth".into(), signature);
        log::debug!("Lighting: Zone transition into '{zone}'.");
        self.blender.register_effect(TransitionEffect::from_tuning(
            "zone",
            EffectOrigin::Zone,
            self.zone_tuning,
            targets,
        ));
    }
}

impl Default for LightingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentSubsystem for LightingSystem {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Lighting
    }

    fn initialize(&mut self, config: &EnvironmentConfig) -> anyhow::Result<()> {
        self.manual_tuning = config.manual_transition;
        self.gameplay_tuning = config.gameplay_transition;
        self.zone_tuning = config.zone_transition;
        self.active = true;
        log::info!("Lighting: Initialized.");
        Ok(())
    }

    fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
        let Some(spec) = request.params.get("lighting").and_then(|v| v.as_object()) else {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "lighting request without a lighting parameter object".into(),
            )));
        };
        let targets = numeric_targets(spec);
        if targets.is_empty() {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "lighting request carries no numeric targets".into(),
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
            subsystem: SubsystemKind::Lighting,
            payload: json!({"targets": targets}),
        }))
    }

    fn update_generation(&mut self, dt: f32, env: &EnvironmentState) {
        if env.zone != self.last_zone {
            self.last_zone = env.zone.clone();
            if let Some(zone) = self.last_zone.clone() {
                self.react_to_zone(&zone);
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
        if let CoordinationEffect::LightingPulse { intensity } = effect {
            // Throttled lighting pulses shrink with quality.
            let delta = intensity * self.quality.value();
            let current = self.intensity().unwrap_or(0.0);
            let mut targets = strata_blend::ParamSet::new();
            targets.insert("intensity".into(), (current + delta).clamp(0.0, 1.0));
            self.blender.register_effect(TransitionEffect::from_tuning(
                "coordination:pulse",
                EffectOrigin::Gameplay,
                self.gameplay_tuning,
                targets,
            ));
        }
    }
}
