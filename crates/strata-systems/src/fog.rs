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

//! Volumetric fog.
//!
//! A single `density` parameter in `[0, 1]` moves through the blender.
//! Coordination adjustments shift density relative to its current value.

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

/// Baseline cost of an active fog system.
const BASE_COST: f32 = 0.03;
/// Cost of each running fog transition.
const COST_PER_TRANSITION: f32 = 0.02;

/// Drives volumetric fog density.
pub struct FogSystem {
    active: bool,
    quality: QualityLevel,
    blender: TransitionBlender,
    manual_tuning: TransitionTuning,
    gameplay_tuning: TransitionTuning,
    zone_tuning: TransitionTuning,
    last_zone: Option<String>,
}

impl FogSystem {
    /// Creates an inactive fog system; `initialize` activates it.
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

    /// Current blended fog density, if any transition has driven it.
    pub fn density(&self) -> Option<f32> {
        self.blender.value("density")
    }
}

impl Default for FogSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentSubsystem for FogSystem {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Fog
    }

    fn initialize(&mut self, config: &EnvironmentConfig) -> anyhow::Result<()> {
        self.manual_tuning = config.manual_transition;
        self.gameplay_tuning = config.gameplay_transition;
        self.zone_tuning = config.zone_transition;
        self.active = true;
        log::info!("Fog: Initialized.");
        Ok(())
    }

    fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
        let Some(spec) = request.params.get("fog").and_then(|v| v.as_object()) else {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "fog request without a fog parameter object".into(),
            )));
        };
        let targets = numeric_targets(spec);
        if targets.is_empty() {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "fog request carries no numeric targets".into(),
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
            subsystem: SubsystemKind::Fog,
            payload: json!({"targets": targets}),
        }))
    }

    fn update_generation(&mut self, dt: f32, env: &EnvironmentState) {
        if env.zone != self.last_zone {
            self.last_zone = env.zone.clone();
            if let Some(zone) = self.last_zone.as_deref() {
                let mut targets = ParamSet::new();
                targets.insert("density".into(), 0.2 + 0.6 * zone_signature(zone));
                log::debug!("Fog: Zone transition into '{zone}'.");
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
        if let CoordinationEffect::FogAdjustment { density_shift } = effect {
            let shift = density_shift * self.quality.value();
            let current = self.density().unwrap_or(0.0);
            let mut targets = ParamSet::new();
            targets.insert("density".into(), (current + shift).clamp(0.0, 1.0));
            self.blender.register_effect(TransitionEffect::from_tuning(
                "coordination:adjustment",
                EffectOrigin::Gameplay,
                self.gameplay_tuning,
                targets,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::request::GenerationParams;
    use strata_core::subsystem::JobPoll;

    fn initialized() -> FogSystem {
        let mut system = FogSystem::new();
        system
            .initialize(&EnvironmentConfig::default())
            .expect("initialize");
        system
    }

    fn fog_request(density: f32) -> GenerationRequest {
        let mut params = GenerationParams::new();
        params.insert("fog".into(), json!({"density": density}));
        GenerationRequest::new(params, 5)
    }

    #[test]
    fn test_generation_drives_density() {
        let mut system = initialized();
        let job = system.begin_generation(&fog_request(0.6));
        assert!(matches!(job.poll(), JobPoll::Finished(Ok(_))));
        system.update_generation(5.0, &EnvironmentState::default());
        assert!((system.density().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_requests_blend_density() {
        let mut system = initialized();
        // Same manual priority: the newer request takes the dominant slot.
        let _ = system.begin_generation(&fog_request(0.3));
        let _ = system.begin_generation(&fog_request(0.7));
        system.update_generation(5.0, &EnvironmentState::default());
        let settled = system.density().unwrap();
        assert!((settled - (0.7 * 0.7 + 0.3 * 0.3)).abs() < 1e-6);
    }

    #[test]
    fn test_coordination_shift_is_relative() {
        let mut system = initialized();
        let _ = system.begin_generation(&fog_request(0.5));
        system.update_generation(5.0, &EnvironmentState::default());
        system.apply_coordination(&CoordinationEffect::FogAdjustment {
            density_shift: -0.1,
        });
        system.update_generation(5.0, &EnvironmentState::default());
        assert!((system.density().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_zone_change_registers_fog_transition() {
        let mut system = initialized();
        let env = EnvironmentState {
            zone: Some("marsh".into()),
            ..Default::default()
        };
        system.update_generation(5.0, &env);
        let density = system.density().unwrap();
        assert!((0.2..=0.8).contains(&density));
    }

    #[test]
    fn test_inactive_flag_round_trips() {
        let mut system = initialized();
        assert!(system.is_active());
        system.set_active(false);
        assert!(!system.is_active());
    }
}
