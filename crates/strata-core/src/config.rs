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

//! The configuration surface consumed by the core.
//!
//! All values are supplied at initialization and may be changed at runtime
//! through the director. Invalid values are clamped during sanitization,
//! never raised as errors: callers must not see an exception from these
//! paths.

use serde::{Deserialize, Serialize};

/// Duration and priority for one class of transition effects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionTuning {
    /// Transition duration in seconds.
    pub duration: f32,
    /// Blend priority of effects in this class.
    pub priority: i32,
}

/// The full configuration surface for the direction core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Radius within which content is generated, in world units.
    pub generation_distance: f32,
    /// Radius beyond which content and spatial effects are discarded.
    pub cleanup_distance: f32,

    /// Maximum generations running concurrently at full quality.
    pub max_concurrent_generations: usize,
    /// Aggregate performance cost above which no new work is admitted.
    pub admission_cost_threshold: f32,
    /// Aggregate performance cost above which the pending queue is shed.
    pub shedding_cost_threshold: f32,
    /// Seconds between admission ticks at full quality.
    pub scheduling_interval: f32,
    /// Seconds a terminal request is retained before cleanup.
    pub retention_window: f32,
    /// Enables coordinated post-generation side effects.
    pub coordination_enabled: bool,
    /// Seconds separating consecutive coordination steps.
    pub coordination_delay: f32,

    /// Target frame rate the simulation is tuned for.
    pub target_frame_rate: f32,
    /// Average frame rate below which throttling escalates.
    pub minimum_frame_rate: f32,
    /// Instantaneous frame rate below which emergency throttling engages.
    pub emergency_frame_rate: f32,
    /// Enables the emergency override level.
    pub emergency_enabled: bool,
    /// Estimated CPU percentage ceiling.
    pub max_cpu_percent: f32,
    /// Memory ceiling in megabytes.
    pub max_memory_mb: f32,
    /// GPU memory ceiling in megabytes.
    pub max_gpu_memory_mb: f32,
    /// Base quality reduction applied per throttled tick.
    pub throttle_step: f32,
    /// Quality recovered per healthy tick once the cooldown has elapsed.
    pub recovery_step: f32,
    /// Cooldown in seconds after the last throttle event before recovery.
    pub recovery_response_time: f32,
    /// Samples required before the classifier acts.
    pub min_history_samples: usize,
    /// Bounded capacity of the performance sample history.
    pub sample_history_capacity: usize,
    /// Consecutive sub-emergency frames that raise a regression signal.
    pub regression_frame_threshold: u32,

    /// Tuning for zone-driven transitions.
    pub zone_transition: TransitionTuning,
    /// Tuning for gameplay-driven transitions.
    pub gameplay_transition: TransitionTuning,
    /// Tuning for manually registered transitions.
    pub manual_transition: TransitionTuning,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            generation_distance: 120.0,
            cleanup_distance: 160.0,
            max_concurrent_generations: 3,
            admission_cost_threshold: 0.8,
            shedding_cost_threshold: 0.95,
            scheduling_interval: 0.25,
            retention_window: 30.0,
            coordination_enabled: true,
            coordination_delay: 0.35,
            target_frame_rate: 60.0,
            minimum_frame_rate: 30.0,
            emergency_frame_rate: 20.0,
            emergency_enabled: true,
            max_cpu_percent: 85.0,
            max_memory_mb: 1024.0,
            max_gpu_memory_mb: 768.0,
            throttle_step: 0.1,
            recovery_step: 0.05,
            recovery_response_time: 5.0,
            min_history_samples: 10,
            sample_history_capacity: 120,
            regression_frame_threshold: 30,
            zone_transition: TransitionTuning {
                duration: 2.0,
                priority: 5,
            },
            gameplay_transition: TransitionTuning {
                duration: 0.8,
                priority: 8,
            },
            manual_transition: TransitionTuning {
                duration: 1.0,
                priority: 6,
            },
        }
    }
}

impl EnvironmentConfig {
    /// Clamps every field into its valid range, logging each correction.
    ///
    /// Negative distances become zero, non-positive intervals fall back to
    /// their defaults, and cost thresholds are forced into `[0, 1]`.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        clamp_non_negative("generation_distance", &mut self.generation_distance);
        clamp_non_negative("cleanup_distance", &mut self.cleanup_distance);
        if self.max_concurrent_generations == 0 {
            log::warn!("Config: max_concurrent_generations 0 raised to 1.");
            self.max_concurrent_generations = 1;
        }
        clamp_unit("admission_cost_threshold", &mut self.admission_cost_threshold);
        clamp_unit("shedding_cost_threshold", &mut self.shedding_cost_threshold);
        clamp_positive(
            "scheduling_interval",
            &mut self.scheduling_interval,
            defaults.scheduling_interval,
        );
        clamp_non_negative("retention_window", &mut self.retention_window);
        clamp_non_negative("coordination_delay", &mut self.coordination_delay);
        clamp_positive(
            "target_frame_rate",
            &mut self.target_frame_rate,
            defaults.target_frame_rate,
        );
        clamp_positive(
            "minimum_frame_rate",
            &mut self.minimum_frame_rate,
            defaults.minimum_frame_rate,
        );
        clamp_positive(
            "emergency_frame_rate",
            &mut self.emergency_frame_rate,
            defaults.emergency_frame_rate,
        );
        clamp_positive(
            "max_cpu_percent",
            &mut self.max_cpu_percent,
            defaults.max_cpu_percent,
        );
        clamp_positive(
            "max_memory_mb",
            &mut self.max_memory_mb,
            defaults.max_memory_mb,
        );
        clamp_positive(
            "max_gpu_memory_mb",
            &mut self.max_gpu_memory_mb,
            defaults.max_gpu_memory_mb,
        );
        clamp_unit("throttle_step", &mut self.throttle_step);
        clamp_unit("recovery_step", &mut self.recovery_step);
        clamp_non_negative("recovery_response_time", &mut self.recovery_response_time);
        if self.sample_history_capacity == 0 {
            log::warn!("Config: sample_history_capacity 0 raised to 1.");
            self.sample_history_capacity = 1;
        }
        if self.min_history_samples > self.sample_history_capacity {
            log::warn!(
                "Config: min_history_samples {} exceeds history capacity {}; lowered.",
                self.min_history_samples,
                self.sample_history_capacity
            );
            self.min_history_samples = self.sample_history_capacity;
        }
        // Transition durations may legitimately be <= 0: that requests an
        // immediate snap rather than an animation.
    }

    /// Parses a configuration from JSON and sanitizes it.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.sanitize();
        Ok(config)
    }

    /// Returns the transition tuning for a known effect class name, falling
    /// back to the manual class for unknown names.
    pub fn transition_tuning(&self, class: &str) -> TransitionTuning {
        match class {
            "zone" => self.zone_transition,
            "gameplay" => self.gameplay_transition,
            _ => self.manual_transition,
        }
    }
}

fn clamp_non_negative(name: &str, value: &mut f32) {
    if !value.is_finite() || *value < 0.0 {
        log::warn!("Config: {name} {value} clamped to 0.");
        *value = 0.0;
    }
}

fn clamp_positive(name: &str, value: &mut f32, fallback: f32) {
    if !value.is_finite() || *value <= 0.0 {
        log::warn!("Config: {name} {value} replaced by default {fallback}.");
        *value = fallback;
    }
}

fn clamp_unit(name: &str, value: &mut f32) {
    if !value.is_finite() {
        log::warn!("Config: {name} non-finite, reset to 1.");
        *value = 1.0;
    } else if *value < 0.0 || *value > 1.0 {
        let clamped = value.clamp(0.0, 1.0);
        log::warn!("Config: {name} {value} clamped to {clamped}.");
        *value = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_survive_sanitize_unchanged() {
        let mut config = EnvironmentConfig::default();
        let before = format!("{config:?}");
        config.sanitize();
        assert_eq!(before, format!("{config:?}"));
    }

    #[test]
    fn test_negative_distances_clamp_to_zero() {
        let mut config = EnvironmentConfig {
            generation_distance: -5.0,
            cleanup_distance: -1.0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.generation_distance, 0.0);
        assert_eq!(config.cleanup_distance, 0.0);
    }

    #[test]
    fn test_zero_concurrency_raised_to_one() {
        let mut config = EnvironmentConfig {
            max_concurrent_generations: 0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.max_concurrent_generations, 1);
    }

    #[test]
    fn test_out_of_range_thresholds_clamped() {
        let mut config = EnvironmentConfig {
            admission_cost_threshold: 1.7,
            shedding_cost_threshold: -0.2,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.admission_cost_threshold, 1.0);
        assert_eq!(config.shedding_cost_threshold, 0.0);
    }

    #[test]
    fn test_non_positive_interval_falls_back() {
        let mut config = EnvironmentConfig {
            scheduling_interval: 0.0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(
            config.scheduling_interval,
            EnvironmentConfig::default().scheduling_interval
        );
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let config =
            EnvironmentConfig::from_json(r#"{"target_frame_rate": 30.0}"#).expect("valid json");
        assert_eq!(config.target_frame_rate, 30.0);
        assert_eq!(
            config.max_memory_mb,
            EnvironmentConfig::default().max_memory_mb
        );
    }

    #[test]
    fn test_transition_tuning_lookup() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.transition_tuning("gameplay").priority, 8);
        assert_eq!(
            config.transition_tuning("unknown").priority,
            config.manual_transition.priority
        );
    }
}
