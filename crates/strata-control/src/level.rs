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

//! Throttle-level classification from performance metrics.
//!
//! The classifier is a pure threshold cascade evaluated once per sample;
//! hysteresis lives in the controller, which reacts to *level changes*
//! rather than re-deriving state.

use strata_core::config::EnvironmentConfig;
use strata_core::quality::ThrottleLevel;

/// Fraction of the target frame rate below which light throttling engages.
pub const LIGHT_TARGET_FRACTION: f32 = 0.9;

/// The metric ceilings the classifier compares against.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleThresholds {
    /// Target frame rate the simulation is tuned for.
    pub target_frame_rate: f32,
    /// Average frame rate below which throttling escalates.
    pub minimum_frame_rate: f32,
    /// Instantaneous frame rate below which emergency throttling engages.
    pub emergency_frame_rate: f32,
    /// Whether the emergency override is enabled.
    pub emergency_enabled: bool,
    /// Estimated CPU percentage ceiling.
    pub max_cpu_percent: f32,
    /// Memory ceiling in megabytes.
    pub max_memory_mb: f32,
    /// GPU memory ceiling in megabytes.
    pub max_gpu_memory_mb: f32,
}

impl From<&EnvironmentConfig> for ThrottleThresholds {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            target_frame_rate: config.target_frame_rate,
            minimum_frame_rate: config.minimum_frame_rate,
            emergency_frame_rate: config.emergency_frame_rate,
            emergency_enabled: config.emergency_enabled,
            max_cpu_percent: config.max_cpu_percent,
            max_memory_mb: config.max_memory_mb,
            max_gpu_memory_mb: config.max_gpu_memory_mb,
        }
    }
}

/// The metrics a single classification acts on.
#[derive(Debug, Clone, Copy)]
pub struct LevelInputs {
    /// Instantaneous frame rate of the latest sample.
    pub instantaneous_frame_rate: f32,
    /// Rolling average frame rate over the history.
    pub average_frame_rate: f32,
    /// Estimated CPU percentage of the latest sample.
    pub cpu_percent: f32,
    /// Memory usage of the latest sample, in megabytes.
    pub memory_mb: f32,
    /// GPU memory usage, if the source is available.
    pub gpu_memory_mb: Option<f32>,
}

/// Classifies the current metrics into a throttle level.
///
/// Emergency (when enabled) overrides everything else; the remaining levels
/// cascade from Heavy down to None.
pub fn classify(inputs: &LevelInputs, thresholds: &ThrottleThresholds) -> ThrottleLevel {
    if thresholds.emergency_enabled
        && inputs.instantaneous_frame_rate < thresholds.emergency_frame_rate
    {
        return ThrottleLevel::Emergency;
    }

    let low_average = inputs.average_frame_rate < thresholds.minimum_frame_rate;
    let cpu_over = inputs.cpu_percent > thresholds.max_cpu_percent;
    let memory_over = inputs.memory_mb > thresholds.max_memory_mb;
    let gpu_over = inputs
        .gpu_memory_mb
        .map(|mb| mb > thresholds.max_gpu_memory_mb)
        .unwrap_or(false);

    if (low_average && cpu_over) || memory_over || gpu_over {
        return ThrottleLevel::Heavy;
    }
    if low_average || cpu_over {
        return ThrottleLevel::Moderate;
    }
    if inputs.average_frame_rate < thresholds.target_frame_rate * LIGHT_TARGET_FRACTION {
        return ThrottleLevel::Light;
    }
    ThrottleLevel::None
}
