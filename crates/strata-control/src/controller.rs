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

//! The throttle controller: samples performance once per tick, classifies a
//! throttle level, and adjusts the process-wide quality scalar.
//!
//! The controller is the quality scalar's only writer. Escalation is
//! immediate; recovery is gated behind a cooldown since the last level
//! change plus a comfort margin on every metric, which gives the state
//! machine its hysteresis.

use crate::history::SampleHistory;
use crate::level::{classify, LevelInputs, ThrottleThresholds};
use crate::regression::RegressionDetector;
use strata_core::config::EnvironmentConfig;
use strata_core::quality::{QualityLevel, QualitySink, ThrottleLevel};
use strata_core::registry::SubsystemRegistry;
use strata_core::telemetry::{ThrottleSample, ThrottleSnapshot};

/// Quality target while Light throttling is active.
const LIGHT_QUALITY_TARGET: f32 = 0.75;
/// Quality target while Moderate throttling is active.
const MODERATE_QUALITY_TARGET: f32 = 0.5;
/// Quality target while Heavy throttling is active.
const HEAVY_QUALITY_TARGET: f32 = 0.25;
/// Quality floor snapped to under Emergency throttling.
const EMERGENCY_QUALITY_FLOOR: f32 = 0.1;
/// Fraction of the target frame rate the average must reach before
/// recovery is allowed.
const RECOVERY_FRAME_RATE_MARGIN: f32 = 0.95;
/// Fraction of each ceiling the latest sample must stay under before
/// recovery is allowed.
const RECOVERY_LOAD_MARGIN: f32 = 0.85;
/// Samples included in diagnostics snapshots.
const SNAPSHOT_SAMPLE_COUNT: usize = 20;

/// Raw performance inputs for one tick.
///
/// A missing metric source is substituted with a default rather than
/// failing the sampling tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    /// Frame time of the last frame, in seconds.
    pub frame_time: f32,
    /// Memory usage in megabytes.
    pub memory_mb: f32,
    /// GPU memory usage in megabytes, if reporting is available.
    pub gpu_memory_mb: Option<f32>,
}

/// The outcome of one controller tick.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleDecision {
    /// The throttle level after classification.
    pub level: ThrottleLevel,
    /// The quality scalar after adjustment.
    pub quality: QualityLevel,
    /// `true` exactly when a sustained-regression episode was detected this
    /// tick.
    pub regression_event: bool,
}

/// Converts live performance samples into the quality scalar.
pub struct PerformanceThrottleController {
    thresholds: ThrottleThresholds,
    throttle_step: f32,
    recovery_step: f32,
    recovery_response_time: f32,
    min_history_samples: usize,
    history: SampleHistory,
    regression: RegressionDetector,
    level: ThrottleLevel,
    quality: QualityLevel,
    throttling_active: bool,
    last_throttle_event: Option<f64>,
    clock: f64,
}

impl PerformanceThrottleController {
    /// Creates a controller from the shared configuration.
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            thresholds: ThrottleThresholds::from(config),
            throttle_step: config.throttle_step,
            recovery_step: config.recovery_step,
            recovery_response_time: config.recovery_response_time,
            min_history_samples: config.min_history_samples,
            history: SampleHistory::new(config.sample_history_capacity),
            regression: RegressionDetector::new(
                config.emergency_frame_rate,
                config.regression_frame_threshold,
            ),
            level: ThrottleLevel::None,
            quality: QualityLevel::FULL,
            throttling_active: false,
            last_throttle_event: None,
            clock: 0.0,
        }
    }

    /// The current quality scalar.
    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    /// The current throttle level.
    pub fn level(&self) -> ThrottleLevel {
        self.level
    }

    /// `true` while quality is reduced and not yet fully recovered.
    pub fn is_throttling(&self) -> bool {
        self.throttling_active
    }

    /// Overrides the quality scalar, e.g. when resuming from a saved
    /// session. The value is clamped; a value below 1.0 marks throttling
    /// active so recovery will run.
    pub fn set_quality(&mut self, quality: QualityLevel) {
        self.quality = quality;
        self.throttling_active = !quality.is_full();
    }

    /// Runs one sampling-and-adjustment tick.
    pub fn tick(&mut self, dt: f32, inputs: FrameInputs) -> ThrottleDecision {
        self.clock += f64::from(dt.max(0.0));
        let sample = self.take_sample(inputs);
        self.history.push(sample);

        let regression_event = self.regression.observe(sample.frame_rate);

        if self.history.len() >= self.min_history_samples {
            let level = classify(
                &LevelInputs {
                    instantaneous_frame_rate: sample.frame_rate,
                    average_frame_rate: self.history.average_frame_rate(),
                    cpu_percent: sample.cpu_percent,
                    memory_mb: sample.memory_mb,
                    gpu_memory_mb: sample.gpu_memory_mb,
                },
                &self.thresholds,
            );
            if level != self.level {
                log::info!(
                    "Throttle: Level {} -> {} (fps={:.1}, avg={:.1}, cpu={:.0}%).",
                    self.level,
                    level,
                    sample.frame_rate,
                    self.history.average_frame_rate(),
                    sample.cpu_percent
                );
                self.level = level;
                // A level change, in either direction, restarts the
                // recovery cooldown.
                self.last_throttle_event = Some(self.clock);
            }
            self.adjust_quality(&sample);
        }

        ThrottleDecision {
            level: self.level,
            quality: self.quality,
            regression_event,
        }
    }

    /// Pushes the current scalar to every registered subsystem and to an
    /// additional sink (the generation scheduler).
    pub fn propagate(&self, registry: &mut SubsystemRegistry, sink: &mut dyn QualitySink) {
        registry.set_quality_all(self.quality);
        sink.set_quality_level(self.quality);
    }

    /// Snapshots controller diagnostics.
    pub fn snapshot(&self) -> ThrottleSnapshot {
        ThrottleSnapshot {
            level: self.level,
            quality: self.quality.value(),
            throttling_active: self.throttling_active,
            average_frame_rate: self.history.average_frame_rate(),
            recent_samples: self.history.recent(SNAPSHOT_SAMPLE_COUNT),
        }
    }

    fn take_sample(&self, inputs: FrameInputs) -> ThrottleSample {
        // A non-positive frame time means the source skipped a reading;
        // substitute the target rather than failing the tick.
        let frame_rate = if inputs.frame_time > 0.0 {
            1.0 / inputs.frame_time
        } else {
            self.thresholds.target_frame_rate
        };
        let target_frame_time = 1.0 / self.thresholds.target_frame_rate;
        let cpu_percent = if inputs.frame_time > 0.0 {
            (inputs.frame_time / target_frame_time).clamp(0.0, 1.0) * 100.0
        } else {
            0.0
        };
        ThrottleSample {
            timestamp: self.clock,
            frame_rate,
            cpu_percent,
            memory_mb: inputs.memory_mb.max(0.0),
            gpu_memory_mb: inputs.gpu_memory_mb,
            quality: self.quality.value(),
        }
    }

    fn adjust_quality(&mut self, sample: &ThrottleSample) {
        match self.level {
            ThrottleLevel::None => self.try_recover(sample),
            ThrottleLevel::Emergency => {
                self.throttling_active = true;
                let floored = self.quality.value().min(EMERGENCY_QUALITY_FLOOR);
                if floored < self.quality.value() {
                    log::warn!("Throttle: Emergency, quality snapped to {floored:.2}.");
                }
                self.quality = QualityLevel::new(floored);
            }
            level => {
                self.throttling_active = true;
                let (target, reduction) = match level {
                    ThrottleLevel::Light => (LIGHT_QUALITY_TARGET, self.throttle_step * 0.5),
                    ThrottleLevel::Moderate => (MODERATE_QUALITY_TARGET, self.throttle_step),
                    _ => (HEAVY_QUALITY_TARGET, self.throttle_step * 2.0),
                };
                let current = self.quality.value();
                if current > target {
                    // One step per tick, never past the level's target.
                    let next = (current - reduction).max(target);
                    log::debug!(
                        "Throttle: {} reduces quality {:.2} -> {:.2} (target {:.2}).",
                        level,
                        current,
                        next,
                        target
                    );
                    self.quality = QualityLevel::new(next);
                }
            }
        }
    }

    fn try_recover(&mut self, sample: &ThrottleSample) {
        if self.quality.is_full() {
            return;
        }
        let cooldown_over = self
            .last_throttle_event
            .map(|at| self.clock - at >= f64::from(self.recovery_response_time))
            .unwrap_or(true);
        if !cooldown_over || !self.metrics_comfortable(sample) {
            return;
        }
        let next = (self.quality.value() + self.recovery_step).min(1.0);
        self.quality = QualityLevel::new(next);
        if self.quality.is_full() {
            self.throttling_active = false;
            log::info!("Throttle: Quality fully recovered.");
        } else {
            log::debug!("Throttle: Recovering quality to {:.2}.", next);
        }
    }

    /// Recovery requires every metric comfortably under its limit, not just
    /// barely healthy.
    fn metrics_comfortable(&self, sample: &ThrottleSample) -> bool {
        let fps_ok = self.history.average_frame_rate()
            >= self.thresholds.target_frame_rate * RECOVERY_FRAME_RATE_MARGIN;
        let cpu_ok = sample.cpu_percent <= self.thresholds.max_cpu_percent * RECOVERY_LOAD_MARGIN;
        let memory_ok = sample.memory_mb <= self.thresholds.max_memory_mb * RECOVERY_LOAD_MARGIN;
        let gpu_ok = sample
            .gpu_memory_mb
            .map(|mb| mb <= self.thresholds.max_gpu_memory_mb * RECOVERY_LOAD_MARGIN)
            .unwrap_or(true);
        fps_ok && cpu_ok && memory_ok && gpu_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EnvironmentConfig {
        EnvironmentConfig {
            min_history_samples: 4,
            recovery_response_time: 1.0,
            ..Default::default()
        }
    }

    // Faster than the 60 fps target so the CPU estimate stays under its
    // ceiling; a frame at exactly the target consumes the full budget.
    fn healthy_frame() -> FrameInputs {
        FrameInputs {
            frame_time: 1.0 / 120.0,
            memory_mb: 256.0,
            gpu_memory_mb: Some(128.0),
        }
    }

    fn slow_frame(fps: f32) -> FrameInputs {
        FrameInputs {
            frame_time: 1.0 / fps,
            memory_mb: 256.0,
            gpu_memory_mb: Some(128.0),
        }
    }

    fn run_ticks(
        controller: &mut PerformanceThrottleController,
        inputs: FrameInputs,
        ticks: usize,
    ) -> ThrottleDecision {
        let mut last = controller.tick(0.05, inputs);
        for _ in 1..ticks {
            last = controller.tick(0.05, inputs);
        }
        last
    }

    #[test]
    fn test_no_classification_before_min_history() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        let decision = run_ticks(&mut controller, slow_frame(10.0), 3);
        assert_eq!(decision.level, ThrottleLevel::None);
        assert!(decision.quality.is_full());
    }

    #[test]
    fn test_emergency_snaps_quality_to_floor() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        let decision = run_ticks(&mut controller, slow_frame(10.0), 6);
        assert_eq!(decision.level, ThrottleLevel::Emergency);
        assert!((decision.quality.value() - EMERGENCY_QUALITY_FLOOR).abs() < 1e-6);
        assert!(controller.is_throttling());
    }

    #[test]
    fn test_moderate_reduces_one_step_per_tick() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        // 50 fps: average above the 30 fps minimum, but the CPU estimate
        // saturates, so the classifier lands on Moderate.
        run_ticks(&mut controller, slow_frame(50.0), 4);
        let q_after_first = controller.quality().value();
        assert!((q_after_first - 0.9).abs() < 1e-6);
        controller.tick(0.05, slow_frame(50.0));
        assert!((controller.quality().value() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_reduction_stops_at_level_target() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        run_ticks(&mut controller, slow_frame(50.0), 60);
        assert!((controller.quality().value() - MODERATE_QUALITY_TARGET).abs() < 1e-6);
    }

    #[test]
    fn test_quality_always_in_range() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        let frames = [5.0, 60.0, 12.0, 144.0, 25.0, 31.0, 60.0, 8.0];
        for _ in 0..50 {
            for fps in frames {
                let decision = controller.tick(0.05, slow_frame(fps));
                let q = decision.quality.value();
                assert!((0.0..=1.0).contains(&q), "quality {q} out of range");
            }
        }
    }

    #[test]
    fn test_recovery_waits_for_cooldown() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        run_ticks(&mut controller, slow_frame(10.0), 6);
        assert!(!controller.quality().is_full());
        // Healthy frames, but the level change just happened: within the
        // 1.0s cooldown (ticks are 0.05s), quality must not rise yet.
        let before = controller.quality().value();
        run_ticks(&mut controller, healthy_frame(), 4);
        assert!((controller.quality().value() - before).abs() < 1e-6);
    }

    #[test]
    fn test_recovery_restores_exactly_full_quality() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        controller.set_quality(QualityLevel::new(0.0));
        assert!(controller.is_throttling());
        // Healthy frames well past the cooldown: quality climbs by the
        // recovery step each tick and lands on exactly 1.0.
        run_ticks(&mut controller, healthy_frame(), 400);
        assert_eq!(controller.quality().value(), 1.0);
        assert!(!controller.is_throttling());
    }

    #[test]
    fn test_missing_gpu_metric_does_not_block_recovery() {
        let mut controller = PerformanceThrottleController::new(&test_config());
        controller.set_quality(QualityLevel::new(0.5));
        let inputs = FrameInputs {
            frame_time: 1.0 / 120.0,
            memory_mb: 256.0,
            gpu_memory_mb: None,
        };
        run_ticks(&mut controller, inputs, 200);
        assert!(controller.quality().is_full());
    }

    #[test]
    fn test_regression_signal_fires_once_per_episode() {
        let mut config = test_config();
        config.emergency_frame_rate = 30.0;
        config.regression_frame_threshold = 30;
        let mut controller = PerformanceThrottleController::new(&config);
        let mut events = 0;
        for _ in 0..90 {
            if controller.tick(0.05, slow_frame(25.0)).regression_event {
                events += 1;
            }
        }
        assert_eq!(events, 1);
    }

    #[test]
    fn test_zero_frame_time_substitutes_target() {
        let controller = PerformanceThrottleController::new(&test_config());
        let sample = controller.take_sample(FrameInputs {
            frame_time: 0.0,
            memory_mb: 100.0,
            gpu_memory_mb: None,
        });
        assert_eq!(sample.frame_rate, 60.0);
        assert_eq!(sample.cpu_percent, 0.0);
    }
}
