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

//! The environment director.
//!
//! One instance owns the registry, the scheduler and the throttle
//! controller; everything advances inside `tick`, so no component needs a
//! lock or its own thread.

use strata_control::{FrameInputs, PerformanceThrottleController, ThrottleDecision};
use strata_core::config::EnvironmentConfig;
use strata_core::quality::QualityLevel;
use strata_core::registry::SubsystemRegistry;
use strata_core::request::{GenerationParams, RequestId, RequestStatus};
use strata_core::subsystem::{EnvironmentState, EnvironmentSubsystem, SubsystemKind};
use strata_core::telemetry::DiagnosticsSnapshot;
use strata_gen::{GenerationScheduler, PendingRequest};

/// Seconds between distance-cleanup passes.
const CLEANUP_PERIOD: f32 = 1.0;

/// Owns and advances the environmental direction core.
pub struct EnvironmentDirector {
    config: EnvironmentConfig,
    registry: SubsystemRegistry,
    scheduler: GenerationScheduler,
    controller: PerformanceThrottleController,
    env: EnvironmentState,
    cleanup_timer: f32,
}

impl EnvironmentDirector {
    /// Creates a director from a configuration, sanitizing it first.
    pub fn new(mut config: EnvironmentConfig) -> Self {
        config.sanitize();
        log::info!(
            "Director: Starting (target {} fps, {} concurrent generations).",
            config.target_frame_rate,
            config.max_concurrent_generations
        );
        Self {
            scheduler: GenerationScheduler::new(&config),
            controller: PerformanceThrottleController::new(&config),
            config,
            registry: SubsystemRegistry::new(),
            env: EnvironmentState::default(),
            cleanup_timer: 0.0,
        }
    }

    /// The sanitized configuration in effect.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// The current quality scalar.
    pub fn quality(&self) -> QualityLevel {
        self.controller.quality()
    }

    /// Initializes and registers a subsystem handler.
    pub fn register_subsystem(
        &mut self,
        mut handler: Box<dyn EnvironmentSubsystem>,
    ) -> anyhow::Result<()> {
        handler.initialize(&self.config)?;
        self.registry.register(handler);
        Ok(())
    }

    /// Removes a subsystem. Unknown kinds are a no-op.
    pub fn unregister_subsystem(&mut self, kind: SubsystemKind) {
        self.registry.unregister(kind);
    }

    /// Enqueues a generation request, routed and prioritized by its
    /// parameter map.
    pub fn request_generation(
        &mut self,
        params: GenerationParams,
        priority: Option<i32>,
    ) -> (RequestId, PendingRequest) {
        self.scheduler.enqueue(params, priority)
    }

    /// Looks up the lifecycle status of a request.
    pub fn request_status(&self, id: RequestId) -> Option<RequestStatus> {
        self.scheduler.status_of(id)
    }

    /// Replaces the driver-side environment inputs (observer position,
    /// speed, zone). `elapsed` is advanced by the director itself.
    pub fn set_environment(&mut self, mut env: EnvironmentState) {
        env.elapsed = self.env.elapsed;
        self.env = env;
    }

    /// Advances the whole core by one frame.
    ///
    /// Order within the tick: performance sampling and quality adjustment,
    /// quality propagation to the registry and scheduler, scheduler
    /// admission and completion, subsystem updates, periodic distance
    /// cleanup.
    pub fn tick(&mut self, dt: f32, inputs: FrameInputs) -> ThrottleDecision {
        let dt = dt.max(0.0);
        self.env.elapsed += dt;

        let decision = self.controller.tick(dt, inputs);
        if decision.regression_event {
            log::warn!("Director: Sustained performance regression detected.");
        }
        self.controller
            .propagate(&mut self.registry, &mut self.scheduler);

        self.scheduler.update(dt, &mut self.registry);
        self.registry.update_all(dt, &self.env);

        self.cleanup_timer += dt;
        if self.cleanup_timer >= CLEANUP_PERIOD {
            self.cleanup_timer -= CLEANUP_PERIOD;
            self.registry
                .cleanup_all(self.config.cleanup_distance, self.env.observer_position);
        }

        // Subsystem updates and cleanup change costs after the scheduler's
        // own refresh; re-read so diagnostics see end-of-tick state.
        self.registry.refresh_costs();
        decision
    }

    /// Snapshots the full diagnostics surface.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            scheduler: self.scheduler.snapshot(),
            throttle: self.controller.snapshot(),
            subsystems: self.registry.snapshot(),
            registered_systems: self.registry.len(),
            aggregate_cost: self.registry.aggregate_cost(),
        }
    }

    /// Replaces the configuration at runtime.
    ///
    /// The new configuration is sanitized and takes effect for scheduling
    /// and throttling immediately; accumulated scheduler and controller
    /// state (queues, sample history) is rebuilt from scratch.
    pub fn update_config(&mut self, mut config: EnvironmentConfig) {
        config.sanitize();
        log::info!("Director: Configuration replaced.");
        self.scheduler = GenerationScheduler::new(&config);
        self.controller = PerformanceThrottleController::new(&config);
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sanitizes_config() {
        let director = EnvironmentDirector::new(EnvironmentConfig {
            max_concurrent_generations: 0,
            generation_distance: -10.0,
            ..Default::default()
        });
        assert_eq!(director.config().max_concurrent_generations, 1);
        assert_eq!(director.config().generation_distance, 0.0);
    }

    #[test]
    fn test_elapsed_survives_environment_replacement() {
        let mut director = EnvironmentDirector::new(EnvironmentConfig::default());
        let inputs = FrameInputs {
            frame_time: 1.0 / 120.0,
            memory_mb: 100.0,
            gpu_memory_mb: None,
        };
        director.tick(0.5, inputs);
        director.set_environment(EnvironmentState {
            zone: Some("cavern".into()),
            ..Default::default()
        });
        director.tick(0.5, inputs);
        // Two half-second ticks: elapsed tracked internally.
        assert!((director.env.elapsed - 1.0).abs() < 1e-6);
    }
}
