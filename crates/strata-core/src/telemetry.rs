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

//! Performance samples and the diagnostics snapshot consumed by an
//! external reporting collaborator. The core produces these; it renders
//! nothing itself.

use crate::quality::ThrottleLevel;
use crate::subsystem::SubsystemKind;
use serde::Serialize;

/// One performance measurement, immutable once created.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThrottleSample {
    /// Seconds since the controller started.
    pub timestamp: f64,
    /// Instantaneous frame rate derived from the sampled frame time.
    pub frame_rate: f32,
    /// Estimated CPU utilization in percent, clamped to `[0, 100]`.
    pub cpu_percent: f32,
    /// Memory usage in megabytes.
    pub memory_mb: f32,
    /// GPU memory usage in megabytes, if the source is available.
    pub gpu_memory_mb: Option<f32>,
    /// The quality scalar in effect when the sample was taken.
    pub quality: f32,
}

/// Scheduler-side diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    /// Requests waiting in the pending queue.
    pub queue_length: usize,
    /// Requests currently dispatched and running.
    pub active_generations: usize,
    /// Effective concurrency limit after quality scaling.
    pub effective_concurrency: usize,
    /// Effective admission interval in seconds after quality scaling.
    pub effective_interval: f32,
    /// Requests enqueued since startup.
    pub total_enqueued: u64,
    /// Requests completed successfully since startup.
    pub total_completed: u64,
    /// Requests failed since startup.
    pub total_failed: u64,
    /// Load-shedding events since startup.
    pub shed_events: u64,
}

/// Throttle-controller-side diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleSnapshot {
    /// Current throttle level.
    pub level: ThrottleLevel,
    /// Current quality scalar.
    pub quality: f32,
    /// `true` while quality is reduced and not yet fully recovered.
    pub throttling_active: bool,
    /// Rolling average frame rate over the sample history.
    pub average_frame_rate: f32,
    /// Most recent performance samples, oldest first.
    pub recent_samples: Vec<ThrottleSample>,
}

/// Per-subsystem diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemSnapshot {
    /// The subsystem kind.
    pub kind: SubsystemKind,
    /// Whether the subsystem is active.
    pub active: bool,
    /// Last observed performance cost.
    pub performance_cost: f32,
    /// Quality scalar last pushed to the subsystem.
    pub quality: f32,
}

/// The full diagnostics snapshot exposed by the director.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Scheduler state.
    pub scheduler: SchedulerSnapshot,
    /// Throttle controller state.
    pub throttle: ThrottleSnapshot,
    /// Per-subsystem state, in registration order.
    pub subsystems: Vec<SubsystemSnapshot>,
    /// Number of registered subsystems.
    pub registered_systems: usize,
    /// Aggregate performance cost across active subsystems.
    pub aggregate_cost: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = DiagnosticsSnapshot {
            scheduler: SchedulerSnapshot {
                queue_length: 2,
                active_generations: 1,
                effective_concurrency: 3,
                effective_interval: 0.25,
                total_enqueued: 10,
                total_completed: 7,
                total_failed: 0,
                shed_events: 0,
            },
            throttle: ThrottleSnapshot {
                level: ThrottleLevel::Light,
                quality: 0.9,
                throttling_active: true,
                average_frame_rate: 52.0,
                recent_samples: vec![],
            },
            subsystems: vec![],
            registered_systems: 0,
            aggregate_cost: 0.0,
        };
        let json = serde_json::to_string(&snapshot).expect("serializable");
        assert!(json.contains("\"level\":\"Light\""));
        assert!(json.contains("\"queue_length\":2"));
    }
}
