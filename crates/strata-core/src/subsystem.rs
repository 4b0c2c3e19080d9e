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

//! The contract every generation subsystem handler implements, and the
//! completion-channel boundary between scheduler bookkeeping and handler
//! work.
//!
//! Execution is single-threaded cooperative: a dispatched request suspends
//! until its [`GenerationJob`] resolves, and the scheduler resumes it on a
//! later tick. If a handler chooses to run its work on a real thread, the
//! job's channel is the only boundary that needs to be thread-safe.

use crate::config::EnvironmentConfig;
use crate::error::GenerationError;
use crate::math::Vec3;
use crate::quality::QualityLevel;
use crate::request::{GenerationParams, GenerationRequest, GenerationResult};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};

/// Identifies the environmental subsystem a request is routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SubsystemKind {
    /// Spatial layout generation (the default route).
    Layout,
    /// Environmental lighting.
    Lighting,
    /// Ambient audio.
    Audio,
    /// Volumetric fog.
    Fog,
}

impl SubsystemKind {
    /// All kinds, in routing-precedence order.
    pub const ALL: [SubsystemKind; 4] = [
        SubsystemKind::Layout,
        SubsystemKind::Lighting,
        SubsystemKind::Audio,
        SubsystemKind::Fog,
    ];

    /// Chooses the target subsystem by inspecting which parameter keys are
    /// present. Unrecognized parameter maps fall back to layout.
    pub fn for_params(params: &GenerationParams) -> Self {
        for kind in Self::ALL {
            if params.contains_key(kind.param_key()) {
                return kind;
            }
        }
        SubsystemKind::Layout
    }

    /// The top-level parameter key that routes a request to this kind.
    pub fn param_key(self) -> &'static str {
        match self {
            SubsystemKind::Layout => "layout",
            SubsystemKind::Lighting => "lighting",
            SubsystemKind::Audio => "audio",
            SubsystemKind::Fog => "fog",
        }
    }
}

impl std::fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The environment inputs drivers feed into each tick.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentState {
    /// Reference point for generation and cleanup distances.
    pub observer_position: Vec3,
    /// Observer speed in units per second.
    pub observer_speed: f32,
    /// The zone the observer currently occupies, if any.
    pub zone: Option<String>,
    /// Seconds since the simulation started.
    pub elapsed: f32,
}

/// A coordinated side effect the scheduler triggers on other subsystems
/// after a successful generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinationEffect {
    /// A brief lighting intensity pulse.
    LightingPulse {
        /// Intensity delta applied by the lighting subsystem.
        intensity: f32,
    },
    /// A fog density adjustment.
    FogAdjustment {
        /// Density delta applied by the fog subsystem.
        density_shift: f32,
    },
    /// An ambient audio volume nudge.
    AmbienceNudge {
        /// Volume delta applied by the audio subsystem.
        volume_shift: f32,
    },
}

impl CoordinationEffect {
    /// The subsystem this effect targets.
    pub fn target(&self) -> SubsystemKind {
        match self {
            CoordinationEffect::LightingPulse { .. } => SubsystemKind::Lighting,
            CoordinationEffect::FogAdjustment { .. } => SubsystemKind::Fog,
            CoordinationEffect::AmbienceNudge { .. } => SubsystemKind::Audio,
        }
    }
}

/// The result of polling a [`GenerationJob`].
#[derive(Debug)]
pub enum JobPoll {
    /// The handler has not finished yet.
    Pending,
    /// The handler finished with the contained outcome.
    Finished(Result<GenerationResult, GenerationError>),
}

/// The sending half of a generation job, held by the handler.
///
/// `JobCompletion` is `Send`, so a handler may move it onto a worker thread;
/// this channel is then the only thread-safe boundary in the system.
#[derive(Debug)]
pub struct JobCompletion {
    tx: Sender<Result<GenerationResult, GenerationError>>,
}

impl JobCompletion {
    /// Resolves the job. A disconnected receiver is ignored: the scheduler
    /// may already have shut down.
    pub fn finish(self, outcome: Result<GenerationResult, GenerationError>) {
        let _ = self.tx.send(outcome);
    }
}

/// The receiving half of a dispatched generation, polled by the scheduler
/// once per tick.
#[derive(Debug)]
pub struct GenerationJob {
    rx: Receiver<Result<GenerationResult, GenerationError>>,
}

impl GenerationJob {
    /// Creates a job that resolves when the returned [`JobCompletion`] is
    /// finished.
    pub fn pending() -> (JobCompletion, Self) {
        let (tx, rx) = bounded(1);
        (JobCompletion { tx }, Self { rx })
    }

    /// Creates a job that is already resolved, for handlers that complete
    /// synchronously within the dispatching tick.
    pub fn ready(outcome: Result<GenerationResult, GenerationError>) -> Self {
        let (completion, job) = Self::pending();
        completion.finish(outcome);
        job
    }

    /// Non-blocking completion check.
    ///
    /// A dropped [`JobCompletion`] resolves the job as failed rather than
    /// leaking the concurrency slot forever.
    pub fn poll(&self) -> JobPoll {
        match self.rx.try_recv() {
            Ok(outcome) => JobPoll::Finished(outcome),
            Err(TryRecvError::Empty) => JobPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                JobPoll::Finished(Err(GenerationError::HandlerDropped))
            }
        }
    }
}

/// The interface every generation subsystem handler exposes to the core.
///
/// Implementations live outside the core (layout, lighting, audio, fog);
/// they consume the core's outputs but contain no scheduling logic of their
/// own.
pub trait EnvironmentSubsystem {
    /// The kind this handler serves.
    fn kind(&self) -> SubsystemKind;

    /// Called once at registration with the shared configuration.
    fn initialize(&mut self, config: &EnvironmentConfig) -> anyhow::Result<()>;

    /// Starts generating content for a dispatched request.
    ///
    /// The returned job resolves when the work completes or fails; handlers
    /// that finish inline return [`GenerationJob::ready`].
    fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob;

    /// Advances continuous generation work and transition animation.
    fn update_generation(&mut self, dt: f32, env: &EnvironmentState);

    /// Removes content farther than `distance` from `reference`.
    fn cleanup_distant_content(&mut self, distance: f32, reference: Vec3);

    /// Receives the latest quality scalar from the throttle controller.
    fn set_quality_level(&mut self, quality: QualityLevel);

    /// Activates or deactivates the subsystem.
    fn set_active(&mut self, active: bool);

    /// The subsystem's current contribution to aggregate performance cost,
    /// normalized so that 1.0 saturates the whole budget.
    fn performance_cost(&self) -> f32;

    /// Returns `true` while the subsystem is active.
    fn is_active(&self) -> bool;

    /// Applies a coordinated side effect triggered by another subsystem's
    /// successful generation. Default is a no-op.
    fn apply_coordination(&mut self, effect: &CoordinationEffect) {
        let _ = effect;
    }
}
