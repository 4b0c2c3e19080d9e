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

//! The transition blender.
//!
//! At most two effects shape the output at a time: the highest-priority
//! effect at the dominant weight and the runner-up at the secondary weight.
//! Each effect animates from the parameter values that were applied when it
//! was registered, through a cubic ease, to its targets. A finished effect
//! contributes its exact targets once before it is retired, so settled
//! output never misses the endpoint.

use crate::effect::{ParamSet, TransitionEffect};
use strata_core::math::{cubic_ease_in_out, Vec3};

/// Blend weight of the highest-priority effect.
pub const DOMINANT_WEIGHT: f32 = 0.7;
/// Blend weight of the second-highest-priority effect.
pub const SECONDARY_WEIGHT: f32 = 0.3;

struct TransitionTask {
    effect: TransitionEffect,
    /// Applied values captured at registration; keys the blender had never
    /// driven start from zero.
    start: ParamSet,
    elapsed: f32,
    seq: u64,
}

impl TransitionTask {
    fn progress(&self) -> f32 {
        if self.effect.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.effect.duration).min(1.0)
        }
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.effect.duration
    }

    /// The eased current value for `key`, or `None` if this effect does not
    /// drive it.
    fn current(&self, key: &str) -> Option<f32> {
        let target = *self.effect.targets.get(key)?;
        let start = self.start.get(key).copied().unwrap_or(0.0);
        let t = cubic_ease_in_out(self.progress());
        Some(start + (target - start) * t)
    }
}

/// Blends concurrent prioritized transitions into one applied parameter set.
#[derive(Default)]
pub struct TransitionBlender {
    tasks: Vec<TransitionTask>,
    applied: ParamSet,
    next_seq: u64,
}

impl TransitionBlender {
    /// Creates an empty blender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of running transitions.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// The last applied value for `key`, if the blender has ever driven it.
    pub fn value(&self, key: &str) -> Option<f32> {
        self.applied.get(key).copied()
    }

    /// All applied parameter values.
    pub fn applied(&self) -> &ParamSet {
        &self.applied
    }

    /// Registers an effect, superseding any running effect with the same id.
    ///
    /// The transition starts from the currently applied values; a
    /// non-positive duration snaps the targets immediately.
    pub fn register_effect(&mut self, effect: TransitionEffect) {
        if self.remove_effect(&effect.id) {
            log::debug!("Blender: Superseding effect '{}'.", effect.id);
        }
        if effect.duration <= 0.0 {
            log::debug!("Blender: Snapping effect '{}'.", effect.id);
            for (key, value) in &effect.targets {
                self.applied.insert(key.clone(), *value);
            }
            return;
        }
        let start = effect
            .targets
            .keys()
            .map(|key| {
                let from = self.applied.get(key).copied().unwrap_or(0.0);
                (key.clone(), from)
            })
            .collect();
        self.tasks.push(TransitionTask {
            effect,
            start,
            elapsed: 0.0,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Removes a running effect. Unknown ids are a no-op; the applied
    /// values keep their last state.
    pub fn remove_effect(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.effect.id != id);
        self.tasks.len() < before
    }

    /// Advances every transition and re-blends the applied values.
    pub fn update(&mut self, dt: f32) {
        if self.tasks.is_empty() {
            return;
        }
        let dt = dt.max(0.0);
        for task in &mut self.tasks {
            task.elapsed += dt;
        }
        self.blend();
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.finished());
        if self.tasks.len() < before {
            log::debug!("Blender: Retired {} finished effects.", before - self.tasks.len());
        }
    }

    /// Removes spatial effects farther than `distance` from `reference`.
    pub fn cleanup_distant(&mut self, distance: f32, reference: Vec3) {
        let distance = distance.max(0.0);
        let before = self.tasks.len();
        self.tasks.retain(|task| match task.effect.position {
            Some(position) => position.distance(reference) <= distance,
            None => true,
        });
        if self.tasks.len() < before {
            log::debug!(
                "Blender: Discarded {} distant effects.",
                before - self.tasks.len()
            );
        }
    }

    /// Writes the blend of the top-two priority tasks into `applied`.
    ///
    /// Ties go to the most recently registered effect. A key driven by only
    /// one of the two contributes at full weight. Each task contributes its
    /// eased in-flight value rather than its final target, so the applied
    /// state stays continuous while transitions run; once both tasks settle
    /// the result is identical to weighting the targets directly.
    fn blend(&mut self) {
        let (dominant, secondary) = self.top_two();
        let Some(dominant) = dominant else { return };

        let mut next = Vec::new();
        for key in dominant.effect.targets.keys() {
            let top = dominant.current(key).unwrap_or(0.0);
            let value = match secondary.and_then(|s| s.current(key)) {
                Some(second) => DOMINANT_WEIGHT * top + SECONDARY_WEIGHT * second,
                None => top,
            };
            next.push((key.clone(), value));
        }
        if let Some(secondary) = secondary {
            for key in secondary.effect.targets.keys() {
                if !dominant.effect.targets.contains_key(key) {
                    if let Some(value) = secondary.current(key) {
                        next.push((key.clone(), value));
                    }
                }
            }
        }
        for (key, value) in next {
            self.applied.insert(key, value);
        }
    }

    fn top_two(&self) -> (Option<&TransitionTask>, Option<&TransitionTask>) {
        let mut dominant: Option<&TransitionTask> = None;
        let mut secondary: Option<&TransitionTask> = None;
        for task in &self.tasks {
            let rank = (task.effect.priority, task.seq);
            match dominant {
                Some(top) if (top.effect.priority, top.seq) >= rank => {
                    match secondary {
                        Some(second) if (second.effect.priority, second.seq) >= rank => {}
                        _ => secondary = Some(task),
                    }
                }
                _ => {
                    secondary = dominant;
                    dominant = Some(task);
                }
            }
        }
        (dominant, secondary)
    }
}
