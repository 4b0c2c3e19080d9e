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

//! Sustained performance-regression detection.
//!
//! A regression episode starts when the frame rate stays below the
//! threshold for a configured number of consecutive frames; the signal
//! fires exactly once per episode, and a single healthy frame ends the
//! episode.

/// Detects sustained sub-threshold frame-rate episodes.
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    threshold_frame_rate: f32,
    frame_threshold: u32,
    consecutive: u32,
    in_episode: bool,
    episodes: u64,
}

impl RegressionDetector {
    /// Creates a detector that fires after `frame_threshold` consecutive
    /// frames below `threshold_frame_rate`.
    pub fn new(threshold_frame_rate: f32, frame_threshold: u32) -> Self {
        Self {
            threshold_frame_rate,
            frame_threshold: frame_threshold.max(1),
            consecutive: 0,
            in_episode: false,
            episodes: 0,
        }
    }

    /// Feeds one frame-rate observation.
    ///
    /// Returns `true` exactly once per sustained episode, at the moment the
    /// consecutive-frame threshold is first crossed.
    pub fn observe(&mut self, frame_rate: f32) -> bool {
        if frame_rate < self.threshold_frame_rate {
            self.consecutive = self.consecutive.saturating_add(1);
            if self.consecutive >= self.frame_threshold && !self.in_episode {
                self.in_episode = true;
                self.episodes += 1;
                log::warn!(
                    "Regression: Frame rate below {:.1} for {} consecutive frames (episode {}).",
                    self.threshold_frame_rate,
                    self.consecutive,
                    self.episodes
                );
                return true;
            }
        } else {
            self.consecutive = 0;
            self.in_episode = false;
        }
        false
    }

    /// Total episodes detected since startup.
    pub fn episode_count(&self) -> u64 {
        self.episodes
    }

    /// Returns `true` while inside a detected episode.
    pub fn in_episode(&self) -> bool {
        self.in_episode
    }
}
