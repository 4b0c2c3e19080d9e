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

//! The process-wide quality scalar and the throttle severity ladder.
//!
//! `QualityLevel` is the single channel through which throttling affects
//! subsystem behavior: one writer (the throttle controller), many readers.
//! The newtype guarantees the scalar is never observed outside `[0, 1]`.

use serde::{Deserialize, Serialize};

/// A quality scalar in `[0.0, 1.0]` controlling how much detail and
/// complexity every subsystem should produce.
///
/// Construction clamps out-of-range input, so any `QualityLevel` value is
/// valid by definition.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityLevel(f32);

impl QualityLevel {
    /// Full quality: no throttling in effect.
    pub const FULL: Self = Self(1.0);

    /// Creates a quality level, clamping the input to `[0.0, 1.0]`.
    ///
    /// Non-finite input carries no usable information and maps to full
    /// quality rather than poisoning the scalar.
    #[inline]
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(1.0)
        }
    }

    /// Returns the raw scalar value.
    #[inline]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Returns `true` if the scalar is exactly `1.0`.
    #[inline]
    pub fn is_full(self) -> bool {
        self.0 >= 1.0
    }
}

impl Default for QualityLevel {
    fn default() -> Self {
        Self::FULL
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A consumer of quality updates pushed by the throttle controller.
///
/// The generation scheduler implements this to scale its concurrency limit
/// and scheduling interval; subsystems receive the same scalar through
/// [`EnvironmentSubsystem::set_quality_level`](crate::subsystem::EnvironmentSubsystem::set_quality_level).
pub trait QualitySink {
    /// Receives the latest quality scalar.
    fn set_quality_level(&mut self, quality: QualityLevel);
}

/// Discrete throttle severity, ordered from healthy to emergency.
///
/// The variant order defines monotonic severity; the controller uses it to
/// decide how aggressively quality is reduced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ThrottleLevel {
    /// All metrics healthy.
    #[default]
    None,
    /// Frame rate slightly below target but otherwise healthy.
    Light,
    /// Average frame rate below minimum or CPU over its ceiling.
    Moderate,
    /// Frame rate and CPU failing together, or memory over its ceiling.
    Heavy,
    /// Instantaneous frame rate below the emergency threshold.
    Emergency,
}

impl ThrottleLevel {
    /// Returns the severity rank (0 = healthy, 4 = emergency).
    #[inline]
    pub fn severity(self) -> u8 {
        self as u8
    }

    /// Returns `true` if any throttling is in effect.
    #[inline]
    pub fn is_throttled(self) -> bool {
        self != ThrottleLevel::None
    }
}

impl std::fmt::Display for ThrottleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
