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

//! Minimal mathematics primitives for spatial queries and animation curves.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub mod easing;
pub mod vector;

pub use self::easing::cubic_ease_in_out;
pub use self::vector::Vec3;
