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

//! # Strata Systems
//!
//! Reference implementations of the [`EnvironmentSubsystem`] contract:
//! spatial layout, lighting, volumetric fog and ambient audio. Each system
//! consumes the core's outputs (requests, quality, coordination effects)
//! and drives its parameters through a [`TransitionBlender`]; none of them
//! contains scheduling logic of its own.
//!
//! [`EnvironmentSubsystem`]: strata_core::EnvironmentSubsystem
//! [`TransitionBlender`]: strata_blend::TransitionBlender

#![warn(missing_docs)]

pub mod ambience;
pub mod fog;
pub mod layout;
pub mod lighting;

pub use ambience::AmbienceSystem;
pub use fog::FogSystem;
pub use layout::LayoutSystem;
pub use lighting::LightingSystem;

/// Collects the numeric fields of a request's parameter object into blend
/// targets.
pub(crate) fn numeric_targets(spec: &serde_json::Map<String, serde_json::Value>) -> strata_blend::ParamSet {
    spec.iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v as f32)))
        .collect()
}

/// Reads an optional `[x, y, z]` position array from a parameter object.
pub(crate) fn params_position(
    spec: &serde_json::Map<String, serde_json::Value>,
) -> Option<strata_core::math::Vec3> {
    let coords = spec.get("position")?.as_array()?;
    if coords.len() != 3 {
        return None;
    }
    let mut xyz = [0.0f32; 3];
    for (slot, value) in xyz.iter_mut().zip(coords) {
        *slot = value.as_f64()? as f32;
    }
    Some(strata_core::math::Vec3::new(xyz[0], xyz[1], xyz[2]))
}

/// Derives a stable scalar in `[0, 1]` from a zone name.
///
/// Zone-driven transitions need deterministic per-zone targets without a
/// content database; an FNV-1a hash of the name provides them.
pub(crate) fn zone_signature(zone: &str) -> f32 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in zone.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash % 1000) as f32 / 999.0
}
