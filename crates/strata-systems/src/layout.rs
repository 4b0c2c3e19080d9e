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

//! Spatial layout generation.
//!
//! The layout system materializes chunks of walkable space around request
//! positions. Chunk detail scales with the quality scalar; generated chunks
//! are retained until distance cleanup discards them.

use serde_json::json;
use strata_core::config::EnvironmentConfig;
use strata_core::error::GenerationError;
use strata_core::math::Vec3;
use strata_core::quality::QualityLevel;
use strata_core::request::{GenerationRequest, GenerationResult};
use strata_core::subsystem::{
    CoordinationEffect, EnvironmentState, EnvironmentSubsystem, GenerationJob, SubsystemKind,
};

/// Cells per chunk at full quality.
const BASE_CELLS_PER_CHUNK: u32 = 64;
/// Cells per chunk at the quality floor.
const MIN_CELLS_PER_CHUNK: u32 = 8;
/// Cost contribution of one retained chunk.
const COST_PER_CHUNK: f32 = 0.04;

#[derive(Debug)]
struct Chunk {
    id: u64,
    position: Vec3,
    cells: u32,
}

/// Generates and retains spatial layout chunks.
pub struct LayoutSystem {
    active: bool,
    quality: QualityLevel,
    chunks: Vec<Chunk>,
    next_chunk_id: u64,
    generation_distance: f32,
}

impl LayoutSystem {
    /// Creates an inactive-by-default layout system; `initialize` activates
    /// it.
    pub fn new() -> Self {
        Self {
            active: false,
            quality: QualityLevel::FULL,
            chunks: Vec::new(),
            next_chunk_id: 0,
            generation_distance: 0.0,
        }
    }

    /// Number of retained chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn cells_for_quality(&self) -> u32 {
        let scaled = (BASE_CELLS_PER_CHUNK as f32 * self.quality.value()) as u32;
        scaled.max(MIN_CELLS_PER_CHUNK)
    }

    fn request_position(request: &GenerationRequest) -> Option<Vec3> {
        let spec = request.params.get("layout")?.as_object()?;
        let coords = spec.get("position")?.as_array()?;
        if coords.len() != 3 {
            return None;
        }
        let mut xyz = [0.0f32; 3];
        for (slot, value) in xyz.iter_mut().zip(coords) {
            *slot = value.as_f64()? as f32;
        }
        Some(Vec3::new(xyz[0], xyz[1], xyz[2]))
    }
}

impl Default for LayoutSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentSubsystem for LayoutSystem {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Layout
    }

    fn initialize(&mut self, config: &EnvironmentConfig) -> anyhow::Result<()> {
        self.generation_distance = config.generation_distance;
        self.active = true;
        log::info!(
            "Layout: Initialized (generation distance {:.0}).",
            self.generation_distance
        );
        Ok(())
    }

    fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
        let Some(spec) = request.params.get("layout").and_then(|v| v.as_object()) else {
            return GenerationJob::ready(Err(GenerationError::HandlerFailure(
                "layout request without a layout parameter object".into(),
            )));
        };
        let seed = spec.get("seed").and_then(|v| v.as_u64()).unwrap_or(0);
        let position = Self::request_position(request).unwrap_or(Vec3::ZERO);
        let cells = self.cells_for_quality();
        let chunk = Chunk {
            id: self.next_chunk_id,
            position,
            cells,
        };
        self.next_chunk_id += 1;
        log::debug!(
            "Layout: Generated chunk {} ({} cells, seed {seed}).",
            chunk.id,
            chunk.cells
        );
        let payload = json!({
            "chunk_id": chunk.id,
            "cells": chunk.cells,
            "seed": seed,
            "position": [position.x, position.y, position.z],
        });
        self.chunks.push(chunk);
        GenerationJob::ready(Ok(GenerationResult {
            subsystem: SubsystemKind::Layout,
            payload,
        }))
    }

    fn update_generation(&mut self, _dt: f32, _env: &EnvironmentState) {}

    fn cleanup_distant_content(&mut self, distance: f32, reference: Vec3) {
        let before = self.chunks.len();
        self.chunks
            .retain(|chunk| chunk.position.distance(reference) <= distance);
        if self.chunks.len() < before {
            log::debug!("Layout: Discarded {} distant chunks.", before - self.chunks.len());
        }
    }

    fn set_quality_level(&mut self, quality: QualityLevel) {
        self.quality = quality;
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn performance_cost(&self) -> f32 {
        (self.chunks.len() as f32 * COST_PER_CHUNK).min(1.0)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn apply_coordination(&mut self, _effect: &CoordinationEffect) {
        // Layout has no continuous parameters to nudge.
    }
}
