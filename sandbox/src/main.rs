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

//! Scripted drive of the direction core: a healthy stretch, a synthetic
//! frame-time spike that forces throttling, then relief and recovery.
//! Diagnostics are printed as JSON at a few checkpoints.

use serde_json::json;
use strata_core::config::EnvironmentConfig;
use strata_core::request::GenerationParams;
use strata_core::subsystem::EnvironmentState;
use strata_runtime::{EnvironmentDirector, FrameInputs};
use strata_systems::{AmbienceSystem, FogSystem, LayoutSystem, LightingSystem};

const TICK: f32 = 1.0 / 60.0;
const TOTAL_TICKS: u32 = 1200;
const SPIKE_START: u32 = 400;
const SPIKE_END: u32 = 600;

fn params(key: &str, spec: serde_json::Value) -> GenerationParams {
    let mut params = GenerationParams::new();
    params.insert(key.to_string(), spec);
    params
}

fn frame_inputs(tick: u32) -> FrameInputs {
    // A 15 fps spike in the middle of the run, healthy 120 fps elsewhere.
    let frame_time = if (SPIKE_START..SPIKE_END).contains(&tick) {
        1.0 / 15.0
    } else {
        1.0 / 120.0
    };
    FrameInputs {
        frame_time,
        memory_mb: 512.0,
        gpu_memory_mb: Some(256.0),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut director = EnvironmentDirector::new(EnvironmentConfig {
        min_history_samples: 5,
        recovery_response_time: 1.0,
        ..Default::default()
    });
    director.register_subsystem(Box::new(LayoutSystem::new()))?;
    director.register_subsystem(Box::new(LightingSystem::new()))?;
    director.register_subsystem(Box::new(FogSystem::new()))?;
    director.register_subsystem(Box::new(AmbienceSystem::new()))?;

    let mut handles = Vec::new();
    for tick in 0..TOTAL_TICKS {
        match tick {
            30 => {
                let spec = json!({"seed": 7, "position": [40.0, 0.0, 0.0]});
                handles.push(director.request_generation(params("layout", spec), None));
            }
            60 => {
                let spec = json!({"density": 0.5});
                handles.push(director.request_generation(params("fog", spec), None));
            }
            90 => {
                let spec = json!({"intensity": 0.8, "warmth": 0.6});
                handles.push(director.request_generation(params("lighting", spec), Some(8)));
            }
            300 => {
                director.set_environment(EnvironmentState {
                    zone: Some("cavern".into()),
                    ..Default::default()
                });
            }
            SPIKE_START => log::info!("Sandbox: Entering synthetic frame-time spike."),
            SPIKE_END => log::info!("Sandbox: Spike relieved."),
            _ => {}
        }

        director.tick(TICK, frame_inputs(tick));

        if tick % 300 == 299 {
            let snapshot = director.diagnostics();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    for (id, handle) in &handles {
        match handle.try_outcome() {
            Some(Ok(result)) => log::info!("Sandbox: {id} completed by {}.", result.subsystem),
            Some(Err(error)) => log::warn!("Sandbox: {id} failed: {error}."),
            None => log::warn!("Sandbox: {id} still unresolved."),
        }
    }
    log::info!(
        "Sandbox: Finished at quality {} after {TOTAL_TICKS} ticks.",
        director.quality()
    );
    Ok(())
}
