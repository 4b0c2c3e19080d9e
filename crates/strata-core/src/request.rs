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

//! The generation request model.
//!
//! A request is owned exclusively by the scheduler until completion, then
//! retained read-only for a bounded retention window.

use crate::subsystem::SubsystemKind;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The default priority assigned to a request with no explicit value and no
/// heuristic boost.
pub const DEFAULT_PRIORITY: i32 = 5;
/// The priority assigned to urgent requests.
pub const URGENT_PRIORITY: i32 = 10;
/// The base priority of layout generation requests.
pub const LAYOUT_BASE_PRIORITY: i32 = 7;
/// The fixed increment applied when a request carries the `urgent` flag.
pub const URGENT_INCREMENT: i32 = 3;
/// The fixed increment applied when a request is player-triggered.
pub const PLAYER_TRIGGERED_INCREMENT: i32 = 2;

/// An opaque map of generation parameters.
///
/// The scheduler only inspects top-level keys to route requests; the values
/// are interpreted by the target subsystem.
pub type GenerationParams = serde_json::Map<String, serde_json::Value>;

/// A unique identifier for a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle state of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting in the pending queue.
    Queued,
    /// Dispatched to a subsystem handler and running.
    Processing,
    /// Finished successfully; the result is stored on the request.
    Completed,
    /// Finished with an error; the message is stored on the request.
    Failed,
}

impl RequestStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// The handle a subsystem returns on successful generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The subsystem that produced the content.
    pub subsystem: SubsystemKind,
    /// Subsystem-defined description of what was generated.
    pub payload: serde_json::Value,
}

/// A single generation request tracked by the scheduler.
#[derive(Debug)]
pub struct GenerationRequest {
    /// Unique identifier, assigned at enqueue time.
    pub id: RequestId,
    /// Opaque parameter map supplied by the environment driver.
    pub params: GenerationParams,
    /// Effective priority (explicit or heuristic), higher admits first.
    pub priority: i32,
    /// When the request entered the pending queue.
    pub queued_at: Instant,
    /// When the request was dispatched to a handler, if it has been.
    pub dispatched_at: Option<Instant>,
    /// When the request reached a terminal status, if it has.
    pub completed_at: Option<Instant>,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// Result handle, present once `Completed`.
    pub result: Option<GenerationResult>,
    /// Error text, present once `Failed`.
    pub error: Option<String>,
}

impl GenerationRequest {
    /// Creates a queued request with the given parameters and priority.
    pub fn new(params: GenerationParams, priority: i32) -> Self {
        Self {
            id: RequestId::new(),
            params,
            priority,
            queued_at: Instant::now(),
            dispatched_at: None,
            completed_at: None,
            status: RequestStatus::Queued,
            result: None,
            error: None,
        }
    }

    /// Time elapsed since the request reached a terminal status, or `None`
    /// while it is still queued or processing.
    pub fn terminal_age(&self, now: Instant) -> Option<Duration> {
        self.completed_at
            .map(|at| now.saturating_duration_since(at))
    }
}

/// Returns `true` if `params` carries a truthy boolean value under `key`.
pub fn params_flag(params: &GenerationParams, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Computes the heuristic priority for a request without an explicit value.
///
/// Layout requests take a higher base; `urgent` and `player_triggered`
/// flags add fixed increments. The result is clamped to
/// `[0, URGENT_PRIORITY]`.
pub fn heuristic_priority(params: &GenerationParams) -> i32 {
    let mut priority = if params.contains_key("layout") {
        LAYOUT_BASE_PRIORITY
    } else {
        DEFAULT_PRIORITY
    };
    if params_flag(params, "urgent") {
        priority += URGENT_INCREMENT;
    }
    if params_flag(params, "player_triggered") {
        priority += PLAYER_TRIGGERED_INCREMENT;
    }
    priority.clamp(0, URGENT_PRIORITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_with(entries: &[(&str, serde_json::Value)]) -> GenerationParams {
        let mut params = GenerationParams::new();
        for (key, value) in entries {
            params.insert((*key).to_string(), value.clone());
        }
        params
    }

    #[test]
    fn test_default_priority_without_hints() {
        let params = params_with(&[("fog", json!({"density": 0.4}))]);
        assert_eq!(heuristic_priority(&params), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_layout_requests_get_high_base() {
        let params = params_with(&[("layout", json!({"seed": 7}))]);
        assert_eq!(heuristic_priority(&params), LAYOUT_BASE_PRIORITY);
    }

    #[test]
    fn test_urgent_layout_caps_at_urgent_priority() {
        let params = params_with(&[("layout", json!({})), ("urgent", json!(true))]);
        assert_eq!(heuristic_priority(&params), URGENT_PRIORITY);
    }

    #[test]
    fn test_player_triggered_increment() {
        let params = params_with(&[("lighting", json!({})), ("player_triggered", json!(true))]);
        assert_eq!(
            heuristic_priority(&params),
            DEFAULT_PRIORITY + PLAYER_TRIGGERED_INCREMENT
        );
    }

    #[test]
    fn test_non_boolean_flag_is_ignored() {
        let params = params_with(&[("urgent", json!("yes"))]);
        assert_eq!(heuristic_priority(&params), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_new_request_is_queued() {
        let request = GenerationRequest::new(GenerationParams::new(), DEFAULT_PRIORITY);
        assert_eq!(request.status, RequestStatus::Queued);
        assert!(request.result.is_none());
        assert!(request.terminal_age(Instant::now()).is_none());
    }
}
