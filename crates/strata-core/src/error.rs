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

//! Error types for generation dispatch and completion.

use crate::subsystem::SubsystemKind;
use std::fmt::Display;

/// An error produced while executing a generation request.
///
/// Handler failures are recorded on the request and never abort the
/// scheduling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The subsystem handler reported a failure.
    HandlerFailure(String),
    /// The handler dropped its completion channel without sending a result.
    HandlerDropped,
    /// No handler is registered for the targeted subsystem kind.
    SubsystemUnavailable(SubsystemKind),
    /// The targeted subsystem is registered but deactivated.
    SubsystemInactive(SubsystemKind),
    /// The pending request was discarded by load shedding before dispatch.
    Shed,
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::HandlerFailure(msg) => write!(f, "handler failure: {msg}"),
            GenerationError::HandlerDropped => {
                write!(f, "handler dropped the completion channel")
            }
            GenerationError::SubsystemUnavailable(kind) => {
                write!(f, "no handler registered for subsystem {kind}")
            }
            GenerationError::SubsystemInactive(kind) => {
                write!(f, "subsystem {kind} is inactive")
            }
            GenerationError::Shed => write!(f, "discarded by load shedding"),
        }
    }
}

impl std::error::Error for GenerationError {}
