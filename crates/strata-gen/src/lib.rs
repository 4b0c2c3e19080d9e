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

//! # Strata Gen
//!
//! The generation scheduler: a priority queue of generation requests,
//! admitted under an aggregate cost budget, dispatched to registered
//! subsystems and coordinated across them after success.
//!
//! The scheduler is a [`QualitySink`](strata_core::QualitySink): the
//! throttle controller's quality scalar scales its concurrency limit and
//! admission interval every tick.

#![warn(missing_docs)]

pub mod coordination;
pub mod queue;
pub mod scheduler;

pub use coordination::CoordinationPlanner;
pub use queue::PendingQueue;
pub use scheduler::{GenerationScheduler, PendingRequest, RequestOutcome};
