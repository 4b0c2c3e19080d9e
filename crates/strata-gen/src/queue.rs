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

//! The pending-request priority queue.
//!
//! Higher priority pops first; requests of equal priority pop in enqueue
//! order. A monotonic sequence number breaks ties, so ordering is total and
//! stable regardless of heap internals.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use strata_core::request::{GenerationRequest, RequestId};

struct QueuedEntry {
    priority: i32,
    seq: u64,
    request: GenerationRequest,
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedEntry {}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: highest priority wins, then the lowest sequence number.
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

/// A priority queue of pending [`GenerationRequest`]s.
#[derive(Default)]
pub struct PendingQueue {
    heap: BinaryHeap<QueuedEntry>,
    next_seq: u64,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a request, ordered by its effective priority.
    pub fn push(&mut self, request: GenerationRequest) {
        let entry = QueuedEntry {
            priority: request.priority,
            seq: self.next_seq,
            request,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Removes and returns the highest-priority request.
    pub fn pop(&mut self) -> Option<GenerationRequest> {
        self.heap.pop().map(|entry| entry.request)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns `true` if a request with the given id is pending.
    pub fn contains(&self, id: RequestId) -> bool {
        self.heap.iter().any(|entry| entry.request.id == id)
    }

    /// Removes every pending request, in no particular order.
    pub fn drain(&mut self) -> Vec<GenerationRequest> {
        self.heap.drain().map(|entry| entry.request).collect()
    }
}
