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

//! Bounded storage for rolling performance samples.

use std::collections::VecDeque;
use strata_core::telemetry::ThrottleSample;

/// A bounded history of [`ThrottleSample`]s, oldest first.
///
/// Pushing beyond capacity evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<ThrottleSample>,
    capacity: usize,
}

impl SampleHistory {
    /// Creates an empty history with the given bound (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest if the buffer is full.
    pub fn push(&mut self, sample: ThrottleSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates samples in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &ThrottleSample> {
        self.samples.iter()
    }

    /// The most recent sample, if any.
    pub fn latest(&self) -> Option<&ThrottleSample> {
        self.samples.back()
    }

    /// Arithmetic mean of the stored frame rates, or 0.0 when empty.
    pub fn average_frame_rate(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.frame_rate).sum::<f32>() / self.samples.len() as f32
    }

    /// Arithmetic mean of the stored CPU estimates, or 0.0 when empty.
    pub fn average_cpu_percent(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.cpu_percent).sum::<f32>() / self.samples.len() as f32
    }

    /// The last `n` samples in chronological order, cloned for snapshots.
    pub fn recent(&self, n: usize) -> Vec<ThrottleSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(frame_rate: f32) -> ThrottleSample {
        ThrottleSample {
            timestamp: 0.0,
            frame_rate,
            cpu_percent: 50.0,
            memory_mb: 256.0,
            gpu_memory_mb: None,
            quality: 1.0,
        }
    }

    #[test]
    fn test_push_evicts_oldest_at_capacity() {
        let mut history = SampleHistory::new(3);
        for fps in [10.0, 20.0, 30.0, 40.0] {
            history.push(sample(fps));
        }
        assert_eq!(history.len(), 3);
        let rates: Vec<f32> = history.iter().map(|s| s.frame_rate).collect();
        assert_eq!(rates, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_average_frame_rate() {
        let mut history = SampleHistory::new(8);
        history.push(sample(30.0));
        history.push(sample(60.0));
        assert_relative_eq!(history.average_frame_rate(), 45.0);
    }

    #[test]
    fn test_empty_history_averages_zero() {
        let history = SampleHistory::new(4);
        assert_eq!(history.average_frame_rate(), 0.0);
        assert_eq!(history.average_cpu_percent(), 0.0);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut history = SampleHistory::new(8);
        for fps in [1.0, 2.0, 3.0, 4.0] {
            history.push(sample(fps));
        }
        let tail = history.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].frame_rate, 3.0);
        assert_eq!(tail[1].frame_rate, 4.0);
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let mut history = SampleHistory::new(0);
        history.push(sample(60.0));
        history.push(sample(30.0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().frame_rate, 30.0);
    }
}
