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

//! The generation scheduler.
//!
//! Requests enter a priority queue. Each scheduling interval admits pending
//! work until the concurrency limit is reached or the aggregate subsystem
//! cost crosses the admission threshold. Past the shedding threshold the
//! whole pending queue is dropped. The quality scalar pushed by the throttle
//! controller scales both the concurrency limit and the interval.

use crate::coordination::CoordinationPlanner;
use crate::queue::PendingQueue;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::collections::HashMap;
use std::time::Instant;
use strata_core::config::EnvironmentConfig;
use strata_core::error::GenerationError;
use strata_core::quality::{QualityLevel, QualitySink};
use strata_core::registry::SubsystemRegistry;
use strata_core::request::{
    heuristic_priority, GenerationParams, GenerationRequest, GenerationResult, RequestId,
    RequestStatus, URGENT_PRIORITY,
};
use strata_core::subsystem::{GenerationJob, JobPoll, SubsystemKind};
use strata_core::telemetry::SchedulerSnapshot;

/// Quality floor used when scaling the admission interval, so a fully
/// throttled scheduler still makes progress at a quarter rate.
const MIN_INTERVAL_QUALITY: f32 = 0.25;

/// The outcome delivered to a request's [`PendingRequest`] handle.
pub type RequestOutcome = Result<GenerationResult, GenerationError>;

/// A caller-side handle to an enqueued request.
///
/// The handle resolves exactly once, when the request reaches a terminal
/// status (including load shedding).
#[derive(Debug)]
pub struct PendingRequest {
    rx: Receiver<RequestOutcome>,
}

impl PendingRequest {
    /// Non-blocking outcome check.
    ///
    /// Returns `None` while the request is still queued or processing. A
    /// scheduler that was dropped without resolving the request reports
    /// [`GenerationError::HandlerDropped`].
    pub fn try_outcome(&self) -> Option<RequestOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(GenerationError::HandlerDropped)),
        }
    }
}

struct ActiveEntry {
    request: GenerationRequest,
    kind: SubsystemKind,
    job: GenerationJob,
}

/// Priority-ordered scheduler for environmental generation requests.
pub struct GenerationScheduler {
    base_concurrency: usize,
    base_interval: f32,
    admission_cost_threshold: f32,
    shedding_cost_threshold: f32,
    retention_window: f32,
    quality: QualityLevel,
    queue: PendingQueue,
    active: Vec<ActiveEntry>,
    retained: Vec<GenerationRequest>,
    handles: HashMap<RequestId, Sender<RequestOutcome>>,
    planner: CoordinationPlanner,
    interval_timer: f32,
    total_enqueued: u64,
    total_completed: u64,
    total_failed: u64,
    shed_events: u64,
}

impl GenerationScheduler {
    /// Creates a scheduler from the shared configuration.
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            base_concurrency: config.max_concurrent_generations,
            base_interval: config.scheduling_interval,
            admission_cost_threshold: config.admission_cost_threshold,
            shedding_cost_threshold: config.shedding_cost_threshold,
            retention_window: config.retention_window,
            quality: QualityLevel::FULL,
            queue: PendingQueue::new(),
            active: Vec::new(),
            retained: Vec::new(),
            handles: HashMap::new(),
            planner: CoordinationPlanner::new(
                config.coordination_enabled,
                config.coordination_delay,
            ),
            interval_timer: 0.0,
            total_enqueued: 0,
            total_completed: 0,
            total_failed: 0,
            shed_events: 0,
        }
    }

    /// Enqueues a generation request.
    ///
    /// An explicit priority is clamped to `[0, URGENT_PRIORITY]`; without
    /// one the heuristic derives a priority from the parameter map.
    pub fn enqueue(
        &mut self,
        params: GenerationParams,
        priority: Option<i32>,
    ) -> (RequestId, PendingRequest) {
        let priority = priority
            .map(|p| p.clamp(0, URGENT_PRIORITY))
            .unwrap_or_else(|| heuristic_priority(&params));
        let request = GenerationRequest::new(params, priority);
        let id = request.id;
        let (tx, rx) = bounded(1);
        self.handles.insert(id, tx);
        log::debug!(
            "Scheduler: Enqueued {id} (priority {priority}, {} pending).",
            self.queue.len() + 1
        );
        self.queue.push(request);
        self.total_enqueued += 1;
        (id, PendingRequest { rx })
    }

    /// Concurrency limit after quality scaling, never below one.
    pub fn effective_concurrency(&self) -> usize {
        let scaled = (self.base_concurrency as f32 * self.quality.value()).ceil() as usize;
        scaled.max(1)
    }

    /// Admission interval after quality scaling.
    pub fn effective_interval(&self) -> f32 {
        self.base_interval / self.quality.value().max(MIN_INTERVAL_QUALITY)
    }

    /// Looks up the lifecycle status of a request.
    ///
    /// Returns `None` for unknown ids and for terminal requests already
    /// discarded by the retention window.
    pub fn status_of(&self, id: RequestId) -> Option<RequestStatus> {
        if self.queue.contains(id) {
            return Some(RequestStatus::Queued);
        }
        if self.active.iter().any(|e| e.request.id == id) {
            return Some(RequestStatus::Processing);
        }
        self.retained
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    /// Runs one scheduler tick: resolve finished jobs, shed or admit
    /// pending work, fire due coordination steps, and expire retained
    /// requests.
    pub fn update(&mut self, dt: f32, registry: &mut SubsystemRegistry) {
        registry.refresh_costs();
        let cost = registry.aggregate_cost();

        self.poll_active();

        if cost > self.shedding_cost_threshold && !self.queue.is_empty() {
            self.shed(cost);
        }

        self.interval_timer += dt.max(0.0);
        let interval = self.effective_interval();
        while self.interval_timer >= interval {
            self.interval_timer -= interval;
            // Each admission tick fills the free concurrency slots, with the
            // cost re-read after every dispatch so a handler that spikes its
            // own cost stops further admission.
            loop {
                if self.active.len() >= self.effective_concurrency() {
                    break;
                }
                registry.refresh_costs();
                if registry.aggregate_cost() > self.admission_cost_threshold {
                    break;
                }
                let Some(request) = self.queue.pop() else {
                    break;
                };
                self.dispatch(request, registry);
            }
        }

        self.planner.advance(dt, registry);
        self.expire_retained();
    }

    /// Snapshots scheduler diagnostics.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            queue_length: self.queue.len(),
            active_generations: self.active.len(),
            effective_concurrency: self.effective_concurrency(),
            effective_interval: self.effective_interval(),
            total_enqueued: self.total_enqueued,
            total_completed: self.total_completed,
            total_failed: self.total_failed,
            shed_events: self.shed_events,
        }
    }

    fn poll_active(&mut self) {
        let mut i = 0;
        while i < self.active.len() {
            match self.active[i].job.poll() {
                JobPoll::Pending => i += 1,
                JobPoll::Finished(outcome) => {
                    let entry = self.active.swap_remove(i);
                    match outcome {
                        Ok(result) => self.complete(entry.request, entry.kind, result),
                        Err(error) => self.fail(entry.request, error),
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, mut request: GenerationRequest, registry: &mut SubsystemRegistry) {
        let kind = SubsystemKind::for_params(&request.params);
        let Some(handler) = registry.get_mut(kind) else {
            self.fail(request, GenerationError::SubsystemUnavailable(kind));
            return;
        };
        if !handler.is_active() {
            self.fail(request, GenerationError::SubsystemInactive(kind));
            return;
        }
        request.status = RequestStatus::Processing;
        request.dispatched_at = Some(Instant::now());
        log::debug!("Scheduler: Dispatched {} to {kind}.", request.id);
        let job = handler.begin_generation(&request);
        self.active.push(ActiveEntry { request, kind, job });
    }

    fn complete(
        &mut self,
        mut request: GenerationRequest,
        kind: SubsystemKind,
        result: GenerationResult,
    ) {
        request.status = RequestStatus::Completed;
        request.completed_at = Some(Instant::now());
        request.result = Some(result.clone());
        self.total_completed += 1;
        log::debug!("Scheduler: Completed {} ({kind}).", request.id);
        self.resolve(request.id, Ok(result));
        self.planner.schedule(kind);
        self.retained.push(request);
    }

    fn fail(&mut self, mut request: GenerationRequest, error: GenerationError) {
        request.status = RequestStatus::Failed;
        request.completed_at = Some(Instant::now());
        request.error = Some(error.to_string());
        self.total_failed += 1;
        log::debug!("Scheduler: Failed {}: {error}.", request.id);
        self.resolve(request.id, Err(error));
        self.retained.push(request);
    }

    fn resolve(&mut self, id: RequestId, outcome: RequestOutcome) {
        if let Some(tx) = self.handles.remove(&id) {
            // A dropped handle means the caller stopped caring.
            let _ = tx.send(outcome);
        }
    }

    fn shed(&mut self, cost: f32) {
        let drained = self.queue.drain();
        log::warn!(
            "Scheduler: Shedding {} pending requests (aggregate cost {cost:.2}).",
            drained.len()
        );
        self.shed_events += 1;
        for request in drained {
            self.fail(request, GenerationError::Shed);
        }
    }

    fn expire_retained(&mut self) {
        if self.retained.is_empty() {
            return;
        }
        let now = Instant::now();
        let window = self.retention_window;
        self.retained.retain(|request| {
            request
                .terminal_age(now)
                .map(|age| age.as_secs_f32() <= window)
                .unwrap_or(true)
        });
    }
}

impl QualitySink for GenerationScheduler {
    fn set_quality_level(&mut self, quality: QualityLevel) {
        if quality != self.quality {
            log::debug!(
                "Scheduler: Quality {} -> {} (concurrency {}, interval {:.2}s).",
                self.quality,
                quality,
                self.effective_concurrency(),
                self.effective_interval()
            );
        }
        self.quality = quality;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use strata_core::math::Vec3;
    use strata_core::subsystem::{
        EnvironmentState, EnvironmentSubsystem, JobCompletion,
    };

    type DispatchLog = Rc<RefCell<Vec<i32>>>;

    /// Completes every dispatched request within the dispatching tick.
    struct InstantSystem {
        kind: SubsystemKind,
        cost: f32,
        active: bool,
        dispatched: DispatchLog,
    }

    impl InstantSystem {
        fn boxed(kind: SubsystemKind, cost: f32) -> (Box<Self>, DispatchLog) {
            let dispatched = Rc::new(RefCell::new(Vec::new()));
            (
                Box::new(Self {
                    kind,
                    cost,
                    active: true,
                    dispatched: Rc::clone(&dispatched),
                }),
                dispatched,
            )
        }

        fn inactive(kind: SubsystemKind) -> Box<Self> {
            let (mut system, _) = Self::boxed(kind, 0.0);
            system.active = false;
            system
        }
    }

    impl EnvironmentSubsystem for InstantSystem {
        fn kind(&self) -> SubsystemKind {
            self.kind
        }
        fn initialize(&mut self, _config: &EnvironmentConfig) -> anyhow::Result<()> {
            Ok(())
        }
        fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
            self.dispatched.borrow_mut().push(request.priority);
            GenerationJob::ready(Ok(GenerationResult {
                subsystem: self.kind,
                payload: json!({"ok": true}),
            }))
        }
        fn update_generation(&mut self, _dt: f32, _env: &EnvironmentState) {}
        fn cleanup_distant_content(&mut self, _distance: f32, _reference: Vec3) {}
        fn set_quality_level(&mut self, _quality: QualityLevel) {}
        fn set_active(&mut self, active: bool) {
            self.active = active;
        }
        fn performance_cost(&self) -> f32 {
            self.cost
        }
        fn is_active(&self) -> bool {
            self.active
        }
    }

    /// Holds dispatched jobs open until the test resolves them.
    struct ManualSystem {
        kind: SubsystemKind,
        cost: f32,
        completions: Rc<RefCell<Vec<JobCompletion>>>,
        dispatched: DispatchLog,
    }

    impl ManualSystem {
        #[allow(clippy::type_complexity)]
        fn boxed(
            kind: SubsystemKind,
            cost: f32,
        ) -> (Box<Self>, Rc<RefCell<Vec<JobCompletion>>>, DispatchLog) {
            let completions = Rc::new(RefCell::new(Vec::new()));
            let dispatched = Rc::new(RefCell::new(Vec::new()));
            (
                Box::new(Self {
                    kind,
                    cost,
                    completions: Rc::clone(&completions),
                    dispatched: Rc::clone(&dispatched),
                }),
                completions,
                dispatched,
            )
        }
    }

    impl EnvironmentSubsystem for ManualSystem {
        fn kind(&self) -> SubsystemKind {
            self.kind
        }
        fn initialize(&mut self, _config: &EnvironmentConfig) -> anyhow::Result<()> {
            Ok(())
        }
        fn begin_generation(&mut self, request: &GenerationRequest) -> GenerationJob {
            self.dispatched.borrow_mut().push(request.priority);
            let (completion, job) = GenerationJob::pending();
            self.completions.borrow_mut().push(completion);
            job
        }
        fn update_generation(&mut self, _dt: f32, _env: &EnvironmentState) {}
        fn cleanup_distant_content(&mut self, _distance: f32, _reference: Vec3) {}
        fn set_quality_level(&mut self, _quality: QualityLevel) {}
        fn set_active(&mut self, _active: bool) {}
        fn performance_cost(&self) -> f32 {
            self.cost
        }
        fn is_active(&self) -> bool {
            true
        }
    }

    fn layout_params() -> GenerationParams {
        let mut params = GenerationParams::new();
        params.insert("layout".into(), json!({"seed": 1}));
        params
    }

    fn test_config() -> EnvironmentConfig {
        EnvironmentConfig {
            scheduling_interval: 0.25,
            coordination_enabled: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_dispatch_order_follows_priority() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let (system, _completions, dispatched) = ManualSystem::boxed(SubsystemKind::Layout, 0.1);
        registry.register(system);

        scheduler.enqueue(layout_params(), Some(2));
        scheduler.enqueue(layout_params(), Some(9));
        scheduler.enqueue(layout_params(), Some(5));
        for _ in 0..3 {
            scheduler.update(0.25, &mut registry);
        }
        assert_eq!(*dispatched.borrow(), vec![9, 5, 2]);
    }

    #[test]
    fn test_heuristic_priority_applied_when_unspecified() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut params = layout_params();
        params.insert("urgent".into(), json!(true));
        let (id, _handle) = scheduler.enqueue(params, None);
        assert_eq!(scheduler.status_of(id), Some(RequestStatus::Queued));
        // Layout base 7 plus the urgent increment, capped at 10.
        assert_eq!(scheduler.snapshot().queue_length, 1);
    }

    #[test]
    fn test_admission_blocked_above_cost_threshold() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        // Above the 0.8 admission threshold, below the 0.95 shedding one.
        let (system, _completions, dispatched) = ManualSystem::boxed(SubsystemKind::Layout, 0.9);
        registry.register(system);

        scheduler.enqueue(layout_params(), Some(5));
        for _ in 0..4 {
            scheduler.update(0.25, &mut registry);
        }
        assert!(dispatched.borrow().is_empty());
        assert_eq!(scheduler.snapshot().queue_length, 1);
    }

    #[test]
    fn test_shedding_drains_queue_and_resolves_handles() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let (system, _completions, _dispatched) = ManualSystem::boxed(SubsystemKind::Layout, 0.97);
        registry.register(system);

        let (_, first) = scheduler.enqueue(layout_params(), Some(5));
        let (_, second) = scheduler.enqueue(layout_params(), Some(7));
        scheduler.update(0.01, &mut registry);

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.queue_length, 0);
        assert_eq!(snapshot.shed_events, 1);
        assert_eq!(snapshot.total_failed, 2);
        assert!(matches!(first.try_outcome(), Some(Err(GenerationError::Shed))));
        assert!(matches!(second.try_outcome(), Some(Err(GenerationError::Shed))));
    }

    #[test]
    fn test_admission_fills_capacity_within_one_interval() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let (system, _completions, dispatched) = ManualSystem::boxed(SubsystemKind::Layout, 0.1);
        registry.register(system);

        for _ in 0..3 {
            scheduler.enqueue(layout_params(), Some(5));
        }
        // One elapsed interval starts all three: capacity is filled per
        // admission tick, not one request per tick.
        scheduler.update(0.25, &mut registry);
        assert_eq!(dispatched.borrow().len(), 3);
        assert_eq!(scheduler.snapshot().active_generations, 3);
        assert_eq!(scheduler.snapshot().queue_length, 0);
    }

    #[test]
    fn test_concurrency_scales_with_quality() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        assert_eq!(scheduler.effective_concurrency(), 3);
        scheduler.set_quality_level(QualityLevel::new(0.5));
        assert_eq!(scheduler.effective_concurrency(), 2);
        scheduler.set_quality_level(QualityLevel::new(0.0));
        assert_eq!(scheduler.effective_concurrency(), 1);
    }

    #[test]
    fn test_interval_scales_with_quality_floor() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        assert!((scheduler.effective_interval() - 0.25).abs() < 1e-6);
        scheduler.set_quality_level(QualityLevel::new(0.1));
        // The floor keeps the interval at four times the base, not ten.
        assert!((scheduler.effective_interval() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reduced_concurrency_limits_active_jobs() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let (system, _completions, dispatched) = ManualSystem::boxed(SubsystemKind::Layout, 0.1);
        registry.register(system);
        scheduler.set_quality_level(QualityLevel::new(0.5));

        for _ in 0..4 {
            scheduler.enqueue(layout_params(), Some(5));
        }
        for _ in 0..8 {
            scheduler.update(1.0, &mut registry);
        }
        assert_eq!(dispatched.borrow().len(), 2);
        assert_eq!(scheduler.snapshot().active_generations, 2);
    }

    #[test]
    fn test_completion_resolves_handle() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let (system, _dispatched) = InstantSystem::boxed(SubsystemKind::Layout, 0.1);
        registry.register(system);

        let (id, handle) = scheduler.enqueue(layout_params(), Some(5));
        scheduler.update(0.25, &mut registry);
        assert_eq!(scheduler.status_of(id), Some(RequestStatus::Processing));
        scheduler.update(0.01, &mut registry);

        assert_eq!(scheduler.status_of(id), Some(RequestStatus::Completed));
        match handle.try_outcome() {
            Some(Ok(result)) => assert_eq!(result.subsystem, SubsystemKind::Layout),
            other => panic!("expected completed outcome, got {other:?}"),
        }
        assert_eq!(scheduler.snapshot().total_completed, 1);
    }

    #[test]
    fn test_missing_subsystem_fails_request() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        let mut params = GenerationParams::new();
        params.insert("fog".into(), json!({"density": 0.5}));

        let (id, handle) = scheduler.enqueue(params, Some(5));
        scheduler.update(0.25, &mut registry);

        assert_eq!(scheduler.status_of(id), Some(RequestStatus::Failed));
        assert!(matches!(
            handle.try_outcome(),
            Some(Err(GenerationError::SubsystemUnavailable(SubsystemKind::Fog)))
        ));
    }

    #[test]
    fn test_inactive_subsystem_fails_request() {
        let mut scheduler = GenerationScheduler::new(&test_config());
        let mut registry = SubsystemRegistry::new();
        registry.register(InstantSystem::inactive(SubsystemKind::Layout));

        let (_, handle) = scheduler.enqueue(layout_params(), Some(5));
        scheduler.update(0.25, &mut registry);
        assert!(matches!(
            handle.try_outcome(),
            Some(Err(GenerationError::SubsystemInactive(SubsystemKind::Layout)))
        ));
    }

    #[test]
    fn test_retention_window_expires_terminal_requests() {
        let mut config = test_config();
        config.retention_window = 0.0;
        let mut scheduler = GenerationScheduler::new(&config);
        let mut registry = SubsystemRegistry::new();
        let (system, _dispatched) = InstantSystem::boxed(SubsystemKind::Layout, 0.1);
        registry.register(system);

        let (id, _handle) = scheduler.enqueue(layout_params(), Some(5));
        scheduler.update(0.25, &mut registry);
        scheduler.update(0.01, &mut registry);
        // Terminal and past the zero-length window: the next tick drops it.
        scheduler.update(0.01, &mut registry);
        assert_eq!(scheduler.status_of(id), None);
    }

    #[test]
    fn test_unknown_id_has_no_status() {
        let scheduler = GenerationScheduler::new(&test_config());
        assert_eq!(scheduler.status_of(RequestId::new()), None);
    }
}
