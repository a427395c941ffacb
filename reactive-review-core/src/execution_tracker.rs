//! `ExecutionTracker` (C5): a per-plan step state machine plus the bounded
//! parallel execution loop that drives a user-supplied step executor.
//!
//! One `PlanExecutionState` per `plan_id`, guarded by its own `Mutex` inside
//! a `DashMap` so unrelated plans never contend. `execute_ready_parallel`
//! only ever holds that lock for bookkeeping, never across an await on the
//! executor or the worker pool — long-running calls must not hold it (§5).

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::{Error, ExecutionError, RrcResult};
use crate::model::{Plan, Priority, StepExecutionRecord, StepOutcome, StepStatus};

struct PlanExecutionState {
    steps: HashMap<u32, StepExecutionRecord>,
    depends_on: HashMap<u32, BTreeSet<u32>>,
    dependents: HashMap<u32, BTreeSet<u32>>,
    priority: HashMap<u32, Priority>,
    ready_steps: BTreeSet<u32>,
    current_steps: BTreeSet<u32>,
    completed_steps: Vec<u32>,
    aborted: bool,
    last_accessed: Instant,
}

impl PlanExecutionState {
    fn from_plan(plan: &Plan) -> Self {
        let mut steps = HashMap::new();
        let mut depends_on = HashMap::new();
        let mut dependents: HashMap<u32, BTreeSet<u32>> = HashMap::new();
        let mut priority = HashMap::new();
        let mut ready_steps = BTreeSet::new();

        for step in &plan.steps {
            steps.insert(step.step_number, StepExecutionRecord::new(step.step_number));
            depends_on.insert(step.step_number, step.depends_on.clone());
            priority.insert(step.step_number, step.priority);
            dependents.entry(step.step_number).or_default();
            for &dep in &step.depends_on {
                dependents.entry(dep).or_default().insert(step.step_number);
            }
        }

        for step in &plan.steps {
            if step.depends_on.is_empty() {
                ready_steps.insert(step.step_number);
                steps.get_mut(&step.step_number).unwrap().status = StepStatus::Ready;
            }
        }

        Self {
            steps,
            depends_on,
            dependents,
            priority,
            ready_steps,
            current_steps: BTreeSet::new(),
            completed_steps: Vec::new(),
            aborted: false,
            last_accessed: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    fn is_settled(&self) -> bool {
        self.ready_steps.is_empty() && self.current_steps.is_empty()
    }

    fn select_batch(&self, slots: usize, restrict: Option<&std::collections::HashSet<u32>>) -> Vec<u32> {
        let mut candidates: Vec<u32> = self
            .ready_steps
            .iter()
            .copied()
            .filter(|n| restrict.map(|r| r.contains(n)).unwrap_or(true))
            .collect();
        candidates.sort_by_key(|n| (self.priority.get(n).copied().unwrap_or(Priority::Low), *n));
        candidates.truncate(slots);
        candidates
    }

    fn mark_completed_and_unlock(&mut self, n: u32) {
        self.completed_steps.push(n);
        self.current_steps.remove(&n);
        if let Some(children) = self.dependents.get(&n).cloned() {
            for child in children {
                let deps_done = self.depends_on[&child]
                    .iter()
                    .all(|d| matches!(self.steps.get(d).map(|r| r.status), Some(StepStatus::Completed)));
                if deps_done {
                    if let Some(record) = self.steps.get_mut(&child) {
                        if record.status == StepStatus::Pending {
                            record.status = StepStatus::Ready;
                            self.ready_steps.insert(child);
                        }
                    }
                }
            }
        }
    }

    fn skip_transitively(&mut self, n: u32) {
        let mut stack = vec![n];
        while let Some(cur) = stack.pop() {
            if let Some(children) = self.dependents.get(&cur).cloned() {
                for child in children {
                    self.ready_steps.remove(&child);
                    self.current_steps.remove(&child);
                    if let Some(record) = self.steps.get_mut(&child) {
                        if !matches!(record.status, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped) {
                            record.status = StepStatus::Skipped;
                            record.completed_at = Some(Utc::now());
                            stack.push(child);
                        }
                    }
                }
            }
        }
    }
}

/// Snapshot returned by `get_state`, safe to hand to callers without
/// exposing the tracker's internal locking.
#[derive(Debug, Clone)]
pub struct ExecutionStateView {
    pub plan_id: String,
    pub ready_steps: Vec<u32>,
    pub current_steps: Vec<u32>,
    pub completed_steps: Vec<u32>,
    pub aborted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f32,
}

pub struct ExecutionTracker {
    states: DashMap<String, Mutex<PlanExecutionState>>,
    retention: Duration,
    capacity: usize,
}

impl ExecutionTracker {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            states: DashMap::new(),
            retention,
            capacity,
        }
    }

    fn with_state<T>(&self, plan_id: &str, f: impl FnOnce(&mut PlanExecutionState) -> T) -> RrcResult<T> {
        let entry = self
            .states
            .get(plan_id)
            .ok_or_else(|| Error::Execution(ExecutionError::UnknownPlan(plan_id.to_string())))?;
        let mut guard = entry.lock().expect("execution state lock poisoned");
        guard.touch();
        Ok(f(&mut guard))
    }

    pub fn initialize(&self, plan: &Plan) -> ExecutionStateView {
        let state = PlanExecutionState::from_plan(plan);
        let view = ExecutionStateView {
            plan_id: plan.id.clone(),
            ready_steps: state.ready_steps.iter().copied().collect(),
            current_steps: vec![],
            completed_steps: vec![],
            aborted: false,
        };
        self.states.insert(plan.id.clone(), Mutex::new(state));
        view
    }

    pub fn start_step(&self, plan_id: &str, n: u32) -> RrcResult<StepExecutionRecord> {
        self.with_state(plan_id, |state| {
            let status = state
                .steps
                .get(&n)
                .map(|r| r.status)
                .ok_or_else(|| Error::Execution(ExecutionError::UnknownStep(n, plan_id.to_string())))?;
            if !matches!(status, StepStatus::Ready | StepStatus::Pending) {
                return Err(Error::Conflict(format!(
                    "step {n} cannot start from status {status:?}"
                )));
            }
            state.ready_steps.remove(&n);
            state.current_steps.insert(n);
            let record = state.steps.get_mut(&n).unwrap();
            record.status = StepStatus::InProgress;
            record.started_at = Some(Utc::now());
            Ok(record.clone())
        })?
    }

    pub fn complete_step(&self, plan_id: &str, n: u32) -> RrcResult<StepExecutionRecord> {
        self.with_state(plan_id, |state| {
            if !state.steps.contains_key(&n) {
                return Err(Error::Execution(ExecutionError::UnknownStep(n, plan_id.to_string())));
            }
            let now = Utc::now();
            {
                let record = state.steps.get_mut(&n).unwrap();
                record.status = StepStatus::Completed;
                record.completed_at = Some(now);
                record.duration_ms = record
                    .started_at
                    .map(|s| (now - s).num_milliseconds().max(0) as u64);
            }
            state.mark_completed_and_unlock(n);
            Ok(state.steps[&n].clone())
        })?
    }

    /// Terminal failure. `skip_dependents` cascades `Skipped` to every
    /// transitive dependent that hasn't already settled.
    pub fn fail_step(
        &self,
        plan_id: &str,
        n: u32,
        error: impl Into<String>,
        skip_dependents: bool,
    ) -> RrcResult<StepExecutionRecord> {
        self.with_state(plan_id, |state| {
            if !state.steps.contains_key(&n) {
                return Err(Error::Execution(ExecutionError::UnknownStep(n, plan_id.to_string())));
            }
            let now = Utc::now();
            {
                let record = state.steps.get_mut(&n).unwrap();
                record.status = StepStatus::Failed;
                record.completed_at = Some(now);
                record.error = Some(error.into());
            }
            state.current_steps.remove(&n);
            state.ready_steps.remove(&n);
            if skip_dependents {
                state.skip_transitively(n);
            }
            Ok(state.steps[&n].clone())
        })?
    }

    /// Re-queues a step after a retriable failure: increments `retries` and
    /// returns it to `ready`, without touching dependents.
    fn requeue_step(&self, plan_id: &str, n: u32) -> RrcResult<()> {
        self.with_state(plan_id, |state| {
            state.current_steps.remove(&n);
            if let Some(record) = state.steps.get_mut(&n) {
                record.retries += 1;
                record.status = StepStatus::Ready;
            }
            state.ready_steps.insert(n);
        })
    }

    pub fn get_progress(&self, plan_id: &str) -> RrcResult<Progress> {
        self.with_state(plan_id, |state| {
            let total = state.steps.len();
            let completed = state
                .steps
                .values()
                .filter(|r| matches!(r.status, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped))
                .count();
            let percentage = if total == 0 { 100.0 } else { (completed as f32 / total as f32) * 100.0 };
            Progress { completed, total, percentage }
        })
    }

    pub fn get_state(&self, plan_id: &str) -> Option<ExecutionStateView> {
        let entry = self.states.get(plan_id)?;
        let state = entry.lock().expect("execution state lock poisoned");
        Some(ExecutionStateView {
            plan_id: plan_id.to_string(),
            ready_steps: state.ready_steps.iter().copied().collect(),
            current_steps: state.current_steps.iter().copied().collect(),
            completed_steps: state.completed_steps.clone(),
            aborted: state.aborted,
        })
    }

    pub fn has_state(&self, plan_id: &str) -> bool {
        self.states.contains_key(plan_id)
    }

    pub fn abort(&self, plan_id: &str) -> RrcResult<()> {
        self.with_state(plan_id, |state| state.aborted = true)
    }

    pub fn clear_abort(&self, plan_id: &str) -> RrcResult<()> {
        self.with_state(plan_id, |state| state.aborted = false)
    }

    /// Evicts terminal (settled) plan states whose `last_accessed` exceeds
    /// `retention`, then caps the remainder to `capacity` by evicting the
    /// oldest-accessed terminal states first.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        let stale: Vec<String> = self
            .states
            .iter()
            .filter_map(|entry| {
                let state = entry.value().lock().expect("execution state lock poisoned");
                let settled = state.is_settled();
                let age = state.last_accessed.elapsed();
                (settled && age > self.retention).then(|| entry.key().clone())
            })
            .collect();
        for key in stale {
            self.states.remove(&key);
            removed += 1;
        }

        if self.states.len() > self.capacity {
            let mut terminal: Vec<(String, Instant)> = self
                .states
                .iter()
                .filter_map(|entry| {
                    let state = entry.value().lock().expect("execution state lock poisoned");
                    state.is_settled().then(|| (entry.key().clone(), state.last_accessed))
                })
                .collect();
            terminal.sort_by_key(|(_, t)| *t);
            let overflow = self.states.len().saturating_sub(self.capacity);
            for (key, _) in terminal.into_iter().take(overflow) {
                self.states.remove(&key);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "execution_tracker: cleanup evicted plan states");
        }
        removed
    }

    /// Bounded-worker-pool parallel execution of a plan's steps. Gated by
    /// `breaker`: while open and `breaker.fallback_to_sequential()`, falls
    /// back to running one ready step at a time outside the worker pool.
    pub async fn execute_ready_parallel<F, Fut>(
        &self,
        plan_id: &str,
        breaker: &CircuitBreaker,
        max_workers: usize,
        step_timeout: Duration,
        max_retries: u32,
        executor_fn: F,
    ) -> RrcResult<Vec<StepOutcome>>
    where
        F: Fn(String, u32) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = crate::model::StepResult> + Send + 'static,
    {
        self.execute_subset_parallel(plan_id, None, breaker, max_workers, step_timeout, max_retries, executor_fn)
            .await
    }

    /// Like `execute_ready_parallel`, but when `restrict` is `Some`, only
    /// dispatches steps from that set and returns once every one of them has
    /// settled — other ready steps in the plan are left untouched for a
    /// later call. Used by chunked execution to throttle a reactive plan's
    /// fully-parallel step set into fixed-size batches.
    pub async fn execute_subset_parallel<F, Fut>(
        &self,
        plan_id: &str,
        restrict: Option<&[u32]>,
        breaker: &CircuitBreaker,
        max_workers: usize,
        step_timeout: Duration,
        max_retries: u32,
        executor_fn: F,
    ) -> RrcResult<Vec<StepOutcome>>
    where
        F: Fn(String, u32) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = crate::model::StepResult> + Send + 'static,
    {
        let mut outcomes = Vec::new();
        let mut joinset: JoinSet<(u32, Result<crate::model::StepResult, tokio::time::error::Elapsed>)> =
            JoinSet::new();
        let mut in_flight = 0usize;
        let mut remaining: Option<std::collections::HashSet<u32>> =
            restrict.map(|r| r.iter().copied().collect());

        loop {
            let (aborted, settled) = self.with_state(plan_id, |state| (state.aborted, state.is_settled()))?;
            let done = match &remaining {
                Some(r) => r.is_empty(),
                None => settled,
            };
            if (aborted || done) && in_flight == 0 {
                break;
            }

            let parallel_allowed = breaker.allow();
            let slots = if parallel_allowed {
                max_workers.saturating_sub(in_flight)
            } else if in_flight == 0 && breaker.fallback_to_sequential() {
                1
            } else {
                0
            };

            if slots > 0 && !aborted {
                let batch = self.with_state(plan_id, |state| state.select_batch(slots, remaining.as_ref()))?;
                for n in batch {
                    self.start_step(plan_id, n)?;
                    let fut = executor_fn(plan_id.to_string(), n);
                    joinset.spawn(async move { (n, tokio::time::timeout(step_timeout, fut).await) });
                    in_flight += 1;
                }
            }

            if in_flight == 0 {
                let done = match &remaining {
                    Some(r) => r.is_empty(),
                    None => self.with_state(plan_id, |state| state.is_settled())?,
                };
                if done {
                    break;
                }
                // nothing dispatchable (breaker open with sequential fallback
                // disabled, or the restricted steps aren't ready yet); sleep
                // briefly rather than busy-spinning until the breaker allows
                // work again or a dependency clears.
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }

            let Some(joined) = joinset.join_next().await else {
                break;
            };
            in_flight -= 1;
            let (n, result) = joined.map_err(|e| Error::Execution(ExecutionError::Join(e.to_string())))?;

            match result {
                Ok(step_result) if step_result.success => {
                    let record = self.complete_step(plan_id, n)?;
                    breaker.record_success();
                    if let Some(r) = remaining.as_mut() {
                        r.remove(&n);
                    }
                    outcomes.push(StepOutcome {
                        step_number: n,
                        record,
                        files_modified: step_result.files_modified,
                    });
                }
                Ok(step_result) => {
                    breaker.record_failure();
                    let retries = self.with_state(plan_id, |state| state.steps[&n].retries)?;
                    if retries < max_retries {
                        self.requeue_step(plan_id, n)?;
                        warn!(step = n, retries, "execution_tracker: retrying failed step");
                    } else {
                        let record = self.fail_step(
                            plan_id,
                            n,
                            step_result.error.unwrap_or_else(|| "step failed".to_string()),
                            false,
                        )?;
                        if let Some(r) = remaining.as_mut() {
                            r.remove(&n);
                        }
                        outcomes.push(StepOutcome {
                            step_number: n,
                            record,
                            files_modified: step_result.files_modified,
                        });
                    }
                }
                Err(_elapsed) => {
                    breaker.record_failure();
                    let retries = self.with_state(plan_id, |state| state.steps[&n].retries)?;
                    if retries < max_retries {
                        self.requeue_step(plan_id, n)?;
                        warn!(step = n, retries, "execution_tracker: retrying timed-out step");
                    } else {
                        let record = self.fail_step(
                            plan_id,
                            n,
                            format!("step {n} timed out after {} ms", step_timeout.as_millis()),
                            false,
                        )?;
                        if let Some(r) = remaining.as_mut() {
                            r.remove(&n);
                        }
                        outcomes.push(StepOutcome { step_number: n, record, files_modified: vec![] });
                    }
                }
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::BreakerState;
    use crate::model::{Plan, PlanStep, Priority, StepStatus};
    use std::sync::Arc;

    fn step(n: u32, deps: &[u32]) -> PlanStep {
        PlanStep {
            step_number: n,
            id: format!("s{n}"),
            title: format!("step {n}"),
            description: "desc".into(),
            priority: Priority::Medium,
            estimated_effort: None,
            files_to_modify: vec![],
            files_to_create: vec![],
            files_to_delete: vec![],
            depends_on: deps.iter().copied().collect(),
            blocks: Default::default(),
            can_parallel_with: Default::default(),
        }
    }

    fn plan(steps: Vec<PlanStep>) -> Plan {
        let now = chrono::Utc::now();
        Plan {
            id: "p1".into(),
            version: 1,
            created_at: now,
            updated_at: now,
            goal: "g".into(),
            steps,
            scope: None,
            risks: None,
            architecture: None,
            testing_strategy: None,
            confidence_score: None,
            context_files: vec![],
            codebase_insights: None,
        }
    }

    #[test]
    fn diamond_dag_admits_steps_as_dependencies_clear() {
        let p = plan(vec![step(1, &[]), step(2, &[1]), step(3, &[1]), step(4, &[2, 3])]);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);
        let view = tracker.initialize(&p);
        assert_eq!(view.ready_steps, vec![1]);

        tracker.start_step("p1", 1).unwrap();
        tracker.complete_step("p1", 1).unwrap();
        let state = tracker.get_state("p1").unwrap();
        assert_eq!(state.ready_steps, vec![2, 3]);

        tracker.start_step("p1", 2).unwrap();
        tracker.complete_step("p1", 2).unwrap();
        tracker.start_step("p1", 3).unwrap();
        tracker.complete_step("p1", 3).unwrap();
        let state = tracker.get_state("p1").unwrap();
        assert_eq!(state.ready_steps, vec![4]);

        tracker.start_step("p1", 4).unwrap();
        tracker.complete_step("p1", 4).unwrap();
        let progress = tracker.get_progress("p1").unwrap();
        assert_eq!(progress.percentage, 100.0);
    }

    #[test]
    fn fail_step_with_skip_dependents_cascades() {
        let p = plan(vec![step(1, &[]), step(2, &[1]), step(3, &[2])]);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);
        tracker.initialize(&p);
        tracker.start_step("p1", 1).unwrap();
        tracker.fail_step("p1", 1, "boom", true).unwrap();
        let state = tracker.get_state("p1").unwrap();
        assert!(state.ready_steps.is_empty());
        assert!(state.current_steps.is_empty());
    }

    #[test]
    fn unknown_plan_is_an_error() {
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);
        let err = tracker.start_step("nope", 1).unwrap_err();
        assert!(matches!(err, Error::Execution(ExecutionError::UnknownPlan(_))));
    }

    #[tokio::test]
    async fn execute_ready_parallel_runs_diamond_to_completion() {
        let p = plan(vec![step(1, &[]), step(2, &[1]), step(3, &[1]), step(4, &[2, 3])]);
        let tracker = Arc::new(ExecutionTracker::new(Duration::from_secs(3600), 100));
        tracker.initialize(&p);
        let breaker = CircuitBreaker::new(3, 2, Duration::from_secs(60), true);

        let outcomes = tracker
            .execute_ready_parallel(
                "p1",
                &breaker,
                2,
                Duration::from_secs(5),
                1,
                |_plan_id, _n| async move {
                    crate::model::StepResult {
                        success: true,
                        error: None,
                        files_modified: vec![],
                        tokens_used: 1,
                        findings_count: 0,
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        let progress = tracker.get_progress("p1").unwrap();
        assert_eq!(progress.percentage, 100.0);
    }

    #[tokio::test]
    async fn execute_ready_parallel_retries_then_fails() {
        let p = plan(vec![step(1, &[])]);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);
        tracker.initialize(&p);
        let breaker = CircuitBreaker::new(10, 2, Duration::from_secs(60), true);

        let outcomes = tracker
            .execute_ready_parallel(
                "p1",
                &breaker,
                1,
                Duration::from_secs(5),
                1,
                |_plan_id, _n| async move {
                    crate::model::StepResult {
                        success: false,
                        error: Some("nope".into()),
                        files_modified: vec![],
                        tokens_used: 0,
                        findings_count: 0,
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].record.status, StepStatus::Failed);
        assert_eq!(outcomes[0].record.retries, 1);
    }

    #[tokio::test]
    async fn breaker_open_without_fallback_withholds_dispatch_until_half_open() {
        let p = plan(vec![step(1, &[])]);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);
        tracker.initialize(&p);
        // fallback_to_sequential = false: an open breaker must dispatch
        // nothing, not even one step at a time, until it reaches half-open.
        let breaker = CircuitBreaker::new(1, 2, Duration::from_millis(50), false);
        breaker.record_failure();
        assert_eq!(breaker.state().state, BreakerState::Open);

        let start = Instant::now();
        let outcomes = tracker
            .execute_ready_parallel(
                "p1",
                &breaker,
                2,
                Duration::from_secs(5),
                0,
                |_plan_id, _n| async move {
                    crate::model::StepResult {
                        success: true,
                        error: None,
                        files_modified: vec![],
                        tokens_used: 1,
                        findings_count: 0,
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].record.status, StepStatus::Completed);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
