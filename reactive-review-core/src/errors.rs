//! Crate-wide error hierarchy for reactive-review-core.
//!
//! Mirrors the shape used across the mr-ai-backend workspace: a single root
//! `Error` that downstream callers match on via `?`, with component-scoped
//! sub-enums wired in through `#[from]`/`#[error(transparent)]` so each
//! component's error surface stays legible on its own.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type RrcResult<T> = Result<T, Error>;

/// Root error type for reactive-review-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: missing argument, malformed cache key, cyclic plan.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown plan, version, or session.
    #[error("not found: {0}")]
    NotFound(String),

    /// `save` without `overwrite` against a known plan id.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Illegal state transition (pause outside executing, resume outside paused, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A step or session exceeded its timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Durable store (PlanStore/HistoryStore) I/O or serialization failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Plan-shape validation failure (cycles, dangling dependencies).
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Step execution failure not covered by a more specific variant.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Catch-all for conditions that don't fit a more specific variant.
    #[error("other error: {0}")]
    Other(String),
}

/// PlanStore / HistoryStore persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("plan not found: {0}")]
    NotFound(String),

    #[error("plan already exists: {0}")]
    AlreadyExists(String),
}

/// DependencyAnalyzer / plan validation errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cyclic dependency graph detected")]
    Cycle,

    #[error("step {0} depends on unknown step {1}")]
    DanglingDependency(u32, u32),
}

/// ExecutionTracker / step execution errors.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unknown plan execution state: {0}")]
    UnknownPlan(String),

    #[error("unknown step {0} in plan {1}")]
    UnknownStep(u32, String),

    #[error("step {0} timed out after {1} ms")]
    StepTimeout(u32, u64),

    #[error("step {0} failed: {1}")]
    StepFailed(u32, String),

    #[error("worker task panicked: {0}")]
    Join(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Store(StoreError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(StoreError::Serde(e))
    }
}
