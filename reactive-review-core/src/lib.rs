//! Reactive Review Core: a stateful, concurrent scheduler that plans,
//! executes, and tracks AI-assisted pull request reviews over a
//! content-addressed cache and a durable plan/history store.
//!
//! The eight components map one-to-one onto this crate's modules:
//! [`cache`] (response cache), [`plan_store`] / [`history_store`]
//! (durable plan state), [`dependency_analyzer`] (DAG derivation),
//! [`execution_tracker`] (step scheduling), [`circuit_breaker`]
//! (failure gating), [`session_manager`] (review lifecycle), and
//! [`orchestrator`], which composes all of the above behind one
//! `ReviewOrchestrator`.

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod dependency_analyzer;
pub mod errors;
pub mod execution_tracker;
pub mod external;
pub mod history_store;
pub mod lru;
pub mod model;
pub mod orchestrator;
pub mod plan_store;
pub mod session_manager;

pub use cache::ResponseCache;
pub use circuit_breaker::{BreakerState, BreakerStateSnapshot, CircuitBreaker};
pub use config::ReactiveReviewConfig;
pub use errors::{Error, RrcResult};
pub use execution_tracker::{ExecutionStateView, ExecutionTracker, Progress};
pub use external::{Context, ContextBackend, IndexReport, LlmClient, Planner, PromptOptions, SearchHit};
pub use history_store::{ChangeType, Diff, GetHistoryOptions, History, HistoryStore, RollbackOptions, RollbackOutcome, VersionRecord};
pub use model::*;
pub use orchestrator::{ReviewOrchestrator, ReviewOrchestratorBuilder, StartOptions};
pub use plan_store::{ListOptions, PlanStore, SaveOptions, SaveOutcome, SortBy};
pub use session_manager::SessionManager;
