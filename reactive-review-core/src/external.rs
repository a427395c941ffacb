//! Interfaces for the external collaborators the core consumes: the
//! semantic index/embedding backend, the LLM provider, and the planner.
//! Each is opaque on purpose — the core only relies on the operations named
//! here, never on a concrete backend's internals. Implemented as `async`
//! traits (static dispatch at the call site via generics on
//! `ReviewOrchestrator`) rather than inheritance over a heap-allocated
//! service-client hierarchy.

use async_trait::async_trait;

use crate::errors::RrcResult;
use crate::model::Plan;

/// One hit from a semantic search over the workspace.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub path: String,
    pub content: String,
    pub lines: (u32, u32),
    pub score: f32,
}

/// Result of a full workspace (re)index.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Options controlling how much context to assemble for a prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub max_chunks: usize,
    pub max_chars: usize,
}

/// Assembled context ready to be spliced into a prompt.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub chunks: Vec<SearchHit>,
    pub text: String,
}

/// The semantic index / embedding backend. Opaque: the core never inspects
/// how results were produced, only consumes them.
#[async_trait]
pub trait ContextBackend: Send + Sync {
    async fn index_workspace(&self) -> RrcResult<IndexReport>;
    async fn semantic_search(&self, query: &str, k: usize) -> RrcResult<Vec<SearchHit>>;
    async fn get_context_for_prompt(&self, query: &str, opts: &PromptOptions) -> RrcResult<Context>;
}

/// The AI/LLM provider. A single opaque operation; may take minutes and may
/// fail transiently — callers are expected to retry per the step execution
/// contract rather than here.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn search_and_ask(&self, search_query: &str, prompt: &str) -> RrcResult<String>;
}

/// Options passed through to `Planner::generate_plan`.
#[derive(Debug, Clone, Default)]
pub struct PlannerOptions {
    pub changed_files: Vec<String>,
    pub max_steps: Option<usize>,
}

/// The planner. Returns a `Plan` whose `depends_on` relations the core MUST
/// sanitize before use — for reactive reviews `depends_on` is cleared to
/// force pure parallelism (§6).
#[async_trait]
pub trait Planner: Send + Sync {
    async fn generate_plan(&self, task_description: &str, opts: &PlannerOptions) -> RrcResult<Plan>;
}

/// Clears every step's `depends_on`/`blocks` so a reactively-generated plan
/// runs as a single parallel group, per the sanitation rule in §6.
pub fn sanitize_for_reactive_review(mut plan: Plan) -> Plan {
    for step in plan.steps.iter_mut() {
        step.depends_on.clear();
        step.blocks.clear();
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Plan, PlanStep, Priority};
    use chrono::Utc;
    use std::collections::BTreeSet;

    #[test]
    fn sanitize_clears_dependencies() {
        let now = Utc::now();
        let plan = Plan {
            id: "p1".into(),
            version: 1,
            created_at: now,
            updated_at: now,
            goal: "g".into(),
            steps: vec![PlanStep {
                step_number: 2,
                id: "s2".into(),
                title: "t".into(),
                description: "d".into(),
                priority: Priority::Medium,
                estimated_effort: None,
                files_to_modify: vec![],
                files_to_create: vec![],
                files_to_delete: vec![],
                depends_on: BTreeSet::from([1]),
                blocks: BTreeSet::new(),
                can_parallel_with: BTreeSet::new(),
            }],
            scope: None,
            risks: None,
            architecture: None,
            testing_strategy: None,
            confidence_score: None,
            context_files: vec![],
            codebase_insights: None,
        };
        let sanitized = sanitize_for_reactive_review(plan);
        assert!(sanitized.steps[0].depends_on.is_empty());
    }
}
