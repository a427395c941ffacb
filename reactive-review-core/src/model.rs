//! Data model for the reactive review core: PR metadata, plans and steps,
//! the derived dependency graph, per-step/per-plan runtime state, review
//! sessions, and the three-tuple cache key/result pair.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input to a review: a commit, its base ref, and the files it touched.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrMetadata {
    pub commit_hash: String,
    pub base_ref: String,
    pub changed_files: Vec<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub lines_added: Option<u32>,
    pub lines_removed: Option<u32>,
}

impl PrMetadata {
    /// Builds metadata, deduplicating `changed_files` while preserving order.
    pub fn new(
        commit_hash: impl Into<String>,
        base_ref: impl Into<String>,
        changed_files: Vec<String>,
    ) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(changed_files.len());
        let changed_files = changed_files
            .into_iter()
            .filter(|f| seen.insert(f.clone()))
            .collect();
        Self {
            commit_hash: commit_hash.into(),
            base_ref: base_ref.into(),
            changed_files,
            title: None,
            author: None,
            lines_added: None,
            lines_removed: None,
        }
    }
}

/// Relative priority of a plan step. Declaration order doubles as execution
/// priority (`High < Medium < Low`) so the derived `Ord` sorts "runs first"
/// to the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// How a file participates in a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
}

/// A single file touched by a step, with effort-estimation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub change_type: ChangeType,
    pub estimated_loc: Option<u32>,
    pub complexity: Option<String>,
    pub reason: Option<String>,
}

/// One node in a plan's dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub files_to_modify: Vec<FileRef>,
    #[serde(default)]
    pub files_to_create: Vec<FileRef>,
    #[serde(default)]
    pub files_to_delete: Vec<FileRef>,
    #[serde(default)]
    pub depends_on: BTreeSet<u32>,
    #[serde(default)]
    pub blocks: BTreeSet<u32>,
    #[serde(default)]
    pub can_parallel_with: BTreeSet<u32>,
}

impl PlanStep {
    /// Recomputes `blocks` as the transpose of every step's `depends_on`.
    /// `blocks` is reconstructable, not trusted on load (§3).
    pub fn recompute_blocks(steps: &mut [PlanStep]) {
        let mut blocks: std::collections::HashMap<u32, BTreeSet<u32>> = std::collections::HashMap::new();
        for step in steps.iter() {
            for &dep in &step.depends_on {
                blocks.entry(dep).or_default().insert(step.step_number);
            }
        }
        for step in steps.iter_mut() {
            step.blocks = blocks.remove(&step.step_number).unwrap_or_default();
        }
    }
}

/// A review task description: goal, steps, and optional planner-authored context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub goal: String,
    pub steps: Vec<PlanStep>,
    pub scope: Option<String>,
    pub risks: Option<String>,
    pub architecture: Option<String>,
    pub testing_strategy: Option<String>,
    pub confidence_score: Option<f32>,
    #[serde(default)]
    pub context_files: Vec<String>,
    pub codebase_insights: Option<String>,
}

/// Small projection of a `Plan` for listing/search without loading the full blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub plan_id: String,
    pub name: String,
    pub goal: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub step_count: usize,
    pub file_path: String,
    pub version: u64,
}

/// Graph derived from a plan's steps by `DependencyAnalyzer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<u32>,
    /// `(dependency, dependent)` edges.
    pub edges: Vec<(u32, u32)>,
    pub execution_order: Vec<u32>,
    pub critical_path: Vec<u32>,
    pub parallel_groups: Vec<Vec<u32>>,
}

/// Per-step state machine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Ready,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// Per-step runtime record tracked by `ExecutionTracker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecutionRecord {
    pub step_number: u32,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retries: u32,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl StepExecutionRecord {
    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            retries: 0,
            error: None,
            duration_ms: None,
        }
    }
}

/// Result handed back by a user-supplied step executor.
#[derive(Debug, Clone, Default)]
pub struct StepResult {
    pub success: bool,
    pub error: Option<String>,
    pub files_modified: Vec<String>,
    pub tokens_used: u64,
    pub findings_count: u64,
}

/// One completed (or failed) step as returned from `execute_ready_parallel`.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step_number: u32,
    pub record: StepExecutionRecord,
    pub files_modified: Vec<String>,
}

/// Severity of a single review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// One review comment produced by a step executor for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub line: Option<u32>,
    pub suggestion: Option<String>,
}

/// Which cache layer answered a `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayer {
    Memory,
    Commit,
    FileHash,
}

/// `(commit_hash, file_path, content_hash, step_fingerprint)`. `content_hash`
/// is a 16-hex-digit truncation of SHA-256 over the file content at the
/// commit; `step_fingerprint` is the same over the step's description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub commit_hash: String,
    pub file_path: String,
    pub content_hash: String,
    pub step_fingerprint: String,
}

impl CacheKey {
    /// Builds a key, hashing `file_content` and `step_description` with the
    /// 16-hex-digit truncated SHA-256 scheme described in the spec.
    pub fn new(
        commit_hash: impl Into<String>,
        file_path: impl Into<String>,
        file_content: &str,
        step_description: &str,
    ) -> Self {
        Self {
            commit_hash: commit_hash.into(),
            file_path: file_path.into(),
            content_hash: fingerprint16(file_content),
            step_fingerprint: fingerprint16(step_description),
        }
    }
}

/// 16-hex-digit truncation of a SHA-256 digest over `data`.
pub fn fingerprint16(data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 8) // 8 bytes = 16 hex digits
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{:02x}", b)).collect()
}

/// `(findings, cached_at, source_layer)` as served by `ResponseCache::get`.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub findings: Vec<Finding>,
    pub cached_at: std::time::Instant,
    pub source_layer: SourceLayer,
}

/// `ResponseCache::stats()` output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub memory_hits: u64,
    pub commit_hits: u64,
    pub file_hash_hits: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Status of a `ReviewSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Analyzing,
    Executing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// One PR review: the long-lived handle a caller polls/pauses/resumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub session_id: String,
    pub plan_id: String,
    pub status: SessionStatus,
    pub pr_metadata: PrMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_steps: u32,
    pub current_step: Option<u32>,
    pub error: Option<String>,
}

/// Snapshot returned by `get_review_status`/`get_review_status_async`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStatus {
    pub session_id: String,
    pub status: SessionStatus,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percentage: f32,
    pub current_step: Option<u32>,
    pub error: Option<String>,
}

/// `get_review_telemetry` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub elapsed_ms: u64,
    pub tokens_used: u64,
    pub cache_hit_rate: f64,
    pub last_activity_ms: u64,
    pub appears_stalled: bool,
    pub findings_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_metadata_dedupes_changed_files_preserving_order() {
        let pr = PrMetadata::new(
            "abc123",
            "main",
            vec!["a.rs".into(), "b.rs".into(), "a.rs".into()],
        );
        assert_eq!(pr.changed_files, vec!["a.rs".to_string(), "b.rs".to_string()]);
    }

    #[test]
    fn priority_orders_high_first() {
        let mut v = vec![Priority::Low, Priority::High, Priority::Medium];
        v.sort();
        assert_eq!(v, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn cache_key_fingerprint_is_16_hex_chars() {
        let key = CacheKey::new("c1", "a.rs", "fn main() {}", "check style");
        assert_eq!(key.content_hash.len(), 16);
        assert_eq!(key.step_fingerprint.len(), 16);
        assert!(key.content_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn recompute_blocks_is_transpose_of_depends_on() {
        let mut steps = vec![
            PlanStep {
                step_number: 1,
                id: "s1".into(),
                title: "t".into(),
                description: "d".into(),
                priority: Priority::Medium,
                estimated_effort: None,
                files_to_modify: vec![],
                files_to_create: vec![],
                files_to_delete: vec![],
                depends_on: BTreeSet::new(),
                blocks: BTreeSet::new(),
                can_parallel_with: BTreeSet::new(),
            },
            PlanStep {
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
            },
        ];
        PlanStep::recompute_blocks(&mut steps);
        assert_eq!(steps[0].blocks, BTreeSet::from([2]));
        assert!(steps[1].blocks.is_empty());
    }
}
