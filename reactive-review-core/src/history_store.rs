//! `HistoryStore` (C3): an append-only, versioned history of every material
//! mutation to a plan, with diffing and rollback. One JSON blob per plan on
//! disk (the full plan snapshot plus a change summary per version), fronted
//! by a bounded in-memory LRU — same shape as `PlanStore`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;

use crate::errors::{Error, RrcResult, StoreError};
use crate::lru::LruCache;
use crate::model::Plan;

fn default_root() -> PathBuf {
    std::env::var("RRC_HISTORY_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("code_data/rrc_history"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub plan_id: String,
    pub version: u64,
    pub change_type: ChangeType,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PlanHistory {
    versions: Vec<VersionRecord>,
}

#[derive(Debug, Clone)]
pub struct History {
    pub plan_id: String,
    pub versions: Vec<VersionRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct GetHistoryOptions {
    pub limit: Option<usize>,
    pub include_plans: bool,
}

#[derive(Debug, Clone)]
pub struct Diff {
    pub steps_added: Vec<u32>,
    pub steps_removed: Vec<u32>,
    pub steps_modified: Vec<u32>,
    pub goal_changed: bool,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct RollbackOptions {
    pub target_version: u64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RollbackOutcome {
    pub plan: Plan,
    pub new_version: u64,
}

pub struct HistoryStore {
    root: PathBuf,
    max_versions: usize,
    memory: Mutex<LruCache<String, PlanHistory>>,
    locks: DashMap<String, std::sync::Arc<AsyncMutex<()>>>,
}

impl HistoryStore {
    pub fn new(max_plans: usize, max_versions: usize) -> Self {
        Self::with_root(default_root(), max_plans, max_versions)
    }

    pub fn with_root(root: PathBuf, max_plans: usize, max_versions: usize) -> Self {
        Self {
            root,
            max_versions,
            memory: Mutex::new(LruCache::new(max_plans)),
            locks: DashMap::new(),
        }
    }

    fn path_for(&self, plan_id: &str) -> PathBuf {
        self.root.join(format!("{plan_id}.json"))
    }

    fn lock_for(&self, plan_id: &str) -> std::sync::Arc<AsyncMutex<()>> {
        self.locks
            .entry(plan_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn read(&self, plan_id: &str) -> RrcResult<PlanHistory> {
        if let Some(h) = self
            .memory
            .lock()
            .expect("history store memory lock poisoned")
            .get(&plan_id.to_string())
        {
            return Ok(h.clone());
        }
        let path = self.path_for(plan_id);
        if !path.exists() {
            return Ok(PlanHistory::default());
        }
        let bytes = fs::read(&path).await?;
        let history: PlanHistory = serde_json::from_slice(&bytes)?;
        self.memory
            .lock()
            .expect("history store memory lock poisoned")
            .put(plan_id.to_string(), history.clone());
        Ok(history)
    }

    async fn write(&self, plan_id: &str, history: &PlanHistory) -> RrcResult<()> {
        let path = self.path_for(plan_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let bytes = serde_json::to_vec_pretty(history)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        self.memory
            .lock()
            .expect("history store memory lock poisoned")
            .put(plan_id.to_string(), history.clone());
        Ok(())
    }

    /// Appends a new version, pruning the oldest beyond `max_versions`.
    /// Serialized per `plan_id` so versions strictly increase.
    pub async fn record_version(
        &self,
        plan: &Plan,
        change_type: ChangeType,
        summary: impl Into<String>,
    ) -> RrcResult<VersionRecord> {
        let lock = self.lock_for(&plan.id);
        let _guard = lock.lock().await;

        let mut history = self.read(&plan.id).await?;
        let next_version = history
            .versions
            .last()
            .map(|v| v.version + 1)
            .unwrap_or(1);

        let record = VersionRecord {
            plan_id: plan.id.clone(),
            version: next_version,
            change_type,
            summary: summary.into(),
            recorded_at: Utc::now(),
            plan: plan.clone(),
        };
        history.versions.push(record.clone());
        if history.versions.len() > self.max_versions {
            let overflow = history.versions.len() - self.max_versions;
            history.versions.drain(0..overflow);
        }
        self.write(&plan.id, &history).await?;
        Ok(record)
    }

    pub async fn get_history(
        &self,
        plan_id: &str,
        opts: GetHistoryOptions,
    ) -> RrcResult<Option<History>> {
        let history = self.read(plan_id).await?;
        if history.versions.is_empty() {
            return Ok(None);
        }
        let mut versions = history.versions;
        if let Some(limit) = opts.limit {
            let start = versions.len().saturating_sub(limit);
            versions = versions[start..].to_vec();
        }
        if !opts.include_plans {
            for v in versions.iter_mut() {
                v.plan.steps.clear();
            }
        }
        Ok(Some(History {
            plan_id: plan_id.to_string(),
            versions,
        }))
    }

    pub async fn get_version(&self, plan_id: &str, version: u64) -> RrcResult<Option<VersionRecord>> {
        let history = self.read(plan_id).await?;
        Ok(history.versions.into_iter().find(|v| v.version == version))
    }

    pub async fn generate_diff(&self, plan_id: &str, from: u64, to: u64) -> RrcResult<Option<Diff>> {
        let from_v = self.get_version(plan_id, from).await?;
        let to_v = self.get_version(plan_id, to).await?;
        let (Some(from_v), Some(to_v)) = (from_v, to_v) else {
            return Ok(None);
        };

        let from_steps: HashMap<u32, _> = from_v.plan.steps.iter().map(|s| (s.step_number, s)).collect();
        let to_steps: HashMap<u32, _> = to_v.plan.steps.iter().map(|s| (s.step_number, s)).collect();

        let mut steps_added: Vec<u32> = to_steps
            .keys()
            .filter(|n| !from_steps.contains_key(*n))
            .copied()
            .collect();
        let mut steps_removed: Vec<u32> = from_steps
            .keys()
            .filter(|n| !to_steps.contains_key(*n))
            .copied()
            .collect();
        let mut steps_modified: Vec<u32> = from_steps
            .iter()
            .filter_map(|(n, a)| {
                to_steps.get(n).and_then(|b| {
                    let changed = a.title != b.title
                        || a.description != b.description
                        || a.files_to_modify != b.files_to_modify
                        || a.files_to_create != b.files_to_create
                        || a.files_to_delete != b.files_to_delete;
                    changed.then_some(*n)
                })
            })
            .collect();

        steps_added.sort_unstable();
        steps_removed.sort_unstable();
        steps_modified.sort_unstable();
        let goal_changed = from_v.plan.goal != to_v.plan.goal;

        let summary = format!(
            "{} added, {} removed, {} modified{}",
            steps_added.len(),
            steps_removed.len(),
            steps_modified.len(),
            if goal_changed { ", goal changed" } else { "" }
        );

        Ok(Some(Diff {
            steps_added,
            steps_removed,
            steps_modified,
            goal_changed,
            summary,
        }))
    }

    /// Restores the plan bytes of `target_version` and immediately records
    /// this as a new version so history stays append-only.
    pub async fn rollback(&self, plan_id: &str, opts: RollbackOptions) -> RrcResult<RollbackOutcome> {
        let target = self
            .get_version(plan_id, opts.target_version)
            .await?
            .ok_or_else(|| Error::Store(StoreError::NotFound(format!(
                "plan {plan_id} has no version {}",
                opts.target_version
            ))))?;

        let mut restored = target.plan;
        restored.updated_at = Utc::now();
        let summary = opts
            .reason
            .unwrap_or_else(|| format!("rolled back to version {}", opts.target_version));
        let record = self
            .record_version(&restored, ChangeType::RolledBack, summary)
            .await?;

        Ok(RollbackOutcome {
            plan: restored,
            new_version: record.version,
        })
    }

    pub async fn delete_history(&self, plan_id: &str) -> RrcResult<bool> {
        let path = self.path_for(plan_id);
        let existed = path.exists();
        if existed {
            fs::remove_file(&path).await?;
        }
        self.memory
            .lock()
            .expect("history store memory lock poisoned")
            .remove(&plan_id.to_string());
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanStep, Priority};
    use std::collections::BTreeSet;

    fn plan_with_goal(id: &str, goal: &str, steps: Vec<u32>) -> Plan {
        let now = Utc::now();
        Plan {
            id: id.to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
            goal: goal.to_string(),
            steps: steps
                .into_iter()
                .map(|n| PlanStep {
                    step_number: n,
                    id: format!("s{n}"),
                    title: format!("title {n}"),
                    description: "desc".into(),
                    priority: Priority::Medium,
                    estimated_effort: None,
                    files_to_modify: vec![],
                    files_to_create: vec![],
                    files_to_delete: vec![],
                    depends_on: BTreeSet::new(),
                    blocks: BTreeSet::new(),
                    can_parallel_with: BTreeSet::new(),
                })
                .collect(),
            scope: None,
            risks: None,
            architecture: None,
            testing_strategy: None,
            confidence_score: None,
            context_files: vec![],
            codebase_insights: None,
        }
    }

    #[tokio::test]
    async fn versions_strictly_increase() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 20);
        let plan = plan_with_goal("p1", "g", vec![1]);
        let v1 = store.record_version(&plan, ChangeType::Created, "created").await.unwrap();
        let v2 = store.record_version(&plan, ChangeType::Modified, "modified").await.unwrap();
        assert!(v1.version < v2.version);
    }

    #[tokio::test]
    async fn retention_prunes_oldest_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 3);
        let plan = plan_with_goal("p1", "g", vec![1]);
        for i in 0..5 {
            store
                .record_version(&plan, ChangeType::Modified, format!("change {i}"))
                .await
                .unwrap();
        }
        let history = store
            .get_history("p1", GetHistoryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.versions.len(), 3);
        assert_eq!(history.versions.first().unwrap().version, 3);
    }

    #[tokio::test]
    async fn diff_reports_added_removed_modified_and_goal_change() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 20);
        let p1 = plan_with_goal("p1", "old goal", vec![1, 2]);
        let v1 = store.record_version(&p1, ChangeType::Created, "created").await.unwrap();

        let mut p2 = plan_with_goal("p1", "new goal", vec![2, 3]);
        p2.steps[0].title = "changed title".into();
        let v2 = store.record_version(&p2, ChangeType::Modified, "modified").await.unwrap();

        let diff = store
            .generate_diff("p1", v1.version, v2.version)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(diff.steps_added, vec![3]);
        assert_eq!(diff.steps_removed, vec![1]);
        assert_eq!(diff.steps_modified, vec![2]);
        assert!(diff.goal_changed);
    }

    #[tokio::test]
    async fn diff_detects_file_list_content_change_at_equal_length() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 20);
        let mut p1 = plan_with_goal("p1", "goal", vec![1]);
        p1.steps[0].files_to_modify = vec![crate::model::FileRef {
            path: "a.rs".into(),
            change_type: crate::model::ChangeType::Modify,
            estimated_loc: None,
            complexity: None,
            reason: None,
        }];
        let v1 = store.record_version(&p1, ChangeType::Created, "created").await.unwrap();

        // Same step count, same file-list length, different path: a
        // length-only comparison would miss this.
        let mut p2 = p1.clone();
        p2.steps[0].files_to_modify = vec![crate::model::FileRef {
            path: "b.rs".into(),
            change_type: crate::model::ChangeType::Modify,
            estimated_loc: None,
            complexity: None,
            reason: None,
        }];
        let v2 = store.record_version(&p2, ChangeType::Modified, "modified").await.unwrap();

        let diff = store
            .generate_diff("p1", v1.version, v2.version)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(diff.steps_modified, vec![1]);
    }

    #[tokio::test]
    async fn rollback_is_append_only_and_restores_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 20);
        let p1 = plan_with_goal("p1", "goal v1", vec![1]);
        let v1 = store.record_version(&p1, ChangeType::Created, "created").await.unwrap();
        let p2 = plan_with_goal("p1", "goal v2", vec![1, 2]);
        store.record_version(&p2, ChangeType::Modified, "modified").await.unwrap();

        let outcome = store
            .rollback(
                "p1",
                RollbackOptions {
                    target_version: v1.version,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.plan.goal, "goal v1");
        assert_eq!(outcome.new_version, 3);

        let history = store
            .get_history("p1", GetHistoryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.versions.len(), 3);
    }

    #[tokio::test]
    async fn rollback_to_unknown_version_fails_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_root(tmp.path().to_path_buf(), 50, 20);
        let p1 = plan_with_goal("p1", "goal", vec![1]);
        store.record_version(&p1, ChangeType::Created, "created").await.unwrap();

        let err = store
            .rollback(
                "p1",
                RollbackOptions {
                    target_version: 99,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    }
}
