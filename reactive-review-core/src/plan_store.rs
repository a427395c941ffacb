//! `PlanStore` (C2): durable save/load/list/delete of plans keyed by plan id,
//! backed by one JSON blob per plan plus a single index blob, with a bounded
//! in-memory LRU in front of disk. I/O goes through `tokio::fs`, the same
//! non-blocking approach `mr-reviewer::cache` uses for its large-diff cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::errors::{Error, RrcResult, StoreError};
use crate::lru::LruCache;
use crate::model::{Plan, PlanMetadata};

/// Root directory for persisted plans (env-overridable, mirrors
/// `MR_REVIEWER_CACHE_DIR` in the teacher crate).
fn default_root() -> PathBuf {
    std::env::var("RRC_PLAN_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("code_data/rrc_plans"))
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub sort_by: Option<SortBy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreatedAt,
    UpdatedAt,
    Name,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub plan_id: String,
    pub file_path: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Index {
    entries: HashMap<String, PlanMetadata>,
}

pub struct PlanStore {
    root: PathBuf,
    capacity: usize,
    memory: Mutex<LruCache<String, Plan>>,
    index: AsyncMutex<Index>,
    locks: DashMap<String, std::sync::Arc<AsyncMutex<()>>>,
    counter: AtomicU64,
}

impl PlanStore {
    pub fn new(capacity: usize) -> Self {
        Self::with_root(default_root(), capacity)
    }

    pub fn with_root(root: PathBuf, capacity: usize) -> Self {
        Self {
            root,
            capacity,
            memory: Mutex::new(LruCache::new(capacity)),
            index: AsyncMutex::new(Index::default()),
            locks: DashMap::new(),
            counter: AtomicU64::new(0),
        }
    }

    fn plan_path(&self, plan_id: &str) -> PathBuf {
        self.root.join("plans").join(format!("{plan_id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn lock_for(&self, plan_id: &str) -> std::sync::Arc<AsyncMutex<()>> {
        self.locks
            .entry(plan_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn load_index(&self) -> RrcResult<()> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(());
        }
        let bytes = fs::read(&path).await?;
        let loaded: Index = serde_json::from_slice(&bytes)?;
        *self.index.lock().await = loaded;
        Ok(())
    }

    async fn persist_index(&self) -> RrcResult<()> {
        if let Some(dir) = self.index_path().parent() {
            fs::create_dir_all(dir).await?;
        }
        let snapshot = {
            let guard = self.index.lock().await;
            serde_json::to_vec_pretty(&*guard)?
        };
        let tmp = self.index_path().with_extension("json.tmp");
        fs::write(&tmp, snapshot).await?;
        fs::rename(&tmp, self.index_path()).await?;
        Ok(())
    }

    fn normalize(&self, plan: &Plan, opts: &SaveOptions) -> PlanMetadata {
        let plan_id = if plan.id.trim().is_empty() {
            format!("plan_{}", self.counter.fetch_add(1, Ordering::Relaxed))
        } else {
            plan.id.clone()
        };

        let candidate_name = opts.name.clone().unwrap_or_else(|| plan_id.clone());
        let name = if candidate_name.chars().any(|c| c.is_alphanumeric()) {
            candidate_name
        } else {
            format!("Plan {}", Utc::now().format("%Y-%m-%d"))
        };

        let goal = if plan.goal.trim().is_empty() {
            "untitled".to_string()
        } else {
            plan.goal.clone()
        };

        PlanMetadata {
            plan_id: plan_id.clone(),
            name,
            goal,
            tags: opts.tags.clone(),
            created_at: plan.created_at,
            updated_at: plan.updated_at,
            step_count: plan.steps.len(),
            file_path: self.plan_path(&plan_id).to_string_lossy().to_string(),
            version: plan.version,
        }
    }

    /// Saves `plan`, generating stable substitutes for missing `id`/`goal`
    /// and falling back to a dated name when the supplied name has no
    /// alphanumeric characters. These substitutions are observable only in
    /// the returned metadata — the stored blob records the plan as given.
    pub async fn save(&self, plan: &Plan, opts: SaveOptions) -> RrcResult<SaveOutcome> {
        self.load_index().await.ok();
        let metadata = self.normalize(plan, &opts);
        let plan_id = metadata.plan_id.clone();
        let lock = self.lock_for(&plan_id);
        let _guard = lock.lock().await;

        {
            let index = self.index.lock().await;
            if !opts.overwrite && index.entries.contains_key(&plan_id) {
                return Err(Error::Store(StoreError::AlreadyExists(plan_id)));
            }
        }

        let path = self.plan_path(&plan_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let bytes = serde_json::to_vec_pretty(plan)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;

        {
            let mut index = self.index.lock().await;
            index.entries.insert(plan_id.clone(), metadata.clone());
        }
        self.persist_index().await?;

        {
            let mut mem = self.memory.lock().expect("plan store memory lock poisoned");
            mem.put(plan_id.clone(), plan.clone());
        }

        debug!(plan_id = %plan_id, "plan_store: saved");
        Ok(SaveOutcome {
            plan_id,
            file_path: path.to_string_lossy().to_string(),
        })
    }

    /// Consults the in-memory LRU before disk.
    pub async fn load(&self, plan_id: &str) -> RrcResult<Option<Plan>> {
        if let Some(plan) = self
            .memory
            .lock()
            .expect("plan store memory lock poisoned")
            .get(&plan_id.to_string())
        {
            return Ok(Some(plan.clone()));
        }

        let path = self.plan_path(plan_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).await?;
        let plan: Plan = serde_json::from_slice(&bytes)?;
        self.memory
            .lock()
            .expect("plan store memory lock poisoned")
            .put(plan_id.to_string(), plan.clone());
        Ok(Some(plan))
    }

    pub async fn load_by_name(&self, name: &str) -> RrcResult<Option<Plan>> {
        self.load_index().await.ok();
        let plan_id = {
            let index = self.index.lock().await;
            index
                .entries
                .values()
                .find(|m| m.name.eq_ignore_ascii_case(name))
                .map(|m| m.plan_id.clone())
        };
        match plan_id {
            Some(id) => self.load(&id).await,
            None => Ok(None),
        }
    }

    pub async fn list(&self, opts: ListOptions) -> RrcResult<Vec<PlanMetadata>> {
        self.load_index().await.ok();
        let index = self.index.lock().await;
        let mut items: Vec<PlanMetadata> = index
            .entries
            .values()
            .filter(|m| {
                opts.tags.is_empty() || opts.tags.iter().all(|t| m.tags.contains(t))
            })
            .cloned()
            .collect();
        drop(index);

        match opts.sort_by.unwrap_or(SortBy::UpdatedAt) {
            SortBy::CreatedAt => items.sort_by_key(|m| m.created_at),
            SortBy::UpdatedAt => items.sort_by_key(|m| m.updated_at),
            SortBy::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        items.reverse();
        if let Some(limit) = opts.limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    pub async fn delete(&self, plan_id: &str) -> RrcResult<()> {
        let lock = self.lock_for(plan_id);
        let _guard = lock.lock().await;

        let path = self.plan_path(plan_id);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        {
            let mut index = self.index.lock().await;
            if index.entries.remove(plan_id).is_none() {
                warn!(plan_id, "plan_store: delete of unknown plan metadata");
            }
        }
        self.persist_index().await?;
        self.memory
            .lock()
            .expect("plan store memory lock poisoned")
            .remove(&plan_id.to_string());
        Ok(())
    }

    pub async fn get_metadata(&self, plan_id: &str) -> RrcResult<Option<PlanMetadata>> {
        self.load_index().await.ok();
        let index = self.index.lock().await;
        Ok(index.entries.get(plan_id).cloned())
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlanStep;
    use std::collections::BTreeSet;

    fn sample_plan(id: &str) -> Plan {
        let now = Utc::now();
        Plan {
            id: id.to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
            goal: "ship it".into(),
            steps: vec![PlanStep {
                step_number: 1,
                id: "s1".into(),
                title: "do a thing".into(),
                description: "desc".into(),
                priority: crate::model::Priority::Medium,
                estimated_effort: None,
                files_to_modify: vec![],
                files_to_create: vec![],
                files_to_delete: vec![],
                depends_on: BTreeSet::new(),
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
        }
    }

    #[tokio::test]
    async fn round_trip_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let plan = sample_plan("p1");
        store.save(&plan, SaveOptions::default()).await.unwrap();
        let loaded = store.load("p1").await.unwrap().expect("plan should load");
        assert_eq!(loaded.id, plan.id);
        assert_eq!(loaded.steps.len(), plan.steps.len());
    }

    #[tokio::test]
    async fn save_without_overwrite_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let plan = sample_plan("p1");
        store.save(&plan, SaveOptions::default()).await.unwrap();
        let err = store.save(&plan, SaveOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let mut plan = sample_plan("p1");
        store.save(&plan, SaveOptions::default()).await.unwrap();
        plan.goal = "new goal".into();
        let opts = SaveOptions {
            overwrite: true,
            ..Default::default()
        };
        store.save(&plan, opts).await.unwrap();
        let loaded = store.load("p1").await.unwrap().unwrap();
        assert_eq!(loaded.goal, "new goal");
    }

    #[tokio::test]
    async fn missing_id_gets_stable_substitute() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let plan = sample_plan("");
        let outcome = store.save(&plan, SaveOptions::default()).await.unwrap();
        assert!(outcome.plan_id.starts_with("plan_"));
    }

    #[tokio::test]
    async fn load_by_name_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let plan = sample_plan("p1");
        let opts = SaveOptions {
            name: Some("My Plan".into()),
            ..Default::default()
        };
        store.save(&plan, opts).await.unwrap();
        let loaded = store.load_by_name("my plan").await.unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn delete_removes_blob_and_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::with_root(tmp.path().to_path_buf(), 50);
        let plan = sample_plan("p1");
        store.save(&plan, SaveOptions::default()).await.unwrap();
        store.delete("p1").await.unwrap();
        assert!(store.load("p1").await.unwrap().is_none());
        assert!(store.get_metadata("p1").await.unwrap().is_none());
    }
}
