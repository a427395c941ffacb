//! `SessionManager` (C7): lifecycle, zombie detection, and periodic cleanup
//! for long-lived `ReviewSession`s. Sessions live in a `DashMap` alongside a
//! handful of out-of-band per-session maps (start time, last activity,
//! tokens, findings, adaptive timeout) so hot paths (`touch`, `record_*`)
//! never need to lock the whole session record.

use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{Error, RrcResult};
use crate::execution_tracker::ExecutionTracker;
use crate::model::{PrMetadata, ReviewSession, SessionStatus};
use crate::plan_store::PlanStore;

struct SideState {
    start_time: Instant,
    last_activity: Instant,
    tokens_used: u64,
    findings_count: u64,
    adaptive_timeout: Duration,
}

pub struct SessionManager {
    sessions: DashMap<String, ReviewSession>,
    side: DashMap<String, SideState>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            side: DashMap::new(),
        }
    }

    /// Creates and registers a new session in `initializing` status.
    pub fn create_session(
        &self,
        plan_id: impl Into<String>,
        pr_metadata: PrMetadata,
        total_steps: u32,
        adaptive_timeout: Duration,
    ) -> ReviewSession {
        let session_id = format!("sess_{}", Uuid::new_v4().simple());
        let now = Utc::now();
        let session = ReviewSession {
            session_id: session_id.clone(),
            plan_id: plan_id.into(),
            status: SessionStatus::Initializing,
            pr_metadata,
            created_at: now,
            updated_at: now,
            total_steps,
            current_step: None,
            error: None,
        };
        self.sessions.insert(session_id.clone(), session.clone());
        self.side.insert(
            session_id,
            SideState {
                start_time: Instant::now(),
                last_activity: Instant::now(),
                tokens_used: 0,
                findings_count: 0,
                adaptive_timeout,
            },
        );
        session
    }

    pub fn get(&self, session_id: &str) -> Option<ReviewSession> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    pub fn list(&self, status_filter: Option<SessionStatus>) -> Vec<ReviewSession> {
        self.sessions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| status_filter.map(|f| s.status == f).unwrap_or(true))
            .collect()
    }

    /// Updates `last_activity`. Called on every externally observable
    /// progress event so slow-but-live reviews don't look stalled.
    pub fn touch(&self, session_id: &str) {
        if let Some(mut side) = self.side.get_mut(session_id) {
            side.last_activity = Instant::now();
        }
    }

    pub fn record_tokens(&self, session_id: &str, n: u64) {
        if let Some(mut side) = self.side.get_mut(session_id) {
            side.tokens_used += n;
        }
    }

    pub fn record_findings(&self, session_id: &str, n: u64) {
        if let Some(mut side) = self.side.get_mut(session_id) {
            side.findings_count += n;
        }
    }

    pub fn set_status(&self, session_id: &str, status: SessionStatus, error: Option<String>) -> RrcResult<()> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        session.status = status;
        session.updated_at = Utc::now();
        if error.is_some() {
            session.error = error;
        }
        Ok(())
    }

    pub fn set_current_step(&self, session_id: &str, step: Option<u32>) -> RrcResult<()> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        session.current_step = step;
        session.updated_at = Utc::now();
        Ok(())
    }

    pub fn tokens_used(&self, session_id: &str) -> u64 {
        self.side.get(session_id).map(|s| s.tokens_used).unwrap_or(0)
    }

    pub fn findings_count(&self, session_id: &str) -> u64 {
        self.side.get(session_id).map(|s| s.findings_count).unwrap_or(0)
    }

    pub fn elapsed(&self, session_id: &str) -> Duration {
        self.side.get(session_id).map(|s| s.start_time.elapsed()).unwrap_or_default()
    }

    pub fn last_activity_age(&self, session_id: &str) -> Duration {
        self.side.get(session_id).map(|s| s.last_activity.elapsed()).unwrap_or_default()
    }

    pub fn adaptive_timeout(&self, session_id: &str) -> Option<Duration> {
        self.side.get(session_id).map(|s| s.adaptive_timeout)
    }

    /// Drops a session and every one of its out-of-band side entries.
    pub fn remove(&self, session_id: &str) -> Option<ReviewSession> {
        self.side.remove(session_id);
        self.sessions.remove(session_id).map(|(_, s)| s)
    }

    /// Evaluates the zombie predicate from §4.7 for one active session.
    /// Attempts plan recovery from disk before declaring the plan missing.
    async fn is_zombie(&self, session: &ReviewSession, plan_store: &PlanStore, tracker: &ExecutionTracker) -> bool {
        if !session.status.is_active() {
            return false;
        }
        let plan_missing = plan_store.load(&session.plan_id).await.ok().flatten().is_none();
        if plan_missing {
            return true;
        }
        if session.status == SessionStatus::Executing && !tracker.has_state(&session.plan_id) {
            return true;
        }
        if let Some(timeout) = self.adaptive_timeout(&session.session_id) {
            if self.last_activity_age(&session.session_id) > timeout {
                return true;
            }
        }
        false
    }

    /// Full periodic cleanup pass: reap zombies, then evict terminal
    /// sessions past TTL, then cap total count by evicting oldest-terminal.
    /// `on_zombie` is invoked for each session transitioned to `failed` so
    /// the caller can react (e.g. disable commit caching for that plan).
    pub async fn cleanup_expired(
        &self,
        plan_store: &PlanStore,
        tracker: &ExecutionTracker,
        session_ttl: Duration,
        max_sessions: usize,
        mut on_zombie: impl FnMut(&ReviewSession),
    ) -> usize {
        let mut removed = 0usize;

        let active: Vec<ReviewSession> = self
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| s.status.is_active())
            .collect();
        for session in active {
            if self.is_zombie(&session, plan_store, tracker).await {
                let _ = tracker.abort(&session.plan_id);
                let _ = self.set_status(
                    &session.session_id,
                    SessionStatus::Failed,
                    Some("session detected as zombie: plan or execution state lost, or inactive past timeout".into()),
                );
                warn!(session_id = %session.session_id, "session_manager: zombie reaped");
                if let Some(s) = self.get(&session.session_id) {
                    on_zombie(&s);
                }
            }
        }

        let now = Utc::now();
        let stale_terminal: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| {
                let s = e.value();
                s.status.is_terminal()
                    && (now - s.created_at).num_milliseconds().max(0) as u64 > session_ttl.as_millis() as u64
            })
            .map(|e| e.key().clone())
            .collect();
        for id in stale_terminal {
            self.remove(&id);
            removed += 1;
        }

        if self.sessions.len() > max_sessions {
            let mut terminal: Vec<(String, chrono::DateTime<Utc>)> = self
                .sessions
                .iter()
                .filter(|e| e.value().status.is_terminal())
                .map(|e| (e.key().clone(), e.value().created_at))
                .collect();
            terminal.sort_by_key(|(_, t)| *t);
            let overflow = self.sessions.len().saturating_sub(max_sessions);
            for (id, _) in terminal.into_iter().take(overflow) {
                self.remove(&id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "session_manager: cleanup evicted sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr() -> PrMetadata {
        PrMetadata::new("c1", "main", vec!["a.rs".into()])
    }

    #[test]
    fn create_session_starts_initializing_and_is_active() {
        let mgr = SessionManager::new();
        let s = mgr.create_session("p1", pr(), 3, Duration::from_secs(60));
        assert_eq!(s.status, SessionStatus::Initializing);
        assert!(s.status.is_active());
        assert!(mgr.get(&s.session_id).is_some());
    }

    #[test]
    fn touch_updates_last_activity_age() {
        let mgr = SessionManager::new();
        let s = mgr.create_session("p1", pr(), 3, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        let before = mgr.last_activity_age(&s.session_id);
        mgr.touch(&s.session_id);
        let after = mgr.last_activity_age(&s.session_id);
        assert!(after < before);
    }

    #[test]
    fn remove_drops_session_and_side_state() {
        let mgr = SessionManager::new();
        let s = mgr.create_session("p1", pr(), 3, Duration::from_secs(60));
        mgr.record_tokens(&s.session_id, 100);
        mgr.remove(&s.session_id);
        assert!(mgr.get(&s.session_id).is_none());
        assert_eq!(mgr.tokens_used(&s.session_id), 0);
    }

    #[tokio::test]
    async fn cleanup_evicts_ttl_expired_terminal_session_keeps_active() {
        let tmp = tempfile::tempdir().unwrap();
        let plan_store = PlanStore::with_root(tmp.path().to_path_buf(), 10);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);

        let mgr = SessionManager::new();
        let completed = mgr.create_session("p_done", pr(), 1, Duration::from_secs(60));
        mgr.set_status(&completed.session_id, SessionStatus::Completed, None).unwrap();
        {
            let mut side = mgr.side.get_mut(&completed.session_id).unwrap();
            side.start_time = Instant::now() - Duration::from_secs(10_000);
        }
        {
            let mut entry = mgr.sessions.get_mut(&completed.session_id).unwrap();
            entry.created_at = Utc::now() - chrono::Duration::milliseconds(7_200_000);
        }

        let active = mgr.create_session("p_active", pr(), 1, Duration::from_secs(3600));
        mgr.set_status(&active.session_id, SessionStatus::Executing, None).unwrap();
        tracker.initialize(&crate::model::Plan {
            id: "p_active".into(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            goal: "g".into(),
            steps: vec![],
            scope: None,
            risks: None,
            architecture: None,
            testing_strategy: None,
            confidence_score: None,
            context_files: vec![],
            codebase_insights: None,
        });

        let removed = mgr
            .cleanup_expired(&plan_store, &tracker, Duration::from_millis(3_600_000), 100, |_| {})
            .await;

        assert_eq!(removed, 1);
        assert!(mgr.get(&completed.session_id).is_none());
        assert!(mgr.get(&active.session_id).is_some());
    }

    #[tokio::test]
    async fn zombie_without_plan_or_disk_is_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let plan_store = PlanStore::with_root(tmp.path().to_path_buf(), 10);
        let tracker = ExecutionTracker::new(Duration::from_secs(3600), 100);

        let mgr = SessionManager::new();
        let s = mgr.create_session("ghost_plan", pr(), 1, Duration::from_secs(3600));
        mgr.set_status(&s.session_id, SessionStatus::Executing, None).unwrap();

        mgr.cleanup_expired(&plan_store, &tracker, Duration::from_secs(3600), 100, |_| {})
            .await;

        let after = mgr.get(&s.session_id).unwrap();
        assert_eq!(after.status, SessionStatus::Failed);
    }
}
