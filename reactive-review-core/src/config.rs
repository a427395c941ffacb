//! Runtime configuration for the reactive review core. Every field mirrors a
//! row of the configuration table in §6 of the specification and carries the
//! same default. Loadable from `RRC_*` environment variables the same way
//! `contextor`'s `ContextorConfig::from_env()` loads its own knobs, so the
//! binary entrypoint can keep using `dotenvy` without this crate depending
//! on it directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveReviewConfig {
    pub enabled: bool,
    pub parallel_exec: bool,
    pub commit_cache: bool,
    pub max_workers: usize,
    pub step_timeout_ms: u64,
    pub max_retries: u32,
    pub session_ttl_ms: u64,
    pub max_sessions: usize,
    pub session_execution_timeout_ms: u64,
    pub cache_ttl_ms: u64,
    pub cache_memory_capacity: usize,
    pub cb_failure_threshold: u32,
    pub cb_reset_timeout_ms: u64,
    pub cb_success_threshold: u32,
    pub cb_fallback_sequential: bool,
    pub chunked_enabled: bool,
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    pub inter_chunk_delay_ms: u64,
    pub plan_store_capacity: usize,
    pub history_max_versions: usize,
    pub history_max_plans: usize,
    pub execution_state_capacity: usize,
    pub execution_state_retention_ms: u64,
    pub cleanup_interval_ms: u64,
    pub stall_threshold_ms: u64,
}

impl Default for ReactiveReviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            parallel_exec: true,
            commit_cache: true,
            max_workers: 2,
            step_timeout_ms: 180_000,
            max_retries: 3,
            session_ttl_ms: 3_600_000,
            max_sessions: 100,
            session_execution_timeout_ms: 300_000,
            cache_ttl_ms: 3_600_000,
            cache_memory_capacity: 1_000,
            cb_failure_threshold: 3,
            cb_reset_timeout_ms: 60_000,
            cb_success_threshold: 2,
            cb_fallback_sequential: true,
            chunked_enabled: true,
            chunk_threshold: 15,
            chunk_size: 10,
            inter_chunk_delay_ms: 5_000,
            plan_store_capacity: 50,
            history_max_versions: 20,
            history_max_plans: 50,
            execution_state_capacity: 100,
            execution_state_retention_ms: 3_600_000,
            cleanup_interval_ms: 300_000,
            stall_threshold_ms: 120_000,
        }
    }
}

impl ReactiveReviewConfig {
    /// Loads defaults, overriding any field whose `RRC_<SCREAMING_SNAKE>`
    /// environment variable is set and parses cleanly.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        macro_rules! env_override {
            ($field:ident, $key:literal) => {
                if let Ok(raw) = std::env::var(concat!("RRC_", $key)) {
                    if let Ok(parsed) = raw.parse() {
                        cfg.$field = parsed;
                    }
                }
            };
        }
        env_override!(enabled, "ENABLED");
        env_override!(parallel_exec, "PARALLEL_EXEC");
        env_override!(commit_cache, "COMMIT_CACHE");
        env_override!(max_workers, "MAX_WORKERS");
        env_override!(step_timeout_ms, "STEP_TIMEOUT_MS");
        env_override!(max_retries, "MAX_RETRIES");
        env_override!(session_ttl_ms, "SESSION_TTL_MS");
        env_override!(max_sessions, "MAX_SESSIONS");
        env_override!(session_execution_timeout_ms, "SESSION_EXECUTION_TIMEOUT_MS");
        env_override!(cache_ttl_ms, "CACHE_TTL_MS");
        env_override!(cb_failure_threshold, "CB_FAILURE_THRESHOLD");
        env_override!(cb_reset_timeout_ms, "CB_RESET_TIMEOUT_MS");
        env_override!(cb_success_threshold, "CB_SUCCESS_THRESHOLD");
        env_override!(cb_fallback_sequential, "CB_FALLBACK_SEQUENTIAL");
        env_override!(chunked_enabled, "CHUNKED_ENABLED");
        env_override!(chunk_threshold, "CHUNK_THRESHOLD");
        env_override!(chunk_size, "CHUNK_SIZE");
        env_override!(inter_chunk_delay_ms, "INTER_CHUNK_DELAY_MS");
        cfg
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_millis(self.session_ttl_ms)
    }

    pub fn cb_reset_timeout(&self) -> Duration {
        Duration::from_millis(self.cb_reset_timeout_ms)
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = ReactiveReviewConfig::default();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.step_timeout_ms, 180_000);
        assert_eq!(cfg.cb_failure_threshold, 3);
        assert_eq!(cfg.max_sessions, 100);
    }

    #[test]
    fn env_override_parses_and_falls_back() {
        unsafe {
            std::env::set_var("RRC_MAX_WORKERS", "7");
        }
        let cfg = ReactiveReviewConfig::from_env();
        assert_eq!(cfg.max_workers, 7);
        unsafe {
            std::env::remove_var("RRC_MAX_WORKERS");
        }
    }
}
