//! `ResponseCache` (C1): a three-tier, in-memory cache of per-step review
//! findings keyed by `(commit, file, content, step)`.
//!
//! Layer 1 (memory) is a bounded LRU of the full `CacheKey`. Layer 2
//! (commit) partitions by `commit_hash` and is invalidated en bloc. Layer 3
//! (file-hash) survives across commits that didn't touch a file's bytes.
//! `get`/`put` never suspend: every layer here is guarded by a synchronous
//! `std::sync::Mutex`, matching the file-based cache in `mr-reviewer::cache`,
//! which never write-backs to an external store either.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::lru::LruCache;
use crate::model::{CacheKey, CacheStats, CachedResult, Finding, SourceLayer};

pub struct ResponseCache {
    memory: Mutex<LruCache<CacheKey, CachedResult>>,
    commits: DashMap<String, HashMap<CacheKey, CachedResult>>,
    file_hash: DashMap<(String, String), CachedResult>,
    ttl: Duration,

    hits: AtomicU64,
    misses: AtomicU64,
    memory_hits: AtomicU64,
    commit_hits: AtomicU64,
    file_hash_hits: AtomicU64,
}

impl ResponseCache {
    pub fn new(memory_capacity: usize, ttl: Duration) -> Self {
        Self {
            memory: Mutex::new(LruCache::new(memory_capacity)),
            commits: DashMap::new(),
            file_hash: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            memory_hits: AtomicU64::new(0),
            commit_hits: AtomicU64::new(0),
            file_hash_hits: AtomicU64::new(0),
        }
    }

    fn is_expired(&self, entry: &CachedResult) -> bool {
        entry.cached_at.elapsed() > self.ttl
    }

    /// Layer 1 → 2 → 3, promoting on every miss-then-hit. A hit whose age
    /// exceeds `ttl` counts as a miss and is evicted from the layer it was
    /// found in.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        {
            let mut mem = self.memory.lock().expect("response cache memory lock poisoned");
            if let Some(entry) = mem.get(key) {
                if self.is_expired(entry) {
                    mem.remove(key);
                } else {
                    let hit = entry.clone();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    self.memory_hits.fetch_add(1, Ordering::Relaxed);
                    return Some(hit);
                }
            }
        }

        if let Some(mut partition) = self.commits.get_mut(&key.commit_hash) {
            if let Some(entry) = partition.get(key) {
                if self.is_expired(entry) {
                    partition.remove(key);
                } else {
                    let mut hit = entry.clone();
                    hit.source_layer = SourceLayer::Commit;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    self.commit_hits.fetch_add(1, Ordering::Relaxed);
                    self.promote(key, hit.clone());
                    return Some(hit);
                }
            }
        }

        let fh_key = (key.file_path.clone(), key.content_hash.clone());
        if let Some(entry) = self.file_hash.get(&fh_key) {
            if self.is_expired(&entry) {
                drop(entry);
                self.file_hash.remove(&fh_key);
            } else {
                let mut hit = entry.clone();
                hit.source_layer = SourceLayer::FileHash;
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.file_hash_hits.fetch_add(1, Ordering::Relaxed);
                self.promote(key, hit.clone());
                return Some(hit);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn promote(&self, key: &CacheKey, mut result: CachedResult) {
        result.source_layer = SourceLayer::Memory;
        let mut mem = self.memory.lock().expect("response cache memory lock poisoned");
        mem.put(key.clone(), result);
    }

    /// Writes `findings` into every layer. Last-writer-wins per key; no
    /// operation here can fail (§4.1).
    pub fn put(&self, key: &CacheKey, findings: Vec<Finding>) {
        let result = CachedResult {
            findings,
            cached_at: Instant::now(),
            source_layer: SourceLayer::Memory,
        };

        {
            let mut mem = self.memory.lock().expect("response cache memory lock poisoned");
            mem.put(key.clone(), result.clone());
        }

        self.commits
            .entry(key.commit_hash.clone())
            .or_default()
            .insert(key.clone(), {
                let mut r = result.clone();
                r.source_layer = SourceLayer::Commit;
                r
            });

        let fh_key = (key.file_path.clone(), key.content_hash.clone());
        let mut fh_result = result;
        fh_result.source_layer = SourceLayer::FileHash;
        self.file_hash.insert(fh_key, fh_result);

        debug!(commit = %key.commit_hash, file = %key.file_path, "cache: put");
    }

    /// Drops the entire layer-2 partition for `commit` and matching layer-1
    /// entries; leaves layer 3 intact (content may still be valid).
    pub fn invalidate_commit(&self, commit: &str) {
        self.commits.remove(commit);
        let mut mem = self.memory.lock().expect("response cache memory lock poisoned");
        mem.retain(|k, _| k.commit_hash != commit);
    }

    /// Removes entries touching `path` from layers 1 and 3; leaves layer 2 alone.
    pub fn invalidate_file(&self, path: &str) {
        {
            let mut mem = self.memory.lock().expect("response cache memory lock poisoned");
            mem.retain(|k, _| k.file_path != path);
        }
        self.file_hash.retain(|(p, _), _| p != path);
    }

    pub fn clear(&self) {
        self.memory.lock().expect("response cache memory lock poisoned").clear();
        self.commits.clear();
        self.file_hash.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            commit_hits: self.commit_hits.load(Ordering::Relaxed),
            file_hash_hits: self.file_hash_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(msg: &str) -> Vec<Finding> {
        vec![Finding {
            file: "a.rs".into(),
            severity: crate::model::Severity::Info,
            category: "style".into(),
            message: msg.into(),
            line: None,
            suggestion: None,
        }]
    }

    #[test]
    fn promotion_across_commits_via_file_hash_layer() {
        let cache = ResponseCache::new(1_000, Duration::from_secs(3600));
        let content = "fn main() {}";
        let step_desc = "check style";
        let k1 = CacheKey::new("c1", "a.rs", content, step_desc);
        cache.put(&k1, finding("ok"));

        let k2 = CacheKey::new("c2", "a.rs", content, step_desc);
        let hit = cache.get(&k2).expect("file-hash layer should answer");
        assert_eq!(hit.source_layer, SourceLayer::FileHash);

        // second get of the same key now comes from memory (promoted).
        let hit2 = cache.get(&k2).expect("memory layer should answer after promotion");
        assert_eq!(hit2.source_layer, SourceLayer::Memory);
    }

    #[test]
    fn hit_rate_matches_hits_over_hits_plus_misses() {
        let cache = ResponseCache::new(10, Duration::from_secs(3600));
        let k = CacheKey::new("c1", "a.rs", "content", "step");
        assert!(cache.get(&k).is_none());
        cache.put(&k, finding("ok"));
        assert!(cache.get(&k).is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalidate_commit_leaves_file_hash_layer_intact() {
        let cache = ResponseCache::new(10, Duration::from_secs(3600));
        let k = CacheKey::new("c1", "a.rs", "content", "step");
        cache.put(&k, finding("ok"));
        cache.invalidate_commit("c1");

        let k2 = CacheKey::new("c2", "a.rs", "content", "step");
        let hit = cache.get(&k2).expect("file-hash layer survives commit invalidation");
        assert_eq!(hit.source_layer, SourceLayer::FileHash);
    }

    #[test]
    fn expired_entry_counts_as_miss() {
        let cache = ResponseCache::new(10, Duration::from_millis(0));
        let k = CacheKey::new("c1", "a.rs", "content", "step");
        cache.put(&k, finding("ok"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&k).is_none());
    }

    #[test]
    fn zero_size_memory_layer_still_hits_through_lower_layers() {
        let cache = ResponseCache::new(0, Duration::from_secs(3600));
        let k = CacheKey::new("c1", "a.rs", "content", "step");
        cache.put(&k, finding("ok"));
        // memory capacity clamps to 1 but is immediately promoted-over by
        // later gets; layer 2/3 must still answer regardless.
        let k2 = CacheKey::new("c2", "a.rs", "content", "step");
        assert!(cache.get(&k2).is_some());
    }
}
