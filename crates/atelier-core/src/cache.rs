//! Response cache — memoizes agent results by request fingerprint.
//!
//! Keyed by a canonical fingerprint of (agent identity, normalized input).
//! Expiry is evaluated lazily on `get`; `sweep` may run opportunistically to
//! bound memory but is not required for correctness.

use crate::task::TaskResult;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    result: TaskResult,
    created: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= self.ttl
    }
}

/// Time-bounded memo of agent results.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

/// Canonical cache fingerprint of (agent identity, normalized input payload).
///
/// Normalization trims and collapses internal whitespace so formatting-only
/// differences hit the same entry; payload case is preserved because it can
/// be meaningful (element names, parameter ids).
#[must_use]
pub fn fingerprint(agent_name: &str, input: &str) -> String {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(agent_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl ResponseCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a fingerprint. An expired entry reads as absent and is dropped.
    pub fn get(&self, fingerprint: &str) -> Option<TaskResult> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(fingerprint) {
            if !entry.is_expired(now) {
                return Some(entry.result.clone());
            }
        }
        // Drop the expired entry outside the read guard
        self.entries
            .remove_if(fingerprint, |_, entry| entry.is_expired(now));
        None
    }

    /// Store a result. Overwrites any prior entry for the fingerprint.
    pub fn put(&self, fingerprint: impl Into<String>, result: TaskResult, ttl: Duration) {
        self.entries.insert(
            fingerprint.into(),
            CacheEntry {
                result,
                created: Instant::now(),
                ttl,
            },
        );
    }

    /// Remove an entry explicitly. Returns true if it existed.
    pub fn invalidate(&self, fingerprint: &str) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Cache sweep");
        }
        removed
    }

    /// Number of live entries (including not-yet-swept expired ones)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(payload: &str) -> TaskResult {
        TaskResult::succeeded("t1", payload, Vec::new(), 10)
    }

    #[test]
    fn test_fingerprint_normalizes_whitespace() {
        let a = fingerprint("standards", "check  duct\n sizing");
        let b = fingerprint("standards", "check duct sizing");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_agents() {
        let a = fingerprint("standards", "check duct sizing");
        let b = fingerprint("api_expert", "check duct sizing");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_preserves_case() {
        assert_ne!(
            fingerprint("standards", "Level 1"),
            fingerprint("standards", "level 1")
        );
    }

    #[test]
    fn test_round_trip() {
        let cache = ResponseCache::new();
        let fp = fingerprint("standards", "check duct sizing");
        cache.put(fp.clone(), result("compliant"), Duration::from_secs(60));

        let hit = cache.get(&fp).unwrap();
        assert_eq!(hit.payload, "compliant");
    }

    #[test]
    fn test_expired_entry_reads_absent_and_is_dropped() {
        let cache = ResponseCache::new();
        let fp = fingerprint("standards", "check duct sizing");
        cache.put(fp.clone(), result("stale"), Duration::from_millis(0));

        assert!(cache.get(&fp).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResponseCache::new();
        let fp = fingerprint("standards", "check duct sizing");
        cache.put(fp.clone(), result("first"), Duration::from_secs(60));
        cache.put(fp.clone(), result("second"), Duration::from_secs(60));

        assert_eq!(cache.get(&fp).unwrap().payload, "second");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = ResponseCache::new();
        cache.put("live", result("a"), Duration::from_secs(60));
        cache.put("dead", result("b"), Duration::from_millis(0));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("live").is_some());
    }

    #[test]
    fn test_invalidate() {
        let cache = ResponseCache::new();
        cache.put("key", result("a"), Duration::from_secs(60));
        assert!(cache.invalidate("key"));
        assert!(!cache.invalidate("key"));
    }
}
