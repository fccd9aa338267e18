//! Process-wide cache of generated story templates.
//!
//! Keys are digests of the non-personal request fields only, so every child
//! asking for the same theme, focus, difficulty and part shares one entry.
//! Entries expire after a TTL and are removed lazily on lookup; there is no
//! background sweeper. Concurrent writers to the same key are resolved as
//! last-writer-wins, which is fine because such payloads are interchangeable.

use crate::content::{GeneratedContent, GenerationRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default time-to-live of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Digest identifying one cacheable request.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `request` under the given prompt-template fingerprint.
    ///
    /// Only the request's own fields and the fingerprint feed the digest.
    pub fn derive(request: &GenerationRequest, template_fingerprint: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"story-cache\x1f");
        hasher.update(template_fingerprint.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(request.theme.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(request.learning_focus.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(request.difficulty.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(request.part_index.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", &self.0[..12.min(self.0.len())])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored template. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: GeneratedContent,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is expired once strictly more than `ttl` has passed.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Cache tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds an entry stays servable.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub stores: u64,
}

/// TTL cache shared by every session in the process.
pub struct GenerationCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    stores: AtomicU64,
}

impl GenerationCache {
    /// Create a cache using the wall clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl())
    }

    // A panic while holding the lock cannot leave a half-written entry
    // behind, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a live entry. Expired entries are removed and reported absent.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let found = entries.get(key).map(|entry| {
            if entry.is_expired(now, self.ttl) {
                None
            } else {
                Some(entry.clone())
            }
        });

        match found {
            Some(None) => {
                entries.remove(key);
                drop(entries);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, "cache entry expired");
                None
            }
            Some(Some(entry)) => {
                drop(entries);
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, "cache hit");
                Some(entry)
            }
            None => {
                drop(entries);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, "cache miss");
                None
            }
        }
    }

    /// Store `payload` under `key`, replacing whatever was there.
    pub fn store(&self, key: CacheKey, payload: GeneratedContent) -> CacheEntry {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            created_at: self.clock.now(),
        };
        self.lock().insert(key, entry.clone());
        self.stores.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = ?entry.key, "cache store");
        entry
    }

    /// Number of entries currently held, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }

    /// Every stored payload, for inspection.
    pub fn payloads(&self) -> Vec<GeneratedContent> {
        self.lock().values().map(|e| e.payload.clone()).collect()
    }
}

impl Default for GenerationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl fmt::Debug for GenerationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}
