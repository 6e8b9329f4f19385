//! High-Performance In-Memory Cache Module
//!
//! Thread-safe caching layer untuk hasil fetch provider (holders, activity,
//! klasifikasi kontrak). Menggunakan DashMap untuk concurrent access tanpa
//! lock contention.
//!
//! Features:
//! - TTL-based expiration (5 menit default)
//! - Cache key menggabungkan address (lowercase), nama operasi, dan semua
//!   parameter yang mempengaruhi hasil (page size, limit)
//! - Cache HIT/MISS logging + statistik
//! - Entries immutable setelah ditulis; dua concurrent miss boleh sama-sama
//!   fetch (at-most-duplicated-work, bukan single-flight)

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::errors::AppResult;
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// Cache entry dengan timestamp untuk TTL validation
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Cached value, serialized once at insert time
    pub value: serde_json::Value,
    /// Waktu saat entry dibuat
    pub created_at: Instant,
    /// TTL dalam detik
    pub ttl_secs: u64,
}

impl CacheEntry {
    /// Cek apakah entry sudah expired
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > Duration::from_secs(self.ttl_secs)
    }

    /// Sisa waktu sebelum expired (dalam detik)
    pub fn remaining_ttl(&self) -> u64 {
        let elapsed = self.created_at.elapsed().as_secs();
        self.ttl_secs.saturating_sub(elapsed)
    }
}

/// Build a cache key from the normalized token address, the logical
/// operation name, and every parameter that affects the result.
/// Two calls with different limits never share a slot.
pub fn cache_key(operation: &str, address: &str, params: &[&str]) -> String {
    let mut key = format!("{}_{}", operation, address.to_lowercase());
    for param in params {
        key.push('_');
        key.push_str(param);
    }
    key
}

/// Shared TTL cache over JSON values
/// Thread-safe tanpa explicit locking
#[derive(Clone)]
pub struct ScoreCache {
    /// Internal storage: key -> CacheEntry
    store: Arc<DashMap<String, CacheEntry>>,
    /// TTL default dalam detik
    ttl_secs: u64,
    /// Counter untuk statistik
    hits: Arc<std::sync::atomic::AtomicU64>,
    misses: Arc<std::sync::atomic::AtomicU64>,
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreCache {
    /// Buat cache baru dengan TTL default (5 menit)
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL_SECS)
    }

    /// Buat cache dengan custom TTL
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl_secs,
            hits: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            misses: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Get dari cache dengan TTL validation
    /// Returns Some(value) jika cache HIT dan belum expired
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(entry) = self.store.get(key) {
            if entry.is_expired() {
                // Entry expired, hapus dan return None
                drop(entry); // Release read lock
                self.store.remove(key);
                self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            } else {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!("✅ CACHE HIT: {} (TTL: {}s remaining)", key, entry.remaining_ttl());
                serde_json::from_value(entry.value.clone()).ok()
            }
        } else {
            self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            debug!("📭 CACHE MISS: {}", key);
            None
        }
    }

    /// Set ke cache dengan TTL default
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        self.set_json_with_ttl(key, value, self.ttl_secs);
    }

    /// Set ke cache dengan custom TTL
    pub fn set_json_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let serialized = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                debug!("⚠️ CACHE SET skipped, serialization failed for {}: {}", key, e);
                return;
            }
        };
        let entry = CacheEntry {
            value: serialized,
            created_at: Instant::now(),
            ttl_secs,
        };
        self.store.insert(key.to_string(), entry);
        debug!("💾 CACHE SET: {} (TTL: {}s)", key, ttl_secs);
    }

    /// Memoize an async fetch under a key. On a hit the stored value is
    /// returned without running the closure; on a miss the closure runs and a
    /// successful result is stored. Errors are never cached.
    pub async fn with_cache<T, F, Fut>(&self, key: &str, ttl_secs: u64, fetch: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(cached) = self.get_json::<T>(key) {
            return Ok(cached);
        }

        let value = fetch().await?;
        self.set_json_with_ttl(key, &value, ttl_secs);
        Ok(value)
    }

    /// Hapus entry dari cache
    #[allow(dead_code)]
    pub fn invalidate(&self, key: &str) {
        self.store.remove(key);
        debug!("🗑️ CACHE INVALIDATE: {}", key);
    }

    /// Bersihkan semua entry yang expired
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before - self.store.len();
        if removed > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    /// Get statistik cache
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(std::sync::atomic::Ordering::Relaxed);
        let misses = self.misses.load(std::sync::atomic::Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl_secs,
        }
    }

    /// Clear semua cache
    #[allow(dead_code)]
    pub fn clear(&self) {
        self.store.clear();
        info!("🗑️ CACHE CLEARED");
    }
}

/// Statistik cache untuk monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;

    #[test]
    fn test_cache_set_get() {
        let cache = ScoreCache::new();
        let key = cache_key("holders", "0xdAC17F958D2ee523a2206206994597C13D831ec7", &["10"]);

        cache.set_json(&key, &vec![1u64, 2, 3]);

        let result: Option<Vec<u64>> = cache.get_json(&key);
        assert_eq!(result, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_key_includes_params() {
        // Calls with different limits must not share a slot
        let a = cache_key("activity", "0xAbC", &["100"]);
        let b = cache_key("activity", "0xAbC", &["500"]);
        assert_ne!(a, b);

        // Address normalization: case differences map to the same slot
        let c = cache_key("activity", "0xabc", &["100"]);
        assert_eq!(a, c);
    }

    #[test]
    fn test_cache_miss() {
        let cache = ScoreCache::new();
        let result: Option<u64> = cache.get_json("nonexistent");
        assert!(result.is_none());
    }

    #[test]
    fn test_cache_stats() {
        let cache = ScoreCache::new();
        cache.set_json("k", &42u64);
        let _: Option<u64> = cache.get_json("k"); // HIT
        let _: Option<u64> = cache.get_json("other"); // MISS

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_entry_evicted_on_read() {
        let cache = ScoreCache::with_ttl(0);
        cache.set_json("k", &1u64);
        std::thread::sleep(Duration::from_millis(5));

        let result: Option<u64> = cache.get_json("k");
        assert!(result.is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_with_cache_memoizes() {
        let cache = ScoreCache::new();
        let key = cache_key("op", "0xToken", &[]);

        let first = cache
            .with_cache(&key, 60, || async { Ok::<_, AppError>(7u64) })
            .await
            .unwrap();
        assert_eq!(first, 7);

        // Second call must come from cache, not the closure
        let second = cache
            .with_cache(&key, 60, || async {
                Err::<u64, _>(AppError::network("should not run"))
            })
            .await
            .unwrap();
        assert_eq!(second, 7);
    }

    #[tokio::test]
    async fn test_with_cache_never_caches_errors() {
        let cache = ScoreCache::new();
        let key = cache_key("op", "0xToken", &["err"]);

        let result = cache
            .with_cache(&key, 60, || async {
                Err::<u64, _>(AppError::rate_limited())
            })
            .await;
        assert!(result.is_err());

        // Next call still runs the closure
        let ok = cache
            .with_cache(&key, 60, || async { Ok::<_, AppError>(9u64) })
            .await
            .unwrap();
        assert_eq!(ok, 9);
    }
}
