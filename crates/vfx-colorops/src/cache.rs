//! Thread-safe caches of finalized artifacts.
//!
//! Each cache maps a request key to a shared, immutable artifact. A miss
//! builds the artifact while holding the cache lock, so concurrent requests
//! for the same key never build twice. Failed builds are not cached.
//!
//! ```rust
//! use vfx_colorops::cache::KeyedCache;
//!
//! let cache: KeyedCache<u32, String> = KeyedCache::new("names", true);
//! let a = cache.get_or_try_insert_with(1, || Ok("one".to_string())).unwrap();
//! let b = cache.get_or_try_insert_with(1, || Ok("uno".to_string())).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! ```

use crate::error::OpResult;
use std::collections::HashMap;
use std::env;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Environment variable that turns processor caching off.
pub const PROCESSOR_CACHE_ENV: &str = "VFX_PROCESSOR_CACHE";

/// Caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    /// Whether artifacts are cached at all.
    pub enabled: bool,
    /// Whether CPU processors holding dynamic properties may be cached.
    ///
    /// Cached processors share their property handles, so editing one
    /// edits every processor returned for the same key.
    pub share_dynamic_properties: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            share_dynamic_properties: true,
        }
    }
}

impl CacheConfig {
    /// Default policy with the environment override applied.
    ///
    /// `VFX_PROCESSOR_CACHE` set to `0`, `off` or `false` disables caching.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(PROCESSOR_CACHE_ENV) {
            if is_off(&raw) {
                debug!("processor caching disabled from environment");
                config.enabled = false;
            }
        }
        config
    }

    /// Sets [`enabled`](Self::enabled).
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets [`share_dynamic_properties`](Self::share_dynamic_properties).
    pub fn with_shared_dynamic_properties(mut self, share: bool) -> Self {
        self.share_dynamic_properties = share;
        self
    }
}

fn is_off(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "off" | "false")
}

/// Key to artifact map guarded by one mutex.
#[derive(Debug)]
pub struct KeyedCache<K, V> {
    name: &'static str,
    enabled: bool,
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> KeyedCache<K, V> {
    /// Empty cache; `name` labels log events.
    pub fn new(name: &'static str, enabled: bool) -> Self {
        Self {
            name,
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether lookups are cached.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        // entries are immutable once inserted, so a poisoned map is intact
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached artifact for `key`, built with `build` on a miss.
    ///
    /// A disabled cache builds on every call.
    pub fn get_or_try_insert_with(
        &self,
        key: K,
        build: impl FnOnce() -> OpResult<V>,
    ) -> OpResult<Arc<V>> {
        if !self.enabled {
            return build().map(Arc::new);
        }
        let mut entries = self.lock();
        if let Some(hit) = entries.get(&key) {
            debug!(cache = self.name, "cache hit");
            return Ok(Arc::clone(hit));
        }
        debug!(cache = self.name, "cache miss");
        let value = Arc::new(build()?);
        entries.insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_key_same_instance() {
        let cache = KeyedCache::new("test", true);
        let a = cache.get_or_try_insert_with(1, || Ok(vec![1])).unwrap();
        let b = cache.get_or_try_insert_with(1, || Ok(vec![2])).unwrap();
        let c = cache.get_or_try_insert_with(2, || Ok(vec![1])).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: KeyedCache<u8, u8> = KeyedCache::new("test", true);
        let err = cache.get_or_try_insert_with(0, || Err(OpError::invalid("bad")));
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_try_insert_with(0, || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn disabled_cache_always_builds() {
        let cache = KeyedCache::new("test", false);
        let a = cache.get_or_try_insert_with(1, || Ok(1)).unwrap();
        let b = cache.get_or_try_insert_with(1, || Ok(1)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_requests_build_once() {
        let cache = Arc::new(KeyedCache::new("test", true));
        let builds = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    cache
                        .get_or_try_insert_with("key", || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(*h.join().unwrap(), 42);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_values() {
        assert!(is_off("0"));
        assert!(is_off("OFF"));
        assert!(is_off(" false "));
        assert!(!is_off("1"));
        assert!(!is_off("on"));
    }
}
