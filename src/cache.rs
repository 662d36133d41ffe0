use crate::identity::{CacheKey, PackageIdentity};
use image::RgbaImage;
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Memory-bounded store of rasterized icons.
///
/// Entries are keyed by [`CacheKey`] (identity at one size) and evicted
/// least-recently-used once the total bitmap byte size exceeds the budget.
/// Alongside the main store, a secondary index from identity to its live
/// keys enables targeted invalidation of one identity across all sizes,
/// so setting or removing a custom icon doesn't have to drop the world.
///
/// Safe to share between the UI thread and a background worker; all access
/// goes through one internal lock. Never does I/O, never panics on use.
///
/// # Example
///
/// ```
/// use appicon::{CacheKey, IconCache, IconRequest, PackageIdentity};
/// use image::RgbaImage;
/// use std::sync::Arc;
///
/// let cache = IconCache::for_max_memory(256 * 1024 * 1024);
/// let key = CacheKey::new(&IconRequest::sized(PackageIdentity::package("com.example.app"), 48));
///
/// cache.put(key.clone(), Arc::new(RgbaImage::new(48, 48)));
/// assert!(cache.get(&key).is_some());
/// ```
pub struct IconCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: LruCache<CacheKey, Arc<RgbaImage>>,
    by_identity: HashMap<PackageIdentity, HashSet<CacheKey>>,
    used_bytes: usize,
    budget_bytes: usize,
}

fn bitmap_cost(bitmap: &RgbaImage) -> usize {
    bitmap.as_raw().len()
}

impl IconCache {
    /// Create a cache holding at most `budget_bytes` of bitmap data.
    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                by_identity: HashMap::new(),
                used_bytes: 0,
                budget_bytes,
            }),
        }
    }

    /// Create a cache sized for a runtime with `max_memory_bytes` available,
    /// dedicating one eighth of it to icons.
    pub fn for_max_memory(max_memory_bytes: usize) -> Self {
        Self::with_budget(max_memory_bytes / 8)
    }

    /// Look up a cached bitmap, promoting it to most-recently-used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RgbaImage>> {
        let mut inner = self.lock();
        inner.entries.get(key).cloned()
    }

    /// Insert a bitmap, evicting least-recently-used entries until the
    /// total size is back under budget.
    ///
    /// At most one entry exists per key; inserting over an existing key
    /// replaces it.
    pub fn put(&self, key: CacheKey, bitmap: Arc<RgbaImage>) {
        let mut inner = self.lock();

        if let Some(previous) = inner.entries.put(key.clone(), Arc::clone(&bitmap)) {
            inner.used_bytes -= bitmap_cost(&previous);
        }
        inner.used_bytes += bitmap_cost(&bitmap);
        inner
            .by_identity
            .entry(key.identity.clone())
            .or_default()
            .insert(key);

        while inner.used_bytes > inner.budget_bytes {
            let Some((evicted_key, evicted)) = inner.entries.pop_lru() else {
                break;
            };

            inner.used_bytes -= bitmap_cost(&evicted);
            inner.unindex(&evicted_key);
        }
    }

    /// Drop every cached bitmap for one identity, at every size.
    pub fn invalidate_identity(&self, identity: &PackageIdentity) {
        let mut inner = self.lock();

        let Some(keys) = inner.by_identity.remove(identity) else {
            return;
        };

        for key in keys {
            if let Some(evicted) = inner.entries.pop(&key) {
                inner.used_bytes -= bitmap_cost(&evicted);
            }
        }
    }

    /// Drop every cached bitmap. Used when per-key invalidation would be
    /// unsound, such as after an icon pack switch that may remap anything.
    pub fn invalidate_all(&self) {
        let mut inner = self.lock();

        inner.entries.clear();
        inner.by_identity.clear();
        inner.used_bytes = 0;
    }

    /// Number of cached bitmaps.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Total byte size of all cached bitmaps.
    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    /// The configured byte budget.
    pub fn budget_bytes(&self) -> usize {
        self.lock().budget_bytes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // a panic mid-insert leaves no dangling state worse than a stale
        // entry, so recover the guard rather than poisoning every caller
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for IconCache {
    fn default() -> Self {
        // assume a modest 256 MiB runtime when the composition root
        // doesn't tell us better
        Self::for_max_memory(256 * 1024 * 1024)
    }
}

impl CacheInner {
    fn unindex(&mut self, key: &CacheKey) {
        if let Some(keys) = self.by_identity.get_mut(&key.identity) {
            keys.remove(key);

            if keys.is_empty() {
                self.by_identity.remove(&key.identity);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::cache::IconCache;
    use crate::identity::{CacheKey, IconRequest, PackageIdentity};
    use crate::platform::test::solid;
    use std::sync::Arc;

    fn key(package: &str, size: u32) -> CacheKey {
        CacheKey::new(&IconRequest::sized(PackageIdentity::package(package), size))
    }

    #[test]
    fn test_get_returns_what_was_put() {
        let cache = IconCache::with_budget(1024 * 1024);
        let bitmap = Arc::new(solid([1, 2, 3, 255], 16));

        cache.put(key("com.example.app", 16), Arc::clone(&bitmap));

        let hit = cache.get(&key("com.example.app", 16)).unwrap();
        assert_eq!(*hit, *bitmap);
    }

    #[test]
    fn test_one_entry_per_key() {
        let cache = IconCache::with_budget(1024 * 1024);

        cache.put(key("com.example.app", 16), Arc::new(solid([1, 1, 1, 255], 16)));
        cache.put(key("com.example.app", 16), Arc::new(solid([2, 2, 2, 255], 16)));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 16 * 16 * 4);

        let hit = cache.get(&key("com.example.app", 16)).unwrap();
        assert_eq!(hit.get_pixel(0, 0).0, [2, 2, 2, 255]);
    }

    #[test]
    fn test_eviction_under_pressure_prefers_recent() {
        // room for three 16x16 bitmaps (1024 bytes each), not four
        let cache = IconCache::with_budget(3 * 16 * 16 * 4);

        for package in ["app.a", "app.b", "app.c"] {
            cache.put(key(package, 16), Arc::new(solid([0, 0, 0, 255], 16)));
        }

        // touch the oldest so it becomes the most recent
        assert!(cache.get(&key("app.a", 16)).is_some());

        cache.put(key("app.d", 16), Arc::new(solid([0, 0, 0, 255], 16)));

        assert!(cache.used_bytes() <= cache.budget_bytes());
        assert!(cache.get(&key("app.a", 16)).is_some(), "recently used survives");
        assert!(cache.get(&key("app.b", 16)).is_none(), "least recently used is evicted");
        assert!(cache.get(&key("app.d", 16)).is_some());
    }

    #[test]
    fn test_invalidate_identity_hits_every_size() {
        let cache = IconCache::with_budget(1024 * 1024);
        let target = PackageIdentity::package("app.target");

        cache.put(key("app.target", 16), Arc::new(solid([1, 1, 1, 255], 16)));
        cache.put(key("app.target", 32), Arc::new(solid([1, 1, 1, 255], 32)));
        cache.put(key("app.other", 16), Arc::new(solid([1, 1, 1, 255], 16)));

        cache.invalidate_identity(&target);

        assert!(cache.get(&key("app.target", 16)).is_none());
        assert!(cache.get(&key("app.target", 32)).is_none());
        assert!(cache.get(&key("app.other", 16)).is_some(), "other identities untouched");
        assert_eq!(cache.used_bytes(), 16 * 16 * 4);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = IconCache::with_budget(1024 * 1024);

        cache.put(key("app.a", 16), Arc::new(solid([1, 1, 1, 255], 16)));
        cache.put(key("app.b", 16), Arc::new(solid([1, 1, 1, 255], 16)));

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn test_byte_accounting_across_eviction() {
        let cache = IconCache::with_budget(2 * 16 * 16 * 4);

        for package in ["app.a", "app.b", "app.c", "app.d"] {
            cache.put(key(package, 16), Arc::new(solid([0, 0, 0, 255], 16)));
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.used_bytes(), 2 * 16 * 16 * 4);
    }
}
