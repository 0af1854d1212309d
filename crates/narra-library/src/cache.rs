//! Short-TTL in-memory cache for library views, keyed by view name.
//! Write-through invalidation on session mutation is deliberately not
//! attempted; the TTL bounds staleness and backfill invalidates
//! explicitly.

use std::time::Duration;

use moka::sync::Cache;

use narra_core::models::library::{AdvancedStats, LibraryEntry, LibraryStats};

const CACHE_TTL: Duration = Duration::from_secs(30);
const CACHE_CAPACITY: u64 = 256;

#[derive(Clone)]
pub enum CachedView {
    Entries(Vec<LibraryEntry>),
    Stats(LibraryStats),
    Advanced(AdvancedStats),
}

pub struct ViewCache {
    inner: Cache<String, CachedView>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedView> {
        self.inner.get(key)
    }

    pub fn put(&self, key: &str, view: CachedView) {
        self.inner.insert(key.to_string(), view);
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}
