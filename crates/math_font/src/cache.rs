//! Shared metric table cache
//!
//! Central, lazily-populated store of [`FontMetricsTable`]s keyed by font
//! name. Readers share a read lock; populating a missing entry runs the
//! loader outside the lock and inserts under the write lock, so concurrent
//! requesters for the same font all end up with the same `Arc`.

use crate::{FontError, FontMetricsTable, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Cache key of the built-in table
pub const BUILTIN_FONT: &str = "builtin";

static GLOBAL_CACHE: OnceLock<FontCache> = OnceLock::new();

/// Cache of loaded metric tables
#[derive(Debug, Clone, Default)]
pub struct FontCache {
    /// Loaded tables (font name -> table)
    tables: Arc<RwLock<HashMap<String, Arc<FontMetricsTable>>>>,
}

impl FontCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> &'static FontCache {
        GLOBAL_CACHE.get_or_init(FontCache::new)
    }

    /// Look up an already loaded table
    pub fn get(&self, name: &str) -> Option<Arc<FontMetricsTable>> {
        // Entries are immutable once inserted, so a poisoned map is still consistent.
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(name).cloned()
    }

    /// Return the cached table for `name`, loading it on first use
    ///
    /// If two callers race to load the same font, the first insert wins and
    /// the other caller's table is dropped in favour of the winner's.
    pub fn get_or_load<F>(&self, name: &str, loader: F) -> Result<Arc<FontMetricsTable>>
    where
        F: FnOnce() -> Result<FontMetricsTable>,
    {
        if let Some(table) = self.get(name) {
            return Ok(table);
        }

        Ok(self.insert(name, loader()?))
    }

    /// Return the cached table for `name`, failing if it was never loaded
    pub fn require(&self, name: &str) -> Result<Arc<FontMetricsTable>> {
        self.get(name).ok_or_else(|| FontError::FontNotFound(name.to_string()))
    }

    /// Load a table from JSON and cache it under `name`
    pub fn load_json(&self, name: &str, json: &str) -> Result<Arc<FontMetricsTable>> {
        self.get_or_load(name, || FontMetricsTable::from_json(json))
    }

    /// The built-in table, populated on first use
    pub fn builtin(&self) -> Arc<FontMetricsTable> {
        match self.get(BUILTIN_FONT) {
            Some(table) => table,
            None => self.insert(BUILTIN_FONT, FontMetricsTable::builtin()),
        }
    }

    /// Insert unless another caller got there first; returns the cached table
    fn insert(&self, name: &str, table: FontMetricsTable) -> Arc<FontMetricsTable> {
        let loaded = Arc::new(table);
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let entry = tables.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(target: "math_font::cache", font = name, "metrics table populated");
            Arc::clone(&loaded)
        });
        if !Arc::ptr_eq(entry, &loaded) {
            tracing::trace!(target: "math_font::cache", font = name, "lost population race, reusing cached table");
        }
        Arc::clone(entry)
    }

    /// Whether a table is cached under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_or_load_caches() {
        let cache = FontCache::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(FontMetricsTable::builtin())
        };

        let first = cache.get_or_load("lm", load).unwrap();
        let second = cache
            .get_or_load("lm", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(FontMetricsTable::builtin())
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = FontCache::new();
        let result = cache.get_or_load("broken", || Err(FontError::InvalidTable("broken".into())));
        assert!(result.is_err());
        assert!(!cache.contains("broken"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_population_shares_one_table() {
        let cache = FontCache::new();
        let tables: Vec<Arc<FontMetricsTable>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = cache.clone();
                    scope.spawn(move || {
                        cache
                            .get_or_load("shared", || Ok(FontMetricsTable::builtin()))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(tables.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_json() {
        let cache = FontCache::new();
        let json = FontMetricsTable::builtin().to_json().unwrap();
        let table = cache.load_json("from-json", &json).unwrap();
        assert_eq!(table.units_per_em, 1000);
        assert!(cache.contains("from-json"));
    }

    #[test]
    fn test_builtin_is_shared() {
        let cache = FontCache::new();
        assert!(Arc::ptr_eq(&cache.builtin(), &cache.builtin()));
    }

    #[test]
    fn test_require_missing_font() {
        let cache = FontCache::new();
        let err = cache.require("lm").unwrap_err();
        assert!(matches!(err, FontError::FontNotFound(ref name) if name == "lm"));
    }

    #[test]
    fn test_builtin_and_loader_share_entry() {
        let cache = FontCache::new();
        let builtin = cache.builtin();
        let loaded = cache
            .get_or_load(BUILTIN_FONT, || Err(FontError::InvalidTable("loader must not run".into())))
            .unwrap();
        assert!(Arc::ptr_eq(&builtin, &loaded));
        assert!(Arc::ptr_eq(&builtin, &cache.require(BUILTIN_FONT).unwrap()));
        assert_eq!(cache.len(), 1);
    }
}
