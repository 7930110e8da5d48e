// src/crawl/dedup.rs
// =============================================================================
// First-seen-wins membership sets, one per asset category.
//
// Every discovery channel runs concurrently, so whether an asset gets
// reported must hinge on a single atomic operation: insert_if_absent
// returns true for exactly one caller per key. Callers never inspect the
// sets any other way - check-then-insert as two steps would race.
//
// All URL-shaped assets (anchors, robots paths, sitemap entries, historical
// URLs) share the Urls set, which is what keeps a URL discovered by two
// channels from being reported twice.
// =============================================================================

use std::collections::HashSet;
use std::sync::Mutex;

/// The four dedup categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Urls,
    Subdomains,
    Scripts,
    Forms,
}

/// Concurrency-safe dedup store for one crawl instance.
#[derive(Debug, Default)]
pub struct AssetDedup {
    urls: Mutex<HashSet<String>>,
    subdomains: Mutex<HashSet<String>>,
    scripts: Mutex<HashSet<String>>,
    forms: Mutex<HashSet<String>>,
}

impl AssetDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts `key` into the category set. Returns true only on
    /// the call that performed the insertion; every other concurrent or
    /// later call with the same key returns false.
    pub fn insert_if_absent(&self, category: Category, key: &str) -> bool {
        let set = match category {
            Category::Urls => &self.urls,
            Category::Subdomains => &self.subdomains,
            Category::Scripts => &self.scripts,
            Category::Forms => &self.forms,
        };
        let mut set = match set.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.insert(key.to_string())
    }
}
