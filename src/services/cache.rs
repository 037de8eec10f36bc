use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Key prefix of cached index pages.
pub const INDEX_PAGE_PREFIX: &str = "index_page";

/// In-memory cache of rendered pages with a fixed time-to-live.
///
/// Entries are not invalidated on writes; a new post shows up on a cached
/// page once the entry expires.
pub struct PageCache {
    entries: RwLock<HashMap<String, (Instant, String)>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.read().unwrap();
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, html)| html.clone())
    }

    pub fn insert(&self, key: String, html: String) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), html));
    }

    pub fn cleanup(&self) {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key of an index page: the resolved page number and the viewer,
/// since the navigation bar differs per user.
pub fn index_page_key(page: usize, viewer: Option<&str>) -> String {
    format!("{}:{}:{}", INDEX_PAGE_PREFIX, page, viewer.unwrap_or("anonymous"))
}
