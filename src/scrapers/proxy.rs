//! Round-robin proxy rotation.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotates through a fixed set of proxy URLs.
///
/// With an empty set, `next` always returns None and scrapers connect
/// directly. Thread-safe; a single instance is shared across scrapers.
pub struct ProxyRotation {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyRotation {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// The next proxy URL in rotation, or None when no proxies are
    /// configured.
    pub fn next(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(&self.proxies[idx])
    }
}
