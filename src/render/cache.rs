//! Render cache — content-addressed cache of rendered pages with
//! stale-while-revalidate semantics.
//!
//! Keys include the template version, so a version bump invalidates every
//! cached render at once instead of serving cross-version output. Within its
//! freshness window an entry is served as-is; past it, the entry is handed
//! out once more while the caller re-renders, then reads as a miss.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry within its freshness window.
    Fresh(String),
    /// Entry past its window, handed out exactly once; the caller serves it
    /// and refreshes the entry in the background.
    Stale(String),
    Miss,
}

struct Entry {
    html: String,
    rendered_at: Instant,
    fresh_for: Duration,
    stale_served: bool,
}

/// In-process cache of rendered pages keyed by `(slug, template_version)`.
pub struct RenderCache {
    entries: RwLock<HashMap<(String, u32), Entry>>,
}

impl RenderCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Look up a rendered page.
    pub async fn get(&self, slug: &str, template_version: u32) -> CacheLookup {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&(slug.to_string(), template_version)) else {
            return CacheLookup::Miss;
        };

        if entry.rendered_at.elapsed() <= entry.fresh_for {
            return CacheLookup::Fresh(entry.html.clone());
        }
        if !entry.stale_served {
            entry.stale_served = true;
            debug!(slug = %slug, version = template_version, "Serving stale render once");
            return CacheLookup::Stale(entry.html.clone());
        }
        CacheLookup::Miss
    }

    /// Store a rendered page, dropping any other-version entries for the slug.
    pub async fn put(&self, slug: &str, template_version: u32, html: String, fresh_for: Duration) {
        let mut entries = self.entries.write().await;
        entries.retain(|(s, v), _| s != slug || *v == template_version);
        entries.insert(
            (slug.to_string(), template_version),
            Entry {
                html,
                rendered_at: Instant::now(),
                fresh_for,
                stale_served: false,
            },
        );
    }

    /// Fire-and-forget store: the response never waits on the cache write,
    /// and a failed write never reaches the caller.
    pub fn spawn_store(
        self: &Arc<Self>,
        slug: String,
        template_version: u32,
        html: String,
        fresh_for: Duration,
    ) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            cache.put(&slug, template_version, html, fresh_for).await;
        });
    }
}
