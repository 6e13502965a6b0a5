use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::CacheSettings;
use crate::models::GroupId;
use crate::observability::get_metrics;
use crate::repositories::LedgerHead;
use crate::services::projector::Projection;

/// Cache statistics for monitoring.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.get_hits();
        let total = hits + self.get_misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn get_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn get_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn get_invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
struct CachedProjection {
    head: LedgerHead,
    projection: Projection,
}

/// Last projection computed per group, served only while the group's ledger
/// head is unchanged.
#[derive(Debug)]
pub struct ProjectionCache {
    settings: CacheSettings,
    entries: RwLock<HashMap<GroupId, CachedProjection>>,
    stats: Arc<CacheStats>,
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl ProjectionCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            entries: RwLock::new(HashMap::new()),
            stats: Arc::new(CacheStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Cached projection for `group_id`, if it was computed at exactly `head`.
    pub async fn get(&self, group_id: &GroupId, head: &LedgerHead) -> Option<Projection> {
        if !self.settings.enabled {
            return None;
        }

        let found = self
            .entries
            .read()
            .await
            .get(group_id)
            .filter(|cached| cached.head == *head)
            .map(|cached| cached.projection.clone());

        let hit = found.is_some();
        if hit {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        get_metrics().record_cache_lookup(hit);
        tracing::trace!(group_id = %group_id, hit, "Projection cache lookup");
        found
    }

    pub async fn put(&self, head: LedgerHead, projection: Projection) {
        if !self.settings.enabled {
            return;
        }

        let group_id = projection.group_id.clone();
        self.entries
            .write()
            .await
            .insert(group_id, CachedProjection { head, projection });
    }

    pub async fn invalidate(&self, group_id: &GroupId) {
        if self.entries.write().await.remove(group_id).is_some() {
            self.stats.record_invalidation();
            get_metrics().record_cache_invalidation();
            tracing::debug!(group_id = %group_id, "Projection cache invalidated");
        }
    }
}
