//! In-memory caching using moka
//!
//! Holds one configuration snapshot per pricing version. Snapshots are read
//! by every configure and complexity-factor call and change only when the
//! catalog is edited, so catalog mutations invalidate the whole cache.

use moka::future::Cache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::pricing::configure::ConfigSnapshot;

/// Application cache holding configuration snapshots
#[derive(Clone)]
pub struct AppCache {
    /// Pricing version id -> active catalog rows of that version
    pub snapshots: Cache<Uuid, Arc<ConfigSnapshot>>,
}

impl AppCache {
    pub fn new() -> Self {
        Self {
            // a handful of versions are live at once; 30 min TTL, 10 min idle
            snapshots: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(30 * 60))
                .time_to_idle(Duration::from_secs(10 * 60))
                .build(),
        }
    }

    /// Entry counts, logged after each warm
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            snapshots_size: self.snapshots.entry_count(),
        }
    }

    /// Drop every snapshot; called after any catalog mutation
    pub fn invalidate_all(&self) {
        self.snapshots.invalidate_all();
        info!("Configuration cache invalidated");
    }

    /// Snapshot for a version, loading it on a miss
    pub async fn snapshot(&self, pool: &PgPool, version_id: Uuid) -> Result<Arc<ConfigSnapshot>> {
        if let Some(cached) = self.snapshots.get(&version_id).await {
            debug!("Cache HIT for configuration snapshot: {}", version_id);
            return Ok(cached);
        }

        debug!("Cache MISS for configuration snapshot: {}", version_id);
        let snapshot = Arc::new(load_snapshot(pool, version_id).await?);
        self.snapshots.insert(version_id, snapshot.clone()).await;
        Ok(snapshot)
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub snapshots_size: u64,
}

/// Read every active catalog row of a version
pub async fn load_snapshot(pool: &PgPool, version_id: Uuid) -> Result<ConfigSnapshot> {
    Ok(ConfigSnapshot {
        pricing_version_id: version_id,
        products: db::version_products(pool, version_id, true).await?,
        skus: db::version_skus(pool, version_id, true).await?,
        integration_types: db::version_integration_types(pool, version_id, true).await?,
        modules: db::version_modules(pool, version_id, true).await?,
        rules: db::version_rules(pool, version_id, true).await?,
        mature_integrations: db::active_mature_integrations(pool).await?,
    })
}

/// Start background cache warmer
///
/// Loads the current version's snapshot on startup and every 10 minutes.
pub async fn start_cache_warmer(cache: AppCache, db: PgPool) {
    let mut interval = interval(Duration::from_secs(10 * 60));
    loop {
        interval.tick().await;
        warm_cache(&cache, &db).await;
    }
}

async fn warm_cache(cache: &AppCache, pool: &PgPool) {
    let current = match db::find_current_pricing_version(pool).await {
        Ok(Some(version)) => version,
        Ok(None) => return,
        Err(e) => {
            warn!("Failed to look up current pricing version: {}", e);
            return;
        }
    };

    match load_snapshot(pool, current.id).await {
        Ok(snapshot) => {
            cache.snapshots.insert(current.id, Arc::new(snapshot)).await;
            info!(
                "Warmed configuration snapshot for {}. Stats: {:?}",
                current.version_number,
                cache.stats()
            );
        }
        Err(e) => warn!("Failed to warm configuration snapshot: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_all_empties_cache() {
        let cache = AppCache::new();
        let id = Uuid::new_v4();
        cache
            .snapshots
            .insert(id, Arc::new(ConfigSnapshot::default()))
            .await;
        assert!(cache.snapshots.get(&id).await.is_some());

        cache.invalidate_all();
        assert!(cache.snapshots.get(&id).await.is_none());
    }
}
