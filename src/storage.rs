use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RankingError;
use crate::wta::ranking::ScrapedRanking;

/// The only key in the cache, the service holds a single ranking.
pub const PLAYER_DATA_KEY: &str = "PlayerData";

type SharedRanking = Arc<ScrapedRanking>;

/// Process-wide ranking cache with sliding expiration: every read resets the
/// entry's idle timer. Clones share the same underlying storage.
#[derive(Clone)]
pub struct MemoryCache {
    data: Cache<&'static str, SharedRanking>,
}

impl MemoryCache {
    pub fn new(sliding_expiration: Duration) -> MemoryCache {
        MemoryCache {
            data: Cache::builder()
                .max_capacity(1)
                .time_to_idle(sliding_expiration)
                .build(),
        }
    }

    pub async fn get(&self) -> Option<SharedRanking> {
        self.data.get(PLAYER_DATA_KEY).await
    }

    /// Returns the cached ranking, or runs `init` to produce it.
    ///
    /// Concurrent callers missing at the same time share a single `init` run.
    /// Errors are handed back to every waiting caller and never stored.
    pub async fn get_or_try_insert_with<F>(&self, init: F) -> Result<SharedRanking, Arc<RankingError>>
    where
        F: Future<Output = Result<SharedRanking, RankingError>>,
    {
        self.data.try_get_with(PLAYER_DATA_KEY, init).await
    }
}
