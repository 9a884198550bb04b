use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{RankingError, RankingResult};
use crate::storage::MemoryCache;
use crate::wta::client::RankingSource;
use crate::wta::ranking::ScrapedRanking;

/// Cache-aside access to the live ranking.
#[derive(Clone)]
pub struct PlayerDataService {
    cache: MemoryCache,
    source: Arc<dyn RankingSource>,
}

impl PlayerDataService {
    pub fn new(cache: MemoryCache, source: Arc<dyn RankingSource>) -> Self {
        PlayerDataService { cache, source }
    }

    /// Cached ranking, scraping it on a miss. Upstream failures are returned
    /// as-is and leave the cache untouched.
    pub async fn try_ranking(&self) -> RankingResult<Arc<ScrapedRanking>> {
        if let Some(ranking) = self.cache.get().await {
            debug!(scraped_at = %ranking.timestamp, "Serving cached ranking.");
            return Ok(ranking);
        }

        let source = self.source.clone();
        self.cache
            .get_or_try_insert_with(async move {
                info!("Ranking not cached, scraping live ranking page.");
                let ranking = source.ranking().await?;
                info!(players = ranking.len(), "Live ranking scraped.");
                Ok::<_, RankingError>(Arc::new(ranking))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// All players, or an empty list when the ranking could not be scraped.
    pub async fn players(&self) -> Arc<ScrapedRanking> {
        match self.try_ranking().await {
            Ok(ranking) => ranking,
            Err(e) => {
                error!("Could not scrape live ranking. {e}");
                Arc::new(ScrapedRanking::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wta::ranking::{parse_ranking, Player};
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted results and counts upstream calls.
    struct ScriptedSource {
        calls: AtomicUsize,
        results: Mutex<VecDeque<RankingResult<Vec<Player>>>>,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(results: Vec<RankingResult<Vec<Player>>>) -> Arc<Self> {
            Arc::new(ScriptedSource {
                calls: AtomicUsize::new(0),
                results: Mutex::new(results.into()),
                delay: Duration::ZERO,
            })
        }

        fn slow(results: Vec<RankingResult<Vec<Player>>>, delay: Duration) -> Arc<Self> {
            Arc::new(ScriptedSource {
                calls: AtomicUsize::new(0),
                results: Mutex::new(results.into()),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RankingSource for ScriptedSource {
        async fn ranking(&self) -> RankingResult<ScrapedRanking> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let next = self
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RankingError::Http("script exhausted".to_string())));
            next.map(ScrapedRanking::new)
        }
    }

    fn top_two() -> Vec<Player> {
        vec![
            Player::new(1, "Iga Swiatek", 9665),
            Player::new(2, "Aryna Sabalenka", 8716),
        ]
    }

    fn service(source: Arc<ScriptedSource>, sliding_expiration: Duration) -> PlayerDataService {
        PlayerDataService::new(MemoryCache::new(sliding_expiration), source)
    }

    #[tokio::test]
    async fn second_call_within_the_window_is_served_from_cache() {
        let source = ScriptedSource::new(vec![Ok(top_two()), Ok(vec![])]);
        let service = service(source.clone(), Duration::from_secs(600));

        let first = service.players().await;
        let second = service.players().await;

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.players, top_two());
    }

    #[tokio::test]
    async fn call_after_the_idle_window_scrapes_again() {
        let source = ScriptedSource::new(vec![Ok(top_two()), Ok(top_two())]);
        let service = service(source.clone(), Duration::from_millis(100));

        service.players().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        service.players().await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_yields_an_empty_list_and_is_not_cached() {
        let source = ScriptedSource::new(vec![
            Err(RankingError::Http("503 Service Unavailable".to_string())),
            Ok(top_two()),
        ]);
        let service = service(source.clone(), Duration::from_secs(600));

        let failed = service.players().await;
        assert!(failed.is_empty());

        let recovered = service.players().await;
        assert_eq!(recovered.players, top_two());
        assert_eq!(source.calls(), 2);

        service.players().await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn explicit_result_keeps_the_failure_cause() {
        let source = ScriptedSource::new(vec![Err(RankingError::Parse(
            "row 0: invalid rank 'T1'".to_string(),
        ))]);
        let service = service(source, Duration::from_secs(600));

        let result = service.try_ranking().await;

        assert_eq!(
            result.unwrap_err(),
            RankingError::Parse("row 0: invalid rank 'T1'".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_row_empties_the_whole_cycle() {
        let document = {
            use crate::wta::ranking::fixtures::{page, row, spacer};
            page(&[row("1", "A", "100"), spacer(), row("2", "B", "oops")])
        };
        let source = ScriptedSource::new(vec![parse_ranking(&document)]);
        let service = service(source, Duration::from_secs(600));

        assert!(service.players().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_upstream_fetch() {
        let source = ScriptedSource::slow(vec![Ok(top_two())], Duration::from_millis(100));
        let service = service(source.clone(), Duration::from_secs(600));

        let rankings = join_all((0..8).map(|_| service.players())).await;

        assert_eq!(source.calls(), 1);
        assert!(rankings.iter().all(|r| r.players == top_two()));
    }
}
