//! Price Refresh Sync Job
//!
//! Periodically pulls the catalog's prices from CoinGecko and replaces the
//! stored snapshot. Runs once on startup, then on a fixed interval. A failed
//! tick is logged and the next tick retries naturally.
//! Supports graceful shutdown via SIGINT.

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::services::refresh::RefreshPipeline;

/// Shortest accepted period; `tokio::time::interval` panics on zero
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Optional history sweep run after each successful refresh
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub keep: chrono::Duration,
}

/// Spawn the refresh loop. Periods below [`MIN_REFRESH_INTERVAL`] are raised to it.
pub fn start_price_refresh_job(
    pipeline: RefreshPipeline,
    every: Duration,
    retention: Option<RetentionPolicy>,
) -> JoinHandle<()> {
    if every < MIN_REFRESH_INTERVAL {
        warn!(
            requested_ms = every.as_millis() as u64,
            "Refresh interval too short, using minimum"
        );
    }
    let every = every.max(MIN_REFRESH_INTERVAL);

    tokio::spawn(async move {
        info!(
            interval_secs = every.as_secs(),
            retention_hours = retention.map(|r| r.keep.num_hours()),
            "Price refresh job started"
        );

        let mut interval = interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping price refresh job");
                    break;
                }
                // First tick completes immediately, so this also covers the startup run
                _ = interval.tick() => {
                    run_tick(&pipeline, retention).await;
                }
            }
        }

        info!("Price refresh job stopped");
    })
}

async fn run_tick(pipeline: &RefreshPipeline, retention: Option<RetentionPolicy>) {
    info!("Starting scheduled price refresh");

    match pipeline.refresh().await {
        Ok(records) => {
            info!(count = records.len(), "Scheduled price refresh completed");
        }
        Err(e) => {
            error!(error = %e, "Scheduled price refresh failed");
            return;
        }
    }

    if let Some(policy) = retention {
        let cutoff = pipeline.clock().now() - policy.keep;
        match pipeline.store().prune_history(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!(removed = removed, cutoff = %cutoff, "Pruned price history"),
            Err(e) => warn!(error = %e, "Price history sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::crypto::{PriceQuote, PriceRecord};
    use crate::services::catalog::{AssetId, Catalog};
    use crate::services::clock::FixedClock;
    use crate::services::coingecko::PriceSource;
    use crate::services::snapshot_store::{InMemorySnapshotStore, SnapshotStore};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails every odd call, counts all of them
    struct FlakySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for FlakySource {
        async fn fetch_latest(&self, catalog: &Catalog) -> Result<Vec<PriceQuote>, AppError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(AppError::AcquisitionFailed("upstream down".to_string()));
            }
            Ok(catalog
                .assets()
                .iter()
                .map(|asset| PriceQuote {
                    asset: asset.clone(),
                    price_usd: 100.0 + n as f64,
                    market_cap_usd: 1.0,
                    change_24h_pct: 0.0,
                })
                .collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_continue_after_failures() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(InMemorySnapshotStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap(),
        ));
        let pipeline =
            RefreshPipeline::new(source.clone(), store.clone(), Catalog::tracked(), clock);

        let every = Duration::from_secs(7200);
        let handle = start_price_refresh_job(pipeline, every, None);

        // Ticks at 0, 2h (fails), 4h
        tokio::time::sleep(every * 2 + Duration::from_secs(60)).await;
        handle.abort();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        // Two successful batches of three assets
        assert_eq!(store.history_len(), 6);

        let btc = Catalog::tracked().resolve("bitcoin").unwrap();
        let latest = store.find_latest(&btc).await.unwrap().unwrap();
        assert_eq!(latest.price_usd, 102.0);
    }

    #[tokio::test]
    async fn test_tick_prunes_old_history() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(InMemorySnapshotStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap(),
        ));
        let pipeline = RefreshPipeline::new(
            source.clone(),
            store.clone(),
            Catalog::tracked(),
            clock.clone(),
        );
        let retention = Some(RetentionPolicy {
            keep: chrono::Duration::hours(3),
        });

        run_tick(&pipeline, retention).await;
        assert_eq!(store.history_len(), 3);

        // Second call fails: nothing inserted, nothing pruned
        clock.advance(chrono::Duration::hours(2));
        run_tick(&pipeline, retention).await;
        assert_eq!(store.history_len(), 3);

        // Third call succeeds four hours in; the first batch falls outside the window
        clock.advance(chrono::Duration::hours(2));
        run_tick(&pipeline, retention).await;
        assert_eq!(store.history_len(), 3);

        let btc = Catalog::tracked().resolve("bitcoin").unwrap();
        let history = store.find_recent_history(&btc, 100).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price_usd, 102.0);
    }

    /// Rejects the first `replace_all`, then defers to an in-memory store
    struct FailFirstWriteStore {
        inner: InMemorySnapshotStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotStore for FailFirstWriteStore {
        async fn replace_all(&self, records: &[PriceRecord]) -> Result<(), AppError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(AppError::StoreFailure("connection reset".to_string()));
            }
            self.inner.replace_all(records).await
        }

        async fn find_latest(&self, asset: &AssetId) -> Result<Option<PriceRecord>, AppError> {
            self.inner.find_latest(asset).await
        }

        async fn find_recent_history(
            &self,
            asset: &AssetId,
            limit: u64,
        ) -> Result<Vec<PriceRecord>, AppError> {
            self.inner.find_recent_history(asset, limit).await
        }

        async fn prune_history(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
            self.inner.prune_history(cutoff).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_does_not_stop_next_tick() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(FailFirstWriteStore {
            inner: InMemorySnapshotStore::new(),
            writes: AtomicUsize::new(0),
        });
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap(),
        ));
        let pipeline =
            RefreshPipeline::new(source.clone(), store.clone(), Catalog::tracked(), clock);

        let every = Duration::from_secs(7200);
        let handle = start_price_refresh_job(pipeline, every, None);

        // Tick at 0 fetches but the write fails, 2h fails upstream, 4h lands
        tokio::time::sleep(every * 2 + Duration::from_secs(60)).await;
        handle.abort();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
        assert_eq!(store.inner.history_len(), 3);

        let btc = Catalog::tracked().resolve("bitcoin").unwrap();
        let latest = store.find_latest(&btc).await.unwrap().unwrap();
        assert_eq!(latest.price_usd, 102.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(InMemorySnapshotStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap(),
        ));
        let pipeline = RefreshPipeline::new(source.clone(), store, Catalog::tracked(), clock);

        let handle = start_price_refresh_job(pipeline, Duration::ZERO, None);

        // Ticks at 0s, 1s, 2s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
