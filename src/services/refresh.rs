//! Acquisition → stamp → replace, shared by the scheduled job and `GET /fetch`.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::crypto::PriceRecord;
use crate::services::catalog::Catalog;
use crate::services::clock::Clock;
use crate::services::coingecko::PriceSource;
use crate::services::snapshot_store::SnapshotStore;

#[derive(Clone)]
pub struct RefreshPipeline {
    source: Arc<dyn PriceSource>,
    store: Arc<dyn SnapshotStore>,
    catalog: Catalog,
    clock: Arc<dyn Clock>,
}

impl RefreshPipeline {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn SnapshotStore>,
        catalog: Catalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Fetch the whole catalog and install it as the new snapshot.
    ///
    /// The store is only touched once acquisition has fully succeeded, and
    /// every record of the batch shares one `observed_at`.
    pub async fn refresh(&self) -> Result<Vec<PriceRecord>, AppError> {
        let quotes = self.source.fetch_latest(&self.catalog).await?;

        let observed_at = self.clock.now();
        let records: Vec<PriceRecord> = quotes
            .into_iter()
            .map(|quote| quote.observed(observed_at))
            .collect();

        self.store.replace_all(&records).await.inspect_err(|e| {
            tracing::error!(error = %e, records = records.len(), "Failed to save crypto data");
        })?;

        tracing::info!(
            count = records.len(),
            observed_at = %observed_at,
            "Crypto data fetched and saved"
        );

        Ok(records)
    }
}
