//! Snapshot Store
//!
//! Persists the latest acquisition batch. The current view (`price_snapshots`)
//! is replaced wholesale by every refresh, while each batch is also appended
//! to `price_history` so rolling statistics have samples to work with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use std::collections::HashMap;

use crate::entities::{price_history, price_snapshots, prelude::*};
use crate::error::AppError;
use crate::models::crypto::PriceRecord;
use crate::services::catalog::AssetId;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Clear the current view, then install `records` (and append them to history).
    /// Readers see either the previous batch or the whole new one.
    async fn replace_all(&self, records: &[PriceRecord]) -> Result<(), AppError>;

    /// Most recently inserted current record for the asset
    async fn find_latest(&self, asset: &AssetId) -> Result<Option<PriceRecord>, AppError>;

    /// Up to `limit` history samples for the asset, newest first
    async fn find_recent_history(
        &self,
        asset: &AssetId,
        limit: u64,
    ) -> Result<Vec<PriceRecord>, AppError>;

    /// Drop history observed strictly before `cutoff`. Returns rows removed.
    async fn prune_history(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}

fn reject_empty(records: &[PriceRecord]) -> Result<(), AppError> {
    if records.is_empty() {
        return Err(AppError::StoreFailure(
            "refusing to replace snapshot with an empty batch".to_string(),
        ));
    }
    Ok(())
}

/// Postgres (or SQLite) backed store
#[derive(Clone)]
pub struct SeaOrmSnapshotStore {
    db: DatabaseConnection,
}

impl SeaOrmSnapshotStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for SeaOrmSnapshotStore {
    async fn replace_all(&self, records: &[PriceRecord]) -> Result<(), AppError> {
        reject_empty(records)?;

        let snapshots: Vec<price_snapshots::ActiveModel> = records
            .iter()
            .map(|r| price_snapshots::ActiveModel {
                asset: Set(r.asset.as_str().to_string()),
                price_usd: Set(r.price_usd),
                market_cap_usd: Set(r.market_cap_usd),
                day_change_pct: Set(r.change_24h_pct),
                observed_at: Set(r.observed_at),
                ..Default::default()
            })
            .collect();

        let history: Vec<price_history::ActiveModel> = records
            .iter()
            .map(|r| price_history::ActiveModel {
                asset: Set(r.asset.as_str().to_string()),
                price_usd: Set(r.price_usd),
                market_cap_usd: Set(r.market_cap_usd),
                day_change_pct: Set(r.change_24h_pct),
                observed_at: Set(r.observed_at),
                ..Default::default()
            })
            .collect();

        // Clear and both inserts commit together; a failed insert keeps the old batch
        let txn = self.db.begin().await?;

        let cleared = PriceSnapshots::delete_many().exec(&txn).await?;
        PriceSnapshots::insert_many(snapshots).exec(&txn).await?;
        PriceHistory::insert_many(history).exec(&txn).await?;

        txn.commit().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to commit snapshot replace");
        })?;

        tracing::debug!(
            cleared = cleared.rows_affected,
            inserted = records.len(),
            "Replaced price snapshot"
        );

        Ok(())
    }

    async fn find_latest(&self, asset: &AssetId) -> Result<Option<PriceRecord>, AppError> {
        let row = PriceSnapshots::find()
            .filter(price_snapshots::Column::Asset.eq(asset.as_str()))
            .order_by(price_snapshots::Column::ObservedAt, Order::Desc)
            .order_by(price_snapshots::Column::Id, Order::Desc)
            .one(&self.db)
            .await?;

        Ok(row.map(|m| PriceRecord {
            asset: asset.clone(),
            price_usd: m.price_usd,
            market_cap_usd: m.market_cap_usd,
            change_24h_pct: m.day_change_pct,
            observed_at: m.observed_at,
        }))
    }

    async fn find_recent_history(
        &self,
        asset: &AssetId,
        limit: u64,
    ) -> Result<Vec<PriceRecord>, AppError> {
        let rows = PriceHistory::find()
            .filter(price_history::Column::Asset.eq(asset.as_str()))
            .order_by(price_history::Column::ObservedAt, Order::Desc)
            .order_by(price_history::Column::Id, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| PriceRecord {
                asset: asset.clone(),
                price_usd: m.price_usd,
                market_cap_usd: m.market_cap_usd,
                change_24h_pct: m.day_change_pct,
                observed_at: m.observed_at,
            })
            .collect())
    }

    async fn prune_history(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = PriceHistory::delete_many()
            .filter(price_history::Column::ObservedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[derive(Default)]
struct InMemoryState {
    current: Vec<PriceRecord>,
    history: HashMap<AssetId, Vec<PriceRecord>>,
}

/// Process-local store for tests. Same semantics as the database store, nothing survives a restart.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    state: RwLock<InMemoryState>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total history rows across all assets
    pub fn history_len(&self) -> usize {
        self.state.read().history.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn replace_all(&self, records: &[PriceRecord]) -> Result<(), AppError> {
        reject_empty(records)?;

        let mut state = self.state.write();
        state.current = records.to_vec();
        for record in records {
            state
                .history
                .entry(record.asset.clone())
                .or_default()
                .push(record.clone());
        }

        Ok(())
    }

    async fn find_latest(&self, asset: &AssetId) -> Result<Option<PriceRecord>, AppError> {
        let state = self.state.read();
        Ok(state
            .current
            .iter()
            .filter(|r| &r.asset == asset)
            .max_by_key(|r| r.observed_at)
            .cloned())
    }

    async fn find_recent_history(
        &self,
        asset: &AssetId,
        limit: u64,
    ) -> Result<Vec<PriceRecord>, AppError> {
        let state = self.state.read();
        let Some(samples) = state.history.get(asset) else {
            return Ok(Vec::new());
        };

        // Newest first; stable sort keeps later inserts ahead on equal timestamps
        let mut newest_first: Vec<PriceRecord> = samples.iter().rev().cloned().collect();
        newest_first.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        newest_first.truncate(limit as usize);

        Ok(newest_first)
    }

    async fn prune_history(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.state.write();
        let mut removed = 0u64;
        for samples in state.history.values_mut() {
            let before = samples.len();
            samples.retain(|r| r.observed_at >= cutoff);
            removed += (before - samples.len()) as u64;
        }

        Ok(removed)
    }
}
