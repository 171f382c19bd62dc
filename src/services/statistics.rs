//! Statistics Engine: current stats and rolling price volatility.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::AppError;
use crate::models::crypto::{CurrentStats, VolatilityResult};
use crate::services::catalog::AssetId;
use crate::services::snapshot_store::SnapshotStore;

/// Number of recent samples the volatility window looks at
pub const VOLATILITY_WINDOW: u64 = 100;

/// Fewer samples than this yields `InsufficientData`
const MIN_SAMPLES: usize = 2;

pub async fn current_stats(
    store: &dyn SnapshotStore,
    asset: &AssetId,
) -> Result<CurrentStats, AppError> {
    let latest = store.find_latest(asset).await.inspect_err(|e| {
        tracing::error!(asset = %asset, error = %e, "Error retrieving cryptocurrency stats");
    })?;

    match latest {
        Some(record) => Ok(CurrentStats::from(&record)),
        None => {
            tracing::info!(asset = %asset, "No snapshot yet for asset");
            Err(AppError::NotFound(asset.to_string()))
        }
    }
}

/// Population standard deviation of up to `window_size` most recent prices.
///
/// With fewer than two samples the result carries an estimate of when the next
/// refresh lands (`now + refresh_interval`) instead of a number.
pub async fn price_volatility(
    store: &dyn SnapshotStore,
    asset: &AssetId,
    window_size: u64,
    now: DateTime<Utc>,
    refresh_interval: Duration,
) -> Result<VolatilityResult, AppError> {
    let samples = store
        .find_recent_history(asset, window_size)
        .await
        .inspect_err(|e| {
            tracing::error!(asset = %asset, error = %e, "Error calculating standard deviation");
        })?;

    let prices: Vec<f64> = samples.iter().map(|r| r.price_usd).collect();

    match population_std_dev(&prices) {
        Some(value) => Ok(VolatilityResult::Deviation {
            deviation: format!("{:.2}", value),
            value,
            samples: prices.len(),
        }),
        None => {
            let available_after = next_availability(now, refresh_interval);
            tracing::debug!(
                asset = %asset,
                samples = prices.len(),
                "Not enough samples for volatility"
            );
            Ok(VolatilityResult::InsufficientData {
                message: insufficient_data_message(available_after),
                available_after,
            })
        }
    }
}

/// `None` for fewer than two prices. Divides by N, not N - 1.
pub fn population_std_dev(prices: &[f64]) -> Option<f64> {
    if prices.len() < MIN_SAMPLES {
        return None;
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt())
}

pub fn next_availability(now: DateTime<Utc>, refresh_interval: Duration) -> DateTime<Utc> {
    let interval = chrono::Duration::from_std(refresh_interval).unwrap_or(chrono::Duration::MAX);
    now.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn insufficient_data_message(available_after: DateTime<Utc>) -> String {
    format!(
        "Not enough data to calculate standard deviation. Please try again later after {} when more data is collected.",
        available_after.format("%I:%M %p")
    )
}
