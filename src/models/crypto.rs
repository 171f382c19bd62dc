use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::catalog::AssetId;

/// One normalized entry of an acquisition batch, before it is stamped and persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub asset: AssetId,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub change_24h_pct: f64,
}

impl PriceQuote {
    pub fn observed(self, observed_at: DateTime<Utc>) -> PriceRecord {
        PriceRecord {
            asset: self.asset,
            price_usd: self.price_usd,
            market_cap_usd: self.market_cap_usd,
            change_24h_pct: self.change_24h_pct,
            observed_at,
        }
    }
}

/// One persisted sample for one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub asset: AssetId,
    #[serde(rename = "priceUSD")]
    pub price_usd: f64,
    #[serde(rename = "marketCapUSD")]
    pub market_cap_usd: f64,
    #[serde(rename = "change24hPct")]
    pub change_24h_pct: f64,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub price: f64,
    pub market_cap: f64,
    pub change24h: f64,
}

impl From<&PriceRecord> for CurrentStats {
    fn from(record: &PriceRecord) -> Self {
        Self {
            price: record.price_usd,
            market_cap: record.market_cap_usd,
            change24h: record.change_24h_pct,
        }
    }
}

/// Outcome of a volatility query. Serializes as `{deviation}` or `{message}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VolatilityResult {
    Deviation {
        /// Population standard deviation, two decimals
        deviation: String,
        #[serde(skip_serializing)]
        value: f64,
        #[serde(skip_serializing)]
        samples: usize,
    },
    InsufficientData {
        message: String,
        #[serde(skip_serializing)]
        available_after: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub data: Vec<PriceRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinQuery {
    pub coin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
