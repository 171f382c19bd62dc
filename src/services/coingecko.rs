use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::AppError;
use crate::models::crypto::PriceQuote;
use crate::services::catalog::Catalog;

const VS_CURRENCY: &str = "usd";

/// Source of the latest quotes for the whole catalog
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// One batched call for every catalog asset. All assets or an error.
    async fn fetch_latest(&self, catalog: &Catalog) -> Result<Vec<PriceQuote>, AppError>;
}

/// CoinGecko key tier, decides which header carries the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiTier {
    Demo,
    Pro,
}

impl ApiTier {
    fn header_name(self) -> &'static str {
        match self {
            ApiTier::Demo => "x-cg-demo-api-key",
            ApiTier::Pro => "x-cg-pro-api-key",
        }
    }
}

impl std::str::FromStr for ApiTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(ApiTier::Demo),
            "pro" => Ok(ApiTier::Pro),
            other => Err(format!("unknown CoinGecko API tier '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    tier: ApiTier,
    base_url: String,
}

/// Entry of `/simple/price` for one coin. Every field is optional on the wire.
#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_change: Option<f64>,
}

type SimplePriceResponse = HashMap<String, SimplePriceEntry>;

impl CoinGeckoService {
    pub fn new(
        api_key: Option<String>,
        tier: ApiTier,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            tier,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_simple_price(&self, catalog: &Catalog) -> Result<SimplePriceResponse, AppError> {
        let url = format!("{}/simple/price", self.base_url);
        let ids = catalog.joined_ids();

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", VS_CURRENCY),
                ("include_market_cap", "true"),
                ("include_24hr_change", "true"),
            ]);

        if let Some(key) = &self.api_key {
            request = request.header(self.tier.header_name(), key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::AcquisitionFailed(format!(
                "CoinGecko API error {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AppError::AcquisitionFailed(format!("malformed CoinGecko payload: {}", e))
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoService {
    async fn fetch_latest(&self, catalog: &Catalog) -> Result<Vec<PriceQuote>, AppError> {
        tracing::info!("Fetching simple prices for {} coins from CoinGecko", catalog.len());

        let payload = self.fetch_simple_price(catalog).await.inspect_err(|e| {
            tracing::error!(error = %e, "Error fetching data from CoinGecko");
        })?;

        let quotes = normalize_quotes(catalog, payload).inspect_err(|e| {
            tracing::error!(error = %e, "Rejecting incomplete CoinGecko payload");
        })?;

        tracing::debug!("Normalized {} CoinGecko quotes", quotes.len());

        Ok(quotes)
    }
}

/// Turn a `/simple/price` payload into one quote per catalog asset, in catalog
/// order. Any missing coin or field fails the whole batch.
fn normalize_quotes(
    catalog: &Catalog,
    mut payload: SimplePriceResponse,
) -> Result<Vec<PriceQuote>, AppError> {
    catalog
        .assets()
        .iter()
        .map(|asset| -> Result<PriceQuote, AppError> {
            let entry = payload.remove(asset.as_str()).ok_or_else(|| {
                AppError::AcquisitionFailed(format!("no entry for '{}' in response", asset))
            })?;

            let field = |value: Option<f64>, name: &str| {
                value.ok_or_else(|| {
                    AppError::AcquisitionFailed(format!("'{}' missing field '{}'", asset, name))
                })
            };

            Ok(PriceQuote {
                asset: asset.clone(),
                price_usd: field(entry.usd, "usd")?,
                market_cap_usd: field(entry.usd_market_cap, "usd_market_cap")?,
                change_24h_pct: field(entry.usd_24h_change, "usd_24h_change")?,
            })
        })
        .collect()
}
