#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use coinstats_backend::{
    error::AppError,
    models::crypto::{PriceQuote, PriceRecord},
    services::{
        catalog::{AssetId, Catalog},
        clock::FixedClock,
        coingecko::PriceSource,
        refresh::RefreshPipeline,
        snapshot_store::{InMemorySnapshotStore, SnapshotStore},
    },
    AppState,
};
use migration::MigratorTrait;
use parking_lot::Mutex;
use sea_orm::{Database, DatabaseConnection, DbErr};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

/// Fresh in-memory SQLite database with the schema migrated
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 12, 13, 5, 0).unwrap()
}

/// Price source whose next answer is set by the test
pub struct StubSource {
    next: Mutex<Result<Vec<f64>, AppError>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(Err(AppError::AcquisitionFailed(
                "no prices scripted".to_string(),
            ))),
        }
    }

    /// Prices in catalog order: bitcoin, matic-network, ethereum
    pub fn set_prices(&self, prices: [f64; 3]) {
        *self.next.lock() = Ok(prices.to_vec());
    }

    pub fn fail(&self, reason: &str) {
        *self.next.lock() = Err(AppError::AcquisitionFailed(reason.to_string()));
    }
}

#[async_trait]
impl PriceSource for StubSource {
    async fn fetch_latest(&self, catalog: &Catalog) -> Result<Vec<PriceQuote>, AppError> {
        let prices = self.next.lock().clone()?;
        Ok(catalog
            .assets()
            .iter()
            .zip(prices)
            .map(|(asset, price)| PriceQuote {
                asset: asset.clone(),
                price_usd: price,
                market_cap_usd: price * 1_000.0,
                change_24h_pct: -2.5,
            })
            .collect())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub source: Arc<StubSource>,
    pub store: Arc<InMemorySnapshotStore>,
    pub clock: Arc<FixedClock>,
}

/// Store whose writes always fail; reads see an empty database
pub struct BrokenStore;

#[async_trait]
impl SnapshotStore for BrokenStore {
    async fn replace_all(&self, _records: &[PriceRecord]) -> Result<(), AppError> {
        Err(AppError::StoreFailure("database is locked".to_string()))
    }

    async fn find_latest(&self, _asset: &AssetId) -> Result<Option<PriceRecord>, AppError> {
        Ok(None)
    }

    async fn find_recent_history(
        &self,
        _asset: &AssetId,
        _limit: u64,
    ) -> Result<Vec<PriceRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn prune_history(&self, _cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(0)
    }
}

pub fn app_state(
    source: Arc<StubSource>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<FixedClock>,
) -> AppState {
    let catalog = Catalog::tracked();
    let refresh = RefreshPipeline::new(source, store.clone(), catalog.clone(), clock.clone());

    AppState {
        store,
        refresh,
        catalog,
        clock,
        refresh_interval: TWO_HOURS,
    }
}

pub fn test_app() -> TestApp {
    let source = Arc::new(StubSource::new());
    let store = Arc::new(InMemorySnapshotStore::new());
    let clock = Arc::new(FixedClock::new(t0()));
    let state = app_state(source.clone(), store.clone(), clock.clone());

    TestApp {
        state,
        source,
        store,
        clock,
    }
}

/// What the fake CoinGecko saw and what it answers with
#[derive(Default)]
pub struct FakeCoinGecko {
    pub status: Mutex<Option<StatusCode>>,
    pub body: Mutex<Value>,
    pub requests: Mutex<Vec<(HashMap<String, String>, HeaderMap)>>,
}

async fn simple_price(
    State(fake): State<Arc<FakeCoinGecko>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    fake.requests.lock().push((params, headers));
    let status = fake.status.lock().unwrap_or(StatusCode::OK);
    (status, Json(fake.body.lock().clone()))
}

/// Serve a stand-in `/simple/price` on an ephemeral port; returns its base URL
pub async fn spawn_fake_coingecko(fake: Arc<FakeCoinGecko>) -> String {
    let app = Router::new()
        .route("/simple/price", get(simple_price))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
