// src/lib.rs

use std::sync::Arc;
use std::time::Duration;

use services::{
    catalog::Catalog, clock::Clock, refresh::RefreshPipeline, snapshot_store::SnapshotStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnapshotStore>,
    pub refresh: RefreshPipeline,
    pub catalog: Catalog,
    pub clock: Arc<dyn Clock>,
    /// Published scheduler period, used for the "try again after" estimate
    pub refresh_interval: Duration,
}

pub mod entities {
    pub mod prelude;
    pub mod price_history;
    pub mod price_snapshots;
}

pub mod services {
    pub mod catalog;
    pub mod clock;
    pub mod coingecko;
    pub mod refresh;
    pub mod snapshot_store;
    pub mod statistics;
}

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod routes;
