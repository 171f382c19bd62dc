use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppError;
use crate::models::crypto::{CoinQuery, CurrentStats, ErrorResponse, RefreshResponse, VolatilityResult};
use crate::services::catalog::AssetId;
use crate::services::statistics::{self, VOLATILITY_WINDOW};
use crate::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Reject anything outside the catalog before any store access
fn resolve_coin(state: &AppState, query: &CoinQuery) -> Result<AssetId, HandlerError> {
    let raw = query.coin.as_deref().unwrap_or_default();
    state.catalog.resolve(raw).map_err(|e| {
        tracing::warn!(coin = raw, "Rejected coin parameter");
        e.into_response_parts()
    })
}

pub async fn health() -> &'static str {
    "Hello, World! The server is running!"
}

/// Fetch from CoinGecko, replace the snapshot and return the new batch
pub async fn fetch_crypto_data(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, HandlerError> {
    tracing::info!("Manual crypto data refresh requested");

    let data = state
        .refresh
        .refresh()
        .await
        .map_err(AppError::into_response_parts)?;

    Ok(Json(RefreshResponse {
        message: "Crypto data fetched, saved, and returned successfully.".to_string(),
        data,
    }))
}

pub async fn get_crypto_stats(
    State(state): State<AppState>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<CurrentStats>, HandlerError> {
    let asset = resolve_coin(&state, &query)?;

    let stats = statistics::current_stats(state.store.as_ref(), &asset)
        .await
        .map_err(AppError::into_response_parts)?;

    Ok(Json(stats))
}

pub async fn get_crypto_deviation(
    State(state): State<AppState>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<VolatilityResult>, HandlerError> {
    let asset = resolve_coin(&state, &query)?;

    let result = statistics::price_volatility(
        state.store.as_ref(),
        &asset,
        VOLATILITY_WINDOW,
        state.clock.now(),
        state.refresh_interval,
    )
    .await
    .map_err(AppError::into_response_parts)?;

    Ok(Json(result))
}
