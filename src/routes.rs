use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::crypto;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(crypto::health))
        .route("/fetch", get(crypto::fetch_crypto_data))
        .route("/stats", get(crypto::get_crypto_stats))
        .route("/deviation", get(crypto::get_crypto_deviation))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
