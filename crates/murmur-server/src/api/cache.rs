//! Cache inspection endpoints

use axum::{extract::State, Json};
use murmur_core::{CacheStats, TuningSnapshot};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheResponse {
    pub cache: CacheStats,
    pub hit_rate: f64,
    pub tuning: TuningSnapshot,
}

pub async fn stats(State(state): State<AppState>) -> Json<CacheResponse> {
    let cache = state.pipeline.cache().stats();
    Json(CacheResponse {
        hit_rate: cache.hit_rate(),
        cache,
        tuning: state.pipeline.tuning().snapshot(),
    })
}

pub async fn clear(State(state): State<AppState>) -> Json<CacheResponse> {
    info!("Clearing audio cache");
    state.pipeline.clear_cache();
    stats(State(state)).await
}
