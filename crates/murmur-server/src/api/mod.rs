//! HTTP routes

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod cache;
mod speech;

/// Build the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/voices", get(speech::voices))
        .route("/v1/audio/speech", post(speech::speech))
        .route("/v1/audio/speech/json", post(speech::speech_json))
        .route("/v1/audio/plan", post(speech::plan))
        .route("/v1/cache", get(cache::stats).delete(cache::clear))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use murmur_core::cache::{DiskTier, MemoryTier};
    use murmur_core::tuning::{ConcurrencyTuner, UnitSizeTuner};
    use murmur_core::{
        AudioBlob, AudioCache, Chunker, Error, Pipeline, Result, SpeechFetcher, TextUnit,
        TuningController, Voice,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    /// Returns `<voice>|<content>` for every unit; "fail" triggers a 500.
    #[derive(Default)]
    pub(crate) struct EchoFetcher {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechFetcher for EchoFetcher {
        async fn fetch(&self, unit: &TextUnit, voice: Voice) -> Result<AudioBlob> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if unit.content.contains("fail") {
                return Err(Error::Upstream {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(AudioBlob::from(format!("{}|{}", voice, unit.content)))
        }
    }

    pub(crate) fn test_app() -> (Router, Arc<EchoFetcher>, TempDir) {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(EchoFetcher::default());
        let tuning = Arc::new(TuningController::new(
            UnitSizeTuner::new(40, 20, 40, 10, 5),
            ConcurrencyTuner::new(2, 1, 4, 5),
        ));
        let cache = Arc::new(AudioCache::new(
            MemoryTier::new(100, 1 << 20),
            DiskTier::new(dir.path()),
        ));
        let pipeline = Pipeline::new(
            Chunker::new(10, tuning.clone()),
            fetcher.clone(),
            cache,
            tuning,
        );
        (create_router(AppState::new(pipeline)), fetcher, dir)
    }

    pub(crate) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }
}
