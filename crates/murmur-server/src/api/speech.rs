//! Speech synthesis endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use murmur_core::{AudioBlob, SynthesisRequest, TextUnit, Voice};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Speech request
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Voice name; defaults to the pipeline's default voice
    #[serde(default)]
    pub voice: Option<String>,
}

impl SpeechRequest {
    fn into_synthesis(self) -> Result<SynthesisRequest, ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::bad_request("text must not be empty"));
        }
        let voice = match self.voice.as_deref() {
            Some(name) => name.parse::<Voice>()?,
            None => Voice::default(),
        };
        Ok(SynthesisRequest::new(self.text, voice))
    }
}

/// Speech response carrying both the preview and the complete audio
#[derive(Debug, Serialize)]
pub struct SpeechJsonResponse {
    pub preview_base64: String,
    pub audio_base64: String,
    pub units: usize,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub max_unit_chars: usize,
    pub units: Vec<TextUnit>,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: &'static [Voice],
}

pub async fn voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: Voice::all(),
    })
}

/// Synthesize and return the reassembled audio as `audio/mpeg`.
pub async fn speech(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> Result<Response, ApiError> {
    let request = request.into_synthesis()?;
    info!("Speech request: {} chars", request.full_text.chars().count());

    let audio = state
        .pipeline
        .synthesize(&request, |_| {}, |_| {})
        .await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

/// Synthesize and return preview and full audio as base64 JSON.
pub async fn speech_json(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> Result<Json<SpeechJsonResponse>, ApiError> {
    let request = request.into_synthesis()?;
    info!("Speech request (json): {} chars", request.full_text.chars().count());

    let mut preview: Option<AudioBlob> = None;
    let mut batches = 0usize;
    let done = state
        .pipeline
        .synthesize_detailed(
            &request,
            |blob| preview = Some(blob),
            |_| batches += 1,
        )
        .await?;

    let preview = preview.ok_or_else(|| ApiError::internal("preview unit never resolved"))?;
    info!("Returned {} units in {} batches", done.units, batches);

    Ok(Json(SpeechJsonResponse {
        preview_base64: STANDARD.encode(&preview),
        audio_base64: STANDARD.encode(&done.audio),
        units: done.units,
        format: "mp3".to_string(),
    }))
}

/// Show how the text would be split right now.
pub async fn plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Json<PlanResponse> {
    Json(PlanResponse {
        max_unit_chars: state.pipeline.tuning().max_unit_chars(),
        units: state.pipeline.plan(&request.text),
    })
}
