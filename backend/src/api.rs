use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::automation::state::PilotClient;
use crate::error::PilotError;
use crate::models::Settings;
use crate::storage::SettingsStore;

pub const MISSING_KEY_MESSAGE: &str = "Please save your OpenAI API key first";

#[derive(Clone)]
pub struct AppState {
    pub pilot: PilotClient,
    pub settings: SettingsStore,
}

/// Fields accepted by `start` and `settings`; anything omitted keeps its saved value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub api_key: Option<String>,
    pub delay: Option<u64>,
    pub message_count: Option<usize>,
}

impl SettingsPatch {
    /// Rejects values no run could use, before anything is written.
    fn validate(&self) -> Result<(), PilotError> {
        if self.message_count == Some(0) {
            return Err(PilotError::InvalidRunConfig("message window must be at least 1".into()));
        }
        Ok(())
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            settings.api_key = Some(key.to_string());
        }
        if let Some(delay) = self.delay {
            settings.delay = delay;
        }
        if let Some(count) = self.message_count {
            settings.message_count = count;
        }
    }
}

fn error_response(e: &PilotError) -> Response {
    let status = match e {
        PilotError::InvalidRunConfig(_) => StatusCode::BAD_REQUEST,
        PilotError::AlreadyRunning => StatusCode::CONFLICT,
        PilotError::ControllerGone => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

pub async fn post_start(State(state): State<AppState>, patch: Option<Json<SettingsPatch>>) -> Response {
    let patch = patch.map(|Json(p)| p).unwrap_or_default();
    if let Err(e) = patch.validate() {
        return error_response(&e);
    }

    // Persisted only after the run is accepted.
    let mut settings = match state.settings.load() {
        Ok(s) => s,
        Err(e) => return error_response(&PilotError::Io(e)),
    };
    patch.apply(&mut settings);

    if settings.api_key.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": MISSING_KEY_MESSAGE }))).into_response();
    }

    let config = match settings.run_config() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = state.pilot.start(config).await {
        warn!(error = %e, "start rejected");
        return error_response(&e);
    }
    info!(delay = settings.delay, window = settings.message_count, "run started");

    if let Err(e) = state.settings.update(|s| patch.apply(s)) {
        warn!(error = %e, "run started but settings were not saved");
    }
    (StatusCode::OK, Json(json!({ "started": true }))).into_response()
}

pub async fn post_stop(State(state): State<AppState>) -> Response {
    match state.pilot.stop().await {
        Ok(stopping) => (StatusCode::OK, Json(json!({ "stopped": stopping }))).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    match state.pilot.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    match state.settings.load() {
        Ok(settings) => (StatusCode::OK, Json(settings.masked())).into_response(),
        Err(e) => error_response(&PilotError::Io(e)),
    }
}

pub async fn post_settings(State(state): State<AppState>, Json(patch): Json<SettingsPatch>) -> impl IntoResponse {
    if let Err(e) = patch.validate() {
        return error_response(&e);
    }
    match state.settings.update(|s| patch.apply(s)) {
        Ok(settings) => (StatusCode::OK, Json(settings.masked())).into_response(),
        Err(e) => error_response(&PilotError::Io(e)),
    }
}
