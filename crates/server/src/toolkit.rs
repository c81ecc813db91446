use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use payhub_agent::ToolName;
use payhub_core::Mode;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinitializeResponse {
    pub success: bool,
    pub toolkit_available: bool,
    pub tools_available: Vec<ToolName>,
    pub toolkit_error: Option<String>,
    pub current_mode: Mode,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/toolkit/reinitialize", post(reinitialize))
}

/// Retries toolkit construction with the credentials resolved at startup.
/// `success` reflects whether the toolkit is now ready.
pub async fn reinitialize(State(state): State<AppState>) -> Json<ReinitializeResponse> {
    state.toolkit.reinitialize(&state.credentials);

    Json(ReinitializeResponse {
        success: state.toolkit.is_available(),
        toolkit_available: state.toolkit.is_available(),
        tools_available: state.toolkit.tool_names(),
        toolkit_error: state.toolkit.last_error(),
        current_mode: state.dispatcher.effective_mode(),
    })
}
