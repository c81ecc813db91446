use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use payhub_core::{Mode, ModeError, ModeSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

const INVALID_MODE: &str = "Mode must be either \"demo\" or \"live\"";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStatusResponse {
    #[serde(flatten)]
    pub snapshot: ModeSnapshot,
    pub openai_configured: bool,
    pub timestamp: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub previous_mode: Mode,
    pub current_mode: Mode,
    pub message: String,
    pub timestamp: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/mode/status", get(status)).route("/api/mode/toggle", post(toggle))
}

pub async fn status(State(state): State<AppState>) -> Json<ModeStatusResponse> {
    Json(ModeStatusResponse {
        snapshot: state.snapshot(),
        openai_configured: state.deployment.openai_configured,
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn toggle(
    State(state): State<AppState>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let Json(request) = payload?;
    let requested = request
        .mode
        .as_deref()
        .and_then(Mode::parse)
        .ok_or_else(|| ApiError::bad_request(INVALID_MODE))?;

    let readiness = state.readiness();
    let transition = state.mode.set_mode(requested, &readiness).map_err(|error| {
        let ModeError::InvalidTransition { toolkit_available, credentials_configured, .. } = error;
        ApiError::BadRequest {
            message: error.to_string(),
            details: Some(json!({
                "toolkitAvailable": toolkit_available,
                "credentialsConfigured": credentials_configured,
                "openaiConfigured": state.deployment.openai_configured,
            })),
        }
    })?;

    info!(
        event_name = "mode.toggled",
        correlation_id = "mode",
        previous_mode = %transition.previous,
        current_mode = %transition.current,
        "operating mode changed"
    );

    Ok(Json(ToggleResponse {
        success: true,
        previous_mode: transition.previous,
        current_mode: transition.current,
        message: format!("Successfully switched to {} mode", transition.current),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::Json;
    use payhub_agent::ToolName;
    use payhub_core::Mode;
    use serde_json::json;

    use super::{status, toggle, ToggleRequest, INVALID_MODE};
    use crate::error::ApiError;
    use crate::state::fixtures;

    fn toggle_to(mode: &str) -> ToggleRequest {
        ToggleRequest { mode: Some(mode.to_string()) }
    }

    #[tokio::test]
    async fn live_without_toolkit_is_rejected_with_details() {
        let state = fixtures::unconfigured();

        let error = toggle(State(state.clone()), Ok(Json(toggle_to("live"))))
            .await
            .expect_err("cannot go live");

        match error {
            ApiError::BadRequest { message, details } => {
                assert!(message.contains("Cannot switch to live mode"), "{message}");
                let details = details.expect("details");
                assert_eq!(details["toolkitAvailable"], json!(false));
                assert_eq!(details["credentialsConfigured"], json!(false));
            }
            other => panic!("expected bad request, got {other:?}"),
        }
        assert!(!state.mode.force_demo());
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let error = toggle(State(fixtures::unconfigured()), Ok(Json(toggle_to("turbo"))))
            .await
            .expect_err("unknown mode");

        match error {
            ApiError::BadRequest { message, .. } => assert_eq!(message, INVALID_MODE),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_toggles_are_idempotent() {
        let state = fixtures::live_failing(vec![ToolName::ListInvoices]);

        let Json(first) =
            toggle(State(state.clone()), Ok(Json(toggle_to("demo")))).await.expect("demo");
        let Json(second) =
            toggle(State(state.clone()), Ok(Json(toggle_to("demo")))).await.expect("demo again");
        assert_eq!(first.previous_mode, Mode::Live);
        assert_eq!(second.previous_mode, Mode::Demo);
        assert_eq!(second.current_mode, Mode::Demo);

        let Json(live) =
            toggle(State(state.clone()), Ok(Json(toggle_to("LIVE")))).await.expect("live");
        assert_eq!(live.current_mode, Mode::Live);
        assert_eq!(live.message, "Successfully switched to live mode");

        let Json(snapshot) = status(State(state)).await;
        assert!(!snapshot.snapshot.force_demo);
        assert!(snapshot.snapshot.can_go_live);
    }
}
