use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use payhub_agent::ToolName;
use payhub_core::{Mode, OperatingStatus};
use serde::Serialize;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub visa_toolkit_available: bool,
    pub tools_available: Vec<ToolName>,
    pub toolkit_error: Option<String>,
    pub current_mode: Mode,
    pub force_demo_mode: bool,
    pub can_go_live: bool,
    pub credentials_configured: bool,
    pub operating_status: OperatingStatus,
    pub timestamp: String,
    pub environment: String,
    pub cybs_environment: String,
    pub openai_configured: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

/// Always 200: a process without a toolkit is healthy, just not live.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let readiness = state.readiness();
    let snapshot = state.mode.snapshot(&readiness);

    let payload = HealthResponse {
        status: "ok",
        visa_toolkit_available: readiness.toolkit_available,
        tools_available: state.toolkit.tool_names(),
        toolkit_error: state.toolkit.last_error(),
        current_mode: snapshot.current_mode,
        force_demo_mode: snapshot.force_demo,
        can_go_live: snapshot.can_go_live,
        credentials_configured: snapshot.credentials_configured,
        operating_status: snapshot.status(),
        timestamp: Utc::now().to_rfc3339(),
        environment: or_not_set(&state.deployment.environment),
        cybs_environment: or_not_set(&state.deployment.cybs_environment),
        openai_configured: state.deployment.openai_configured,
    };

    (StatusCode::OK, Json(payload))
}

fn or_not_set(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "not-set".to_string())
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use payhub_agent::ToolName;
    use payhub_core::{Mode, OperatingStatus};

    use crate::health::health;
    use crate::state::fixtures;

    #[tokio::test]
    async fn health_without_credentials_reports_demo() {
        let (status, Json(payload)) = health(State(fixtures::unconfigured())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ok");
        assert!(!payload.visa_toolkit_available);
        assert_eq!(payload.current_mode, Mode::Demo);
        assert_eq!(payload.operating_status, OperatingStatus::Unavailable);
        assert!(payload.toolkit_error.is_some_and(|error| error.contains("missing credentials")));
        assert_eq!(payload.environment, "not-set");
    }

    #[tokio::test]
    async fn health_with_toolkit_reports_live() {
        let state = fixtures::live_failing(vec![ToolName::CreateInvoice, ToolName::ListInvoices]);

        let (_, Json(payload)) = health(State(state)).await;

        assert!(payload.visa_toolkit_available);
        assert_eq!(payload.tools_available, vec![ToolName::CreateInvoice, ToolName::ListInvoices]);
        assert_eq!(payload.current_mode, Mode::Live);
        assert!(payload.can_go_live);
        assert!(payload.toolkit_error.is_none());
    }
}
