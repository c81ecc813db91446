use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use payhub_agent::selector::rules;
use payhub_agent::{Selection, SelectionSource, ToolName};
use payhub_core::Mode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatch::{DispatchError, Provenance};
use crate::error::ApiError;
use crate::state::AppState;

const NOT_CONFIGURED_NOTE: &str =
    "Visa Acceptance Agent Toolkit not configured. Please set environment variables.";

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResult {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    pub args: Map<String, Value>,
    pub demo: bool,
    pub note: String,
    pub data: Value,
    pub reasoning: String,
    pub source: SelectionSource,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub tool: ToolName,
    pub result: AskResult,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolDescriptor {
    pub id: ToolName,
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsResponse {
    pub tools: Vec<ToolDescriptor>,
    pub is_live: bool,
    pub toolkit_status: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/agent/ask", post(ask)).route("/api/agent/tools", get(tools))
}

pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload?;
    let query = request.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }

    let correlation_id = Uuid::new_v4().to_string();
    let live = state.dispatcher.effective_mode() == Mode::Live;
    let selection = match explicit_selection(&request, query, &correlation_id) {
        Some(selection) => selection,
        None => state.selector.select(query, live).await,
    };
    info!(
        event_name = "agent.ask",
        correlation_id = %correlation_id,
        tool = %selection.tool,
        source = ?selection.source,
        live,
        "routing free-text request"
    );

    let Selection { tool, parameters, reasoning, source } = selection;
    let (args, dispatched) =
        match state.dispatcher.execute(tool, parameters.clone(), &correlation_id).await {
            Ok(dispatched) => (parameters, dispatched),
            Err(DispatchError::InvalidArguments { message, .. }) if source == SelectionSource::Llm => {
                warn!(
                    event_name = "agent.llm_arguments_rejected",
                    correlation_id = %correlation_id,
                    tool = %tool,
                    %message,
                    "LLM arguments did not fit the tool; re-extracting with rules"
                );
                let args = rules::arguments_for(tool, query);
                let dispatched = state.dispatcher.execute(tool, args.clone(), &correlation_id).await?;
                (args, dispatched)
            }
            Err(error) => return Err(error.into()),
        };

    let result = AskResult {
        message: message_for(tool, query, dispatched.provenance),
        tool_calls: dispatched
            .provenance
            .attempted_live()
            .then(|| vec![json!({ "toolCallId": correlation_id, "toolName": tool, "args": args })]),
        demo: dispatched.provenance.is_demo(),
        note: note_for(&state, dispatched.provenance),
        args,
        data: dispatched.value,
        reasoning,
        source,
    };

    Ok(Json(AskResponse { tool, result, success: true }))
}

pub async fn tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let is_live = state.dispatcher.effective_mode() == Mode::Live;
    let names = if is_live { state.toolkit.tool_names() } else { ToolName::ALL.to_vec() };

    let tools = names
        .into_iter()
        .map(|tool| ToolDescriptor {
            id: tool,
            name: tool.display_name(),
            description: tool.description(),
            parameters: tool.parameters_schema(),
        })
        .collect();

    Json(ToolsResponse {
        tools,
        is_live,
        toolkit_status: if is_live { "operational" } else { "demo-mode" },
    })
}

/// `tool` other than "auto" bypasses selection. Unknown names fall back to
/// normal selection rather than failing the request.
fn explicit_selection(request: &AskRequest, query: &str, correlation_id: &str) -> Option<Selection> {
    let raw = request.tool.as_deref().map(str::trim).filter(|raw| {
        !raw.is_empty() && !raw.eq_ignore_ascii_case("auto")
    })?;

    let Some(tool) = ToolName::parse(raw) else {
        warn!(
            event_name = "agent.unknown_tool",
            correlation_id = %correlation_id,
            requested = raw,
            "client named an unknown tool; selecting from query instead"
        );
        return None;
    };

    let parameters = match &request.args {
        Some(args) if !args.is_empty() => args.clone(),
        _ => rules::arguments_for(tool, query),
    };
    Some(Selection {
        tool,
        parameters,
        reasoning: format!("Tool `{tool}` requested explicitly"),
        source: SelectionSource::Explicit,
    })
}

fn message_for(tool: ToolName, query: &str, provenance: Provenance) -> String {
    match provenance {
        Provenance::Live => format!("Processed with live Visa Acceptance Toolkit: \"{query}\""),
        _ => format!("Demo: {} - Query: \"{query}\"", tool.description()),
    }
}

fn note_for(state: &AppState, provenance: Provenance) -> String {
    match provenance {
        Provenance::Live => "Live Visa Acceptance Agent Toolkit is operational".to_string(),
        Provenance::LiveEmpty => {
            "Live Visa Acceptance API returned no results; showing demo data".to_string()
        }
        Provenance::Degraded => {
            "Live Visa Acceptance call failed; showing demo data".to_string()
        }
        Provenance::Demo if state.snapshot().can_go_live => {
            "Demo mode is active; switch to live mode to use the Visa Acceptance toolkit"
                .to_string()
        }
        Provenance::Demo if !state.credentials.is_complete() => NOT_CONFIGURED_NOTE.to_string(),
        Provenance::Demo => {
            state.toolkit.last_error().unwrap_or_else(|| NOT_CONFIGURED_NOTE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::Json;
    use payhub_agent::{SelectionSource, ToolName};
    use serde_json::{json, Map};

    use super::{ask, tools, AskRequest, NOT_CONFIGURED_NOTE};
    use crate::error::ApiError;
    use crate::state::fixtures;

    fn request(query: &str) -> AskRequest {
        AskRequest { query: Some(query.to_string()), ..AskRequest::default() }
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let result = ask(State(fixtures::unconfigured()), Ok(Json(request("   ")))).await;

        match result {
            Err(ApiError::BadRequest { message, .. }) => assert_eq!(message, "Query is required"),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn demo_ask_uses_rule_selection() {
        let Json(response) = ask(
            State(fixtures::unconfigured()),
            Ok(Json(request("Create an invoice for $250 EUR for sam@example.com"))),
        )
        .await
        .expect("demo ask");

        assert!(response.success);
        assert_eq!(response.tool, ToolName::CreateInvoice);
        assert!(response.result.demo);
        assert!(response.result.tool_calls.is_none());
        assert_eq!(response.result.source, SelectionSource::Rules);
        assert_eq!(response.result.note, NOT_CONFIGURED_NOTE);
        assert_eq!(response.result.args["currency"], json!("EUR"));
        assert_eq!(response.result.data["email"], json!("sam@example.com"));
        assert_eq!(response.result.data["isDemo"], json!(true));
    }

    #[tokio::test]
    async fn explicit_dotted_tool_is_honoured() {
        let mut args = Map::new();
        args.insert("status".to_string(), json!("paid"));
        let payload = AskRequest {
            query: Some("whatever".to_string()),
            tool: Some("invoice.list".to_string()),
            args: Some(args),
        };

        let Json(response) =
            ask(State(fixtures::unconfigured()), Ok(Json(payload))).await.expect("explicit tool");

        assert_eq!(response.tool, ToolName::ListInvoices);
        assert_eq!(response.result.source, SelectionSource::Explicit);
        let rows = response.result.data.as_array().expect("rows");
        assert!(rows.iter().all(|row| row["status"] == json!("paid")));
    }

    #[tokio::test]
    async fn degraded_live_ask_records_the_tool_call() {
        let state = fixtures::live_failing(ToolName::ALL.to_vec());

        let Json(response) = ask(State(state), Ok(Json(request("list my payment links"))))
            .await
            .expect("degraded ask");

        assert_eq!(response.tool, ToolName::ListPaymentLinks);
        assert!(response.result.demo);
        let calls = response.result.tool_calls.expect("live attempt is recorded");
        assert_eq!(calls[0]["toolName"], json!("list_payment_links"));
        assert!(response.result.note.contains("failed"));
    }

    #[tokio::test]
    async fn tool_catalog_reflects_mode() {
        let Json(demo) = tools(State(fixtures::unconfigured())).await;
        assert!(!demo.is_live);
        assert_eq!(demo.toolkit_status, "demo-mode");
        assert_eq!(demo.tools.len(), ToolName::ALL.len());

        let Json(live) = tools(State(fixtures::live_failing(vec![ToolName::SendInvoice]))).await;
        assert!(live.is_live);
        assert_eq!(live.toolkit_status, "operational");
        assert_eq!(live.tools.len(), 1);
        assert_eq!(live.tools[0].id, ToolName::SendInvoice);
    }
}
