//! Free-text query to tool selection.
//!
//! With an LLM configured and the process live, the model picks the tool from
//! the static catalog. Any call or parse failure drops to [`rules`], which
//! always produces an answer.

pub mod rules;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::tools::ToolName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Llm,
    Rules,
    /// The client named the tool itself.
    Explicit,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selection {
    pub tool: ToolName,
    pub parameters: Map<String, Value>,
    pub reasoning: String,
    pub source: SelectionSource,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("LLM reply was not a JSON object: {0}")]
    NotJson(String),
    #[error("LLM reply did not name a tool")]
    MissingTool,
    #[error("LLM chose unknown tool `{0}`")]
    UnknownTool(String),
}

#[derive(Clone, Default)]
pub struct ToolSelector {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ToolSelector {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub fn rules_only() -> Self {
        Self { llm: None }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn select(&self, query: &str, live: bool) -> Selection {
        if let (true, Some(llm)) = (live, &self.llm) {
            let reply = llm.complete(&catalog_prompt(query)).await;
            match reply.map_err(|error| error.to_string()).and_then(|raw| {
                parse_llm_reply(&raw).map_err(|error| error.to_string())
            }) {
                Ok(selection) => {
                    debug!(event_name = "selector.llm", tool = %selection.tool, "LLM selected tool");
                    return selection;
                }
                Err(reason) => warn!(
                    event_name = "selector.llm_fallback",
                    %reason,
                    "LLM tool selection failed; using rule-based parser"
                ),
            }
        }

        rules::select(query)
    }
}

impl std::fmt::Debug for ToolSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSelector").field("has_llm", &self.has_llm()).finish()
    }
}

pub fn catalog_prompt(query: &str) -> String {
    let mut prompt = String::from("Available tools:\n");
    for tool in ToolName::ALL {
        prompt.push_str(&format!(
            "- {}: {}\n  parameters: {}\n",
            tool,
            tool.description(),
            tool.parameters_schema()
        ));
    }
    prompt.push_str(&format!(
        "\nUser request: {query}\n\n\
         Respond with JSON: {{\"tool\": \"<tool name>\", \"parameters\": {{...}}, \"reasoning\": \"<why>\"}}"
    ));
    prompt
}

pub fn parse_llm_reply(raw: &str) -> Result<Selection, SelectionError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|error| SelectionError::NotJson(error.to_string()))?;
    let object = value.as_object().ok_or_else(|| SelectionError::NotJson("not an object".into()))?;

    let tool_name = object.get("tool").and_then(Value::as_str).ok_or(SelectionError::MissingTool)?;
    let tool =
        ToolName::parse(tool_name).ok_or_else(|| SelectionError::UnknownTool(tool_name.to_string()))?;

    Ok(Selection {
        tool,
        parameters: object.get("parameters").and_then(Value::as_object).cloned().unwrap_or_default(),
        reasoning: object.get("reasoning").and_then(Value::as_str).unwrap_or_default().to_string(),
        source: SelectionSource::Llm,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let inner = trimmed.trim_start_matches('`');
    let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or(inner);
    inner.trim_end().trim_end_matches('`').trim()
}
