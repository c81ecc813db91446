use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use payhub_agent::ToolName;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::dispatch::DispatchError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest { message: String, details: Option<Value> },
    ToolUnavailable { tool: ToolName },
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), details: None }
    }
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<ToolName>,
}

#[derive(Serialize)]
struct InternalBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest { message, details } => (
                StatusCode::BAD_REQUEST,
                Json(FailureBody {
                    success: false,
                    error: &message,
                    details: details.as_ref(),
                    code: None,
                    tool: None,
                }),
            )
                .into_response(),
            Self::ToolUnavailable { tool } => {
                let message = DispatchError::ToolUnavailable(tool).to_string();
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(FailureBody {
                        success: false,
                        error: &message,
                        details: None,
                        code: Some("tool_not_available"),
                        tool: Some(tool),
                    }),
                )
                    .into_response()
            }
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(InternalBody { error: &message }))
                    .into_response()
            }
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::ToolUnavailable(tool) => Self::ToolUnavailable { tool },
            DispatchError::InvalidArguments { .. } | DispatchError::Domain(_) => {
                Self::bad_request(error.to_string())
            }
            DispatchError::Encode(cause) => {
                error!(event_name = "api.encode_failed", error = %cause, "result encoding failed");
                Self::Internal(cause.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use payhub_agent::ToolName;
    use payhub_core::{DomainError, InvoiceStatus};
    use serde_json::{json, Value};

    use super::ApiError;
    use crate::dispatch::DispatchError;

    async fn render(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn tool_unavailable_is_503_with_code() {
        let (status, body) =
            render(DispatchError::ToolUnavailable(ToolName::SendInvoice).into()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("tool_not_available"));
        assert_eq!(body["tool"], json!("send_invoice"));
    }

    #[tokio::test]
    async fn domain_errors_are_bad_requests() {
        let error = DispatchError::Domain(DomainError::InvalidInvoiceTransition {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Sent,
        });
        let (status, body) = render(error.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid invoice transition from paid to sent"));
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn internal_errors_expose_only_the_message() {
        let (status, body) = render(ApiError::Internal("boom".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "boom" }));
    }
}
