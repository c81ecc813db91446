use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use payhub_core::{CreateInvoice, Invoice, InvoiceActionReceipt, InvoiceFilter, InvoiceId};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list).post(create))
        .route("/api/invoices/{id}/send", post(send))
        .route("/api/invoices/{id}/cancel", post(cancel))
}

pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<InvoiceFilter>, QueryRejection>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let Query(filter) = filter?;
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.list_invoices(filter, &correlation_id).await?;
    Ok(Json(dispatched.value))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateInvoice>, JsonRejection>,
) -> Result<Json<Invoice>, ApiError> {
    let Json(request) = payload?;
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.create_invoice(request, &correlation_id).await?;
    Ok(Json(dispatched.value))
}

pub async fn send(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceActionReceipt>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.send_invoice(InvoiceId(id), &correlation_id).await?;
    Ok(Json(dispatched.value))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceActionReceipt>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.cancel_invoice(InvoiceId(id), &correlation_id).await?;
    Ok(Json(dispatched.value))
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, Query, State};
    use axum::Json;
    use payhub_core::{InvoiceFilter, InvoiceStatus};

    use super::{cancel, list, send};
    use crate::error::ApiError;
    use crate::state::fixtures;

    #[tokio::test]
    async fn demo_list_is_deterministic_and_flagged() {
        let state = fixtures::unconfigured();

        let Json(first) =
            list(State(state.clone()), Ok(Query(InvoiceFilter::default()))).await.expect("list");
        let Json(second) =
            list(State(state), Ok(Query(InvoiceFilter::default()))).await.expect("list");

        assert!(!first.is_empty());
        assert_eq!(first.len(), second.len());
        assert!(first.iter().all(|invoice| invoice.is_demo));
    }

    #[tokio::test]
    async fn demo_send_marks_receipt_as_demo() {
        let Json(receipt) = send(State(fixtures::unconfigured()), Path("inv_demo_002".to_string()))
            .await
            .expect("send");

        assert!(receipt.success);
        assert!(receipt.is_demo);
        assert_eq!(receipt.status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn degraded_cancel_still_answers() {
        let state = fixtures::live_failing(vec![payhub_agent::ToolName::CancelInvoice]);

        let Json(receipt) =
            cancel(State(state), Path("7451283956".to_string())).await.expect("degraded cancel");

        assert!(receipt.is_demo);
        assert_eq!(receipt.status, InvoiceStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_paid_demo_invoice_is_a_bad_request() {
        let error = cancel(State(fixtures::unconfigured()), Path("inv_demo_003".to_string()))
            .await
            .expect_err("paid invoices cannot be cancelled");

        assert!(matches!(error, ApiError::BadRequest { .. }));
    }
}
