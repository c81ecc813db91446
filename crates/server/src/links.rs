use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use payhub_core::{CreatePaymentLink, PaymentLink, PaymentLinkFilter};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/links", get(list).post(create))
}

pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<PaymentLinkFilter>, QueryRejection>,
) -> Result<Json<Vec<PaymentLink>>, ApiError> {
    let Query(filter) = filter?;
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.list_payment_links(filter, &correlation_id).await?;
    Ok(Json(dispatched.value))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentLink>, JsonRejection>,
) -> Result<Json<PaymentLink>, ApiError> {
    let Json(request) = payload?;
    let correlation_id = Uuid::new_v4().to_string();
    let dispatched = state.dispatcher.create_payment_link(request, &correlation_id).await?;
    Ok(Json(dispatched.value))
}

#[cfg(test)]
mod tests {
    use axum::extract::{Query, State};
    use axum::Json;
    use payhub_agent::ToolName;
    use payhub_core::{CreatePaymentLink, PaymentLinkFilter};
    use rust_decimal::Decimal;

    use super::{create, list};
    use crate::state::fixtures;

    #[tokio::test]
    async fn empty_or_failed_live_lists_never_come_back_empty() {
        let state = fixtures::live_failing(vec![ToolName::ListPaymentLinks]);

        let Json(links) =
            list(State(state), Ok(Query(PaymentLinkFilter::default()))).await.expect("links");

        assert!(!links.is_empty());
        assert!(links.iter().all(|link| link.is_demo));
    }

    #[tokio::test]
    async fn demo_create_echoes_the_request() {
        let request = CreatePaymentLink {
            amount: Decimal::new(75, 0),
            currency: "usd".to_string(),
            memo: Some("Workshop".to_string()),
        };

        let Json(link) =
            create(State(fixtures::unconfigured()), Ok(Json(request))).await.expect("create");

        assert!(link.is_demo);
        assert_eq!(link.amount, Decimal::new(75, 0));
        assert_eq!(link.currency, "USD");
        assert!(link.url.starts_with("https://"));
    }
}
