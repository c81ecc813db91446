use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{default_currency, effective_limit, normalize_currency};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_live_api_empty: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentLink {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl CreatePaymentLink {
    pub fn validated(&self) -> Result<Self, DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "amount must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            amount: self.amount,
            currency: normalize_currency(&self.currency)?,
            memo: self.memo.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(Into::into),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl PaymentLinkFilter {
    pub fn effective_limit(&self) -> usize {
        effective_limit(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::CreatePaymentLink;

    #[test]
    fn create_request_defaults_currency() {
        let request: CreatePaymentLink =
            serde_json::from_value(json!({ "amount": 75.0, "memo": "Test link" }))
                .expect("deserialize");

        let validated = request.validated().expect("valid");
        assert_eq!(validated.currency, "USD");
        assert_eq!(validated.amount, Decimal::new(75, 0));
        assert_eq!(validated.memo.as_deref(), Some("Test link"));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let request: CreatePaymentLink =
            serde_json::from_value(json!({ "amount": -5, "currency": "usd" }))
                .expect("deserialize");

        assert!(request.validated().is_err());
    }
}
