use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{default_currency, effective_limit, normalize_currency};
use crate::errors::DomainError;

pub const DEFAULT_DUE_DAYS: u32 = 30;
pub const MAX_DUE_DAYS: u32 = 3650;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub String);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Maps both our own names and the vendor's upper-case lifecycle names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" | "created" => Some(Self::Draft),
            "sent" | "pending" | "partial" => Some(Self::Sent),
            "paid" => Some(Self::Paid),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub created_at: NaiveDate,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_live_api_empty: bool,
}

impl Invoice {
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self.status, next),
            (InvoiceStatus::Draft, InvoiceStatus::Sent)
                | (InvoiceStatus::Draft, InvoiceStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: InvoiceStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidInvoiceTransition { from: self.status, to: next })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_days: Option<u32>,
}

impl CreateInvoice {
    /// Returns a normalised copy, or the first invariant the request breaks.
    pub fn validated(&self) -> Result<Self, DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "amount must be greater than zero".to_string(),
            ));
        }

        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::InvariantViolation(
                "a valid customer email is required".to_string(),
            ));
        }

        if let Some(days) = self.due_days {
            if !(1..=MAX_DUE_DAYS).contains(&days) {
                return Err(DomainError::InvariantViolation(format!(
                    "dueDays must be between 1 and {MAX_DUE_DAYS}, got {days}"
                )));
            }
        }

        Ok(Self {
            amount: self.amount,
            currency: normalize_currency(&self.currency)?,
            email: email.to_string(),
            name: self.name.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(Into::into),
            memo: self.memo.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(Into::into),
            due_days: self.due_days,
        })
    }

    pub fn due_days_or_default(&self) -> u32 {
        self.due_days.unwrap_or(DEFAULT_DUE_DAYS)
    }

    pub fn due_date_from(&self, start: NaiveDate) -> Result<NaiveDate, DomainError> {
        let days = self.due_days_or_default();
        start.checked_add_signed(Duration::days(i64::from(days))).ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "due date {days} days after {start} is out of range"
            ))
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl InvoiceFilter {
    pub fn effective_limit(&self) -> usize {
        effective_limit(self.limit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceAction {
    Send,
    Cancel,
}

impl InvoiceAction {
    pub fn target_status(&self) -> InvoiceStatus {
        match self {
            Self::Send => InvoiceStatus::Sent,
            Self::Cancel => InvoiceStatus::Cancelled,
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Send => "sent",
            Self::Cancel => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceActionReceipt {
    pub success: bool,
    pub message: String,
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub is_demo: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{CreateInvoice, Invoice, InvoiceId, InvoiceStatus, MAX_DUE_DAYS};
    use crate::errors::DomainError;

    fn invoice(status: InvoiceStatus) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        Invoice {
            id: InvoiceId("inv_1".to_string()),
            amount: Decimal::new(10000, 2),
            currency: "USD".to_string(),
            email: "john@example.com".to_string(),
            name: None,
            memo: None,
            status,
            due_date: date,
            created_at: date,
            is_demo: true,
            is_live_api_empty: false,
        }
    }

    #[test]
    fn draft_can_be_sent_or_cancelled() {
        let mut sent = invoice(InvoiceStatus::Draft);
        sent.transition_to(InvoiceStatus::Sent).expect("draft -> sent");
        assert_eq!(sent.status, InvoiceStatus::Sent);

        let mut cancelled = invoice(InvoiceStatus::Draft);
        cancelled.transition_to(InvoiceStatus::Cancelled).expect("draft -> cancelled");
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn paid_invoice_cannot_be_sent_again() {
        let mut paid = invoice(InvoiceStatus::Paid);
        let error = paid.transition_to(InvoiceStatus::Sent).expect_err("paid -> sent should fail");

        assert!(matches!(error, DomainError::InvalidInvoiceTransition { .. }));
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }

    #[test]
    fn serializes_with_camel_case_and_numeric_amount() {
        let value = serde_json::to_value(invoice(InvoiceStatus::Sent)).expect("serialize");

        assert_eq!(value["amount"].as_f64(), Some(100.0));
        assert_eq!(value["dueDate"], json!("2024-01-15"));
        assert_eq!(value["isDemo"], json!(true));
        assert!(value.get("isLiveApiEmpty").is_none(), "false flag should be omitted");
    }

    #[test]
    fn create_request_defaults_currency_and_normalises() {
        let request: CreateInvoice = serde_json::from_value(json!({
            "amount": 125.5,
            "email": " test@example.com ",
            "memo": "  "
        }))
        .expect("deserialize");

        let validated = request.validated().expect("valid request");
        assert_eq!(validated.currency, "USD");
        assert_eq!(validated.email, "test@example.com");
        assert_eq!(validated.memo, None);
        assert_eq!(validated.due_days_or_default(), 30);
    }

    #[test]
    fn create_request_rejects_missing_email_and_bad_amount() {
        let missing_email: CreateInvoice =
            serde_json::from_value(json!({ "amount": 10 })).expect("deserialize");
        assert!(missing_email.validated().is_err());

        let zero_amount: CreateInvoice =
            serde_json::from_value(json!({ "amount": 0, "email": "a@b.co" })).expect("deserialize");
        assert!(zero_amount.validated().is_err());
    }

    #[test]
    fn create_request_bounds_due_days() {
        let request = |due_days: u32| -> CreateInvoice {
            serde_json::from_value(json!({ "amount": 10, "email": "a@b.co", "dueDays": due_days }))
                .expect("deserialize")
        };

        for out_of_range in [0, MAX_DUE_DAYS + 1, u32::MAX] {
            assert!(
                matches!(
                    request(out_of_range).validated(),
                    Err(DomainError::InvariantViolation(_))
                ),
                "dueDays {out_of_range} should be rejected"
            );
        }
        assert!(request(MAX_DUE_DAYS).validated().is_ok());
    }

    #[test]
    fn due_date_counts_from_start_and_never_overflows() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        let request: CreateInvoice =
            serde_json::from_value(json!({ "amount": 10, "email": "a@b.co", "dueDays": 10 }))
                .expect("deserialize");
        assert_eq!(request.due_date_from(start).ok(), NaiveDate::from_ymd_opt(2024, 1, 25));

        let unchecked: CreateInvoice = serde_json::from_value(
            json!({ "amount": 10, "email": "a@b.co", "dueDays": u32::MAX }),
        )
        .expect("deserialize");
        assert!(matches!(
            unchecked.due_date_from(NaiveDate::MAX),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn vendor_status_names_are_understood() {
        assert_eq!(InvoiceStatus::parse("CANCELED"), Some(InvoiceStatus::Cancelled));
        assert_eq!(InvoiceStatus::parse("CREATED"), Some(InvoiceStatus::Draft));
        assert_eq!(InvoiceStatus::parse("unknown"), None);
    }
}
