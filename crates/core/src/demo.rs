//! Demonstration data used when the Visa Acceptance API is not in play.
//!
//! Everything here is deterministic for a given `now`, so list results are
//! stable across calls and tests can pin timestamps.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::invoice::{
    CreateInvoice, Invoice, InvoiceAction, InvoiceActionReceipt, InvoiceFilter, InvoiceId,
    InvoiceStatus,
};
use crate::domain::payment_link::{CreatePaymentLink, PaymentLink, PaymentLinkFilter};
use crate::errors::DomainError;

pub const DEMO_PAY_HOST: &str = "https://pay.visa.com";

/// Why a substitute was produced; only affects the row markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoReason {
    DemoMode,
    LiveFailure,
    LiveEmpty,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    date(year, month, day).and_hms_opt(12, 0, 0).unwrap_or_default().and_utc()
}

#[allow(clippy::too_many_arguments)]
fn demo_invoice(
    id: &str,
    amount: Decimal,
    currency: &str,
    email: &str,
    name: &str,
    memo: &str,
    status: InvoiceStatus,
    created: (i32, u32, u32),
    due: (i32, u32, u32),
) -> Invoice {
    Invoice {
        id: InvoiceId(id.to_string()),
        amount,
        currency: currency.to_string(),
        email: email.to_string(),
        name: Some(name.to_string()),
        memo: Some(memo.to_string()),
        status,
        due_date: date(due.0, due.1, due.2),
        created_at: date(created.0, created.1, created.2),
        is_demo: true,
        is_live_api_empty: false,
    }
}

/// The fixed demonstration invoice set.
pub fn invoices() -> Vec<Invoice> {
    vec![
        demo_invoice(
            "inv_demo_001",
            Decimal::new(100, 0),
            "USD",
            "john@example.com",
            "John Doe",
            "Consulting services",
            InvoiceStatus::Sent,
            (2024, 1, 15),
            (2024, 2, 15),
        ),
        demo_invoice(
            "inv_demo_002",
            Decimal::new(250, 0),
            "EUR",
            "jane@example.com",
            "Jane Smith",
            "Design work",
            InvoiceStatus::Draft,
            (2024, 1, 16),
            (2024, 2, 20),
        ),
        demo_invoice(
            "inv_demo_003",
            Decimal::new(49_999, 2),
            "USD",
            "ops@acme.test",
            "Acme Operations",
            "Quarterly support retainer",
            InvoiceStatus::Paid,
            (2024, 1, 2),
            (2024, 2, 1),
        ),
    ]
}

pub fn list_invoices(filter: &InvoiceFilter, reason: DemoReason) -> Vec<Invoice> {
    invoices()
        .into_iter()
        .filter(|invoice| filter.status.map_or(true, |status| invoice.status == status))
        .take(filter.effective_limit())
        .map(|invoice| mark_invoice(invoice, reason))
        .collect()
}

pub fn create_invoice(
    request: &CreateInvoice,
    now: DateTime<Utc>,
) -> Result<Invoice, DomainError> {
    let created_at = now.date_naive();
    Ok(Invoice {
        id: InvoiceId(format!("inv_{}", now.timestamp_millis())),
        amount: request.amount,
        currency: request.currency.clone(),
        email: request.email.clone(),
        name: request.name.clone(),
        memo: request.memo.clone(),
        status: InvoiceStatus::Draft,
        due_date: request.due_date_from(created_at)?,
        created_at,
        is_demo: true,
        is_live_api_empty: false,
    })
}

/// A demo receipt for send/cancel. Ids from the demo set are held to the
/// invoice lifecycle; any other id is accepted as-is.
pub fn invoice_action(
    invoice_id: &InvoiceId,
    action: InvoiceAction,
    now: DateTime<Utc>,
) -> Result<InvoiceActionReceipt, DomainError> {
    if let Some(mut known) = invoices().into_iter().find(|invoice| &invoice.id == invoice_id) {
        known.transition_to(action.target_status())?;
    }
    Ok(invoice_receipt(invoice_id, action, now))
}

/// A flagged receipt with no lifecycle check, for when a live send/cancel
/// failed and the caller must still get a result.
pub fn invoice_receipt(
    invoice_id: &InvoiceId,
    action: InvoiceAction,
    now: DateTime<Utc>,
) -> InvoiceActionReceipt {
    InvoiceActionReceipt {
        success: true,
        message: format!("Invoice {invoice_id} {} (demo)", action.past_tense()),
        invoice_id: invoice_id.clone(),
        status: action.target_status(),
        is_demo: true,
        timestamp: now,
    }
}

pub fn payment_links() -> Vec<PaymentLink> {
    vec![
        PaymentLink {
            id: "link_demo_001".to_string(),
            url: format!("{DEMO_PAY_HOST}/link_demo_001"),
            amount: Decimal::new(50, 0),
            currency: "USD".to_string(),
            memo: Some("Workshop registration".to_string()),
            created_at: timestamp(2024, 1, 10),
            is_demo: true,
            is_live_api_empty: false,
        },
        PaymentLink {
            id: "link_demo_002".to_string(),
            url: format!("{DEMO_PAY_HOST}/link_demo_002"),
            amount: Decimal::new(1_999, 2),
            currency: "GBP".to_string(),
            memo: Some("E-book bundle".to_string()),
            created_at: timestamp(2024, 1, 12),
            is_demo: true,
            is_live_api_empty: false,
        },
    ]
}

pub fn list_payment_links(filter: &PaymentLinkFilter, reason: DemoReason) -> Vec<PaymentLink> {
    payment_links()
        .into_iter()
        .take(filter.effective_limit())
        .map(|mut link| {
            link.is_live_api_empty = reason == DemoReason::LiveEmpty;
            link
        })
        .collect()
}

pub fn create_payment_link(request: &CreatePaymentLink, now: DateTime<Utc>) -> PaymentLink {
    let id = format!("link_{}", now.timestamp_millis());
    PaymentLink {
        url: format!("{DEMO_PAY_HOST}/{id}"),
        id,
        amount: request.amount,
        currency: request.currency.clone(),
        memo: request.memo.clone(),
        created_at: now,
        is_demo: true,
        is_live_api_empty: false,
    }
}

fn mark_invoice(mut invoice: Invoice, reason: DemoReason) -> Invoice {
    invoice.is_demo = true;
    invoice.is_live_api_empty = reason == DemoReason::LiveEmpty;
    invoice
}
