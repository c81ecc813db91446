//! Request bodies for, and response normalisation from, the vendor REST API.
//!
//! Responses are folded into the domain `Invoice` / `PaymentLink` shapes here
//! so nothing past the adapter ever sees vendor JSON.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use payhub_core::domain::invoice::DEFAULT_DUE_DAYS;
use payhub_core::{
    CreateInvoice, CreatePaymentLink, DomainError, Invoice, InvoiceId, InvoiceStatus, PaymentLink,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};

pub fn invoice_request(request: &CreateInvoice, today: NaiveDate) -> Result<Value, DomainError> {
    let due_date = request.due_date_from(today)?;

    let mut customer = json!({ "email": request.email });
    if let Some(name) = &request.name {
        customer["name"] = json!(name);
    }

    Ok(json!({
        "customerInformation": customer,
        "invoiceInformation": {
            "description": request.memo.clone().unwrap_or_default(),
            "dueDate": due_date.format("%Y-%m-%d").to_string(),
            "sendImmediately": false,
            "deliveryMode": "email",
        },
        "orderInformation": {
            "amountDetails": {
                "totalAmount": format!("{:.2}", request.amount),
                "currency": request.currency,
            }
        }
    }))
}

pub fn payment_link_request(request: &CreatePaymentLink) -> Value {
    let product = request.memo.clone().unwrap_or_else(|| "Payment".to_string());
    let amount = format!("{:.2}", request.amount);

    json!({
        "processingInformation": { "linkType": "PURCHASE" },
        "orderInformation": {
            "amountDetails": {
                "totalAmount": amount,
                "currency": request.currency,
            },
            "lineItems": [{
                "productName": product,
                "unitPrice": amount,
                "quantity": 1,
            }]
        }
    })
}

/// Vendor spelling of a status filter.
pub fn vendor_status(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "DRAFT",
        InvoiceStatus::Sent => "SENT",
        InvoiceStatus::Paid => "PAID",
        InvoiceStatus::Cancelled => "CANCELED",
    }
}

pub fn invoice_from_vendor(value: &Value, today: NaiveDate) -> Option<Invoice> {
    let id = string_at(value, "/id")?;
    let created_at = string_at(value, "/submitTimeUtc")
        .or_else(|| string_at(value, "/createdDate"))
        .and_then(|raw| parse_timestamp(&raw))
        .map(|timestamp| timestamp.date_naive())
        .unwrap_or(today);
    let due_date = string_at(value, "/invoiceInformation/dueDate")
        .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
        .or_else(|| created_at.checked_add_signed(Duration::days(i64::from(DEFAULT_DUE_DAYS))))
        .unwrap_or(created_at);

    Some(Invoice {
        id: InvoiceId(id),
        amount: value
            .pointer("/orderInformation/amountDetails/totalAmount")
            .and_then(decimal_from_value)
            .unwrap_or(Decimal::ZERO),
        currency: string_at(value, "/orderInformation/amountDetails/currency")
            .unwrap_or_else(|| "USD".to_string()),
        email: string_at(value, "/customerInformation/email").unwrap_or_default(),
        name: string_at(value, "/customerInformation/name"),
        memo: string_at(value, "/invoiceInformation/description"),
        status: string_at(value, "/status")
            .and_then(|raw| InvoiceStatus::parse(&raw))
            .unwrap_or(InvoiceStatus::Draft),
        due_date,
        created_at,
        is_demo: false,
        is_live_api_empty: false,
    })
}

pub fn invoices_from_vendor(body: &Value, today: NaiveDate) -> Vec<Invoice> {
    array_at(body, &["invoices"])
        .iter()
        .filter_map(|row| invoice_from_vendor(row, today))
        .collect()
}

pub fn payment_link_from_vendor(value: &Value, now: DateTime<Utc>) -> Option<PaymentLink> {
    let id = string_at(value, "/id")?;
    let url = string_at(value, "/purchaseInformation/paymentLink")
        .or_else(|| string_at(value, "/paymentLink"))
        .or_else(|| string_at(value, "/link"))?;

    Some(PaymentLink {
        id,
        url,
        amount: value
            .pointer("/orderInformation/amountDetails/totalAmount")
            .and_then(decimal_from_value)
            .unwrap_or(Decimal::ZERO),
        currency: string_at(value, "/orderInformation/amountDetails/currency")
            .unwrap_or_else(|| "USD".to_string()),
        memo: string_at(value, "/orderInformation/lineItems/0/productDescription")
            .or_else(|| string_at(value, "/orderInformation/lineItems/0/productName")),
        created_at: string_at(value, "/submitTimeUtc")
            .or_else(|| string_at(value, "/createdDate"))
            .and_then(|raw| parse_timestamp(&raw))
            .unwrap_or(now),
        is_demo: false,
        is_live_api_empty: false,
    })
}

pub fn payment_links_from_vendor(body: &Value, now: DateTime<Utc>) -> Vec<PaymentLink> {
    array_at(body, &["paymentLinks", "links"])
        .iter()
        .filter_map(|row| payment_link_from_vendor(row, now))
        .collect()
}

/// Human-readable reason for a non-2xx vendor response.
pub fn failure_message(status: StatusCode, body: &Value) -> String {
    let detail = string_at(body, "/message")
        .or_else(|| string_at(body, "/reason"))
        .or_else(|| string_at(body, "/errorInformation/message"))
        .or_else(|| body.as_str().map(str::to_string).filter(|text| !text.trim().is_empty()));

    match detail {
        Some(detail) => format!("vendor returned {status}: {detail}"),
        None => format!("vendor returned {status}"),
    }
}

fn array_at<'a>(body: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Some(rows) = body.as_array() {
        return rows;
    }
    keys.iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|timestamp| timestamp.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use payhub_core::{CreateInvoice, CreatePaymentLink, InvoiceStatus};
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        failure_message, invoice_request, invoices_from_vendor, payment_link_from_vendor,
        payment_link_request, payment_links_from_vendor,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    #[test]
    fn invoice_request_carries_amount_due_date_and_customer() {
        let request = CreateInvoice {
            amount: Decimal::new(1005, 1),
            currency: "EUR".to_string(),
            email: "jane@example.com".to_string(),
            name: Some("Jane".to_string()),
            memo: Some("Design work".to_string()),
            due_days: Some(14),
        };

        let body = invoice_request(&request, today()).expect("due date in range");

        assert_eq!(body["orderInformation"]["amountDetails"]["totalAmount"], json!("100.50"));
        assert_eq!(body["orderInformation"]["amountDetails"]["currency"], json!("EUR"));
        assert_eq!(body["invoiceInformation"]["dueDate"], json!("2024-03-15"));
        assert_eq!(body["customerInformation"]["name"], json!("Jane"));
    }

    #[test]
    fn payment_link_request_is_a_purchase_with_one_line_item() {
        let body = payment_link_request(&CreatePaymentLink {
            amount: Decimal::new(75, 0),
            currency: "USD".to_string(),
            memo: None,
        });

        assert_eq!(body["processingInformation"]["linkType"], json!("PURCHASE"));
        assert_eq!(body["orderInformation"]["lineItems"][0]["productName"], json!("Payment"));
        assert_eq!(body["orderInformation"]["lineItems"][0]["unitPrice"], json!("75.00"));
    }

    #[test]
    fn vendor_invoice_list_is_normalised() {
        let body = json!({
            "totalRecords": 2,
            "invoices": [
                {
                    "id": "7451283956",
                    "status": "CANCELED",
                    "submitTimeUtc": "2024-02-10T08:00:00Z",
                    "customerInformation": { "email": "john@example.com", "name": "John" },
                    "invoiceInformation": { "description": "Consulting", "dueDate": "2024-03-10" },
                    "orderInformation": { "amountDetails": { "totalAmount": "250.00", "currency": "USD" } }
                },
                { "status": "SENT" }
            ]
        });

        let invoices = invoices_from_vendor(&body, today());

        assert_eq!(invoices.len(), 1, "rows without an id are dropped");
        let invoice = &invoices[0];
        assert_eq!(invoice.id.0, "7451283956");
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
        assert_eq!(invoice.amount, Decimal::new(250, 0));
        assert_eq!(invoice.created_at.to_string(), "2024-02-10");
        assert_eq!(invoice.due_date.to_string(), "2024-03-10");
        assert!(!invoice.is_demo);
    }

    #[test]
    fn missing_invoice_array_means_no_rows() {
        assert!(invoices_from_vendor(&json!({ "totalRecords": 0 }), today()).is_empty());
    }

    #[test]
    fn vendor_payment_link_is_normalised() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().expect("valid time");
        let link = payment_link_from_vendor(
            &json!({
                "id": "pl_123",
                "purchaseInformation": { "paymentLink": "https://pay.example/pl_123" },
                "orderInformation": {
                    "amountDetails": { "totalAmount": 19.99, "currency": "GBP" },
                    "lineItems": [{ "productName": "E-book" }]
                }
            }),
            now,
        )
        .expect("link");

        assert_eq!(link.url, "https://pay.example/pl_123");
        assert_eq!(link.amount, Decimal::new(1999, 2));
        assert_eq!(link.memo.as_deref(), Some("E-book"));
        assert_eq!(link.created_at, now);

        let links = payment_links_from_vendor(&json!({ "links": [] }), now);
        assert!(links.is_empty());
    }

    #[test]
    fn failure_message_prefers_vendor_reason() {
        let message = failure_message(
            StatusCode::BAD_REQUEST,
            &json!({ "reason": "INVALID_DATA", "message": "Declined - invalid email" }),
        );
        assert_eq!(message, "vendor returned 400 Bad Request: Declined - invalid email");

        assert_eq!(
            failure_message(StatusCode::BAD_GATEWAY, &json!(null)),
            "vendor returned 502 Bad Gateway"
        );
    }
}
