//! Keyword and regex parser used when no LLM is available or it misbehaves.
//! Total: every input yields a selection.

use std::str::FromStr;

use once_cell::sync::Lazy;
use payhub_core::domain::{DEFAULT_CURRENCY, DEFAULT_LIST_LIMIT};
use payhub_core::InvoiceStatus;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::{Selection, SelectionSource};
use crate::tools::ToolName;

pub const DEFAULT_EMAIL: &str = "customer@example.com";
pub const DEFAULT_AMOUNT: i64 = 100;
pub const DEFAULT_INVOICE_ID: &str = "inv_unknown";
const GENERATED_MEMO: &str = "Generated from AI request";

static EMAIL: Lazy<Regex> =
    Lazy::new(|| literal(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"));
static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| literal(r"\$\s?(\d[\d,]*(?:\.\d{1,2})?)"));
static BARE_AMOUNT: Lazy<Regex> = Lazy::new(|| literal(r"\b(\d+(?:\.\d{1,2})?)\b"));
static CURRENCY: Lazy<Regex> = Lazy::new(|| literal(r"(?i)\b(USD|EUR|GBP|CAD|JPY)\b"));
static INVOICE_ID: Lazy<Regex> = Lazy::new(|| literal(r"(?i)\binv_\w+"));
static NUMBERED_INVOICE: Lazy<Regex> =
    Lazy::new(|| literal(r"(?i)invoice\s+#?([A-Za-z0-9_-]*\d[A-Za-z0-9_-]*)"));

fn literal(source: &str) -> Regex {
    Regex::new(source).expect("extraction patterns are string literals")
}

pub fn select(query: &str) -> Selection {
    let (tool, reasoning) = classify(query);
    Selection {
        tool,
        parameters: arguments_for(tool, query),
        reasoning: reasoning.to_string(),
        source: SelectionSource::Rules,
    }
}

fn classify(query: &str) -> (ToolName, &'static str) {
    let lower = query.to_lowercase();
    let has = |word: &str| lower.contains(word);
    let listing = has("list") || has("show");

    if has("create") && has("invoice") {
        (ToolName::CreateInvoice, "matched keywords: create + invoice")
    } else if listing && has("invoice") {
        (ToolName::ListInvoices, "matched keywords: list + invoice")
    } else if has("send") && has("invoice") {
        (ToolName::SendInvoice, "matched keywords: send + invoice")
    } else if has("cancel") && has("invoice") {
        (ToolName::CancelInvoice, "matched keywords: cancel + invoice")
    } else if listing && has("link") {
        (ToolName::ListPaymentLinks, "matched keywords: list + link")
    } else if has("create") && (has("link") || has("payment")) {
        (ToolName::CreatePaymentLink, "matched keywords: create + link/payment")
    } else {
        (ToolName::CreateInvoice, "no keyword match; defaulting to create_invoice")
    }
}

/// Arguments for `tool` pulled out of free text, with defaults for anything absent.
pub fn arguments_for(tool: ToolName, query: &str) -> Map<String, Value> {
    let mut args = Map::new();
    match tool {
        ToolName::CreateInvoice => {
            args.insert("amount".into(), amount_json(extract_amount(query)));
            args.insert("currency".into(), json!(extract_currency(query)));
            args.insert(
                "email".into(),
                json!(extract_email(query).unwrap_or_else(|| DEFAULT_EMAIL.to_string())),
            );
            args.insert("memo".into(), json!(GENERATED_MEMO));
        }
        ToolName::CreatePaymentLink => {
            args.insert("amount".into(), amount_json(extract_amount(query)));
            args.insert("currency".into(), json!(extract_currency(query)));
            args.insert("memo".into(), json!(GENERATED_MEMO));
        }
        ToolName::ListInvoices => {
            if let Some(status) = extract_status(query) {
                args.insert("status".into(), json!(status));
            }
            args.insert("limit".into(), json!(DEFAULT_LIST_LIMIT));
        }
        ToolName::ListPaymentLinks => {
            args.insert("limit".into(), json!(DEFAULT_LIST_LIMIT));
        }
        ToolName::SendInvoice | ToolName::CancelInvoice => {
            args.insert(
                "invoiceId".into(),
                json!(extract_invoice_id(query).unwrap_or_else(|| DEFAULT_INVOICE_ID.to_string())),
            );
        }
    }
    args
}

pub fn extract_email(query: &str) -> Option<String> {
    EMAIL.find(query).map(|found| found.as_str().to_string())
}

/// A `$`-prefixed figure wins over the first bare number.
pub fn extract_amount(query: &str) -> Decimal {
    let dollar = DOLLAR_AMOUNT.captures(query).and_then(|caps| caps.get(1));
    let bare = || BARE_AMOUNT.captures(query).and_then(|caps| caps.get(1));

    dollar
        .or_else(bare)
        .and_then(|found| Decimal::from_str(&found.as_str().replace(',', "")).ok())
        .filter(|amount| *amount > Decimal::ZERO)
        .unwrap_or_else(|| Decimal::from(DEFAULT_AMOUNT))
}

pub fn extract_currency(query: &str) -> String {
    CURRENCY
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

pub fn extract_invoice_id(query: &str) -> Option<String> {
    if let Some(found) = INVOICE_ID.find(query) {
        return Some(found.as_str().to_string());
    }
    NUMBERED_INVOICE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_string())
}

pub fn extract_status(query: &str) -> Option<InvoiceStatus> {
    query
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .find_map(|word| match word.to_ascii_lowercase().as_str() {
            "draft" | "drafts" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "cancelled" | "canceled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        })
}

/// Whole amounts serialize as integers so `100` stays `100`, not `100.0`.
fn amount_json(amount: Decimal) -> Value {
    if amount.fract().is_zero() {
        if let Some(whole) = amount.to_i64() {
            return json!(whole);
        }
    }
    amount.to_f64().map(|value| json!(value)).unwrap_or_else(|| json!(DEFAULT_AMOUNT))
}
