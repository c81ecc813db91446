pub mod invoice;
pub mod payment_link;

use crate::errors::DomainError;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// A requested page size, never zero so a list is never empty by request.
pub fn effective_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIST_LIMIT).max(1)
}

pub(crate) fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Uppercases and checks an ISO-4217 style three-letter code.
pub fn normalize_currency(raw: &str) -> Result<String, DomainError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(DomainError::InvariantViolation(format!(
            "currency must be a three-letter code, got `{}`",
            raw.trim()
        )))
    }
}
