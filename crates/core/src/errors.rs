use thiserror::Error;

use crate::{domain::invoice::InvoiceStatus, mode::Mode};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid invoice transition from {from} to {to}")]
    InvalidInvoiceTransition { from: InvoiceStatus, to: InvoiceStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error(
        "Cannot switch to {requested} mode: Visa Acceptance toolkit not available or not properly configured"
    )]
    InvalidTransition { requested: Mode, toolkit_available: bool, credentials_configured: bool },
}

#[cfg(test)]
mod tests {
    use crate::domain::invoice::InvoiceStatus;
    use crate::errors::{DomainError, ModeError};
    use crate::mode::Mode;

    #[test]
    fn invalid_transition_message_names_both_states() {
        let error = DomainError::InvalidInvoiceTransition {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Sent,
        };

        assert_eq!(error.to_string(), "invalid invoice transition from paid to sent");
    }

    #[test]
    fn mode_error_is_user_facing() {
        let error = ModeError::InvalidTransition {
            requested: Mode::Live,
            toolkit_available: false,
            credentials_configured: false,
        };

        assert!(error.to_string().starts_with("Cannot switch to live mode"));
    }
}
