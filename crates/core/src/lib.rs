pub mod config;
pub mod credentials;
pub mod demo;
pub mod domain;
pub mod errors;
pub mod mode;

pub use credentials::{CredentialResolution, Credentials, VisaEnvironment};
pub use domain::invoice::{
    CreateInvoice, Invoice, InvoiceAction, InvoiceActionReceipt, InvoiceFilter, InvoiceId,
    InvoiceStatus,
};
pub use domain::payment_link::{CreatePaymentLink, PaymentLink, PaymentLinkFilter};
pub use errors::{DomainError, ModeError};
pub use mode::{Mode, ModeController, ModeSnapshot, ModeTransition, OperatingStatus, Readiness};
