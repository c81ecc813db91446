//! Mode-aware request routing.
//!
//! Every operation checks the effective mode, calls the live tool under a
//! timeout when live, and substitutes demo data whenever the live call does
//! not produce a usable result. Only a tool missing from the live catalog,
//! a domain rule violation, or malformed arguments reach the caller as errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use payhub_agent::{ToolName, ToolOutcome, Toolkit};
use payhub_core::demo::{self, DemoReason};
use payhub_core::{
    CreateInvoice, CreatePaymentLink, DomainError, Invoice, InvoiceAction, InvoiceActionReceipt,
    InvoiceFilter, InvoiceId, Mode, ModeController, PaymentLink, PaymentLinkFilter, Readiness,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Tool `{0}` is not available in the Visa Acceptance toolkit")]
    ToolUnavailable(ToolName),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: ToolName, message: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("could not encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where a result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    /// Live call succeeded with zero rows; demo rows substituted.
    LiveEmpty,
    /// Live call failed; demo data substituted.
    Degraded,
    Demo,
}

impl Provenance {
    pub fn is_demo(&self) -> bool {
        !matches!(self, Self::Live)
    }

    pub fn attempted_live(&self) -> bool {
        !matches!(self, Self::Demo)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dispatched<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T: Serialize> Dispatched<T> {
    fn into_json(self) -> Result<Dispatched<Value>, DispatchError> {
        Ok(Dispatched { value: serde_json::to_value(self.value)?, provenance: self.provenance })
    }
}

enum LiveCall<T> {
    NotLive,
    Succeeded(T),
    Failed,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceTarget {
    invoice_id: InvoiceId,
}

#[derive(Clone)]
pub struct Dispatcher {
    mode: Arc<ModeController>,
    toolkit: Arc<Toolkit>,
    credentials_configured: bool,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        mode: Arc<ModeController>,
        toolkit: Arc<Toolkit>,
        credentials_configured: bool,
        call_timeout: Duration,
    ) -> Self {
        Self { mode, toolkit, credentials_configured, call_timeout }
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            toolkit_available: self.toolkit.is_available(),
            tools_registered: self.toolkit.tool_names().len(),
            credentials_configured: self.credentials_configured,
        }
    }

    pub fn effective_mode(&self) -> Mode {
        self.mode.effective_mode(&self.readiness())
    }

    pub async fn create_invoice(
        &self,
        request: CreateInvoice,
        correlation_id: &str,
    ) -> Result<Dispatched<Invoice>, DispatchError> {
        let request = request.validated()?;
        let args = serde_json::to_value(&request)?;

        let outcome = self.call_live(ToolName::CreateInvoice, args, correlation_id).await?;
        let provenance = match outcome {
            LiveCall::Succeeded(invoice) => {
                return Ok(Dispatched { value: invoice, provenance: Provenance::Live })
            }
            LiveCall::NotLive => Provenance::Demo,
            LiveCall::Failed => Provenance::Degraded,
        };
        Ok(Dispatched { value: demo::create_invoice(&request, Utc::now())?, provenance })
    }

    pub async fn list_invoices(
        &self,
        filter: InvoiceFilter,
        correlation_id: &str,
    ) -> Result<Dispatched<Vec<Invoice>>, DispatchError> {
        let args = serde_json::to_value(&filter)?;

        let outcome =
            self.call_live::<Vec<Invoice>>(ToolName::ListInvoices, args, correlation_id).await?;
        let (reason, provenance) = match outcome {
            LiveCall::Succeeded(rows) if !rows.is_empty() => {
                return Ok(Dispatched { value: rows, provenance: Provenance::Live })
            }
            LiveCall::Succeeded(_) => {
                debug!(
                    event_name = "dispatch.live_empty",
                    correlation_id = %correlation_id,
                    tool = %ToolName::ListInvoices,
                    "live invoice list was empty; substituting demo rows"
                );
                (DemoReason::LiveEmpty, Provenance::LiveEmpty)
            }
            LiveCall::NotLive => (DemoReason::DemoMode, Provenance::Demo),
            LiveCall::Failed => (DemoReason::LiveFailure, Provenance::Degraded),
        };
        Ok(Dispatched { value: demo::list_invoices(&filter, reason), provenance })
    }

    pub async fn send_invoice(
        &self,
        invoice_id: InvoiceId,
        correlation_id: &str,
    ) -> Result<Dispatched<InvoiceActionReceipt>, DispatchError> {
        self.invoice_action(invoice_id, InvoiceAction::Send, correlation_id).await
    }

    pub async fn cancel_invoice(
        &self,
        invoice_id: InvoiceId,
        correlation_id: &str,
    ) -> Result<Dispatched<InvoiceActionReceipt>, DispatchError> {
        self.invoice_action(invoice_id, InvoiceAction::Cancel, correlation_id).await
    }

    async fn invoice_action(
        &self,
        invoice_id: InvoiceId,
        action: InvoiceAction,
        correlation_id: &str,
    ) -> Result<Dispatched<InvoiceActionReceipt>, DispatchError> {
        if invoice_id.0.trim().is_empty() {
            let error = DomainError::InvariantViolation("invoice id is required".to_string());
            return Err(error.into());
        }
        let tool = match action {
            InvoiceAction::Send => ToolName::SendInvoice,
            InvoiceAction::Cancel => ToolName::CancelInvoice,
        };
        let args = serde_json::json!({ "invoiceId": invoice_id });

        match self.call_live(tool, args, correlation_id).await? {
            LiveCall::Succeeded(receipt) => {
                Ok(Dispatched { value: receipt, provenance: Provenance::Live })
            }
            LiveCall::NotLive => Ok(Dispatched {
                value: demo::invoice_action(&invoice_id, action, Utc::now())?,
                provenance: Provenance::Demo,
            }),
            // The demo lifecycle says nothing about a live invoice.
            LiveCall::Failed => Ok(Dispatched {
                value: demo::invoice_receipt(&invoice_id, action, Utc::now()),
                provenance: Provenance::Degraded,
            }),
        }
    }

    pub async fn create_payment_link(
        &self,
        request: CreatePaymentLink,
        correlation_id: &str,
    ) -> Result<Dispatched<PaymentLink>, DispatchError> {
        let request = request.validated()?;
        let args = serde_json::to_value(&request)?;

        let provenance =
            match self.call_live(ToolName::CreatePaymentLink, args, correlation_id).await? {
                LiveCall::Succeeded(link) => {
                    return Ok(Dispatched { value: link, provenance: Provenance::Live })
                }
                LiveCall::NotLive => Provenance::Demo,
                LiveCall::Failed => Provenance::Degraded,
            };
        Ok(Dispatched { value: demo::create_payment_link(&request, Utc::now()), provenance })
    }

    pub async fn list_payment_links(
        &self,
        filter: PaymentLinkFilter,
        correlation_id: &str,
    ) -> Result<Dispatched<Vec<PaymentLink>>, DispatchError> {
        let args = serde_json::to_value(&filter)?;

        let (reason, provenance) = match self
            .call_live::<Vec<PaymentLink>>(ToolName::ListPaymentLinks, args, correlation_id)
            .await?
        {
            LiveCall::Succeeded(rows) if !rows.is_empty() => {
                return Ok(Dispatched { value: rows, provenance: Provenance::Live })
            }
            LiveCall::Succeeded(_) => (DemoReason::LiveEmpty, Provenance::LiveEmpty),
            LiveCall::NotLive => (DemoReason::DemoMode, Provenance::Demo),
            LiveCall::Failed => (DemoReason::LiveFailure, Provenance::Degraded),
        };
        Ok(Dispatched { value: demo::list_payment_links(&filter, reason), provenance })
    }

    /// Runs a tool by name with loosely-typed arguments, as chosen by the
    /// selector or named explicitly by a client.
    pub async fn execute(
        &self,
        tool: ToolName,
        args: Map<String, Value>,
        correlation_id: &str,
    ) -> Result<Dispatched<Value>, DispatchError> {
        let args = Value::Object(args);
        match tool {
            ToolName::CreateInvoice => {
                self.create_invoice(parse_args(tool, args)?, correlation_id).await?.into_json()
            }
            ToolName::ListInvoices => {
                self.list_invoices(parse_args(tool, args)?, correlation_id).await?.into_json()
            }
            ToolName::SendInvoice => {
                let target: InvoiceTarget = parse_args(tool, args)?;
                self.send_invoice(target.invoice_id, correlation_id).await?.into_json()
            }
            ToolName::CancelInvoice => {
                let target: InvoiceTarget = parse_args(tool, args)?;
                self.cancel_invoice(target.invoice_id, correlation_id).await?.into_json()
            }
            ToolName::CreatePaymentLink => {
                self.create_payment_link(parse_args(tool, args)?, correlation_id).await?.into_json()
            }
            ToolName::ListPaymentLinks => {
                self.list_payment_links(parse_args(tool, args)?, correlation_id).await?.into_json()
            }
        }
    }

    async fn call_live<T: DeserializeOwned>(
        &self,
        tool: ToolName,
        args: Value,
        correlation_id: &str,
    ) -> Result<LiveCall<T>, DispatchError> {
        if self.effective_mode() != Mode::Live {
            return Ok(LiveCall::NotLive);
        }
        // The toolkit can be re-initialized between the mode check and here.
        let Some(registry) = self.toolkit.registry() else {
            return Ok(LiveCall::NotLive);
        };
        let handle = registry.get(tool).ok_or(DispatchError::ToolUnavailable(tool))?;

        let cause = match tokio::time::timeout(self.call_timeout, handle.execute(args)).await {
            Err(_) => format!("timed out after {}ms", self.call_timeout.as_millis()),
            Ok(Err(error)) => format!("{error:#}"),
            Ok(Ok(ToolOutcome::Failure { message })) => message,
            Ok(Ok(ToolOutcome::Success(value))) => match serde_json::from_value::<T>(value) {
                Ok(parsed) => return Ok(LiveCall::Succeeded(parsed)),
                Err(error) => format!("unparseable {tool} result: {error}"),
            },
        };

        warn!(
            event_name = "dispatch.degraded",
            correlation_id = %correlation_id,
            tool = %tool,
            cause = %cause,
            "live call failed; serving demo data"
        );
        Ok(LiveCall::Failed)
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: Value) -> Result<T, DispatchError> {
    serde_json::from_value(args)
        .map_err(|error| DispatchError::InvalidArguments { tool, message: error.to_string() })
}
