use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use payhub_core::{
    CreateInvoice, CreatePaymentLink, InvoiceAction, InvoiceActionReceipt, InvoiceFilter,
    InvoiceId, InvoiceStatus, PaymentLinkFilter,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::payload;
use super::VisaAcceptanceClient;
use crate::tools::{Tool, ToolName, ToolOutcome};

const INVOICES_PATH: &str = "/invoicing/v2/invoices";
const PAYMENT_LINKS_PATH: &str = "/ipl/v2/payment-links";

/// One catalog entry bound to the shared signed client.
pub struct VisaTool {
    name: ToolName,
    client: Arc<VisaAcceptanceClient>,
}

impl VisaTool {
    pub fn new(name: ToolName, client: Arc<VisaAcceptanceClient>) -> Self {
        Self { name, client }
    }

    async fn create_invoice(&self, input: Value) -> Result<ToolOutcome> {
        let request: CreateInvoice = match arguments(self.name, input) {
            Ok(request) => request,
            Err(outcome) => return Ok(outcome),
        };
        let request = match request.validated() {
            Ok(request) => request,
            Err(error) => return Ok(ToolOutcome::failure(error.to_string())),
        };

        let today = Utc::now().date_naive();
        let body = match payload::invoice_request(&request, today) {
            Ok(body) => body,
            Err(error) => return Ok(ToolOutcome::failure(error.to_string())),
        };
        let response = self.client.post(INVOICES_PATH, &body).await?;
        if !response.is_success() {
            return Ok(ToolOutcome::failure(payload::failure_message(
                response.status,
                &response.body,
            )));
        }

        match payload::invoice_from_vendor(&response.body, today) {
            Some(invoice) => Ok(ToolOutcome::Success(serde_json::to_value(invoice)?)),
            None => Ok(ToolOutcome::failure("vendor response carried no invoice id")),
        }
    }

    async fn list_invoices(&self, input: Value) -> Result<ToolOutcome> {
        let filter: InvoiceFilter = match arguments(self.name, input) {
            Ok(filter) => filter,
            Err(outcome) => return Ok(outcome),
        };

        let mut path = format!(
            "{INVOICES_PATH}?offset=0&limit={}",
            filter.effective_limit()
        );
        if let Some(status) = filter.status {
            path.push_str("&status=");
            path.push_str(payload::vendor_status(status));
        }

        let response = self.client.get(&path).await?;
        if !response.is_success() {
            return Ok(ToolOutcome::failure(payload::failure_message(
                response.status,
                &response.body,
            )));
        }

        let invoices = payload::invoices_from_vendor(&response.body, Utc::now().date_naive());
        debug!(rows = invoices.len(), "vendor invoice list received");
        Ok(ToolOutcome::Success(serde_json::to_value(invoices)?))
    }

    async fn invoice_action(&self, input: Value, action: InvoiceAction) -> Result<ToolOutcome> {
        let target: InvoiceTarget = match arguments(self.name, input) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if !is_path_safe(&target.invoice_id.0) {
            return Ok(ToolOutcome::failure(format!(
                "invoice id `{}` contains unsupported characters",
                target.invoice_id
            )));
        }

        let segment = match action {
            InvoiceAction::Send => "delivery",
            InvoiceAction::Cancel => "cancelation",
        };
        let path = format!("{INVOICES_PATH}/{}/{segment}", target.invoice_id);
        let response = self.client.post(&path, &Value::Object(Default::default())).await?;
        if !response.is_success() {
            return Ok(ToolOutcome::failure(payload::failure_message(
                response.status,
                &response.body,
            )));
        }

        let status = response
            .body
            .get("status")
            .and_then(Value::as_str)
            .and_then(InvoiceStatus::parse)
            .unwrap_or_else(|| action.target_status());
        let receipt = InvoiceActionReceipt {
            success: true,
            message: format!("Invoice {} {}", target.invoice_id, action.past_tense()),
            invoice_id: target.invoice_id,
            status,
            is_demo: false,
            timestamp: Utc::now(),
        };
        Ok(ToolOutcome::Success(serde_json::to_value(receipt)?))
    }

    async fn create_payment_link(&self, input: Value) -> Result<ToolOutcome> {
        let request: CreatePaymentLink = match arguments(self.name, input) {
            Ok(request) => request,
            Err(outcome) => return Ok(outcome),
        };
        let request = match request.validated() {
            Ok(request) => request,
            Err(error) => return Ok(ToolOutcome::failure(error.to_string())),
        };

        let response =
            self.client.post(PAYMENT_LINKS_PATH, &payload::payment_link_request(&request)).await?;
        if !response.is_success() {
            return Ok(ToolOutcome::failure(payload::failure_message(
                response.status,
                &response.body,
            )));
        }

        match payload::payment_link_from_vendor(&response.body, Utc::now()) {
            Some(link) => Ok(ToolOutcome::Success(serde_json::to_value(link)?)),
            None => Ok(ToolOutcome::failure("vendor response carried no payment link")),
        }
    }

    async fn list_payment_links(&self, input: Value) -> Result<ToolOutcome> {
        let filter: PaymentLinkFilter = match arguments(self.name, input) {
            Ok(filter) => filter,
            Err(outcome) => return Ok(outcome),
        };

        let path = format!(
            "{PAYMENT_LINKS_PATH}?offset=0&limit={}",
            filter.effective_limit()
        );
        let response = self.client.get(&path).await?;
        if !response.is_success() {
            return Ok(ToolOutcome::failure(payload::failure_message(
                response.status,
                &response.body,
            )));
        }

        let links = payload::payment_links_from_vendor(&response.body, Utc::now());
        debug!(rows = links.len(), "vendor payment link list received");
        Ok(ToolOutcome::Success(serde_json::to_value(links)?))
    }
}

#[async_trait]
impl Tool for VisaTool {
    fn name(&self) -> ToolName {
        self.name
    }

    async fn execute(&self, input: Value) -> Result<ToolOutcome> {
        match self.name {
            ToolName::CreateInvoice => self.create_invoice(input).await,
            ToolName::ListInvoices => self.list_invoices(input).await,
            ToolName::SendInvoice => self.invoice_action(input, InvoiceAction::Send).await,
            ToolName::CancelInvoice => self.invoice_action(input, InvoiceAction::Cancel).await,
            ToolName::CreatePaymentLink => self.create_payment_link(input).await,
            ToolName::ListPaymentLinks => self.list_payment_links(input).await,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceTarget {
    invoice_id: InvoiceId,
}

fn arguments<T: DeserializeOwned>(tool: ToolName, input: Value) -> Result<T, ToolOutcome> {
    let input = if input.is_null() { Value::Object(Default::default()) } else { input };
    serde_json::from_value(input)
        .map_err(|error| ToolOutcome::failure(format!("invalid {tool} arguments: {error}")))
}

fn is_path_safe(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
