use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CreateInvoice,
    ListInvoices,
    SendInvoice,
    CancelInvoice,
    CreatePaymentLink,
    ListPaymentLinks,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        Self::CreateInvoice,
        Self::ListInvoices,
        Self::SendInvoice,
        Self::CancelInvoice,
        Self::CreatePaymentLink,
        Self::ListPaymentLinks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateInvoice => "create_invoice",
            Self::ListInvoices => "list_invoices",
            Self::SendInvoice => "send_invoice",
            Self::CancelInvoice => "cancel_invoice",
            Self::CreatePaymentLink => "create_payment_link",
            Self::ListPaymentLinks => "list_payment_links",
        }
    }

    /// Accepts the canonical snake_case names plus the dotted
    /// `invoice.create` / `paymentLinks.create` style some clients still send.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "create_invoice" | "invoice.create" | "invoices.create" => Some(Self::CreateInvoice),
            "list_invoices" | "invoice.list" | "invoices.list" => Some(Self::ListInvoices),
            "send_invoice" | "invoice.send" | "invoices.send" => Some(Self::SendInvoice),
            "cancel_invoice" | "invoice.cancel" | "invoices.cancel" => Some(Self::CancelInvoice),
            "create_payment_link" | "create_pay_link" | "paymentLinks.create" => {
                Some(Self::CreatePaymentLink)
            }
            "list_payment_links" | "paymentLinks.list" => Some(Self::ListPaymentLinks),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CreateInvoice => "Create Invoice",
            Self::ListInvoices => "List Invoices",
            Self::SendInvoice => "Send Invoice",
            Self::CancelInvoice => "Cancel Invoice",
            Self::CreatePaymentLink => "Create Payment Link",
            Self::ListPaymentLinks => "List Payment Links",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateInvoice => "Create a new invoice with customer information",
            Self::ListInvoices => "Retrieve a list of invoices with optional status filtering",
            Self::SendInvoice => "Send an existing invoice to the customer via email",
            Self::CancelInvoice => "Cancel an existing invoice",
            Self::CreatePaymentLink => "Create a payment link for quick payments",
            Self::ListPaymentLinks => "Retrieve a list of payment links",
        }
    }

    /// JSON-schema object describing the tool's arguments.
    pub fn parameters_schema(&self) -> Value {
        match self {
            Self::CreateInvoice => json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number", "description": "Invoice amount" },
                    "currency": { "type": "string", "description": "Currency code (USD, EUR, etc.)" },
                    "email": { "type": "string", "description": "Customer email address" },
                    "name": { "type": "string", "description": "Customer name (optional)" },
                    "memo": { "type": "string", "description": "Invoice description or memo" },
                    "dueDays": { "type": "number", "description": "Number of days until due (default 30)" }
                },
                "required": ["amount", "currency", "email"]
            }),
            Self::ListInvoices => json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["draft", "sent", "paid", "cancelled"],
                        "description": "Filter by invoice status"
                    },
                    "limit": { "type": "number", "description": "Maximum number of invoices to return" }
                }
            }),
            Self::SendInvoice | Self::CancelInvoice => json!({
                "type": "object",
                "properties": {
                    "invoiceId": { "type": "string", "description": "Invoice ID" }
                },
                "required": ["invoiceId"]
            }),
            Self::CreatePaymentLink => json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number", "description": "Payment amount" },
                    "currency": { "type": "string", "description": "Currency code (USD, EUR, etc.)" },
                    "memo": { "type": "string", "description": "Payment description" }
                },
                "required": ["amount", "currency"]
            }),
            Self::ListPaymentLinks => json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "number", "description": "Maximum number of links to return" }
                }
            }),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tool reports back. A vendor-side rejection is a `Failure`, not an
/// `Err`; `Err` is reserved for transport problems.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure { message: String },
}

impl ToolOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure { message: message.into() }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    async fn execute(&self, input: Value) -> Result<ToolOutcome>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    /// Registered names in catalog order.
    pub fn names(&self) -> Vec<ToolName> {
        ToolName::ALL.into_iter().filter(|name| self.tools.contains_key(name)).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{Tool, ToolName, ToolOutcome, ToolRegistry};

    struct Echo(ToolName);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> ToolName {
            self.0
        }

        async fn execute(&self, input: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome::Success(input))
        }
    }

    #[test]
    fn dotted_aliases_normalise_to_canonical_names() {
        assert_eq!(ToolName::parse("invoice.create"), Some(ToolName::CreateInvoice));
        assert_eq!(ToolName::parse("paymentLinks.list"), Some(ToolName::ListPaymentLinks));
        assert_eq!(ToolName::parse("create_pay_link"), Some(ToolName::CreatePaymentLink));
        assert_eq!(ToolName::parse("invoice.update"), None);
    }

    #[test]
    fn canonical_names_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(ToolName::parse(name.as_str()), Some(name));
        }
    }

    #[test]
    fn every_schema_is_an_object() {
        for name in ToolName::ALL {
            assert_eq!(name.parameters_schema()["type"], json!("object"), "{name}");
        }
    }

    #[tokio::test]
    async fn registry_lists_in_catalog_order_and_dispatches() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo(ToolName::ListPaymentLinks));
        registry.register(Echo(ToolName::CreateInvoice));

        assert_eq!(registry.names(), vec![ToolName::CreateInvoice, ToolName::ListPaymentLinks]);
        assert!(registry.get(ToolName::SendInvoice).is_none());

        let tool = registry.get(ToolName::CreateInvoice).expect("registered");
        let outcome = tool.execute(json!({ "amount": 1 })).await.expect("echo");
        assert_eq!(outcome, ToolOutcome::Success(json!({ "amount": 1 })));
    }
}
