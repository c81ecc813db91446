//! Visa Acceptance (CyberSource) REST adapter.
//!
//! `VisaToolkitFactory` is the production [`ToolkitFactory`]: it builds one
//! signed HTTP client and registers the invoice and payment-link tools on it.

pub mod payload;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use payhub_core::Credentials;
use reqwest::{Client, Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::signing::RequestSigner;
use crate::toolkit::{ToolkitError, ToolkitFactory};
use crate::tools::{ToolName, ToolRegistry};

pub use tools::VisaTool;

const ACCEPT: &str = "application/hal+json;charset=utf-8";
const CONTENT_TYPE: &str = "application/json;charset=utf-8";

#[derive(Debug)]
pub struct VendorResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl VendorResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Debug)]
pub struct VisaAcceptanceClient {
    http: Client,
    signer: RequestSigner,
    host: String,
    base_url: String,
}

impl VisaAcceptanceClient {
    /// Validates the secret and prepares the HTTP client. No request is made.
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self, ToolkitError> {
        let signer = RequestSigner::new(
            &credentials.merchant_id,
            &credentials.api_key_id,
            credentials.secret_key.expose_secret(),
        )?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ToolkitError::HttpClient(error.to_string()))?;
        let host = credentials.environment.api_host().to_string();

        Ok(Self { http, signer, base_url: format!("https://{host}"), host })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub async fn get(&self, path_and_query: &str) -> Result<VendorResponse> {
        self.send(Method::GET, path_and_query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<VendorResponse> {
        let bytes = serde_json::to_vec(body).context("serializing vendor request")?;
        self.send(Method::POST, path, Some(bytes)).await
    }

    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Vec<u8>>,
    ) -> Result<VendorResponse> {
        let signed =
            self.signer.sign(method.as_str(), &self.host, path_and_query, body.as_deref(), Utc::now());

        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path_and_query))
            .header("v-c-merchant-id", &signed.merchant_id)
            .header("Date", &signed.date)
            .header("Host", &signed.host)
            .header("Signature", &signed.signature)
            .header("Accept", ACCEPT);
        if let Some(digest) = &signed.digest {
            request = request.header("Digest", digest);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", CONTENT_TYPE).body(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {path_and_query} failed"))?;
        let status = response.status();
        let text = response.text().await.context("reading vendor response body")?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(VendorResponse { status, body })
    }
}

/// Builds the live tool catalog for invoices and payment links.
#[derive(Clone, Debug)]
pub struct VisaToolkitFactory {
    request_timeout: Duration,
}

impl VisaToolkitFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl ToolkitFactory for VisaToolkitFactory {
    fn build(&self, credentials: &Credentials) -> Result<ToolRegistry, ToolkitError> {
        let client = Arc::new(VisaAcceptanceClient::new(credentials, self.request_timeout)?);

        let mut registry = ToolRegistry::default();
        for name in ToolName::ALL {
            registry.register(VisaTool::new(name, Arc::clone(&client)));
        }
        Ok(registry)
    }
}
