//! Visa Acceptance credential resolution.
//!
//! Incomplete credentials are a valid, expected state: the process runs in
//! demo mode. Nothing here fails beyond reporting what is missing.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::{ConfigError, VisaConfig};

pub const MERCHANT_ID_VAR: &str = "VISA_ACCEPTANCE_MERCHANT_ID";
pub const API_KEY_ID_VAR: &str = "VISA_ACCEPTANCE_API_KEY_ID";
pub const SECRET_KEY_VAR: &str = "VISA_ACCEPTANCE_SECRET_KEY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl VisaEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "SANDBOX",
            Self::Production => "PRODUCTION",
        }
    }

    pub fn api_host(&self) -> &'static str {
        match self {
            Self::Sandbox => "apitest.cybersource.com",
            Self::Production => "api.cybersource.com",
        }
    }
}

impl fmt::Display for VisaEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VisaEnvironment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SANDBOX" | "TEST" => Ok(Self::Sandbox),
            "PRODUCTION" | "LIVE" => Ok(Self::Production),
            _ => Err(ConfigError::Validation(format!(
                "unsupported visa environment `{}` (expected SANDBOX|PRODUCTION)",
                value.trim()
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub merchant_id: String,
    pub api_key_id: String,
    pub secret_key: SecretString,
    pub environment: VisaEnvironment,
}

#[derive(Clone, Debug)]
pub enum CredentialResolution {
    Complete(Credentials),
    Incomplete { missing: Vec<&'static str> },
}

impl CredentialResolution {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Complete(credentials) => Some(credentials),
            Self::Incomplete { .. } => None,
        }
    }

    pub fn missing(&self) -> &[&'static str] {
        match self {
            Self::Complete(_) => &[],
            Self::Incomplete { missing } => missing,
        }
    }
}

pub fn resolve(visa: &VisaConfig) -> CredentialResolution {
    let merchant_id = non_empty(visa.merchant_id.as_deref());
    let api_key_id = non_empty(visa.api_key_id.as_deref());
    let secret_key =
        visa.secret_key.as_ref().filter(|secret| !secret.expose_secret().trim().is_empty());

    let mut missing = Vec::new();
    if merchant_id.is_none() {
        missing.push(MERCHANT_ID_VAR);
    }
    if api_key_id.is_none() {
        missing.push(API_KEY_ID_VAR);
    }
    if secret_key.is_none() {
        missing.push(SECRET_KEY_VAR);
    }

    match (merchant_id, api_key_id, secret_key) {
        (Some(merchant_id), Some(api_key_id), Some(secret_key)) => {
            CredentialResolution::Complete(Credentials {
                merchant_id: merchant_id.to_string(),
                api_key_id: api_key_id.to_string(),
                secret_key: secret_key.clone(),
                // validated at config load; an unparseable value cannot reach here
                environment: visa.effective_environment().unwrap_or_default(),
            })
        }
        _ => CredentialResolution::Incomplete { missing },
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
