//! Vendor toolkit lifecycle.
//!
//! `Toolkit` owns an explicit `Uninitialized -> Ready | Failed` state. A failed
//! initialization is recorded, never raised, and `reinitialize` may be called
//! at any later point to retry without restarting the process.

use std::sync::{Arc, PoisonError, RwLock};

use payhub_core::{CredentialResolution, Credentials};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::signing::SigningError;
use crate::tools::{ToolName, ToolRegistry};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("invalid secret key: {0}")]
    Signing(#[from] SigningError),
    #[error("http client construction failed: {0}")]
    HttpClient(String),
    #[error("toolkit exposed no tools")]
    EmptyCatalog,
}

/// Turns complete credentials into a live tool catalog.
pub trait ToolkitFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<ToolRegistry, ToolkitError>;
}

#[derive(Clone, Debug)]
pub enum ToolkitState {
    Uninitialized,
    Ready { registry: Arc<ToolRegistry> },
    Failed { reason: String },
}

impl ToolkitState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

pub struct Toolkit {
    factory: Arc<dyn ToolkitFactory>,
    state: RwLock<ToolkitState>,
}

impl Toolkit {
    pub fn new(factory: Arc<dyn ToolkitFactory>) -> Self {
        Self { factory, state: RwLock::new(ToolkitState::Uninitialized) }
    }

    pub fn initialize(&self, resolution: &CredentialResolution) -> ToolkitState {
        let next = match self.build(resolution) {
            Ok(registry) => {
                info!(
                    event_name = "toolkit.ready",
                    tools = registry.len(),
                    "visa acceptance toolkit initialized"
                );
                ToolkitState::Ready { registry: Arc::new(registry) }
            }
            Err(cause @ ToolkitError::MissingCredentials(_)) => {
                let reason = cause.to_string();
                warn!(event_name = "toolkit.unconfigured", %reason, "running without vendor toolkit");
                ToolkitState::Failed { reason }
            }
            Err(cause) => {
                let reason = cause.to_string();
                error!(event_name = "toolkit.failed", %reason, "visa acceptance toolkit init failed");
                ToolkitState::Failed { reason }
            }
        };

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
        next
    }

    /// Same as `initialize`; named separately so retries read as such in logs.
    pub fn reinitialize(&self, resolution: &CredentialResolution) -> ToolkitState {
        info!(
            event_name = "toolkit.reinitialize",
            previous = self.state().label(),
            "re-initializing visa acceptance toolkit"
        );
        self.initialize(resolution)
    }

    fn build(&self, resolution: &CredentialResolution) -> Result<ToolRegistry, ToolkitError> {
        let credentials = match resolution {
            CredentialResolution::Complete(credentials) => credentials,
            CredentialResolution::Incomplete { missing } => {
                return Err(ToolkitError::MissingCredentials(missing.clone()))
            }
        };

        let registry = self.factory.build(credentials)?;
        if registry.is_empty() {
            return Err(ToolkitError::EmptyCatalog);
        }
        Ok(registry)
    }

    pub fn state(&self) -> ToolkitState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn registry(&self) -> Option<Arc<ToolRegistry>> {
        match self.state() {
            ToolkitState::Ready { registry } => Some(registry),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<String> {
        match self.state() {
            ToolkitState::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state(), ToolkitState::Ready { .. })
    }

    pub fn tool_names(&self) -> Vec<ToolName> {
        self.registry().map(|registry| registry.names()).unwrap_or_default()
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit").field("state", &self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use payhub_core::{CredentialResolution, Credentials, VisaEnvironment};
    use secrecy::SecretString;
    use serde_json::Value;

    use super::{Toolkit, ToolkitError, ToolkitFactory, ToolkitState};
    use crate::tools::{Tool, ToolName, ToolOutcome, ToolRegistry};

    struct Noop(ToolName);

    #[async_trait]
    impl Tool for Noop {
        fn name(&self) -> ToolName {
            self.0
        }

        async fn execute(&self, input: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome::Success(input))
        }
    }

    /// Fails the first `failures` builds, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl ToolkitFactory for Flaky {
        fn build(&self, _: &Credentials) -> Result<ToolRegistry, ToolkitError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(ToolkitError::HttpClient("tls backend unavailable".to_string()));
            }
            let mut registry = ToolRegistry::default();
            registry.register(Noop(ToolName::CreateInvoice));
            Ok(registry)
        }
    }

    struct Empty;

    impl ToolkitFactory for Empty {
        fn build(&self, _: &Credentials) -> Result<ToolRegistry, ToolkitError> {
            Ok(ToolRegistry::default())
        }
    }

    fn complete() -> CredentialResolution {
        CredentialResolution::Complete(Credentials {
            merchant_id: "m".to_string(),
            api_key_id: "k".to_string(),
            secret_key: SecretString::from("c2VjcmV0".to_string()),
            environment: VisaEnvironment::Sandbox,
        })
    }

    #[test]
    fn starts_uninitialized() {
        let toolkit = Toolkit::new(Arc::new(Empty));
        assert!(matches!(toolkit.state(), ToolkitState::Uninitialized));
        assert!(!toolkit.is_available());
        assert!(toolkit.last_error().is_none());
    }

    #[test]
    fn incomplete_credentials_short_circuit() {
        let factory = Arc::new(Flaky { failures: 0, calls: AtomicUsize::new(0) });
        let toolkit = Toolkit::new(factory.clone());

        let state = toolkit.initialize(&CredentialResolution::Incomplete {
            missing: vec!["VISA_ACCEPTANCE_SECRET_KEY"],
        });

        assert!(matches!(state, ToolkitState::Failed { .. }));
        assert_eq!(
            toolkit.last_error().as_deref(),
            Some("missing credentials: VISA_ACCEPTANCE_SECRET_KEY")
        );
        assert_eq!(factory.calls.load(Ordering::SeqCst), 0, "factory must not be called");
    }

    #[test]
    fn reinitialize_recovers_after_failed_construction() {
        let toolkit = Toolkit::new(Arc::new(Flaky { failures: 1, calls: AtomicUsize::new(0) }));

        toolkit.initialize(&complete());
        assert!(!toolkit.is_available());
        assert!(toolkit.tool_names().is_empty());

        let state = toolkit.reinitialize(&complete());
        assert!(matches!(state, ToolkitState::Ready { .. }));
        assert!(toolkit.last_error().is_none());
        assert_eq!(toolkit.tool_names(), vec![ToolName::CreateInvoice]);
    }

    #[test]
    fn empty_catalog_is_a_failure() {
        let toolkit = Toolkit::new(Arc::new(Empty));
        toolkit.initialize(&complete());

        assert_eq!(toolkit.last_error().as_deref(), Some("toolkit exposed no tools"));
    }
}
