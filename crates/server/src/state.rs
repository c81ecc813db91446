use std::sync::Arc;
use std::time::Duration;

use payhub_agent::{Toolkit, ToolSelector};
use payhub_core::{CredentialResolution, ModeController, ModeSnapshot, Readiness};

use crate::dispatch::Dispatcher;

/// Values reported by health/status endpoints that never change at runtime.
#[derive(Clone, Debug, Default)]
pub struct DeploymentInfo {
    pub environment: Option<String>,
    pub cybs_environment: Option<String>,
    pub openai_configured: bool,
}

/// Everything a handler can reach. Cheap to clone; all shared state is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub mode: Arc<ModeController>,
    pub toolkit: Arc<Toolkit>,
    pub credentials: Arc<CredentialResolution>,
    pub selector: ToolSelector,
    pub deployment: Arc<DeploymentInfo>,
}

impl AppState {
    pub fn new(
        mode: Arc<ModeController>,
        toolkit: Arc<Toolkit>,
        credentials: CredentialResolution,
        selector: ToolSelector,
        deployment: DeploymentInfo,
        call_timeout: Duration,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&mode),
            Arc::clone(&toolkit),
            credentials.is_complete(),
            call_timeout,
        );
        Self {
            dispatcher,
            mode,
            toolkit,
            credentials: Arc::new(credentials),
            selector,
            deployment: Arc::new(deployment),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.dispatcher.readiness()
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        self.mode.snapshot(&self.readiness())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use payhub_agent::{
        Tool, ToolName, ToolOutcome, ToolRegistry, ToolSelector, Toolkit, ToolkitError,
        ToolkitFactory,
    };
    use payhub_core::{CredentialResolution, Credentials, ModeController, VisaEnvironment};
    use secrecy::SecretString;
    use serde_json::Value;

    use super::{AppState, DeploymentInfo};

    /// Live tool that always reports a vendor failure.
    pub struct Rejecting(pub ToolName);

    #[async_trait]
    impl Tool for Rejecting {
        fn name(&self) -> ToolName {
            self.0
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome::failure("vendor returned 500 Internal Server Error"))
        }
    }

    pub struct RejectingCatalog(pub Vec<ToolName>);

    impl ToolkitFactory for RejectingCatalog {
        fn build(&self, _: &Credentials) -> Result<ToolRegistry, ToolkitError> {
            let mut registry = ToolRegistry::default();
            for name in &self.0 {
                registry.register(Rejecting(*name));
            }
            Ok(registry)
        }
    }

    pub fn credentials() -> CredentialResolution {
        CredentialResolution::Complete(Credentials {
            merchant_id: "merchant_1".to_string(),
            api_key_id: "key_1".to_string(),
            secret_key: SecretString::from("c2VjcmV0LWtleQ==".to_string()),
            environment: VisaEnvironment::Sandbox,
        })
    }

    fn state(factory: RejectingCatalog, credentials: CredentialResolution) -> AppState {
        let toolkit = Arc::new(Toolkit::new(Arc::new(factory)));
        toolkit.initialize(&credentials);
        AppState::new(
            Arc::new(ModeController::default()),
            toolkit,
            credentials,
            ToolSelector::rules_only(),
            DeploymentInfo::default(),
            Duration::from_millis(200),
        )
    }

    /// No credentials: toolkit failed, status unavailable.
    pub fn unconfigured() -> AppState {
        state(
            RejectingCatalog(Vec::new()),
            CredentialResolution::Incomplete {
                missing: vec![
                    "VISA_ACCEPTANCE_MERCHANT_ID",
                    "VISA_ACCEPTANCE_API_KEY_ID",
                    "VISA_ACCEPTANCE_SECRET_KEY",
                ],
            },
        )
    }

    /// Live-capable, every listed tool fails at the vendor.
    pub fn live_failing(tools: Vec<ToolName>) -> AppState {
        state(RejectingCatalog(tools), credentials())
    }
}
