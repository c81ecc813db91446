use std::sync::Arc;
use std::time::Duration;

use payhub_agent::llm::{LlmClient, OpenAiClient};
use payhub_agent::visa::VisaToolkitFactory;
use payhub_agent::{ToolSelector, Toolkit, ToolkitFactory};
use payhub_core::config::{AppConfig, ConfigError, LoadOptions};
use payhub_core::{credentials, ModeController};
use thiserror::Error;
use tracing::info;

use crate::state::{AppState, DeploymentInfo};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("LLM client construction failed: {0}")]
    Llm(String),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let factory = Arc::new(VisaToolkitFactory::new(Duration::from_secs(
        config.visa.request_timeout_secs,
    )));
    let llm = OpenAiClient::from_config(&config.llm)
        .map_err(|error| BootstrapError::Llm(format!("{error:#}")))?
        .map(|client| {
            info!(
                event_name = "system.bootstrap.llm_configured",
                correlation_id = "bootstrap",
                model = client.model(),
                "LLM tool selection enabled"
            );
            Arc::new(client) as Arc<dyn LlmClient>
        });

    let state = build_state(&config, factory, llm);
    Ok(Application { config, state })
}

/// Wires the shared state and runs the one startup toolkit initialization.
/// The factory and LLM client are injected so tests can script them.
pub fn build_state(
    config: &AppConfig,
    factory: Arc<dyn ToolkitFactory>,
    llm: Option<Arc<dyn LlmClient>>,
) -> AppState {
    let resolution = credentials::resolve(&config.visa);
    let toolkit = Arc::new(Toolkit::new(factory));
    let toolkit_state = toolkit.initialize(&resolution);

    let mode = Arc::new(ModeController::new(config.demo.force_demo));
    let deployment = DeploymentInfo {
        environment: config.visa.environment.clone(),
        cybs_environment: config.visa.cybs_environment.clone(),
        openai_configured: llm.is_some(),
    };
    let state = AppState::new(
        mode,
        toolkit,
        resolution,
        ToolSelector::new(llm),
        deployment,
        Duration::from_secs(config.visa.request_timeout_secs),
    );

    let snapshot = state.snapshot();
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        toolkit_state = toolkit_state.label(),
        tools = state.readiness().tools_registered,
        current_mode = %snapshot.current_mode,
        credentials_configured = snapshot.credentials_configured,
        "application state initialized"
    );
    state
}
