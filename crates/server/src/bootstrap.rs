use std::sync::Arc;

use sabio_alexa::dispatch::{default_dispatcher, Dispatcher};
use sabio_core::config::{AppConfig, ConfigError, LoadOptions};
use sabio_gemini::{GeminiClient, GenerationSettings};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("gemini.api_key is not configured")]
    MissingApiKey,
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    // Validation already requires the key; this guards direct callers that
    // hand-build an AppConfig.
    let api_key = config.gemini.api_key.clone().ok_or(BootstrapError::MissingApiKey)?;

    let settings = GenerationSettings::from(&config.gemini);
    let client = GeminiClient::new(api_key, config.gemini.base_url.clone());
    let dispatcher = Arc::new(default_dispatcher(client, settings));

    info!(
        event_name = "system.bootstrap.ready",
        model = %config.gemini.model,
        handlers = dispatcher.handler_count(),
        "skill dispatcher assembled"
    );

    Ok(Application { config, dispatcher })
}
