//! Tracing subscriber setup

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured filter. Returns an error if the filter
/// does not parse or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("Invalid log filter '{}'", config.filter))?,
    };

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_target(true).with_current_span(false));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true).with_level(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    tracing::info!(json = config.json, filter = %config.filter, "Tracing initialized");
    Ok(())
}
