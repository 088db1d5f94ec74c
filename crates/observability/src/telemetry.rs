//! Tracing subscriber initialization
//!
//! Installs the global subscriber: an `EnvFilter`, a console `fmt` layer
//! writing to stderr (stdout stays free for command output) and the
//! optional log sink layer.

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;
use crate::error::ObservabilityError;
use crate::log_sink;

/// Default filter when neither the config nor the environment sets one
const DEFAULT_LEVEL: &str = "info";

/// Initialize tracing with the given configuration
///
/// # Errors
///
/// Returns [`ObservabilityError::Config`] for an invalid log level and
/// [`ObservabilityError::InitFailed`] when a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    let env_filter = build_filter(&config)?;

    // Build layers separately, then compose once to avoid type mismatch
    let fmt_layer = config.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_target(false)
    });
    let sink_layer = log_sink::log_sink_layer(config.log_sink.clone());

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(sink_layer)
        .try_init()
        .map_err(|e| ObservabilityError::InitFailed(e.to_string()))?;

    tracing::debug!(service.name = %config.service_name, "Tracing initialized");
    Ok(())
}

fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter, ObservabilityError> {
    match &config.log_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::Config(format!("Invalid log level '{}': {}", level, e))),
        None => Ok(EnvFilter::try_from_env("TOOLHOST_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}
