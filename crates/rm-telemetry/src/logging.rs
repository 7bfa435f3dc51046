//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber made of:
//! - an `EnvFilter` built from `TelemetryConfig::log_level`
//! - a `fmt` layer, pretty or JSON, when console output is enabled

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global log subscriber.
///
/// # Errors
///
/// - `TelemetryError::Filter` if `log_level` is not a valid filter
/// - `TelemetryError::SubscriberInit` if a global subscriber already exists
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let fmt_layer = if !config.console_output {
        None
    } else if config.json_logs {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .boxed(),
        )
    } else {
        Some(tracing_subscriber::fmt::layer().with_target(true).boxed())
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
