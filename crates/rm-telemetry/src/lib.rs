//! # RM Telemetry
//!
//! Observability for the repository manager.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an `EnvFilter` and a
//!   pretty or JSON `fmt` layer.
//! - **Metrics**: per-workspace Prometheus counters and gauges, rendered in
//!   text exposition format.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rm_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("Failed to init logging");
//!
//!     // Workspace transitions are now logged
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RM_SERVICE_NAME` | `repository-manager` | Service name attached to log lines |
//! | `RM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RM_JSON_LOGS` | `false` | Emit JSON instead of pretty text |
//! | `RM_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::KernelMetrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install global subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Convenience macro for creating a span with repository context.
///
/// # Example
///
/// ```rust,ignore
/// use rm_telemetry::repository_span;
///
/// fn install() {
///     let _span = repository_span!("install", "user-repo").entered();
/// }
/// ```
#[macro_export]
macro_rules! repository_span {
    ($name:expr, $repository:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name, repository = %$repository $(, $($field)*)?)
    };
}

/// Log a repository lifecycle event with standard fields.
///
/// `$enabled` picks the level: `info` when true, `debug` otherwise.
#[macro_export]
macro_rules! log_transition {
    ($enabled:expr, $action:expr, $repository:expr $(, $($field:tt)*)?) => {
        if $enabled {
            tracing::info!(
                action = $action,
                repository = %$repository,
                $($($field)*,)?
                "Repository transition"
            )
        } else {
            tracing::debug!(
                action = $action,
                repository = %$repository,
                $($($field)*,)?
                "Repository transition"
            )
        }
    };
}
