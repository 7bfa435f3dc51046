//! Prometheus metrics for one workspace.
//!
//! All metrics follow the naming convention: `rm_<subject>_<metric>[_total]`
//!
//! Each `KernelMetrics` owns its registry, so several workspaces in one
//! process never collide on metric names.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::TelemetryError;

/// Lifecycle counters for one workspace.
#[derive(Clone)]
pub struct KernelMetrics {
    registry: Registry,
    repositories_defined: IntCounter,
    connects: IntCounter,
    disconnects: IntCounter,
    instances_created: IntCounter,
    repositories_active: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, TelemetryError> {
    let metric =
        IntCounter::new(name, help).map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    registry
        .register(Box::new(metric.clone()))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    Ok(metric)
}

impl KernelMetrics {
    /// Create and register all metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::MetricsInit` if a metric cannot be registered.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let repositories_defined = counter(
            &registry,
            "rm_repositories_defined_total",
            "Total number of repositories defined",
        )?;
        let connects = counter(
            &registry,
            "rm_repository_connects_total",
            "Total number of repository connections",
        )?;
        let disconnects = counter(
            &registry,
            "rm_repository_disconnects_total",
            "Total number of effective repository disconnections",
        )?;
        let instances_created = counter(
            &registry,
            "rm_repository_instances_created_total",
            "Total number of repository instances built by a factory",
        )?;

        let repositories_active = IntGauge::new(
            "rm_repositories_active",
            "Number of repositories with at least one connection",
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        registry
            .register(Box::new(repositories_active.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        Ok(Self {
            registry,
            repositories_defined,
            connects,
            disconnects,
            instances_created,
            repositories_active,
        })
    }

    pub fn record_defined(&self) {
        self.repositories_defined.inc();
    }

    /// Record a connection; `created` marks a 0→1 transition.
    pub fn record_connect(&self, created: bool) {
        self.connects.inc();
        if created {
            self.instances_created.inc();
            self.repositories_active.inc();
        }
    }

    /// Record a disconnection; `destroyed` marks a 1→0 transition.
    pub fn record_disconnect(&self, destroyed: bool) {
        self.disconnects.inc();
        if destroyed {
            self.repositories_active.dec();
        }
    }

    #[must_use]
    pub fn repositories_defined(&self) -> u64 {
        self.repositories_defined.get()
    }

    #[must_use]
    pub fn connects(&self) -> u64 {
        self.connects.get()
    }

    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.disconnects.get()
    }

    #[must_use]
    pub fn instances_created(&self) -> u64 {
        self.instances_created.get()
    }

    #[must_use]
    pub fn repositories_active(&self) -> i64 {
        self.repositories_active.get()
    }

    /// Underlying registry, for callers that expose metrics themselves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics as Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::MetricsInit` if encoding fails.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

impl std::fmt::Debug for KernelMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelMetrics")
            .field("repositories_defined", &self.repositories_defined())
            .field("connects", &self.connects())
            .field("disconnects", &self.disconnects())
            .field("repositories_active", &self.repositories_active())
            .finish()
    }
}
