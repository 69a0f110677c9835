//! Builder pattern for initializing the tracker with configurable components.

use crate::{
    broadcast::BroadcastMultiplexer,
    config::AppConfig,
    consensus::TipAggregator,
    node::{HttpNodeClient, NodeClient},
    retry::RetryPolicy,
    safety::{SafetyMonitor, SafetyTiming},
    scheduler::RefreshScheduler,
    storage::HeaderStore,
    tip::TipCache,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::lifecycle::Tracker;

/// Errors that can occur during tracker initialization.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// No trusted endpoints configured
    #[error("No trusted node endpoints configured")]
    NoEndpoints,

    /// Generic initialization error
    #[error("Tracker initialization failed: {0}")]
    Initialization(String),
}

/// Configuration options for the tracker builder.
#[derive(Clone)]
struct BuilderOptions {
    push_available: bool,
    shutdown_channel_capacity: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self { push_available: false, shutdown_channel_capacity: 16 }
    }
}

/// Builder for constructing a [`Tracker`] with configurable components.
///
/// # Examples
///
/// ```no_run
/// # use spyglass_core::{config::AppConfig, runtime::TrackerBuilder};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load()?;
///
/// let tracker = TrackerBuilder::new()
///     .with_config(config)
///     .enable_push_notifications()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TrackerBuilder {
    config: Option<AppConfig>,
    header_store: Option<Arc<dyn HeaderStore>>,
    options: BuilderOptions,
}

impl TrackerBuilder {
    /// Creates a new tracker builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, header_store: None, options: BuilderOptions::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Attaches a header-storage collaborator. Every accepted tip is
    /// persisted by height after each refresh.
    #[must_use]
    pub fn with_header_store(mut self, store: Arc<dyn HeaderStore>) -> Self {
        self.header_store = Some(store);
        self
    }

    /// Declares that a new-block notification source will feed the
    /// tracker's notifier.
    ///
    /// Without this, the scheduler logs that it is running in degraded
    /// timer-only mode. The timer runs either way; notifications only
    /// tighten refresh latency.
    #[must_use]
    pub fn enable_push_notifications(mut self) -> Self {
        self.options.push_available = true;
        self
    }

    /// Sets custom shutdown channel capacity (default: 16).
    #[must_use]
    pub fn with_shutdown_channel_capacity(mut self, capacity: usize) -> Self {
        self.options.shutdown_channel_capacity = capacity;
        self
    }

    /// Builds the tracker, initializing all components and starting
    /// background tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if configuration is missing/invalid, no
    /// trusted endpoints are configured, or component initialization
    /// fails.
    pub fn build(self) -> Result<Tracker, RuntimeError> {
        let config = self.config.ok_or_else(|| {
            RuntimeError::ConfigValidation("No configuration provided".to_string())
        })?;

        config.validate().map_err(RuntimeError::ConfigValidation)?;

        let trusted_endpoints = config.trusted_endpoints();
        if trusted_endpoints.is_empty() {
            return Err(RuntimeError::NoEndpoints);
        }

        info!(
            trusted_count = trusted_endpoints.len(),
            untrusted_count = config.untrusted_endpoints().len(),
            shotgun_count = config.broadcast.shotgun_count,
            push_available = self.options.push_available,
            "Initializing tracker runtime"
        );

        let (shutdown_tx, _) = broadcast::channel::<()>(self.options.shutdown_channel_capacity);

        let trusted: Vec<Arc<dyn NodeClient>> = trusted_endpoints
            .iter()
            .map(|endpoint| {
                HttpNodeClient::new(endpoint)
                    .map(|client| Arc::new(client) as Arc<dyn NodeClient>)
                    .map_err(|e| {
                        RuntimeError::Initialization(format!("Endpoint {}: {e}", endpoint.name))
                    })
            })
            .collect::<Result<_, _>>()?;
        let untrusted: Vec<Arc<dyn NodeClient>> = config
            .untrusted_endpoints()
            .iter()
            .map(|endpoint| {
                HttpNodeClient::new(endpoint)
                    .map(|client| Arc::new(client) as Arc<dyn NodeClient>)
                    .map_err(|e| {
                        RuntimeError::Initialization(format!("Endpoint {}: {e}", endpoint.name))
                    })
            })
            .collect::<Result<_, _>>()?;
        debug!(trusted = trusted.len(), untrusted = untrusted.len(), "Node clients initialized");

        let cache = Arc::new(TipCache::new());

        let aggregator = Arc::new(
            TipAggregator::new(trusted.clone(), config.probe_timeout())
                .map_err(|e| RuntimeError::Initialization(e.to_string()))?,
        );
        debug!(endpoints = aggregator.endpoint_count(), "Tip aggregator initialized");

        let (mut scheduler, notifier) = RefreshScheduler::new(
            Arc::clone(&aggregator),
            Arc::clone(&cache),
            config.refresh_interval(),
            self.options.push_available,
        );
        if let Some(store) = self.header_store {
            scheduler = scheduler.with_header_store(store);
            debug!("Header store attached");
        }
        let scheduler_task = scheduler.start_with_shutdown(shutdown_tx.subscribe());
        debug!("Refresh scheduler started");

        let safety = Arc::new(SafetyMonitor::new(
            untrusted,
            SafetyTiming {
                safe_tx_delay: config.safe_tx_delay(),
                poll_interval: config.poll_interval(),
                probe_timeout: config.probe_timeout(),
            },
        ));

        let broadcaster = Arc::new(
            BroadcastMultiplexer::new(
                trusted,
                config.broadcast.shotgun_count,
                RetryPolicy {
                    max_retries: config.broadcast.max_retries,
                    retry_delay: config.retry_delay(),
                },
                config.submit_timeout(),
            )
            .map_err(|e| RuntimeError::Initialization(e.to_string()))?,
        );
        debug!("Broadcast multiplexer initialized");

        let tracker =
            Tracker::new(config, cache, safety, broadcaster, notifier, shutdown_tx, scheduler_task);

        info!("Tracker runtime initialization complete");

        Ok(tracker)
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
