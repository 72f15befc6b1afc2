//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `delivery_ledger_deliveries_total` - Deliveries created
//! - `delivery_ledger_events_total` - Event entries appended
//! - `delivery_ledger_forced_failures_total` - Forced failures recorded
//! - `delivery_ledger_append_duration_seconds` - Append latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total deliveries created
    pub deliveries_total: IntCounter,

    /// Total event entries appended
    pub events_total: IntCounter,

    /// Total forced failures
    pub forced_failures_total: IntCounter,

    /// Append duration histogram
    pub append_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deliveries_total = IntCounter::new(
            "delivery_ledger_deliveries_total",
            "Deliveries created",
        )?;
        registry.register(Box::new(deliveries_total.clone()))?;

        let events_total = IntCounter::new(
            "delivery_ledger_events_total",
            "Event entries appended",
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let forced_failures_total = IntCounter::new(
            "delivery_ledger_forced_failures_total",
            "Forced failures recorded",
        )?;
        registry.register(Box::new(forced_failures_total.clone()))?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new(
                "delivery_ledger_append_duration_seconds",
                "Histogram of append latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        Ok(Self {
            deliveries_total,
            events_total,
            forced_failures_total,
            append_duration,
            registry,
        })
    }

    /// Record delivery creation
    pub fn record_delivery_created(&self) {
        self.deliveries_total.inc();
    }

    /// Record event append
    pub fn record_event_appended(&self) {
        self.events_total.inc();
    }

    /// Record forced failure
    pub fn record_forced_failure(&self) {
        self.forced_failures_total.inc();
    }

    /// Record append duration
    pub fn record_append_duration(&self, duration_seconds: f64) {
        self.append_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
