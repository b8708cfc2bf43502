//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Submission counters
    pub submissions_total: IntCounter,
    pub submissions_accepted: IntCounter,
    pub submissions_rejected: IntCounterVec,
    pub simulation_failures: IntCounter,
    pub network_errors: IntCounter,
    pub anchor_refreshes: IntCounter,

    // Confirmation counters
    pub confirmations_confirmed: IntCounter,
    pub confirmations_failed: IntCounter,
    pub confirmation_timeouts: IntCounter,
    pub status_polls: IntCounter,
    pub status_poll_errors: IntCounter,

    // Gauges
    pub active_trackers: IntGauge,

    // Histograms
    pub submit_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "submissions_total",
            "Total number of transaction submissions attempted",
        ))?;

        let submissions_accepted = IntCounter::with_opts(Opts::new(
            "submissions_accepted",
            "Number of submissions accepted into the pending pool",
        ))?;

        let submissions_rejected = IntCounterVec::new(
            Opts::new("submissions_rejected", "Number of submissions rejected by the node"),
            &["reason"],
        )?;

        let simulation_failures = IntCounter::with_opts(Opts::new(
            "simulation_failures",
            "Number of submissions stopped by pre-flight simulation",
        ))?;

        let network_errors = IntCounter::with_opts(Opts::new(
            "network_errors",
            "Number of submissions that could not reach the node",
        ))?;

        let anchor_refreshes = IntCounter::with_opts(Opts::new(
            "anchor_refreshes",
            "Number of rebuilds with a fresh anchor after a stale-anchor rejection",
        ))?;

        let confirmations_confirmed = IntCounter::with_opts(Opts::new(
            "confirmations_confirmed",
            "Number of tracked transactions that reached the target finality",
        ))?;

        let confirmations_failed = IntCounter::with_opts(Opts::new(
            "confirmations_failed",
            "Number of tracked transactions that failed on the ledger",
        ))?;

        let confirmation_timeouts = IntCounter::with_opts(Opts::new(
            "confirmation_timeouts",
            "Number of tracking attempts that gave up before a terminal status",
        ))?;

        let status_polls = IntCounter::with_opts(Opts::new(
            "status_polls",
            "Number of signature status queries",
        ))?;

        let status_poll_errors = IntCounter::with_opts(Opts::new(
            "status_poll_errors",
            "Number of signature status queries that errored",
        ))?;

        let active_trackers = IntGauge::with_opts(Opts::new(
            "active_trackers",
            "Number of confirmation trackers currently polling",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new("submit_latency_seconds", "Anchor fetch to node acceptance")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Submission to terminal confirmation status",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_accepted.clone()))?;
        registry.register(Box::new(submissions_rejected.clone()))?;
        registry.register(Box::new(simulation_failures.clone()))?;
        registry.register(Box::new(network_errors.clone()))?;
        registry.register(Box::new(anchor_refreshes.clone()))?;
        registry.register(Box::new(confirmations_confirmed.clone()))?;
        registry.register(Box::new(confirmations_failed.clone()))?;
        registry.register(Box::new(confirmation_timeouts.clone()))?;
        registry.register(Box::new(status_polls.clone()))?;
        registry.register(Box::new(status_poll_errors.clone()))?;
        registry.register(Box::new(active_trackers.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_accepted,
            submissions_rejected,
            simulation_failures,
            network_errors,
            anchor_refreshes,
            confirmations_confirmed,
            confirmations_failed,
            confirmation_timeouts,
            status_polls,
            status_poll_errors,
            active_trackers,
            submit_latency,
            confirmation_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
