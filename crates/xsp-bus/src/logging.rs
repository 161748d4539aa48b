//! ---
//! xsp_section: "03-bus-collaborators"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Bus transport abstraction and consumer gate."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, Opts, Registry};
use tracing::debug;

use xsp_envelope::Envelope;

/// Direction of envelope movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeDirection {
    /// Envelope published via a transport.
    Outbound,
    /// Envelope received from a transport.
    Inbound,
    /// Envelope routed to the quarantine path.
    Quarantine,
}

/// Emit a structured log entry for envelope activity.
pub fn log_envelope(direction: EnvelopeDirection, envelope: &Envelope) {
    debug!(
        idempotency_key = %envelope.idempotency_key,
        correlation_id = %envelope.correlation_id,
        created_at = %envelope.created_at,
        kind = envelope.kind(),
        schema_version = envelope.schema_version.as_str(),
        direction = ?direction,
        "envelope activity"
    );
}

/// Prometheus metric handles for gate activity.
pub struct PipelineMetricsExporter {
    processed: IntCounter,
    quarantined: IntCounter,
    duplicates: IntCounter,
    duration: HistogramVec,
}

impl PipelineMetricsExporter {
    /// Register gate metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let processed = IntCounter::with_opts(Opts::new(
            "envelopes_processed_total",
            "Envelopes validated and handed to a consumer handler",
        ))?;
        let quarantined = IntCounter::with_opts(Opts::new(
            "envelopes_quarantined_total",
            "Envelopes rejected by the contract validator",
        ))?;
        let duplicates = IntCounter::with_opts(Opts::new(
            "envelopes_duplicate_total",
            "Envelopes suppressed by the deduplication store",
        ))?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "envelope_processing_seconds",
                "Time spent admitting one envelope, keyed by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(processed.clone()))?;
        registry.register(Box::new(quarantined.clone()))?;
        registry.register(Box::new(duplicates.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            processed,
            quarantined,
            duplicates,
            duration,
        })
    }

    /// Record a processed envelope.
    pub fn observe_processed(&self) {
        self.processed.inc();
    }

    /// Record a quarantined envelope.
    pub fn observe_quarantined(&self) {
        self.quarantined.inc();
    }

    /// Record a suppressed duplicate.
    pub fn observe_duplicate(&self) {
        self.duplicates.inc();
    }

    /// Record admission latency for one outcome.
    pub fn observe_duration(&self, outcome: &str, duration: Duration) {
        self.duration
            .with_label_values(&[outcome])
            .observe(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_exporter_records_counts() {
        let registry = Registry::new();
        let metrics = PipelineMetricsExporter::register(&registry).expect("register metrics");
        metrics.observe_processed();
        metrics.observe_quarantined();
        metrics.observe_duplicate();
        metrics.observe_duration("processed", Duration::from_millis(3));

        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "envelopes_processed_total"));
        assert!(families
            .iter()
            .any(|f| f.get_name() == "envelope_processing_seconds"));
    }
}
