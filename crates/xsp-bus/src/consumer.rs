//! ---
//! xsp_section: "03-bus-collaborators"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Bus transport abstraction and consumer gate."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;

use xsp_envelope::{
    decode, Envelope, EnvelopeFactory, ErrorDetail, MessageRef, ValidationReport,
};

use crate::dedup::{DedupStore, InMemoryDedupStore};
use crate::logging::{log_envelope, EnvelopeDirection, PipelineMetricsExporter};
use crate::transport::{RawMessage, Transport};

/// Error code stamped on quarantine envelopes for structural violations.
pub const CODE_VALIDATION: &str = "contract.validation";
/// Error code stamped on quarantine envelopes for unsupported versions.
///
/// Distinct from [`CODE_VALIDATION`] so a consumer can park these messages
/// for reprocessing once it gains support for the version.
pub const CODE_VERSION: &str = "contract.version";

/// Snapshot of gate counters used by dashboards and monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateMetrics {
    /// Envelopes validated and handed to the handler.
    pub processed: u64,
    /// Envelopes routed to the quarantine transport.
    pub quarantined: u64,
    /// Envelopes suppressed as duplicates.
    pub duplicates: u64,
}

struct Counters {
    processed: AtomicU64,
    quarantined: AtomicU64,
    duplicates: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            quarantined: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> GateMetrics {
        GateMetrics {
            processed: self.processed.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }
}

/// What the gate decided about one inbound value.
#[derive(Debug)]
pub enum GateOutcome {
    /// Contract satisfied; the typed envelope is ready for the handler.
    Processed(Envelope),
    /// Idempotency key already seen; the envelope was dropped.
    Duplicate(String),
    /// Contract violated; an error envelope was routed to quarantine.
    Quarantined(ValidationReport),
}

/// Consumer-side gate wiring the validator, dedup store, and quarantine
/// path in front of a handler.
pub struct ConsumerGate {
    inbound: Arc<dyn Transport>,
    quarantine: Arc<dyn Transport>,
    dedup: Box<dyn DedupStore>,
    factory: EnvelopeFactory,
    counters: Counters,
    exporter: Option<PipelineMetricsExporter>,
}

impl ConsumerGate {
    /// Gate reading from `inbound` and quarantining onto `quarantine`,
    /// with an in-memory dedup store.
    pub fn new(inbound: Arc<dyn Transport>, quarantine: Arc<dyn Transport>) -> Self {
        Self {
            inbound,
            quarantine,
            dedup: Box::new(InMemoryDedupStore::new()),
            factory: EnvelopeFactory::new(),
            counters: Counters::new(),
            exporter: None,
        }
    }

    /// Replace the dedup store (e.g. with a time-bounded or external one).
    pub fn with_dedup<D>(mut self, dedup: D) -> Self
    where
        D: DedupStore + 'static,
    {
        self.dedup = Box::new(dedup);
        self
    }

    /// Attach a Prometheus exporter for gate observations.
    pub fn with_exporter(mut self, exporter: PipelineMetricsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Pull the next inbound value, if any, and admit it.
    pub fn poll_one(&self) -> Option<GateOutcome> {
        self.inbound.recv().map(|raw| self.admit(raw))
    }

    /// Run one raw value through validation, deduplication, and quarantine.
    pub fn admit(&self, raw: RawMessage) -> GateOutcome {
        let started = Instant::now();

        let envelope = match decode(&raw) {
            Ok(envelope) => envelope,
            Err(report) => {
                self.quarantine_raw(&raw, &report);
                self.counters.quarantined.fetch_add(1, Ordering::Relaxed);
                if let Some(exporter) = &self.exporter {
                    exporter.observe_quarantined();
                    exporter.observe_duration("quarantined", started.elapsed());
                }
                return GateOutcome::Quarantined(report);
            }
        };

        if self.dedup.seen(&envelope.idempotency_key) {
            tracing::debug!(
                idempotency_key = %envelope.idempotency_key,
                correlation_id = %envelope.correlation_id,
                "duplicate envelope suppressed"
            );
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            if let Some(exporter) = &self.exporter {
                exporter.observe_duplicate();
                exporter.observe_duration("duplicate", started.elapsed());
            }
            return GateOutcome::Duplicate(envelope.idempotency_key);
        }

        log_envelope(EnvelopeDirection::Inbound, &envelope);
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.exporter {
            exporter.observe_processed();
            exporter.observe_duration("processed", started.elapsed());
        }
        GateOutcome::Processed(envelope)
    }

    /// Return the current counter snapshot.
    pub fn metrics(&self) -> GateMetrics {
        self.counters.snapshot()
    }

    fn quarantine_raw(&self, raw: &RawMessage, report: &ValidationReport) {
        let source_ref = salvage_ref(raw);
        let correlation_id = source_ref
            .as_ref()
            .and_then(|source| source.correlation_id.clone());
        let code = if report.is_version_skew() {
            CODE_VERSION
        } else {
            CODE_VALIDATION
        };

        let quarantine = self.factory.error(
            ErrorDetail {
                code: code.to_owned(),
                message: report.errors.join("; "),
                context: None,
            },
            source_ref,
            correlation_id,
        );

        tracing::warn!(
            errors = ?report.errors,
            code,
            quarantine_key = %quarantine.idempotency_key,
            "envelope failed contract validation"
        );
        log_envelope(EnvelopeDirection::Quarantine, &quarantine);

        match quarantine.to_wire() {
            Ok(wire) => {
                if let Err(err) = self.quarantine.publish(wire) {
                    tracing::warn!(transport = self.quarantine.name(), error = %err, "quarantine publish failed");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "quarantine envelope failed to serialize");
            }
        }
    }
}

/// Recover whatever base fields survive in a malformed value.
fn salvage_ref(raw: &RawMessage) -> Option<MessageRef> {
    let map = raw.as_object()?;
    let text = |field: &str| {
        map.get(field)
            .and_then(JsonValue::as_str)
            .map(str::to_owned)
    };
    let salvaged = MessageRef {
        message_type: text("messageType"),
        idempotency_key: text("idempotencyKey"),
        correlation_id: text("correlationId"),
    };
    (!salvaged.is_empty()).then_some(salvaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use chrono::Utc;
    use serde_json::json;
    use xsp_envelope::Payload;

    fn gate_with_queues() -> (ConsumerGate, Arc<InMemoryTransport>, Arc<InMemoryTransport>) {
        let inbound = Arc::new(InMemoryTransport::new());
        let quarantine = Arc::new(InMemoryTransport::new());
        let gate = ConsumerGate::new(inbound.clone(), quarantine.clone());
        (gate, inbound, quarantine)
    }

    fn valid_wire() -> RawMessage {
        EnvelopeFactory::new()
            .xray_raw("dev-1", Utc::now(), "abc123", None, None)
            .to_wire()
            .expect("serialize")
    }

    #[test]
    fn valid_envelopes_pass_the_gate() {
        let (gate, inbound, quarantine) = gate_with_queues();
        inbound.publish(valid_wire()).expect("publish");

        match gate.poll_one().expect("outcome") {
            GateOutcome::Processed(envelope) => assert_eq!(envelope.kind(), "xray.raw"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(quarantine.is_empty());
        assert_eq!(gate.metrics().processed, 1);
    }

    #[test]
    fn duplicates_are_suppressed_by_key() {
        let (gate, inbound, _) = gate_with_queues();
        let wire = valid_wire();
        inbound.publish(wire.clone()).expect("publish");
        inbound.publish(wire).expect("publish");

        assert!(matches!(
            gate.poll_one().expect("first"),
            GateOutcome::Processed(_)
        ));
        assert!(matches!(
            gate.poll_one().expect("second"),
            GateOutcome::Duplicate(_)
        ));
        assert_eq!(gate.metrics().duplicates, 1);
    }

    #[test]
    fn malformed_values_are_quarantined_with_a_source_ref() {
        let (gate, _, quarantine) = gate_with_queues();
        let outcome = gate.admit(json!({
            "messageType": "xray.raw",
            "correlationId": "chain-7",
            "createdAt": "2024-01-01T00:00:00Z",
            // idempotencyKey and schemaVersion missing
        }));
        assert!(matches!(outcome, GateOutcome::Quarantined(_)));

        let wire = quarantine.recv().expect("quarantine envelope");
        let envelope = decode(&wire).expect("quarantine envelopes satisfy the contract");
        assert_eq!(envelope.correlation_id, "chain-7");
        match envelope.payload {
            Payload::Error(frame) => {
                assert_eq!(frame.error.code, CODE_VALIDATION);
                let source = frame.source_ref.expect("source ref");
                assert_eq!(source.message_type.as_deref(), Some("xray.raw"));
                assert_eq!(source.correlation_id.as_deref(), Some("chain-7"));
                assert!(source.idempotency_key.is_none());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn version_skew_gets_its_own_error_code() {
        let (gate, _, quarantine) = gate_with_queues();
        let mut wire = valid_wire();
        wire["schemaVersion"] = json!("v9.9");
        gate.admit(wire);

        let quarantined = quarantine.recv().expect("quarantine envelope");
        let envelope = decode(&quarantined).expect("decode");
        match envelope.payload {
            Payload::Error(frame) => assert_eq!(frame.error.code, CODE_VERSION),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn unsalvageable_values_quarantine_without_a_ref() {
        let (gate, _, quarantine) = gate_with_queues();
        gate.admit(json!("not an object"));

        let wire = quarantine.recv().expect("quarantine envelope");
        let envelope = decode(&wire).expect("decode");
        match envelope.payload {
            Payload::Error(frame) => assert!(frame.source_ref.is_none()),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
