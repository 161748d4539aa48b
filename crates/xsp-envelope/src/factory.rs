//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::correlate;
use crate::idempotency::{derive_key, ContentMap};
use crate::schema::{
    Anomaly, DeviceCapabilities, DeviceHealth, DeviceMetadata, DeviceState, DeviceStatusFrame,
    Envelope, ErrorDetail, ErrorFrame, MessageRef, Payload, ProcessingInfo, Reading, ReadingStats,
    SchemaVersion, XRayProcessedFrame, XRayRawFrame,
};

/// Clock abstraction injected into the factory so tests can pin time.
pub trait Clock {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Correlation identifier source injected into the factory.
pub trait CorrelationSource {
    /// Mint a fresh globally-unique identifier.
    fn new_id(&self) -> String;
}

/// UUID-v4 backed identifier source.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCorrelationSource;

impl CorrelationSource for UuidCorrelationSource {
    fn new_id(&self) -> String {
        correlate::new_correlation_id()
    }
}

/// The sole sanctioned constructor for envelopes.
///
/// Every constructor computes the idempotency key over the variant's
/// content fields only, forwards or mints a correlation identifier, and
/// stamps the creation time and current schema version. No I/O, no global
/// state; clock and identifier source are explicit dependencies.
pub struct EnvelopeFactory<C = SystemClock, I = UuidCorrelationSource> {
    clock: C,
    ids: I,
}

impl EnvelopeFactory {
    /// Factory wired to the real clock and UUID source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for EnvelopeFactory {
    fn default() -> Self {
        Self {
            clock: SystemClock,
            ids: UuidCorrelationSource,
        }
    }
}

fn content_value<T: Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).expect("content types serialize to plain JSON")
}

impl<C: Clock, I: CorrelationSource> EnvelopeFactory<C, I> {
    /// Factory with explicit clock and identifier source, for deterministic
    /// construction in tests.
    pub fn with_parts(clock: C, ids: I) -> Self {
        Self { clock, ids }
    }

    fn stamp(
        &self,
        idempotency_key: String,
        correlation_id: Option<String>,
        payload: Payload,
    ) -> Envelope {
        Envelope {
            schema_version: SchemaVersion::CURRENT,
            idempotency_key,
            correlation_id: correlation_id.unwrap_or_else(|| self.ids.new_id()),
            created_at: self.clock.now(),
            payload,
        }
    }

    /// Build a raw capture envelope.
    ///
    /// The idempotency key covers device, capture time, and payload; the
    /// metadata snapshot is excluded because it varies independently of the
    /// capture content.
    pub fn xray_raw(
        &self,
        device_id: impl Into<String>,
        captured_at: DateTime<Utc>,
        payload: impl Into<String>,
        metadata: Option<DeviceMetadata>,
        correlation_id: Option<String>,
    ) -> Envelope {
        let frame = XRayRawFrame {
            device_id: device_id.into(),
            captured_at,
            payload: payload.into(),
            metadata,
        };
        let mut content = ContentMap::new();
        content.insert("deviceId".into(), content_value(&frame.device_id));
        content.insert("capturedAt".into(), content_value(&frame.captured_at));
        content.insert("payload".into(), content_value(&frame.payload));
        self.stamp(derive_key(&content), correlation_id, Payload::XRayRaw(frame))
    }

    /// Build a processed capture envelope.
    ///
    /// The key covers device, source reference, and readings; the
    /// processing timestamp varies on retry and is excluded.
    #[allow(clippy::too_many_arguments)]
    pub fn xray_processed(
        &self,
        device_id: impl Into<String>,
        processed_at: DateTime<Utc>,
        source_ref: impl Into<String>,
        readings: Vec<Reading>,
        anomalies: Vec<Anomaly>,
        stats: ReadingStats,
        processing: ProcessingInfo,
        correlation_id: Option<String>,
    ) -> Envelope {
        let frame = XRayProcessedFrame {
            device_id: device_id.into(),
            processed_at,
            source_ref: source_ref.into(),
            readings,
            anomalies,
            stats,
            processing,
        };
        let mut content = ContentMap::new();
        content.insert("deviceId".into(), content_value(&frame.device_id));
        content.insert("sourceRef".into(), content_value(&frame.source_ref));
        content.insert("readings".into(), content_value(&frame.readings));
        self.stamp(
            derive_key(&content),
            correlation_id,
            Payload::XRayProcessed(frame),
        )
    }

    /// Build a device status envelope.
    pub fn device_status(
        &self,
        device_id: impl Into<String>,
        status: DeviceState,
        last_seen: DateTime<Utc>,
        health: Option<DeviceHealth>,
        capabilities: DeviceCapabilities,
        correlation_id: Option<String>,
    ) -> Envelope {
        let frame = DeviceStatusFrame {
            device_id: device_id.into(),
            status,
            last_seen,
            health,
            capabilities,
        };
        let mut content = ContentMap::new();
        content.insert("deviceId".into(), content_value(&frame.device_id));
        content.insert("status".into(), content_value(&frame.status));
        content.insert("lastSeen".into(), content_value(&frame.last_seen));
        self.stamp(
            derive_key(&content),
            correlation_id,
            Payload::DeviceStatus(frame),
        )
    }

    /// Build an error report envelope.
    pub fn error(
        &self,
        error: ErrorDetail,
        source_ref: Option<MessageRef>,
        correlation_id: Option<String>,
    ) -> Envelope {
        let mut content = ContentMap::new();
        content.insert("code".into(), content_value(&error.code));
        content.insert("message".into(), content_value(&error.message));
        content.insert("sourceRef".into(), content_value(&source_ref));
        self.stamp(
            derive_key(&content),
            correlation_id,
            Payload::Error(ErrorFrame { error, source_ref }),
        )
    }

    /// Forward an existing envelope's correlation identifier onto a copy of
    /// a newly built one. Stateless re-export of [`correlate::propagate`]
    /// for response-message construction.
    pub fn propagate_correlation_id(&self, source: &Envelope, target: &Envelope) -> Envelope {
        correlate::propagate(source, target)
    }
}
