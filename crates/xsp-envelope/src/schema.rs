//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Result;

/// Base fields every envelope must carry, in wire spelling.
pub const BASE_FIELDS: [&str; 5] = [
    "schemaVersion",
    "idempotencyKey",
    "correlationId",
    "createdAt",
    "messageType",
];

/// Schema revisions this service can produce and consume.
///
/// Envelopes tagged with any other revision are rejected at validation
/// time, never silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Initial contract revision.
    #[serde(rename = "v1.0")]
    V1_0,
    /// Current revision; adds device metadata to raw captures.
    #[serde(rename = "v1.1")]
    V1_1,
}

impl SchemaVersion {
    /// Revision stamped onto newly built envelopes.
    pub const CURRENT: SchemaVersion = SchemaVersion::V1_1;

    /// Every revision the pipeline currently accepts.
    pub const SUPPORTED: [SchemaVersion; 2] = [SchemaVersion::V1_0, SchemaVersion::V1_1];

    /// Wire spelling of the revision tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1_0 => "v1.0",
            SchemaVersion::V1_1 => "v1.1",
        }
    }

    /// Membership test over the supported revision set.
    pub fn parse(tag: &str) -> Option<SchemaVersion> {
        Self::SUPPORTED
            .into_iter()
            .find(|version| version.as_str() == tag)
    }
}

/// Closed set of message discriminants recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Unprocessed capture emitted by a device.
    #[serde(rename = "xray.raw")]
    XRayRaw,
    /// Capture after the processing stage has extracted readings.
    #[serde(rename = "xray.processed")]
    XRayProcessed,
    /// Device liveness and capability report.
    #[serde(rename = "device.status")]
    DeviceStatus,
    /// Structured failure report, including quarantined messages.
    #[serde(rename = "error")]
    Error,
}

impl MessageType {
    /// Every discriminant the pipeline currently recognizes.
    pub const ALL: [MessageType; 4] = [
        MessageType::XRayRaw,
        MessageType::XRayProcessed,
        MessageType::DeviceStatus,
        MessageType::Error,
    ];

    /// Wire spelling of the discriminant.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::XRayRaw => "xray.raw",
            MessageType::XRayProcessed => "xray.processed",
            MessageType::DeviceStatus => "device.status",
            MessageType::Error => "error",
        }
    }

    /// Membership test over the recognized discriminant set.
    pub fn parse(tag: &str) -> Option<MessageType> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

/// Unified envelope carried on the bus.
///
/// Constructed once by [`crate::EnvelopeFactory`] (or an equivalent emitter
/// in another service honoring the same contract) and treated as a
/// read-only value thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Contract revision the payload conforms to.
    pub schema_version: SchemaVersion,
    /// Deterministic fingerprint of the payload content, for deduplication.
    pub idempotency_key: String,
    /// Identifier shared by every message in one causal chain.
    pub correlation_id: String,
    /// Timestamp of envelope construction.
    pub created_at: DateTime<Utc>,
    /// Variant payload, discriminated on the wire by `messageType`.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    /// Discriminant of the carried payload.
    pub fn message_type(&self) -> MessageType {
        match &self.payload {
            Payload::XRayRaw(_) => MessageType::XRayRaw,
            Payload::XRayProcessed(_) => MessageType::XRayProcessed,
            Payload::DeviceStatus(_) => MessageType::DeviceStatus,
            Payload::Error(_) => MessageType::Error,
        }
    }

    /// Convenience accessor returning the payload kind as a static string.
    pub fn kind(&self) -> &'static str {
        self.message_type().as_str()
    }

    /// Serialize to the canonical wire representation.
    pub fn to_wire(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Variant payloads. The tag lands beside the base fields on the wire, so
/// variant fields sit flat inside the envelope object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType")]
pub enum Payload {
    /// Unprocessed capture emitted by a device.
    #[serde(rename = "xray.raw")]
    XRayRaw(XRayRawFrame),
    /// Capture after the processing stage has extracted readings.
    #[serde(rename = "xray.processed")]
    XRayProcessed(XRayProcessedFrame),
    /// Device liveness and capability report.
    #[serde(rename = "device.status")]
    DeviceStatus(DeviceStatusFrame),
    /// Structured failure report.
    #[serde(rename = "error")]
    Error(ErrorFrame),
}

/// Raw capture frame as emitted by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XRayRawFrame {
    /// Device that produced the capture.
    pub device_id: String,
    /// When the device sampled the payload.
    pub captured_at: DateTime<Utc>,
    /// Opaque capture payload (encoded bytes or structured string).
    pub payload: String,
    /// Optional device-reported metadata snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DeviceMetadata>,
}

/// Device-reported metadata attached to raw captures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetadata {
    /// Free-form deployment location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Battery charge in percent. Expected range 0–100; range enforcement
    /// is a validator concern, not a schema one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<f64>,
    /// Radio signal strength in dBm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength_dbm: Option<f64>,
    /// Enclosure temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    /// Seconds since the device last booted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// Single typed reading extracted from a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Reading kind identifier (e.g. `"density"`).
    pub kind: String,
    /// Measured value.
    pub value: f64,
    /// Unit of the measured value.
    pub unit: String,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

/// Severity ladder for detected anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no operator action expected.
    Low,
    /// Worth surfacing on dashboards.
    Medium,
    /// Requires operator attention.
    High,
    /// Requires immediate intervention.
    Critical,
}

/// Anomaly detected during processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    /// Anomaly kind identifier.
    pub kind: String,
    /// How severe the anomaly is.
    pub severity: Severity,
    /// Human-readable description.
    pub description: String,
    /// When the anomaly was observed.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics over the extracted readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStats {
    /// Number of readings aggregated.
    pub count: u64,
    /// Arithmetic mean of the values.
    pub mean: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

/// Metadata about the processing run itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInfo {
    /// Wall-clock processing time in milliseconds.
    pub elapsed_ms: u64,
    /// Version tag of the extraction algorithm.
    pub algorithm_version: String,
    /// Overall confidence of the run in `[0, 1]`.
    pub confidence: f64,
    /// Quality score assigned to the capture in `[0, 1]`.
    pub quality_score: f64,
}

/// Processed capture frame produced by the processing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XRayProcessedFrame {
    /// Device that produced the original capture.
    pub device_id: String,
    /// When the processing stage finished.
    pub processed_at: DateTime<Utc>,
    /// Reference to the original payload (typically its idempotency key).
    pub source_ref: String,
    /// Typed readings extracted from the capture.
    #[serde(default)]
    pub readings: Vec<Reading>,
    /// Anomalies detected during processing.
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    /// Aggregate statistics over the readings.
    pub stats: ReadingStats,
    /// Processing run metadata.
    pub processing: ProcessingInfo,
}

/// Device operational states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Device is reachable and reporting.
    Online,
    /// Device has stopped reporting.
    Offline,
    /// Device reported an internal fault.
    Error,
    /// Device was taken out of rotation deliberately.
    Maintenance,
}

/// Optional health snapshot attached to status reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealth {
    /// Battery charge in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<f64>,
    /// Enclosure temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    /// Faults recorded since the last report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    /// Seconds since the device last booted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// What a device can emit and over which transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// Message discriminants the device is able to emit.
    pub supported_message_types: Vec<MessageType>,
    /// Largest payload the device will produce, in bytes.
    pub max_payload_bytes: u64,
    /// Transport protocols the device speaks (e.g. `"mqtt"`).
    pub protocols: Vec<String>,
}

/// Device liveness and capability report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusFrame {
    /// Device the report concerns.
    pub device_id: String,
    /// Current operational state.
    pub status: DeviceState,
    /// Last time the device was heard from.
    pub last_seen: DateTime<Utc>,
    /// Optional health snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<DeviceHealth>,
    /// Capability descriptor.
    pub capabilities: DeviceCapabilities,
}

/// Structured error description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional diagnostic context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, JsonValue>>,
}

/// Reference to the message that triggered an error report.
///
/// Fields are individually optional because a quarantined message may be
/// too malformed to yield all three.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Wire discriminant of the offending message, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Idempotency key of the offending message, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Correlation identifier of the offending message, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl MessageRef {
    /// Build a fully populated reference to a well-formed envelope.
    pub fn to(envelope: &Envelope) -> Self {
        Self {
            message_type: Some(envelope.kind().to_owned()),
            idempotency_key: Some(envelope.idempotency_key.clone()),
            correlation_id: Some(envelope.correlation_id.clone()),
        }
    }

    /// True when no field of the original message could be recovered.
    pub fn is_empty(&self) -> bool {
        self.message_type.is_none()
            && self.idempotency_key.is_none()
            && self.correlation_id.is_none()
    }
}

/// Error report payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrame {
    /// What went wrong.
    pub error: ErrorDetail,
    /// Reference to the offending message, when recoverable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<MessageRef>,
}

/// Cheap structural pre-filter used by transport dispatch.
///
/// Checks only that the five base fields are present and string-typed; the
/// full contract check lives in [`crate::validate`]. A `true` here does not
/// imply the value will decode.
pub fn is_envelope_shaped(value: &JsonValue) -> bool {
    match value.as_object() {
        Some(map) => BASE_FIELDS
            .iter()
            .all(|field| map.get(*field).is_some_and(JsonValue::is_string)),
        None => false,
    }
}
