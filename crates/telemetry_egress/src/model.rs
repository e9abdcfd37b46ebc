//! Captured telemetry records handed over by the host instrumentation layer.
//!
//! Everything here is read-only input to the converters: a record is built by
//! the host once the unit of work is finished and is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// 128-bit trace identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// The all-zero trace id.
    pub const INVALID: TraceId = TraceId([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Builds a trace id from its big-endian integer form.
    pub const fn from_u128(id: u128) -> Self {
        Self(id.to_be_bytes())
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// 64-bit span identifier. The all-zero value means "no span".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// The all-zero span id, used as the parent of root spans.
    pub const INVALID: SpanId = SpanId([0; 8]);

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Builds a span id from its big-endian integer form.
    pub const fn from_u64(id: u64) -> Self {
        Self(id.to_be_bytes())
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Returns `false` for the all-zero sentinel.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

/// Attribute value types for span and annotation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Accepted from the host but has no wire representation.
    Array(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Span kind as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanKind {
    #[default]
    Unspecified,
    /// Server-side RPC span
    Server,
    /// Client-side RPC span
    Client,
}

impl SpanKind {
    /// Position of this kind in the wire enum table.
    pub fn index(self) -> i64 {
        match self {
            SpanKind::Unspecified => 0,
            SpanKind::Server => 1,
            SpanKind::Client => 2,
        }
    }
}

/// Span completion status. Codes follow the gRPC status code numbering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanStatus {
    pub code: i32,
    pub message: String,
}

impl SpanStatus {
    pub const OK_CODE: i32 = 0;

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::OK_CODE
    }
}

/// A timestamped, free-form note attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub time: SystemTime,
    pub message: String,
    pub attributes: HashMap<String, AttributeValue>,
}

/// Direction of a message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageEventKind {
    #[default]
    Unspecified,
    Sent,
    Received,
}

impl MessageEventKind {
    pub fn index(self) -> i64 {
        match self {
            MessageEventKind::Unspecified => 0,
            MessageEventKind::Sent => 1,
            MessageEventKind::Received => 2,
        }
    }
}

/// A message sent or received while the span was open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub time: SystemTime,
    pub kind: MessageEventKind,
    pub message_id: i64,
    pub uncompressed_size: i64,
    pub compressed_size: i64,
}

/// A finished span as captured by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedSpan {
    pub name: String,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    /// `SpanId::INVALID` for root spans
    pub parent_span_id: SpanId,
    pub status: SpanStatus,
    pub kind: SpanKind,
    pub attributes: HashMap<String, AttributeValue>,
    pub annotations: Vec<Annotation>,
    pub message_events: Vec<MessageEvent>,
}

impl CapturedSpan {
    /// Creates a span with the given identity, starting and ending now.
    pub fn new(name: impl Into<String>, trace_id: TraceId, span_id: SpanId, parent_span_id: SpanId) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            start_time: now,
            end_time: now,
            trace_id,
            span_id,
            parent_span_id,
            status: SpanStatus::ok(),
            kind: SpanKind::Unspecified,
            attributes: HashMap::new(),
            annotations: Vec::new(),
            message_events: Vec::new(),
        }
    }

    /// Adds an attribute to the span
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns `true` when the span has no parent.
    pub fn is_root(&self) -> bool {
        !self.parent_span_id.is_valid()
    }
}

/// Bucketed distribution statistics for one row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistributionData {
    /// Sorted upper bounds; bucket `i` covers `[bounds[i-1], bounds[i])`.
    pub bounds: Vec<f64>,
    /// One count per bucket, `bounds.len() + 1` entries when well formed.
    pub counts: Vec<i64>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// At most one sampled value per bucket.
    pub exemplars: Vec<Option<f64>>,
}

impl DistributionData {
    pub fn total_count(&self) -> i64 {
        self.counts.iter().filter(|&&c| c > 0).sum()
    }
}

/// Aggregation payload of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    Count(i64),
    LastValue(f64),
    Sum(f64),
    Distribution(DistributionData),
    /// An aggregation kind with no wire mapping; carries its name for logging.
    Unsupported(String),
}

impl Aggregation {
    pub fn kind_name(&self) -> &str {
        match self {
            Aggregation::Count(_) => "count",
            Aggregation::LastValue(_) => "last_value",
            Aggregation::Sum(_) => "sum",
            Aggregation::Distribution(_) => "distribution",
            Aggregation::Unsupported(name) => name,
        }
    }
}

/// One tag set and its aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub tags: HashMap<String, String>,
    pub data: Aggregation,
}

/// A periodic snapshot of one named measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedAggregate {
    pub name: String,
    /// Unit of the underlying measure, `"1"` or empty when dimensionless.
    pub unit: String,
    pub end_time: SystemTime,
    pub rows: Vec<AggregateRow>,
}

impl CapturedAggregate {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            end_time: SystemTime::now(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, returning `self` for chaining.
    pub fn with_row(mut self, tags: HashMap<String, String>, data: Aggregation) -> Self {
        self.rows.push(AggregateRow { tags, data });
        self
    }
}
