//! Wire-format records handed to a [`Sender`](crate::sender::Sender).
//!
//! These mirror the Wavefront data formats: a point (`name value ts source tags`),
//! a histogram distribution of centroids, and a span with tags and span logs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Key/value tag attached to a wire span. Keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanTag {
    pub key: String,
    pub value: String,
}

impl SpanTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A timestamped set of fields recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLog {
    pub timestamp_millis: i64,
    pub fields: HashMap<String, String>,
}

/// One reconstructed histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub value: f64,
    pub count: u64,
}

/// Time granularity at which the collector aggregates a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistogramGranularity {
    Minute,
    Hour,
    Day,
}

impl HistogramGranularity {
    /// Prefix used by the Wavefront histogram line format.
    pub fn prefix(self) -> &'static str {
        match self {
            HistogramGranularity::Minute => "!M",
            HistogramGranularity::Hour => "!H",
            HistogramGranularity::Day => "!D",
        }
    }
}

/// A single scalar metric point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp_millis: i64,
    pub source: String,
    pub tags: HashMap<String, String>,
}

/// A histogram distribution point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPoint {
    pub name: String,
    pub centroids: Vec<Centroid>,
    pub granularities: BTreeSet<HistogramGranularity>,
    pub timestamp_millis: i64,
    pub source: String,
    pub tags: HashMap<String, String>,
}

impl DistributionPoint {
    pub fn total_count(&self) -> u64 {
        self.centroids.iter().map(|c| c.count).sum()
    }
}

/// A span in wire form, identifiers already encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSpan {
    pub name: String,
    pub start_millis: i64,
    pub duration_millis: i64,
    pub source: String,
    pub trace_id: String,
    pub span_id: String,
    /// Empty for root spans, otherwise exactly one entry.
    pub parents: Vec<String>,
    pub follows_from: Vec<String>,
    pub tags: Vec<SpanTag>,
    pub logs: Vec<SpanLog>,
}

impl WireSpan {
    /// First value recorded under `key`, if any.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}
