//! Telemetry Egress
//!
//! Converts finished trace spans and aggregated metric snapshots into
//! Wavefront-style span, point and histogram records and delivers them to a
//! collector through a pluggable [`Sender`], without ever blocking or failing
//! the instrumentation call path.
//!
//! # Pipeline
//!
//! ```text
//! host ──► Exporter ──► convert_span / convert_aggregate ──► SendCommand
//!                                                              │
//!             SelfHealthMonitor ──(inline)──┐                  ▼
//!                                           └──────────► DispatchEngine ──► Sender
//! ```
//!
//! The dispatch engine bounds in-flight work; on overload commands are dropped
//! and counted, never retried. The counters are reported back as metrics by the
//! [`SelfHealthMonitor`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telemetry_egress::{CapturedSpan, Exporter, ExporterConfig, SpanId, StdoutSender, TraceId};
//!
//! # async fn run() -> Result<(), telemetry_egress::ExporterError> {
//! let config = ExporterConfig::default()
//!     .with_source("web-01")
//!     .with_app_tag("application", "shop");
//! let exporter = Exporter::new(Arc::new(StdoutSender::new(true)), config)?;
//!
//! let span = CapturedSpan::new("GET /cart", TraceId::from_u128(7), SpanId::from_u64(1), SpanId::INVALID);
//! exporter.export_span(&span);
//! exporter.flush().await;
//! # Ok(())
//! # }
//! ```

mod invariants;

pub mod command;
pub mod config;
pub mod convert;
pub mod counters;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod exporter;
pub mod model;
pub mod self_health;
pub mod sender;
pub mod wire;

pub use command::{CommandKind, SendCommand};
pub use config::{ApplicationTags, DispatchMode, ExporterConfig};
pub use convert::{convert_aggregate, convert_span, reconstruct_centroids, ConversionContext};
pub use counters::{CounterSnapshot, Counters};
pub use dispatch::DispatchEngine;
pub use error::{DispatchError, ExporterError, SendError};
pub use exporter::Exporter;
pub use model::{
    AggregateRow, Aggregation, Annotation, AttributeValue, CapturedAggregate, CapturedSpan,
    DistributionData, MessageEvent, MessageEventKind, SpanId, SpanKind, SpanStatus, TraceId,
};
pub use self_health::SelfHealthMonitor;
pub use sender::{NullSender, Sender, SenderBoxed, StdoutSender};
pub use wire::{Centroid, DistributionPoint, HistogramGranularity, MetricPoint, SpanLog, SpanTag, WireSpan};
