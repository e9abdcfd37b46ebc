//! Exporter facade used by the host instrumentation layer.

use crate::command::SendCommand;
use crate::config::ExporterConfig;
use crate::convert::{convert_aggregate, convert_span, ConversionContext};
use crate::counters::Counters;
use crate::dispatch::DispatchEngine;
use crate::error::ExporterError;
use crate::model::{CapturedAggregate, CapturedSpan};
use crate::self_health::SelfHealthMonitor;
use crate::sender::SenderBoxed;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// Converts captured spans and aggregates and hands them to the dispatch
/// engine.
///
/// The export entry points never block and never fail: anything that cannot
/// be sent is counted instead. `Exporter` is `Send + Sync` and can be shared
/// across threads behind an `Arc`.
pub struct Exporter {
    engine: Arc<DispatchEngine>,
    context: Arc<ConversionContext>,
    self_health_interval: Duration,
}

impl Exporter {
    /// Creates an exporter whose dispatch tasks run on the current tokio
    /// runtime.
    pub fn new(sender: Arc<dyn SenderBoxed>, config: ExporterConfig) -> Result<Self, ExporterError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(sender, config, runtime))
    }

    /// Creates an exporter bound to an explicit runtime, usable from threads
    /// outside it.
    pub fn with_runtime(sender: Arc<dyn SenderBoxed>, config: ExporterConfig, runtime: Handle) -> Self {
        let context = Arc::new(ConversionContext::from_config(&config));
        let engine = Arc::new(DispatchEngine::new(sender, &config, runtime));
        Self {
            engine,
            context,
            self_health_interval: config.self_health_interval,
        }
    }

    /// Converts a finished span and queues it for sending.
    pub fn export_span(&self, span: &CapturedSpan) {
        let wire = convert_span(span, &self.context);
        self.submit(SendCommand::Span(wire));
    }

    /// Converts every row of an aggregate snapshot and queues each point.
    pub fn export_record(&self, record: &CapturedAggregate) {
        for cmd in convert_aggregate(record, &self.context) {
            self.submit(cmd);
        }
    }

    fn submit(&self, cmd: SendCommand) {
        if let Err(err) = self.engine.dispatch(cmd) {
            trace!(error = %err, "telemetry dropped");
        }
    }

    /// Waits for everything exported so far to be sent, then flushes the
    /// sender.
    pub async fn flush(&self) {
        self.engine.flush().await;
    }

    /// Starts periodic self-health reporting at the configured interval.
    pub fn start_self_health(&self) -> SelfHealthMonitor {
        SelfHealthMonitor::start(
            Arc::clone(&self.engine),
            Arc::clone(&self.context),
            self.self_health_interval,
        )
    }

    pub fn counters(&self) -> &Arc<Counters> {
        self.engine.counters()
    }

    pub fn spans_dropped(&self) -> u64 {
        self.engine.counters().spans_dropped()
    }

    pub fn metrics_dropped(&self) -> u64 {
        self.engine.counters().metrics_dropped()
    }

    pub fn sender_errors(&self) -> u64 {
        self.engine.counters().sender_errors()
    }

    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    pub fn context(&self) -> &ConversionContext {
        &self.context
    }
}
