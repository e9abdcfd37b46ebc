//! Periodic reporting of the engine's own counters as metrics.

use crate::command::SendCommand;
use crate::convert::{point_tags, ConversionContext};
use crate::dispatch::DispatchEngine;
use crate::encode::unix_millis;
use crate::error::SendError;
use crate::wire::MetricPoint;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const SENDER_ERRORS_METRIC: &str = "telemetry.exporter.sender_errors";
pub const DROPPED_METRICS_METRIC: &str = "telemetry.exporter.dropped_metrics";
pub const DROPPED_SPANS_METRIC: &str = "telemetry.exporter.dropped_spans";

/// Handle to a running self-health loop.
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the loop
/// running until the runtime shuts down, with no final report.
pub struct SelfHealthMonitor {
    engine: Arc<DispatchEngine>,
    context: Arc<ConversionContext>,
    task: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl SelfHealthMonitor {
    /// Starts reporting every `period` on the engine's runtime.
    ///
    /// The first report goes out one full period after the start.
    pub fn start(engine: Arc<DispatchEngine>, context: Arc<ConversionContext>, period: Duration) -> Self {
        // tokio intervals reject a zero period
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let runtime = engine.runtime().clone();
        let task = {
            let engine = Arc::clone(&engine);
            let context = Arc::clone(&context);
            runtime.spawn(async move {
                let start = tokio::time::Instant::now() + period;
                let mut interval = tokio::time::interval_at(start, period);
                loop {
                    tokio::select! {
                        _ = interval.tick() => report(&engine, &context).await,
                        // a dropped handle only disables this branch
                        Ok(()) = &mut shutdown_rx => break,
                    }
                }
            })
        };

        Self {
            engine,
            context,
            task,
            shutdown_tx,
        }
    }

    /// Stops the loop, sends a last report and logs what was lost.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(err) = self.task.await {
            debug!(error = %err, "self-health loop ended abnormally");
        }

        report(&self.engine, &self.context).await;

        let counters = self.engine.counters().snapshot();
        if counters.sender_errors > 0 {
            warn!(total = counters.sender_errors, "telemetry sends failed");
        }
        if counters.spans_dropped > 0 {
            warn!(total = counters.spans_dropped, "spans were dropped");
        }
        if counters.metrics_dropped > 0 {
            warn!(total = counters.metrics_dropped, "metrics were dropped");
        }
    }
}

/// Sends every non-zero counter, stopping at the first failed send.
pub(crate) async fn report(engine: &DispatchEngine, context: &ConversionContext) {
    let counters = engine.counters().snapshot();
    let readings = [
        (SENDER_ERRORS_METRIC, counters.sender_errors),
        (DROPPED_METRICS_METRIC, counters.metrics_dropped),
        (DROPPED_SPANS_METRIC, counters.spans_dropped),
    ];

    for (name, value) in readings {
        if value == 0 {
            continue;
        }
        if let Err(err) = send_reading(engine, context, name, value).await {
            debug!(metric = name, error = %err, "self-health report failed");
            return;
        }
    }
}

async fn send_reading(
    engine: &DispatchEngine,
    context: &ConversionContext,
    name: &str,
    value: u64,
) -> Result<(), SendError> {
    let point = MetricPoint {
        name: name.to_string(),
        value: value as f64,
        timestamp_millis: unix_millis(SystemTime::now()),
        source: context.source.clone(),
        tags: point_tags(&HashMap::new(), None, &context.app_tags),
    };
    engine.execute_now(SendCommand::Metric(point)).await
}
