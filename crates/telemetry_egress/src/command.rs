//! Deferred send commands.
//!
//! A converter produces a [`SendCommand`] holding everything the sender needs;
//! from then on the dispatch engine owns it until it is executed once.

use crate::error::SendError;
use crate::sender::SenderBoxed;
use crate::wire::{DistributionPoint, MetricPoint, WireSpan};
use std::fmt;

/// Which kind of record a command carries. Selects the drop counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Metric,
    Distribution,
    Span,
}

impl CommandKind {
    /// `true` for commands counted as dropped spans, `false` for dropped metrics.
    pub fn is_span(self) -> bool {
        matches!(self, CommandKind::Span)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Metric => "metric",
            CommandKind::Distribution => "distribution",
            CommandKind::Span => "span",
        };
        f.write_str(name)
    }
}

/// A self-contained unit of deferred work.
#[derive(Debug, Clone, PartialEq)]
pub enum SendCommand {
    Metric(MetricPoint),
    Distribution(DistributionPoint),
    Span(WireSpan),
}

impl SendCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            SendCommand::Metric(_) => CommandKind::Metric,
            SendCommand::Distribution(_) => CommandKind::Distribution,
            SendCommand::Span(_) => CommandKind::Span,
        }
    }

    /// Name of the metric or span being sent.
    pub fn name(&self) -> &str {
        match self {
            SendCommand::Metric(point) => &point.name,
            SendCommand::Distribution(point) => &point.name,
            SendCommand::Span(span) => &span.name,
        }
    }

    /// Performs the send. Consumes the command so it cannot run twice.
    pub async fn execute(self, sender: &dyn SenderBoxed) -> Result<(), SendError> {
        match self {
            SendCommand::Metric(point) => sender.send_metric_boxed(&point).await,
            SendCommand::Distribution(point) => sender.send_distribution_boxed(&point).await,
            SendCommand::Span(span) => sender.send_span_boxed(&span).await,
        }
    }
}
