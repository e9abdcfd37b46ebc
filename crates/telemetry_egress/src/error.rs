//! Error types for the egress pipeline.
//!
//! None of these ever reach the host's instrumentation call path: the
//! exporter entry points swallow them into counters and log lines.

use crate::command::CommandKind;
use thiserror::Error;

/// Failure reported by a [`Sender`](crate::sender::Sender).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Transport-layer error (network, proxy, HTTP)
    #[error("transport error: {0}")]
    Transport(String),
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The sender has been closed
    #[error("sender is closed")]
    Closed,
}

/// Outcome of offering a command to the dispatch engine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No capacity left; the command was dropped.
    #[error("dispatch queue is full, dropped {0} command")]
    Full(CommandKind),
}

impl DispatchError {
    /// Kind of the command that was dropped.
    pub fn kind(&self) -> CommandKind {
        match self {
            DispatchError::Full(kind) => *kind,
        }
    }
}

/// Errors raised while building an [`Exporter`](crate::exporter::Exporter).
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Construction happened outside a tokio runtime.
    #[error("exporter must be created inside a tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
