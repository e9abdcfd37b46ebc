use crate::error::SendError;
use crate::wire::{DistributionPoint, MetricPoint, WireSpan};
use std::future::Future;
use std::pin::Pin;

/// Boxed send future returned by [`SenderBoxed`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>>;

/// The collector client that performs the actual I/O.
///
/// Uses native async fn in traits instead of `#[async_trait]`.
///
/// # Note on Object Safety
///
/// This trait uses `impl Future` return types which are not object-safe.
/// For dynamic dispatch, use `Arc<dyn SenderBoxed>`; every `Sender` is one.
pub trait Sender: Send + Sync {
    /// Sends one scalar metric point.
    fn send_metric(&self, point: &MetricPoint) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Sends one histogram distribution.
    fn send_distribution(
        &self,
        point: &DistributionPoint,
    ) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Sends one span with its tags and logs.
    fn send_span(&self, span: &WireSpan) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Pushes out anything the sender buffers internally.
    fn flush(&self) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Returns the sender name for debugging.
    fn name(&self) -> &str;
}

/// Object-safe version of [`Sender`] for dynamic dispatch.
pub trait SenderBoxed: Send + Sync {
    fn send_metric_boxed<'a>(&'a self, point: &'a MetricPoint) -> SendFuture<'a>;

    fn send_distribution_boxed<'a>(&'a self, point: &'a DistributionPoint) -> SendFuture<'a>;

    fn send_span_boxed<'a>(&'a self, span: &'a WireSpan) -> SendFuture<'a>;

    fn flush_boxed(&self) -> SendFuture<'_>;

    fn name(&self) -> &str;
}

/// Blanket implementation: any Sender can be used as SenderBoxed
impl<T: Sender> SenderBoxed for T {
    fn send_metric_boxed<'a>(&'a self, point: &'a MetricPoint) -> SendFuture<'a> {
        Box::pin(self.send_metric(point))
    }

    fn send_distribution_boxed<'a>(&'a self, point: &'a DistributionPoint) -> SendFuture<'a> {
        Box::pin(self.send_distribution(point))
    }

    fn send_span_boxed<'a>(&'a self, span: &'a WireSpan) -> SendFuture<'a> {
        Box::pin(self.send_span(span))
    }

    fn flush_boxed(&self) -> SendFuture<'_> {
        Box::pin(self.flush())
    }

    fn name(&self) -> &str {
        Sender::name(self)
    }
}

/// Stdout sender for testing and debugging, one JSON document per record.
pub struct StdoutSender {
    verbose: bool,
}

impl StdoutSender {
    /// Creates a new stdout sender
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn print<T: serde::Serialize>(&self, kind: &str, record: &T) -> Result<(), SendError> {
        if self.verbose {
            let json =
                serde_json::to_string(record).map_err(|e| SendError::Serialization(e.to_string()))?;
            println!("{kind} {json}");
        }
        Ok(())
    }
}

impl Sender for StdoutSender {
    async fn send_metric(&self, point: &MetricPoint) -> Result<(), SendError> {
        self.print("metric", point)
    }

    async fn send_distribution(&self, point: &DistributionPoint) -> Result<(), SendError> {
        self.print("distribution", point)
    }

    async fn send_span(&self, span: &WireSpan) -> Result<(), SendError> {
        self.print("span", span)
    }

    async fn flush(&self) -> Result<(), SendError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Null sender that discards everything (for benchmarking)
pub struct NullSender;

impl NullSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for NullSender {
    async fn send_metric(&self, _point: &MetricPoint) -> Result<(), SendError> {
        Ok(())
    }

    async fn send_distribution(&self, _point: &DistributionPoint) -> Result<(), SendError> {
        Ok(())
    }

    async fn send_span(&self, _span: &WireSpan) -> Result<(), SendError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), SendError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Test sender that records everything it is given
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSender {
    metrics: std::sync::Mutex<Vec<MetricPoint>>,
    distributions: std::sync::Mutex<Vec<DistributionPoint>>,
    spans: std::sync::Mutex<Vec<WireSpan>>,
    flushes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<MetricPoint> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn distributions(&self) -> Vec<DistributionPoint> {
        self.distributions.lock().unwrap().clone()
    }

    pub fn spans(&self) -> Vec<WireSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.metrics.lock().unwrap().len()
            + self.distributions.lock().unwrap().len()
            + self.spans.lock().unwrap().len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
impl Sender for RecordingSender {
    async fn send_metric(&self, point: &MetricPoint) -> Result<(), SendError> {
        self.metrics.lock().unwrap().push(point.clone());
        Ok(())
    }

    async fn send_distribution(&self, point: &DistributionPoint) -> Result<(), SendError> {
        self.distributions.lock().unwrap().push(point.clone());
        Ok(())
    }

    async fn send_span(&self, span: &WireSpan) -> Result<(), SendError> {
        self.spans.lock().unwrap().push(span.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), SendError> {
        self.flushes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Sender that holds every send open until [`GatedSender::open`] is called.
#[cfg(test)]
pub struct GatedSender {
    gate: tokio::sync::watch::Sender<bool>,
    started: std::sync::atomic::AtomicUsize,
    in_flight: std::sync::atomic::AtomicUsize,
    max_in_flight: std::sync::atomic::AtomicUsize,
    inner: RecordingSender,
}

#[cfg(test)]
impl GatedSender {
    pub fn new() -> Self {
        let (gate, _) = tokio::sync::watch::channel(false);
        Self {
            gate,
            started: std::sync::atomic::AtomicUsize::new(0),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            max_in_flight: std::sync::atomic::AtomicUsize::new(0),
            inner: RecordingSender::new(),
        }
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// Number of sends that reached the sender, completed or not.
    pub fn started(&self) -> usize {
        self.started.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Highest number of sends that were ever waiting at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.inner.sent_count()
    }

    async fn pass(&self) {
        use std::sync::atomic::Ordering::SeqCst;

        self.started.fetch_add(1, SeqCst);
        let now = self.in_flight.fetch_add(1, SeqCst) + 1;
        self.max_in_flight.fetch_max(now, SeqCst);
        let mut rx = self.gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
        self.in_flight.fetch_sub(1, SeqCst);
    }
}

#[cfg(test)]
impl Sender for GatedSender {
    async fn send_metric(&self, point: &MetricPoint) -> Result<(), SendError> {
        self.pass().await;
        self.inner.send_metric(point).await
    }

    async fn send_distribution(&self, point: &DistributionPoint) -> Result<(), SendError> {
        self.pass().await;
        self.inner.send_distribution(point).await
    }

    async fn send_span(&self, span: &WireSpan) -> Result<(), SendError> {
        self.pass().await;
        self.inner.send_span(span).await
    }

    async fn flush(&self) -> Result<(), SendError> {
        self.inner.flush().await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Sender whose every call fails.
#[cfg(test)]
#[derive(Default)]
pub struct FailingSender {
    attempts: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FailingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn fail(&self) -> Result<(), SendError> {
        self.attempts.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Err(SendError::Transport("simulated failure".into()))
    }
}

#[cfg(test)]
impl Sender for FailingSender {
    async fn send_metric(&self, _point: &MetricPoint) -> Result<(), SendError> {
        self.fail()
    }

    async fn send_distribution(&self, _point: &DistributionPoint) -> Result<(), SendError> {
        self.fail()
    }

    async fn send_span(&self, _span: &WireSpan) -> Result<(), SendError> {
        self.fail()
    }

    async fn flush(&self) -> Result<(), SendError> {
        self.fail()
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn point() -> MetricPoint {
        MetricPoint {
            name: "test".to_string(),
            value: 4.0,
            timestamp_millis: 1,
            source: "host".to_string(),
            tags: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_stdout_sender() {
        let sender = StdoutSender::new(false);
        assert!(sender.send_metric(&point()).await.is_ok());
        assert!(sender.flush().await.is_ok());
    }

    #[tokio::test]
    async fn test_null_sender_through_boxed() {
        let sender: Arc<dyn SenderBoxed> = Arc::new(NullSender::new());
        assert!(sender.send_metric_boxed(&point()).await.is_ok());
        assert_eq!(sender.name(), "null");
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = RecordingSender::new();
        sender.send_metric(&point()).await.unwrap();
        sender.flush().await.unwrap();

        assert_eq!(sender.metrics(), vec![point()]);
        assert_eq!(sender.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_gated_sender_holds_until_open() {
        let sender = Arc::new(GatedSender::new());
        let task = {
            let sender = Arc::clone(&sender);
            tokio::spawn(async move { sender.send_metric(&point()).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sender.started(), 1);
        assert_eq!(sender.completed(), 0);

        sender.open();
        task.await.unwrap().unwrap();
        assert_eq!(sender.completed(), 1);
    }
}
