//! Exporter configuration.

use crate::wire::HistogramGranularity;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Default bound on accepted-but-unfinished send commands.
pub const DEFAULT_QUEUE_SIZE: usize = 1000;

/// Default idle period after which a [`DispatchMode::Worker`] worker retires.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default period of the self-health report.
pub const DEFAULT_SELF_HEALTH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How accepted commands are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One task per command, capacity enforced by a semaphore.
    #[default]
    Slots,
    /// One long-lived worker draining a bounded queue, retired when idle.
    Worker,
}

/// Tags identifying the emitting application, attached to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationTags {
    pub application: String,
    pub service: String,
    pub cluster: Option<String>,
    pub shard: Option<String>,
    pub custom: HashMap<String, String>,
}

impl ApplicationTags {
    pub fn new(application: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn with_shard(mut self, shard: impl Into<String>) -> Self {
        self.shard = Some(shard.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Flattens into a tag map. Well-known keys win over custom ones.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = self.custom.clone();
        map.insert("application".to_string(), self.application.clone());
        map.insert("service".to_string(), self.service.clone());
        if let Some(cluster) = &self.cluster {
            map.insert("cluster".to_string(), cluster.clone());
        }
        if let Some(shard) = &self.shard {
            map.insert("shard".to_string(), shard.clone());
        }
        map
    }
}

/// Configuration accepted by [`Exporter::new`](crate::exporter::Exporter::new).
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Source label attached to every record.
    ///
    /// Default: empty
    pub source: String,

    /// Tags appended to every span and metric.
    ///
    /// Default: empty
    pub app_tags: HashMap<String, String>,

    /// Maximum number of accepted commands not yet completed. Zero drops
    /// everything, which is handy for benchmarking conversion alone.
    ///
    /// Default: 1000
    pub queue_size: usize,

    /// Granularities requested for distributions.
    ///
    /// Default: none
    pub granularities: BTreeSet<HistogramGranularity>,

    /// Log each sender failure at warn level.
    ///
    /// Default: false
    pub verbose_logging: bool,

    /// Execution strategy for accepted commands.
    ///
    /// Default: [`DispatchMode::Slots`]
    pub dispatch_mode: DispatchMode,

    /// Idle period before a worker retires ([`DispatchMode::Worker`] only).
    ///
    /// Default: 5s
    pub idle_timeout: Duration,

    /// Period of the self-health report.
    ///
    /// Default: 5 minutes
    pub self_health_interval: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            app_tags: HashMap::new(),
            queue_size: DEFAULT_QUEUE_SIZE,
            granularities: BTreeSet::new(),
            verbose_logging: false,
            dispatch_mode: DispatchMode::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            self_health_interval: DEFAULT_SELF_HEALTH_INTERVAL,
        }
    }
}

impl ExporterConfig {
    /// Sets the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Adds one application tag.
    pub fn with_app_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.app_tags.insert(key.into(), value.into());
        self
    }

    /// Merges the given application tags into the tag map.
    pub fn with_application_tags(mut self, tags: &ApplicationTags) -> Self {
        self.app_tags.extend(tags.to_map());
        self
    }

    /// Sets the command capacity.
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Enables one histogram granularity.
    pub fn with_granularity(mut self, granularity: HistogramGranularity) -> Self {
        self.granularities.insert(granularity);
        self
    }

    /// Toggles verbose sender-error logging.
    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    /// Selects the dispatch strategy.
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    /// Sets the worker idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the self-health report period.
    pub fn with_self_health_interval(mut self, interval: Duration) -> Self {
        self.self_health_interval = interval;
        self
    }
}
