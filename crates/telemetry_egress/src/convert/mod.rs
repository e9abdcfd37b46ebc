//! Conversion of captured records into send commands.

mod aggregate;
mod span;

pub use aggregate::{convert_aggregate, point_tags, reconstruct_centroids, UNIT_TAG_KEY};
pub use span::convert_span;

use crate::config::ExporterConfig;
use crate::wire::HistogramGranularity;
use std::collections::{BTreeSet, HashMap};

/// The fixed, per-exporter inputs every conversion needs.
#[derive(Debug, Clone, Default)]
pub struct ConversionContext {
    pub source: String,
    pub app_tags: HashMap<String, String>,
    pub granularities: BTreeSet<HistogramGranularity>,
}

impl ConversionContext {
    pub fn new(source: impl Into<String>, app_tags: HashMap<String, String>) -> Self {
        Self {
            source: source.into(),
            app_tags,
            granularities: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self {
            source: config.source.clone(),
            app_tags: config.app_tags.clone(),
            granularities: config.granularities.clone(),
        }
    }
}
