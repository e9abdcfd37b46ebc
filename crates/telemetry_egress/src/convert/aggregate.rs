use super::ConversionContext;
use crate::command::SendCommand;
use crate::encode::unix_millis;
use crate::invariants::debug_assert_centroid_total;
use crate::model::{Aggregation, CapturedAggregate, DistributionData};
use crate::wire::{Centroid, DistributionPoint, MetricPoint};
use std::collections::HashMap;
use tracing::warn;

pub const UNIT_TAG_KEY: &str = "unit";

/// The unit string of a dimensionless measure.
const DIMENSIONLESS: &str = "1";

/// Converts every row of a snapshot into one send command.
///
/// Rows whose aggregation has no wire mapping, and distributions whose
/// buckets do not line up with their bounds, are logged and skipped.
pub fn convert_aggregate(record: &CapturedAggregate, ctx: &ConversionContext) -> Vec<SendCommand> {
    let unit = (!record.unit.is_empty() && record.unit != DIMENSIONLESS).then_some(record.unit.as_str());
    let timestamp_millis = unix_millis(record.end_time);

    let mut commands = Vec::with_capacity(record.rows.len());
    for row in &record.rows {
        let tags = point_tags(&row.tags, unit, &ctx.app_tags);

        let value = match &row.data {
            Aggregation::Count(count) => *count as f64,
            Aggregation::LastValue(value) | Aggregation::Sum(value) => *value,
            Aggregation::Distribution(data) => {
                let Some(centroids) = reconstruct_centroids(data) else {
                    warn!(metric = %record.name, "malformed distribution, row skipped");
                    continue;
                };
                commands.push(SendCommand::Distribution(DistributionPoint {
                    name: record.name.clone(),
                    centroids,
                    granularities: ctx.granularities.clone(),
                    timestamp_millis,
                    source: ctx.source.clone(),
                    tags,
                }));
                continue;
            }
            Aggregation::Unsupported(kind) => {
                warn!(metric = %record.name, aggregation = %kind, "unsupported aggregation, row skipped");
                continue;
            }
        };

        commands.push(SendCommand::Metric(MetricPoint {
            name: record.name.clone(),
            value,
            timestamp_millis,
            source: ctx.source.clone(),
            tags,
        }));
    }
    commands
}

/// Merges row tags, the unit tag and application tags; later entries win.
pub fn point_tags(
    row_tags: &HashMap<String, String>,
    unit: Option<&str>,
    app_tags: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut tags = HashMap::with_capacity(row_tags.len() + app_tags.len() + 1);
    tags.extend(row_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(unit) = unit {
        tags.insert(UNIT_TAG_KEY.to_string(), unit.to_string());
    }
    tags.extend(app_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags
}

/// Rebuilds histogram centroids from bucketed statistics.
///
/// A bucket holding a single sample keeps that sample's exact value through
/// its exemplar; fuller buckets collapse to the midpoint of their range. The
/// open-ended first and last buckets are closed with the row min and max.
///
/// Returns `None` unless there is exactly one more count than bounds.
pub fn reconstruct_centroids(data: &DistributionData) -> Option<Vec<Centroid>> {
    let bounds = &data.bounds;
    let counts = &data.counts;
    if counts.len() != bounds.len() + 1 {
        warn!(
            bounds = bounds.len(),
            counts = counts.len(),
            "bucket bounds and counts do not match"
        );
        return None;
    }

    let last = counts.len() - 1;
    let mut centroids = Vec::with_capacity(counts.len());
    for (i, &count) in counts.iter().enumerate() {
        if count <= 0 {
            continue;
        }

        let exemplar = data.exemplars.get(i).copied().flatten();
        let value = match exemplar {
            Some(value) if count == 1 => value,
            _ => {
                let low = if i == 0 { data.min } else { bounds[i - 1] };
                let high = if i == last { data.max } else { bounds[i] };
                mean2(low, high)
            }
        };

        centroids.push(Centroid {
            value,
            count: count as u64,
        });
    }

    debug_assert_centroid_total!(centroids, data.total_count());
    Some(centroids)
}

fn mean2(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AggregateRow;
    use crate::wire::HistogramGranularity;
    use std::time::{Duration, UNIX_EPOCH};

    fn ctx() -> ConversionContext {
        let mut ctx = ConversionContext::new(
            "host-1",
            HashMap::from([("app".to_string(), "shop".to_string())]),
        );
        ctx.granularities.insert(HistogramGranularity::Hour);
        ctx
    }

    fn record(unit: &str, data: Aggregation) -> CapturedAggregate {
        CapturedAggregate {
            name: "v1".to_string(),
            unit: unit.to_string(),
            end_time: UNIX_EPOCH + Duration::from_millis(42_000),
            rows: vec![AggregateRow {
                tags: HashMap::from([("method".to_string(), "GET".to_string())]),
                data,
            }],
        }
    }

    fn distribution(bounds: Vec<f64>, counts: Vec<i64>, min: f64, max: f64, exemplars: Vec<Option<f64>>) -> DistributionData {
        DistributionData {
            bounds,
            counts,
            min,
            max,
            mean: 0.0,
            exemplars,
        }
    }

    #[test]
    fn test_scalar_rows() {
        for (data, expected) in [
            (Aggregation::Count(7), 7.0),
            (Aggregation::LastValue(4.5), 4.5),
            (Aggregation::Sum(-2.0), -2.0),
        ] {
            let commands = convert_aggregate(&record("ms", data), &ctx());
            assert_eq!(commands.len(), 1);
            match &commands[0] {
                SendCommand::Metric(point) => {
                    assert_eq!(point.name, "v1");
                    assert_eq!(point.value, expected);
                    assert_eq!(point.timestamp_millis, 42_000);
                    assert_eq!(point.source, "host-1");
                    assert_eq!(point.tags["method"], "GET");
                    assert_eq!(point.tags[UNIT_TAG_KEY], "ms");
                    assert_eq!(point.tags["app"], "shop");
                }
                other => panic!("expected a metric, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_dimensionless_unit_not_tagged() {
        for unit in ["", DIMENSIONLESS] {
            let commands = convert_aggregate(&record(unit, Aggregation::Count(1)), &ctx());
            let SendCommand::Metric(point) = &commands[0] else {
                panic!("expected a metric");
            };
            assert!(!point.tags.contains_key(UNIT_TAG_KEY));
        }
    }

    #[test]
    fn test_later_tags_win() {
        let row = HashMap::from([
            ("app".to_string(), "row".to_string()),
            (UNIT_TAG_KEY.to_string(), "row".to_string()),
        ]);
        let app = HashMap::from([("app".to_string(), "shop".to_string())]);

        let tags = point_tags(&row, Some("bytes"), &app);
        assert_eq!(tags["app"], "shop");
        assert_eq!(tags[UNIT_TAG_KEY], "bytes");
    }

    #[test]
    fn test_distribution_row() {
        let data = distribution(vec![10.0], vec![1, 1], 9.0, 27.0, vec![Some(9.0), Some(27.0)]);
        let commands = convert_aggregate(&record("ms", Aggregation::Distribution(data)), &ctx());

        let SendCommand::Distribution(point) = &commands[0] else {
            panic!("expected a distribution");
        };
        assert_eq!(
            point.centroids,
            vec![
                Centroid { value: 9.0, count: 1 },
                Centroid { value: 27.0, count: 1 },
            ]
        );
        assert!(point.granularities.contains(&HistogramGranularity::Hour));
        assert_eq!(point.tags[UNIT_TAG_KEY], "ms");
    }

    #[test]
    fn test_unsupported_row_skipped() {
        let mut rec = record("", Aggregation::Unsupported("percentile".to_string()));
        rec.rows.push(AggregateRow {
            tags: HashMap::new(),
            data: Aggregation::Sum(1.0),
        });

        let commands = convert_aggregate(&rec, &ctx());
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], SendCommand::Metric(_)));
    }

    #[test]
    fn test_midpoints_for_full_buckets() {
        let data = distribution(
            vec![10.0, 20.0],
            vec![3, 2, 4],
            1.0,
            41.0,
            vec![None, None, None],
        );
        let centroids = reconstruct_centroids(&data).unwrap();
        assert_eq!(
            centroids,
            vec![
                Centroid { value: 5.5, count: 3 },
                Centroid { value: 15.0, count: 2 },
                Centroid { value: 30.5, count: 4 },
            ]
        );
    }

    #[test]
    fn test_empty_and_negative_buckets_skipped() {
        let data = distribution(vec![10.0, 20.0], vec![0, -3, 2], 0.0, 30.0, vec![]);
        let centroids = reconstruct_centroids(&data).unwrap();
        assert_eq!(centroids, vec![Centroid { value: 25.0, count: 2 }]);
    }

    #[test]
    fn test_single_sample_without_exemplar_uses_midpoint() {
        let data = distribution(vec![10.0, 20.0], vec![0, 1, 0], 0.0, 30.0, vec![None, None, None]);
        assert_eq!(
            reconstruct_centroids(&data),
            Some(vec![Centroid { value: 15.0, count: 1 }])
        );
    }

    #[test]
    fn test_single_bucket_spans_min_to_max() {
        let data = distribution(vec![], vec![4], 2.0, 8.0, vec![None]);
        assert_eq!(
            reconstruct_centroids(&data),
            Some(vec![Centroid { value: 5.0, count: 4 }])
        );
    }

    #[test]
    fn test_mismatched_buckets_yield_nothing() {
        let data = distribution(vec![10.0], vec![1, 2, 3], 0.0, 1.0, vec![]);
        assert_eq!(reconstruct_centroids(&data), None);

        let data = distribution(vec![10.0], vec![], 0.0, 1.0, vec![]);
        assert_eq!(reconstruct_centroids(&data), None);
    }

    #[test]
    fn test_malformed_distribution_row_skipped() {
        let malformed = distribution(vec![10.0], vec![1, 2, 3], 0.0, 30.0, vec![]);
        let mut rec = record("ms", Aggregation::Distribution(malformed));
        rec.rows.push(AggregateRow {
            tags: HashMap::new(),
            data: Aggregation::Count(4),
        });

        let commands = convert_aggregate(&rec, &ctx());
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], SendCommand::Metric(_)));
    }
}
