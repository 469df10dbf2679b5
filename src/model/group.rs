//! Grouping of rows by shard, by timestamp, and of runs by name.

use crate::config::GroupingConfig;
use crate::logs::LatencyRow;

use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

/// Split latency rows by shard, keeping row order inside each shard.
pub fn group_by_shard(rows: &[LatencyRow]) -> BTreeMap<i64, Vec<LatencyRow>> {
    let mut out: BTreeMap<i64, Vec<LatencyRow>> = BTreeMap::new();
    for row in rows {
        out.entry(row.shard).or_default().push(row.clone());
    }
    out
}

/// Average `value` over rows sharing the exact same elapsed timestamp.
///
/// Output is ordered by timestamp.
pub fn mean_per_timestamp<T>(
    rows: &[T],
    timestamp: impl Fn(&T) -> f64,
    value: impl Fn(&T) -> f64,
) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = rows.iter().map(|r| (timestamp(r), value(r))).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    pairs
        .chunk_by(|a, b| a.0 == b.0)
        .map(|bucket| {
            let sum: f64 = bucket.iter().map(|(_, v)| v).sum();
            (bucket[0].0, sum / bucket.len() as f64)
        })
        .collect()
}

/// Protocol and checkpoint-interval class of one run, taken from its
/// directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunKey {
    pub protocol: String,
    pub interval: String,
}

impl RunKey {
    pub fn from_name(name: &str, grouping: &GroupingConfig) -> Option<Self> {
        let segments: Vec<&str> = name.split('-').collect();
        let protocol = segments.get(grouping.protocol_segment)?;
        let interval = segments.get(grouping.interval_segment)?;
        Some(RunKey {
            protocol: protocol.to_string(),
            interval: interval.chars().take(grouping.interval_prefix).collect(),
        })
    }
}

/// Group run directory names by `RunKey`; names that do not yield a key are
/// logged and left out.
pub fn group_runs(names: &[String], grouping: &GroupingConfig) -> BTreeMap<RunKey, Vec<String>> {
    let mut out: BTreeMap<RunKey, Vec<String>> = BTreeMap::new();
    for name in names {
        match RunKey::from_name(name, grouping) {
            Some(key) => out.entry(key).or_default().push(name.clone()),
            None => warn!(
                "run {:?} has too few '-' segments for grouping, skipping",
                name
            ),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lat(timestamp: f64, latency: f64, shard: i64) -> LatencyRow {
        LatencyRow {
            timestamp,
            latency,
            shard,
        }
    }

    #[test]
    fn shards_are_partitioned() {
        let rows = vec![lat(0.0, 1.0, 2), lat(1.0, 2.0, 1), lat(2.0, 3.0, 2)];
        let groups = group_by_shard(&rows);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(groups[&2], vec![lat(0.0, 1.0, 2), lat(2.0, 3.0, 2)]);
    }

    #[test]
    fn shards_are_averaged_per_timestamp() {
        let rows = vec![
            lat(1000.0, 4.0, 0),
            lat(0.0, 1.0, 0),
            lat(1000.0, 8.0, 1),
            lat(0.0, 3.0, 1),
            lat(2000.0, 5.0, 0),
        ];
        assert_eq!(
            mean_per_timestamp(&rows, |r| r.timestamp, |r| r.latency),
            vec![(0.0, 2.0), (1000.0, 6.0), (2000.0, 5.0)]
        );
    }

    #[test]
    fn runs_sharing_protocol_and_interval_merge() {
        let names = vec![
            "job-1-cc-30s-50k-x".to_string(),
            "job-2-cc-30s-99k-y".to_string(),
            "job-3-uc-10s-50k-x".to_string(),
            "short-name".to_string(),
        ];
        let groups = group_runs(&names, &GroupingConfig::default());

        let cc = RunKey {
            protocol: "cc".to_string(),
            interval: "30".to_string(),
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&cc], vec![names[0].clone(), names[1].clone()]);
        assert_eq!(
            RunKey::from_name("job-3-uc-10s-50k-x", &GroupingConfig::default()),
            Some(RunKey {
                protocol: "uc".to_string(),
                interval: "10".to_string()
            })
        );
    }

    #[test]
    fn segment_positions_are_configurable() {
        let grouping = GroupingConfig {
            protocol_segment: 3,
            interval_segment: 4,
            interval_prefix: 2,
        };
        let key = RunKey::from_name("wc-run-1-chandy-60s", &grouping).unwrap();
        assert_eq!(key.protocol, "chandy");
        assert_eq!(key.interval, "60");
    }
}
