//! Cross-run summaries: one row per (query, protocol, interval) group.
//!
//! Root layout is `{root}/{query}/{run}/...`. Runs of a query are grouped
//! by `RunKey`, their rows are concatenated, and statistics are taken over
//! the whole group.

use crate::Result;
use crate::config::AnalysisConfig;
use crate::experiment::Experiment;
use crate::logs::{self, LogKind};
use crate::model::group::{RunKey, group_runs};
use crate::model::stats::Summary;

use anyhow::Context;
use log::{error, info, warn};
use serde::Serialize;
use std::path::Path;

/// A summary row renderable as a table line.
pub trait AggregateRow: Serialize {
    fn header() -> Vec<&'static str>;
    fn cells(&self) -> Vec<String>;
}

/// The loaded runs of one group.
pub struct RunGroup<'a> {
    pub query: &'a str,
    pub key: &'a RunKey,
    pub runs: &'a [Experiment],
}

/// Visit every (query, run key) group under `root` in sorted order.
pub fn summarize<R>(
    root: &Path,
    kinds: &[LogKind],
    config: &AnalysisConfig,
    mut build: impl FnMut(&RunGroup<'_>) -> R,
) -> Result<Vec<R>> {
    let queries = logs::list_experiments(root)
        .with_context(|| format!("list query folders under {}", root.display()))?;

    let mut out = Vec::new();
    for query in &queries {
        let query_dir = root.join(query);
        let names = match logs::list_experiments(&query_dir) {
            Ok(n) => n,
            Err(e) => {
                error!("skipping query {}: {}", query, e);
                continue;
            }
        };
        info!("{}: {} runs", query, names.len());

        for (key, members) in group_runs(&names, &config.grouping) {
            let runs: Vec<Experiment> = members
                .iter()
                .filter_map(|name| match Experiment::load(&query_dir, name, kinds) {
                    Ok(exp) => Some(exp),
                    Err(e) => {
                        error!("skipping run {}/{}: {}", query, name, e);
                        None
                    }
                })
                .collect();
            if runs.is_empty() {
                warn!("{}: no loadable runs for {:?}", query, key);
                continue;
            }
            out.push(build(&RunGroup {
                query,
                key: &key,
                runs: &runs,
            }));
        }
    }
    Ok(out)
}

/// `mean ± stdev` with `decimals` fraction digits.
pub fn mean_pm(summary: &Summary, decimals: usize) -> String {
    match (summary.mean, summary.stdev) {
        (Some(m), Some(sd)) => format!("{:.*} ± {:.*}", decimals, m, decimals, sd),
        (Some(m), None) => format!("{:.*} ± n/a", decimals, m),
        _ => "n/a".to_string(),
    }
}

/// Half-to-even, like the table formatter's `{:.0}`.
fn per_run(count: usize, runs: usize) -> u64 {
    (count as f64 / runs as f64).round_ties_even() as u64
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointAggregate {
    pub query: String,
    pub protocol: String,
    pub interval: String,
    pub runs: usize,
    pub total: u64,
    pub regular: u64,
    pub forced: u64,
    pub size_kb: Summary,
    pub time_ms: Summary,
}

pub fn aggregate_checkpoints(group: &RunGroup<'_>) -> CheckpointAggregate {
    let rows: Vec<_> = group.runs.iter().flat_map(|r| r.checkpoint_rows()).collect();
    let runs = group.runs.len();

    let total = per_run(rows.len(), runs);
    let regular = per_run(rows.iter().filter(|r| !r.forced).count(), runs);
    let sizes: Vec<f64> = rows
        .iter()
        .map(|r| (r.bytes as f64 / 1000.0).round_ties_even())
        .collect();
    let times: Vec<f64> = rows.iter().map(|r| r.taken_ms).collect();

    CheckpointAggregate {
        query: group.query.to_string(),
        protocol: group.key.protocol.clone(),
        interval: group.key.interval.clone(),
        runs,
        total,
        regular,
        forced: total.saturating_sub(regular),
        size_kb: Summary::of(&sizes),
        time_ms: Summary::of(&times),
    }
}

impl AggregateRow for CheckpointAggregate {
    fn header() -> Vec<&'static str> {
        vec![
            "query", "protocol", "interval", "#total", "#regular", "#forced", "size (Kb)",
            "time (ms)",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.query.clone(),
            self.protocol.clone(),
            self.interval.clone(),
            self.total.to_string(),
            self.regular.to_string(),
            self.forced.to_string(),
            mean_pm(&self.size_kb, 0),
            mean_pm(&self.time_ms, 0),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryAggregate {
    pub query: String,
    pub protocol: String,
    pub interval: String,
    pub runs: usize,
    pub total_workers: u64,
    pub recovered_workers: u64,
    /// Runs that recovered more workers than the double-failure threshold.
    pub flagged_runs: usize,
    pub restore_ms: Summary,
    pub rollback_s: Summary,
}

pub fn aggregate_recovery(group: &RunGroup<'_>, config: &AnalysisConfig) -> RecoveryAggregate {
    let mut total_workers = Vec::new();
    let mut recovered_workers = Vec::new();
    let mut flagged_runs = 0;
    let mut restore = Vec::new();
    let mut rollback = Vec::new();

    for run in group.runs {
        let total = run.recovery_files.saturating_sub(config.coordinator_instances);
        let recovered = run.recovery_rows().count();
        if recovered == 0 {
            info!("no recovery from {}", run.name);
        }
        if recovered > config.double_failure_threshold {
            warn!(
                "possible double failure in {}: {} recoveries for threshold {}",
                run.name, recovered, config.double_failure_threshold
            );
            flagged_runs += 1;
        }
        total_workers.push(total as f64);
        recovered_workers.push(recovered as f64);

        for row in run.recovery_rows() {
            restore.push(row.restored_ms);
            rollback.push(row.rollback_ms / 1000.0);
        }
    }

    let rounded_mean = |v: &[f64]| {
        Summary::of(v)
            .mean
            .map(|m| m.round_ties_even() as u64)
            .unwrap_or(0)
    };

    RecoveryAggregate {
        query: group.query.to_string(),
        protocol: group.key.protocol.clone(),
        interval: group.key.interval.clone(),
        runs: group.runs.len(),
        total_workers: rounded_mean(&total_workers),
        recovered_workers: rounded_mean(&recovered_workers),
        flagged_runs,
        restore_ms: Summary::of(&restore),
        rollback_s: Summary::of(&rollback),
    }
}

impl AggregateRow for RecoveryAggregate {
    fn header() -> Vec<&'static str> {
        vec![
            "query",
            "protocol",
            "interval",
            "#total",
            "#recovered",
            "#flagged",
            "restore (ms)",
            "restore p50/p99 (ms)",
            "rollback (s)",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let restore_band = match &self.restore_ms.band {
            Some(b) => format!("{:.0}/{:.0}", b.p50, b.p99),
            None => "n/a".to_string(),
        };
        vec![
            self.query.clone(),
            self.protocol.clone(),
            self.interval.clone(),
            self.total_workers.to_string(),
            self.recovered_workers.to_string(),
            self.flagged_runs.to_string(),
            mean_pm(&self.restore_ms, 0),
            restore_band,
            mean_pm(&self.rollback_s, 2),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyAggregate {
    pub query: String,
    pub protocol: String,
    pub interval: String,
    pub runs: usize,
    pub latency_ms: Summary,
}

pub fn aggregate_latency(group: &RunGroup<'_>) -> LatencyAggregate {
    let samples: Vec<f64> = group
        .runs
        .iter()
        .flat_map(|r| r.latency_rows().map(|row| row.latency))
        .collect();

    LatencyAggregate {
        query: group.query.to_string(),
        protocol: group.key.protocol.clone(),
        interval: group.key.interval.clone(),
        runs: group.runs.len(),
        latency_ms: Summary::of(&samples),
    }
}

impl AggregateRow for LatencyAggregate {
    fn header() -> Vec<&'static str> {
        vec![
            "query", "protocol", "interval", "#samples", "mean (ms)", "p1", "p25", "p50", "p75",
            "p95", "p99",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.query.clone(),
            self.protocol.clone(),
            self.interval.clone(),
            self.latency_ms.count.to_string(),
            mean_pm(&self.latency_ms, 2),
        ];
        match &self.latency_ms.band {
            Some(b) => cells.extend(
                [b.p1, b.p25, b.p50, b.p75, b.p95, b.p99]
                    .iter()
                    .map(|v| format!("{:.2}", v)),
            ),
            None => cells.extend(std::iter::repeat_n("n/a".to_string(), 6)),
        }
        cells
    }
}
