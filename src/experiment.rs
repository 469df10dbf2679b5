//! Loading one experiment directory into normalized series.
//!
//! The init point is resolved once here and applied to every kind, so that
//! failure markers, checkpoints and performance series share one clock.

use crate::error::AnalysisError;
use crate::logs::{
    self, CheckpointRow, FAILURES_FILE, FailureRow, LatencyRow, LogKind, RawTable, RecoveryRow,
    ThroughputRow, Timestamped,
};
use crate::series::{count_regressions, normalize};
use crate::time::{INIT_TIMESTAMP_FILE, resolve_init_timestamp};

use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSource {
    /// Read from `init_timestamp.log`.
    Marker,
    /// Earliest first row among the loaded files.
    FirstRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InitPoint {
    pub timestamp: f64,
    pub source: InitSource,
}

/// Rows of one instance log file.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSeries<T> {
    pub instance: String,
    pub file: String,
    pub rows: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub init: InitPoint,
    pub throughput: Vec<InstanceSeries<ThroughputRow>>,
    pub latency: Vec<InstanceSeries<LatencyRow>>,
    pub checkpoints: Vec<InstanceSeries<CheckpointRow>>,
    pub recoveries: Vec<InstanceSeries<RecoveryRow>>,
    /// Recovery files present on disk, empty ones included.
    pub recovery_files: usize,
    pub failures: Vec<FailureRow>,
}

impl Experiment {
    /// Load the requested kinds of `{root}/{name}` and normalize them.
    ///
    /// Unreadable or malformed files are logged and skipped. Only a missing
    /// experiment directory is an error.
    pub fn load(root: &Path, name: &str, kinds: &[LogKind]) -> Result<Self, AnalysisError> {
        let dir = root.join(name);
        if !dir.is_dir() {
            return Err(AnalysisError::NotFound { path: dir });
        }
        let wants = |k: LogKind| kinds.contains(&k);

        let mut throughput = Vec::new();
        let mut latency = Vec::new();
        if wants(LogKind::Throughput) || wants(LogKind::Latency) {
            for file in list_or_empty(root, name, LogKind::Throughput) {
                match performance_kind(&file) {
                    Some(LogKind::Throughput) if wants(LogKind::Throughput) => {
                        let kind = LogKind::Throughput;
                        if let Some(s) = load_instance(&dir, &file, kind, logs::parse_throughput) {
                            throughput.push(s);
                        }
                    }
                    Some(LogKind::Latency) if wants(LogKind::Latency) => {
                        let kind = LogKind::Latency;
                        if let Some(s) = load_instance(&dir, &file, kind, logs::parse_latency) {
                            latency.push(s);
                        }
                    }
                    Some(_) => {}
                    None => warn!(
                        "{}: cannot tell throughput from latency in {:?}, skipping",
                        name, file
                    ),
                }
            }
        }

        let mut checkpoints = Vec::new();
        if wants(LogKind::Checkpoint) {
            for file in list_or_empty(root, name, LogKind::Checkpoint) {
                let kind = LogKind::Checkpoint;
                if let Some(s) = load_instance(&dir, &file, kind, logs::parse_checkpoint) {
                    checkpoints.push(s);
                }
            }
        }

        let mut recoveries = Vec::new();
        let mut recovery_files = 0;
        if wants(LogKind::Recovery) {
            let files = list_or_empty(root, name, LogKind::Recovery);
            recovery_files = files.len();
            for file in files {
                let kind = LogKind::Recovery;
                if let Some(s) = load_instance(&dir, &file, kind, logs::parse_recovery) {
                    recoveries.push(s);
                }
            }
        }

        let failures = if wants(LogKind::Failure) {
            load_failures(&dir)
        } else {
            Vec::new()
        };

        let mut experiment = Experiment {
            name: name.to_string(),
            init: InitPoint {
                timestamp: 0.0,
                source: InitSource::Marker,
            },
            throughput,
            latency,
            checkpoints,
            recoveries,
            recovery_files,
            failures,
        };
        experiment.init = experiment.resolve_init(&dir);
        experiment.rebase();
        Ok(experiment)
    }

    fn resolve_init(&self, dir: &Path) -> InitPoint {
        match resolve_init_timestamp(&dir.join(INIT_TIMESTAMP_FILE)) {
            Ok(timestamp) => InitPoint {
                timestamp,
                source: InitSource::Marker,
            },
            Err(e) => {
                let timestamp = self.earliest_first_row().unwrap_or(0.0);
                warn!(
                    "{}: {}; using first row timestamp {} as init point",
                    self.name, e, timestamp
                );
                InitPoint {
                    timestamp,
                    source: InitSource::FirstRow,
                }
            }
        }
    }

    fn earliest_first_row(&self) -> Option<f64> {
        fn first<T: Timestamped>(series: &[InstanceSeries<T>]) -> impl Iterator<Item = f64> + '_ {
            series.iter().filter_map(|s| s.rows.first().map(|r| r.timestamp()))
        }

        first(&self.throughput)
            .chain(first(&self.latency))
            .chain(first(&self.checkpoints))
            .chain(first(&self.recoveries))
            .chain(self.failures.first().map(|r| r.timestamp()))
            .min_by(f64::total_cmp)
    }

    fn rebase(&mut self) {
        let init = self.init.timestamp;
        let name = self.name.clone();
        rebase_all(&name, &mut self.throughput, init);
        rebase_all(&name, &mut self.latency, init);
        rebase_all(&name, &mut self.checkpoints, init);
        rebase_all(&name, &mut self.recoveries, init);
        self.failures = normalize(std::mem::take(&mut self.failures), init);
    }

    pub fn checkpoint_rows(&self) -> impl Iterator<Item = &CheckpointRow> {
        self.checkpoints.iter().flat_map(|s| s.rows.iter())
    }

    pub fn recovery_rows(&self) -> impl Iterator<Item = &RecoveryRow> {
        self.recoveries.iter().flat_map(|s| s.rows.iter())
    }

    pub fn latency_rows(&self) -> impl Iterator<Item = &LatencyRow> {
        self.latency.iter().flat_map(|s| s.rows.iter())
    }

    pub fn row_counts(&self) -> BTreeMap<LogKind, usize> {
        fn total<T>(series: &[InstanceSeries<T>]) -> usize {
            series.iter().map(|s| s.rows.len()).sum()
        }

        BTreeMap::from([
            (LogKind::Throughput, total(&self.throughput)),
            (LogKind::Latency, total(&self.latency)),
            (LogKind::Checkpoint, total(&self.checkpoints)),
            (LogKind::Recovery, total(&self.recoveries)),
            (LogKind::Failure, self.failures.len()),
        ])
    }
}

fn rebase_all<T: Timestamped>(experiment: &str, series: &mut [InstanceSeries<T>], init: f64) {
    for s in series.iter_mut() {
        s.rows = normalize(std::mem::take(&mut s.rows), init);
        let regressions = count_regressions(&s.rows);
        if regressions > 0 {
            warn!(
                "{}: {} has {} out-of-order rows, kept as-is",
                experiment, s.file, regressions
            );
        }
    }
}

fn list_or_empty(root: &Path, experiment: &str, kind: LogKind) -> Vec<String> {
    match logs::list_log_files(root, experiment, kind) {
        Ok(files) => files,
        Err(e) if e.is_not_found() => {
            info!("{}: no {} folder, treating as zero files", experiment, kind.name());
            Vec::new()
        }
        Err(e) => {
            error!("{}: {}", experiment, e);
            Vec::new()
        }
    }
}

/// Which performance series a file holds, from its dash-separated name.
pub fn performance_kind(file_name: &str) -> Option<LogKind> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    stem.split('-').find_map(|segment| match segment {
        "throughput" => Some(LogKind::Throughput),
        "latency" => Some(LogKind::Latency),
        _ => None,
    })
}

fn kind_path(dir: &Path, kind: LogKind, file: &str) -> PathBuf {
    match kind.folder() {
        Some(folder) => dir.join(folder).join(file),
        None => dir.join(file),
    }
}

fn read_table(path: &Path, kind: LogKind) -> Option<RawTable> {
    let mut table = match logs::read_log_file(path, kind.columns()) {
        Ok(t) => t,
        Err(e) => {
            error!("skipping {}: {}", path.display(), e);
            return None;
        }
    };
    if table.is_empty() {
        info!("{} has no data rows, skipping", path.display());
        return None;
    }
    if kind == LogKind::Latency {
        let dropped = table.dedup_rows();
        if dropped > 0 {
            debug!("{}: dropped {} duplicate rows", path.display(), dropped);
        }
    }
    Some(table)
}

fn load_instance<T>(
    dir: &Path,
    file: &str,
    kind: LogKind,
    parse: fn(&RawTable) -> Result<Vec<T>, AnalysisError>,
) -> Option<InstanceSeries<T>> {
    let path = kind_path(dir, kind, file);
    let table = read_table(&path, kind)?;
    match parse(&table) {
        Ok(rows) => {
            debug!("loaded {} {} rows from {}", rows.len(), kind.name(), path.display());
            Some(InstanceSeries {
                instance: logs::instance_name(file).to_string(),
                file: file.to_string(),
                rows,
            })
        }
        Err(e) => {
            error!("skipping {}: {}", path.display(), e);
            None
        }
    }
}

fn load_failures(dir: &Path) -> Vec<FailureRow> {
    let path = dir.join(FAILURES_FILE);
    if !path.is_file() {
        info!("{} missing, no failure markers", path.display());
        return Vec::new();
    }
    let Some(table) = read_table(&path, LogKind::Failure) else {
        return Vec::new();
    };
    logs::parse_failures(&table).unwrap_or_else(|e| {
        error!("skipping {}: {}", path.display(), e);
        Vec::new()
    })
}

/// Outcome of parsing one file during `check`.
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub file: String,
    pub kind: LogKind,
    pub records: usize,
    pub error: Option<String>,
}

/// Parse every log file of an experiment without normalizing, reporting
/// per-file record counts or the first error.
pub fn check_files(root: &Path, name: &str) -> Vec<FileCheck> {
    let dir = root.join(name);
    let mut targets: Vec<(String, LogKind)> = Vec::new();

    for file in list_or_empty(root, name, LogKind::Throughput) {
        match performance_kind(&file) {
            Some(kind) => targets.push((file, kind)),
            None => warn!(
                "{}: cannot tell throughput from latency in {:?}, skipping",
                name, file
            ),
        }
    }
    for kind in [LogKind::Checkpoint, LogKind::Recovery] {
        for file in list_or_empty(root, name, kind) {
            targets.push((file, kind));
        }
    }
    if dir.join(FAILURES_FILE).is_file() {
        targets.push((FAILURES_FILE.to_string(), LogKind::Failure));
    }

    targets
        .into_iter()
        .map(|(file, kind)| {
            let path = kind_path(&dir, kind, &file);
            let parsed = logs::read_log_file(&path, kind.columns()).and_then(|mut table| {
                if kind == LogKind::Latency {
                    table.dedup_rows();
                }
                logs::parse_table(kind, &table)
            });
            match parsed {
                Ok(records) => FileCheck {
                    file,
                    kind,
                    records: records.len(),
                    error: None,
                },
                Err(e) => FileCheck {
                    file,
                    kind,
                    records: 0,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}
