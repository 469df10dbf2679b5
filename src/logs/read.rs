//! Discovery and raw loading of experiment log files.

use crate::error::AnalysisError;
use crate::logs::row::LogKind;

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const FAILURES_FILE: &str = "failures.log";

/// One data row, still as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: u64,
    pub fields: Vec<String>,
}

/// Rows of one file with their positional column names.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Drop rows whose fields repeat an earlier row exactly; the first
    /// occurrence is kept. Returns how many rows were dropped.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        self.rows.retain(|row| seen.insert(row.fields.clone()));
        before - self.rows.len()
    }
}

/// Names of the directories directly under `root`, sorted.
pub fn list_experiments(root: &Path) -> Result<Vec<String>, AnalysisError> {
    let entries = fs::read_dir(root).map_err(|e| AnalysisError::from_io(root, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::from_io(root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| AnalysisError::from_io(entry.path(), e))?
            .is_dir();
        if is_dir {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// File names inside `{root}/{experiment}/{kind folder}/`, sorted.
///
/// A missing folder is reported as `NotFound`; callers treat it as "no files
/// of this kind".
pub fn list_log_files(
    root: &Path,
    experiment: &str,
    kind: LogKind,
) -> Result<Vec<String>, AnalysisError> {
    let folder = kind.folder().ok_or_else(|| {
        AnalysisError::InvalidArgument(format!(
            "{} logs have no per-instance folder",
            kind.name()
        ))
    })?;
    let dir = root.join(experiment).join(folder);
    let entries = fs::read_dir(&dir).map_err(|e| AnalysisError::from_io(&dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::from_io(&dir, e))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Read a comma (or comma-space) separated file and name its columns.
///
/// Any row whose first field is the literal `timestamp` is a repeated header
/// and is left out, wherever it appears.
pub fn read_log_file(path: &Path, columns: &[&str]) -> Result<RawTable, AnalysisError> {
    let file = File::open(path).map_err(|e| AnalysisError::from_io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AnalysisError::Parse {
            path: path.to_path_buf(),
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.get(0).map(str::trim) == Some("timestamp") {
            continue;
        }
        if record.len() != columns.len() {
            return Err(AnalysisError::Parse {
                path: path.to_path_buf(),
                line,
                message: format!(
                    "expected {} fields ({}), found {}",
                    columns.len(),
                    columns.join(", "),
                    record.len()
                ),
            });
        }

        rows.push(RawRow {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    Ok(RawTable {
        path: path.to_path_buf(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    })
}

/// Instance (role) name of a log file: everything before the first `-`.
pub fn instance_name(file_name: &str) -> &str {
    file_name.split('-').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn experiments_are_sorted_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("run-b")).unwrap();
        fs::create_dir(dir.path().join("run-a")).unwrap();
        write(dir.path(), "run-c-throughput.html", "");

        assert_eq!(
            list_experiments(dir.path()).unwrap(),
            vec!["run-a".to_string(), "run-b".to_string()]
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_experiments(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn lists_files_of_a_kind() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "exp/checkpoint/worker2-cp.log", "");
        write(dir.path(), "exp/checkpoint/worker1-cp.log", "");

        assert_eq!(
            list_log_files(dir.path(), "exp", LogKind::Checkpoint).unwrap(),
            vec!["worker1-cp.log".to_string(), "worker2-cp.log".to_string()]
        );
        assert!(
            list_log_files(dir.path(), "exp", LogKind::Recovery)
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn reads_comma_space_rows_and_drops_headers_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "tp.log",
            "timestamp, throughput\n10:00:00:000, 100\ntimestamp, throughput\n10:00:01:000,150\n",
        );

        let table = read_log_file(&path, LogKind::Throughput.columns()).unwrap();
        let fields: Vec<Vec<String>> = table.rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(
            fields,
            vec![
                vec!["10:00:00:000".to_string(), "100".to_string()],
                vec!["10:00:01:000".to_string(), "150".to_string()],
            ]
        );
        assert_eq!(table.columns, vec!["timestamp", "throughput"]);
    }

    #[test]
    fn empty_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.log", "timestamp, latency, shard\n");

        let table = read_log_file(&path, LogKind::Latency.columns()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn wrong_arity_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.log", "10:00:00:000, 1\n10:00:01:000\n");

        match read_log_file(&path, LogKind::Throughput.columns()) {
            Err(AnalysisError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "lat.log",
            "10:00:00:000, 5.0, 1\n10:00:00:000, 5.0, 1\n10:00:00:000, 5.0, 2\n",
        );

        let mut table = read_log_file(&path, LogKind::Latency.columns()).unwrap();
        assert_eq!(table.dedup_rows(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].line, 1);
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn instance_is_prefix_before_first_dash() {
        assert_eq!(instance_name("sink3-throughput.log"), "sink3");
        assert_eq!(instance_name("coordinator"), "coordinator");
    }
}
