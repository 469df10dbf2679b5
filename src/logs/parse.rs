use crate::error::AnalysisError;
use crate::logs::read::{RawRow, RawTable};
use crate::logs::row::{
    CheckpointRow, FailureRow, LatencyRow, LogKind, Record, RecoveryRow, ThroughputRow,
};
use crate::time::parse_time_to_epoch_millis;

/// Typed access to one raw row, reporting failures with file and line.
struct Cells<'a> {
    table: &'a RawTable,
    row: &'a RawRow,
}

impl<'a> Cells<'a> {
    fn format_error(&self, message: String) -> AnalysisError {
        AnalysisError::Format {
            path: self.table.path.clone(),
            line: self.row.line,
            message,
        }
    }

    fn raw(&self, idx: usize) -> &'a str {
        self.row.fields[idx].trim()
    }

    fn timestamp(&self) -> Result<f64, AnalysisError> {
        parse_time_to_epoch_millis(self.raw(0)).map_err(|e| self.format_error(e.to_string()))
    }

    fn int(&self, idx: usize) -> Result<i64, AnalysisError> {
        self.raw(idx).parse::<i64>().map_err(|e| {
            self.format_error(format!(
                "column {} expects an integer, got {:?}: {}",
                self.table.columns[idx],
                self.raw(idx),
                e
            ))
        })
    }

    fn float(&self, idx: usize) -> Result<f64, AnalysisError> {
        self.raw(idx).parse::<f64>().map_err(|e| {
            self.format_error(format!(
                "column {} expects a number, got {:?}: {}",
                self.table.columns[idx],
                self.raw(idx),
                e
            ))
        })
    }

    /// Only the exact string `True` is true.
    fn flag(&self, idx: usize) -> bool {
        self.raw(idx) == "True"
    }
}

fn rows_of<'a, T>(
    table: &'a RawTable,
    kind: LogKind,
    mut convert: impl FnMut(&Cells<'a>) -> Result<T, AnalysisError>,
) -> Result<Vec<T>, AnalysisError> {
    if table.columns.len() != kind.columns().len() {
        return Err(AnalysisError::InvalidArgument(format!(
            "{} has columns [{}], not the {} layout [{}]",
            table.path.display(),
            table.columns.join(", "),
            kind.name(),
            kind.columns().join(", ")
        )));
    }
    table
        .rows
        .iter()
        .map(|row| {
            if row.fields.len() != kind.columns().len() {
                return Err(AnalysisError::Parse {
                    path: table.path.clone(),
                    line: row.line,
                    message: format!(
                        "expected {} fields, found {}",
                        kind.columns().len(),
                        row.fields.len()
                    ),
                });
            }
            convert(&Cells { table, row })
        })
        .collect()
}

pub fn parse_throughput(table: &RawTable) -> Result<Vec<ThroughputRow>, AnalysisError> {
    rows_of(table, LogKind::Throughput, |c| {
        Ok(ThroughputRow {
            timestamp: c.timestamp()?,
            throughput: c.int(1)?,
        })
    })
}

/// Callers dedup latency tables (`RawTable::dedup_rows`) before parsing.
pub fn parse_latency(table: &RawTable) -> Result<Vec<LatencyRow>, AnalysisError> {
    rows_of(table, LogKind::Latency, |c| {
        Ok(LatencyRow {
            timestamp: c.timestamp()?,
            latency: c.float(1)?,
            shard: c.int(2)?,
        })
    })
}

pub fn parse_checkpoint(table: &RawTable) -> Result<Vec<CheckpointRow>, AnalysisError> {
    rows_of(table, LogKind::Checkpoint, |c| {
        Ok(CheckpointRow {
            timestamp: c.timestamp()?,
            forced: c.flag(1),
            taken_ms: c.float(2)?,
            bytes: c.int(3)?,
        })
    })
}

pub fn parse_recovery(table: &RawTable) -> Result<Vec<RecoveryRow>, AnalysisError> {
    rows_of(table, LogKind::Recovery, |c| {
        Ok(RecoveryRow {
            timestamp: c.timestamp()?,
            restored_ms: c.float(1)?,
            rollback_ms: c.float(2)?,
        })
    })
}

pub fn parse_failures(table: &RawTable) -> Result<Vec<FailureRow>, AnalysisError> {
    rows_of(table, LogKind::Failure, |c| {
        Ok(FailureRow {
            timestamp: c.timestamp()?,
        })
    })
}

/// Parse a table of any kind into tagged records.
pub fn parse_table(kind: LogKind, table: &RawTable) -> Result<Vec<Record>, AnalysisError> {
    let records = match kind {
        LogKind::Throughput => parse_throughput(table)?
            .into_iter()
            .map(Record::Throughput)
            .collect(),
        LogKind::Latency => parse_latency(table)?
            .into_iter()
            .map(Record::Latency)
            .collect(),
        LogKind::Checkpoint => parse_checkpoint(table)?
            .into_iter()
            .map(Record::Checkpoint)
            .collect(),
        LogKind::Recovery => parse_recovery(table)?
            .into_iter()
            .map(Record::Recovery)
            .collect(),
        LogKind::Failure => parse_failures(table)?
            .into_iter()
            .map(Record::Failure)
            .collect(),
    };
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn table(kind: LogKind, rows: &[&[&str]]) -> RawTable {
        RawTable {
            path: PathBuf::from("test.log"),
            columns: kind.columns().iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, fields)| RawRow {
                    line: i as u64 + 1,
                    fields: fields.iter().map(|f| f.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn throughput_rows() {
        let t = table(
            LogKind::Throughput,
            &[&["10:00:00:000", "100"], &["10:00:01:000", "150"]],
        );
        assert_eq!(
            parse_throughput(&t).unwrap(),
            vec![
                ThroughputRow {
                    timestamp: 36_000_000.0,
                    throughput: 100
                },
                ThroughputRow {
                    timestamp: 36_001_000.0,
                    throughput: 150
                },
            ]
        );
    }

    #[test]
    fn forced_flag_is_case_sensitive_true() {
        let t = table(
            LogKind::Checkpoint,
            &[
                &["00:00:01:000", "True", "1.5", "2000"],
                &["00:00:02:000", "False", "2.5", "3000"],
                &["00:00:03:000", "maybe", "3.5", "4000"],
            ],
        );
        let forced: Vec<bool> = parse_checkpoint(&t).unwrap().iter().map(|r| r.forced).collect();
        assert_eq!(forced, vec![true, false, false]);
    }

    #[test]
    fn non_numeric_field_names_file_and_line() {
        let t = table(
            LogKind::Latency,
            &[&["00:00:01:000", "1.0", "0"], &["00:00:02:000", "fast", "0"]],
        );
        match parse_latency(&t) {
            Err(AnalysisError::Format { path, line, message }) => {
                assert_eq!(path, PathBuf::from("test.log"));
                assert_eq!(line, 2);
                assert!(message.contains("latency"), "{}", message);
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_timestamp_is_format_error() {
        let t = table(LogKind::Failure, &[&["10:00:00"]]);
        assert!(matches!(
            parse_failures(&t),
            Err(AnalysisError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn recovery_rows() {
        let t = table(LogKind::Recovery, &[&["00:00:10:000", "12.5", "4000"]]);
        assert_eq!(
            parse_recovery(&t).unwrap(),
            vec![RecoveryRow {
                timestamp: 10_000.0,
                restored_ms: 12.5,
                rollback_ms: 4000.0
            }]
        );
    }

    #[test]
    fn dispatch_tags_records_with_their_kind() {
        let t = table(LogKind::Latency, &[&["00:00:01:000", "3.0", "7"]]);
        let records = parse_table(LogKind::Latency, &t).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), LogKind::Latency);
    }

    #[test]
    fn short_row_is_a_parse_error() {
        let t = table(
            LogKind::Checkpoint,
            &[
                &["00:00:01:000", "True", "1.5", "2000"][..],
                &["00:00:02:000", "False"][..],
            ],
        );
        match parse_checkpoint(&t) {
            Err(AnalysisError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn layout_mismatch_is_rejected() {
        let t = table(LogKind::Throughput, &[&["00:00:01:000", "3"]]);
        assert!(matches!(
            parse_table(LogKind::Checkpoint, &t),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }
}
