//! Reading and typing of benchmark log files.

pub mod parse;
pub mod read;
pub mod row;

pub use parse::{
    parse_checkpoint, parse_failures, parse_latency, parse_recovery, parse_table,
    parse_throughput,
};
pub use read::{
    FAILURES_FILE, RawRow, RawTable, instance_name, list_experiments, list_log_files,
    read_log_file,
};
pub use row::{
    CheckpointRow, FailureRow, LatencyRow, LogKind, Record, RecoveryRow, ThroughputRow,
    Timestamped,
};
