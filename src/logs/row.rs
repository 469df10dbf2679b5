use serde::Serialize;

/// The kinds of log a benchmark run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Throughput,
    Latency,
    Checkpoint,
    Recovery,
    Failure,
}

impl LogKind {
    pub const ALL: [LogKind; 5] = [
        LogKind::Throughput,
        LogKind::Latency,
        LogKind::Checkpoint,
        LogKind::Recovery,
        LogKind::Failure,
    ];

    /// Positional column names, timestamp first.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            LogKind::Throughput => &["timestamp", "throughput"],
            LogKind::Latency => &["timestamp", "latency", "shard"],
            LogKind::Checkpoint => &["timestamp", "forced", "taken_ms", "bytes"],
            LogKind::Recovery => &["timestamp", "restored_ms", "rollback_ms"],
            LogKind::Failure => &["timestamp"],
        }
    }

    /// Per-instance subfolder of an experiment. Failures live in a single
    /// top-level file instead.
    pub fn folder(self) -> Option<&'static str> {
        match self {
            LogKind::Throughput | LogKind::Latency => Some("performance"),
            LogKind::Checkpoint => Some("checkpoint"),
            LogKind::Recovery => Some("recovery"),
            LogKind::Failure => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogKind::Throughput => "throughput",
            LogKind::Latency => "latency",
            LogKind::Checkpoint => "checkpoint",
            LogKind::Recovery => "recovery",
            LogKind::Failure => "failure",
        }
    }
}

/// Rows carrying a timestamp that the normalizer can rebase.
pub trait Timestamped {
    fn timestamp(&self) -> f64;
    fn set_timestamp(&mut self, ts: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputRow {
    pub timestamp: f64,
    pub throughput: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyRow {
    pub timestamp: f64,
    pub latency: f64,
    pub shard: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointRow {
    pub timestamp: f64,
    pub forced: bool,
    pub taken_ms: f64,
    pub bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryRow {
    pub timestamp: f64,
    pub restored_ms: f64,
    pub rollback_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRow {
    pub timestamp: f64,
}

macro_rules! impl_timestamped {
    ($($ty:ty),*) => {
        $(
            impl Timestamped for $ty {
                fn timestamp(&self) -> f64 {
                    self.timestamp
                }

                fn set_timestamp(&mut self, ts: f64) {
                    self.timestamp = ts;
                }
            }
        )*
    };
}

impl_timestamped!(ThroughputRow, LatencyRow, CheckpointRow, RecoveryRow, FailureRow);

/// A parsed row of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Throughput(ThroughputRow),
    Latency(LatencyRow),
    Checkpoint(CheckpointRow),
    Recovery(RecoveryRow),
    Failure(FailureRow),
}

impl Record {
    pub fn kind(&self) -> LogKind {
        match self {
            Record::Throughput(_) => LogKind::Throughput,
            Record::Latency(_) => LogKind::Latency,
            Record::Checkpoint(_) => LogKind::Checkpoint,
            Record::Recovery(_) => LogKind::Recovery,
            Record::Failure(_) => LogKind::Failure,
        }
    }
}

impl Timestamped for Record {
    fn timestamp(&self) -> f64 {
        match self {
            Record::Throughput(r) => r.timestamp,
            Record::Latency(r) => r.timestamp,
            Record::Checkpoint(r) => r.timestamp,
            Record::Recovery(r) => r.timestamp,
            Record::Failure(r) => r.timestamp,
        }
    }

    fn set_timestamp(&mut self, ts: f64) {
        match self {
            Record::Throughput(r) => r.set_timestamp(ts),
            Record::Latency(r) => r.set_timestamp(ts),
            Record::Checkpoint(r) => r.set_timestamp(ts),
            Record::Recovery(r) => r.set_timestamp(ts),
            Record::Failure(r) => r.set_timestamp(ts),
        }
    }
}
