//! Aggregation: grouping and cross-run statistics.

pub mod group;
pub mod stats;
pub mod summary;

pub use summary::{
    AggregateRow, aggregate_checkpoints, aggregate_latency, aggregate_recovery, summarize,
};
