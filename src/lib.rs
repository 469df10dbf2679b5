//! Offline analysis of stream-processing benchmark logs: reading per-worker
//! CSV logs, aligning them on the experiment clock, smoothing, and
//! summarising across runs.

pub mod config;
pub mod error;
pub mod experiment;
pub mod logs;
pub mod model;
pub mod render;
pub mod series;
pub mod time;

pub type Result<T> = anyhow::Result<T>;
