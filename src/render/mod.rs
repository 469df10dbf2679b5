//! Output side: charts and summary tables.

pub mod charts;
pub mod plot;
pub mod table;

pub use charts::{LatencyMode, checkpoint_size_chart, latency_chart, throughput_chart};
pub use plot::PlotSession;
pub use table::{TableFormat, render_table};
