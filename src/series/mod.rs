//! Time alignment and smoothing of parsed series.

pub mod normalize;
pub mod smooth;

pub use normalize::{TimeWindow, count_regressions, normalize};
pub use smooth::{SavitzkyGolay, clamp_non_negative, smooth};
