//! Chart builders turning a loaded experiment into a plot session.

use crate::experiment::Experiment;
use crate::model::group::{group_by_shard, mean_per_timestamp};
use crate::render::plot::{PlotSession, Style};
use crate::series::{SavitzkyGolay, TimeWindow, clamp_non_negative};

use clap::ValueEnum;

const TIME_AXIS: &str = "Experiment Time (s)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LatencyMode {
    /// Every sample of every instance.
    Raw,
    /// One smoothed series per shard.
    PerShard,
    /// Shards averaged per timestamp, then smoothed.
    MeanPerTime,
}

/// Failure markers inside `window`; an explicit window also pins the x axis.
fn add_failures(plot: &mut PlotSession, exp: &Experiment, window: TimeWindow) {
    if window != TimeWindow::default() {
        plot.set_x_range(window.from_secs, window.to_secs);
    }
    for failure in &exp.failures {
        if window.contains(failure.timestamp) {
            plot.add_failure_marker(failure.timestamp);
        }
    }
}

/// Smooth, then clamp the overshoot below zero.
fn smoothed(smoother: &SavitzkyGolay, ys: &[f64]) -> Vec<f64> {
    let mut out = smoother.apply(ys);
    clamp_non_negative(&mut out);
    out
}

fn to_points(xs_ms: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    xs_ms.iter().zip(ys).map(|(x, y)| (x / 1000.0, *y)).collect()
}

/// Throughput per instance: smoothed and clamped over the full run, then cut
/// to `window`.
pub fn throughput_chart(
    exp: &Experiment,
    smoother: &SavitzkyGolay,
    window: TimeWindow,
) -> PlotSession {
    let mut plot = PlotSession::new(
        format!("{} throughput", exp.name),
        TIME_AXIS,
        "Throughput (e/s)",
    );

    for series in &exp.throughput {
        let xs: Vec<f64> = series.rows.iter().map(|r| r.timestamp).collect();
        let raw: Vec<f64> = series.rows.iter().map(|r| r.throughput as f64).collect();
        let (xs, ys): (Vec<f64>, Vec<f64>) = xs
            .into_iter()
            .zip(smoothed(smoother, &raw))
            .filter(|(x, _)| window.contains(*x))
            .unzip();
        plot.add_series(series.instance.clone(), Style::Line, to_points(&xs, &ys));
    }

    add_failures(&mut plot, exp, window);
    plot
}

/// Latency per instance, cut to `window` before any smoothing.
pub fn latency_chart(
    exp: &Experiment,
    smoother: &SavitzkyGolay,
    mode: LatencyMode,
    window: TimeWindow,
) -> PlotSession {
    let mut plot = PlotSession::new(format!("{} latency", exp.name), TIME_AXIS, "Latency (ms)");
    let prefix_shards = exp.latency.len() > 1;

    for series in &exp.latency {
        let mut rows = series.rows.clone();
        window.retain(&mut rows);

        match mode {
            LatencyMode::Raw => {
                let points = rows.iter().map(|r| (r.timestamp / 1000.0, r.latency)).collect();
                plot.add_series(series.instance.clone(), Style::Points, points);
            }
            LatencyMode::PerShard => {
                for (shard, shard_rows) in group_by_shard(&rows) {
                    let xs: Vec<f64> = shard_rows.iter().map(|r| r.timestamp).collect();
                    let ys: Vec<f64> = shard_rows.iter().map(|r| r.latency).collect();
                    let label = if prefix_shards {
                        format!("{}/shard-{}", series.instance, shard)
                    } else {
                        format!("shard-{}", shard)
                    };
                    plot.add_series(label, Style::Points, to_points(&xs, &smoothed(smoother, &ys)));
                }
            }
            LatencyMode::MeanPerTime => {
                let means = mean_per_timestamp(&rows, |r| r.timestamp, |r| r.latency);
                let (xs, ys): (Vec<f64>, Vec<f64>) = means.into_iter().unzip();
                plot.add_series(
                    series.instance.clone(),
                    Style::Points,
                    to_points(&xs, &smoothed(smoother, &ys)),
                );
            }
        }
    }

    add_failures(&mut plot, exp, window);
    plot
}

/// Checkpoint sizes in KB of every instance, pooled into one box.
pub fn checkpoint_size_chart(exp: &Experiment) -> PlotSession {
    let mut plot = PlotSession::new(
        format!("{} checkpoint size", exp.name),
        "Experiment",
        "Checkpoint size (KB)",
    );
    let sizes: Vec<f64> = exp.checkpoint_rows().map(|r| r.bytes as f64 / 1000.0).collect();
    plot.add_box(exp.name.clone(), &sizes);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{InitPoint, InitSource, InstanceSeries};
    use crate::logs::{CheckpointRow, FailureRow, LatencyRow, ThroughputRow};
    use pretty_assertions::assert_eq;

    fn lat(timestamp: f64, latency: f64, shard: i64) -> LatencyRow {
        LatencyRow {
            timestamp,
            latency,
            shard,
        }
    }

    fn experiment() -> Experiment {
        Experiment {
            name: "run".to_string(),
            init: InitPoint {
                timestamp: 0.0,
                source: InitSource::Marker,
            },
            throughput: vec![InstanceSeries {
                instance: "sink1".to_string(),
                file: "sink1-throughput.log".to_string(),
                rows: (0..10)
                    .map(|i| ThroughputRow {
                        timestamp: i as f64 * 1000.0,
                        throughput: 100,
                    })
                    .collect(),
            }],
            latency: vec![InstanceSeries {
                instance: "sink1".to_string(),
                file: "sink1-latency.log".to_string(),
                rows: vec![
                    lat(1000.0, 2.0, 0),
                    lat(1000.0, 4.0, 1),
                    lat(2000.0, 6.0, 0),
                    lat(9000.0, 8.0, 1),
                ],
            }],
            checkpoints: ["w1", "w2"]
                .iter()
                .zip([3000, 5000])
                .map(|(instance, bytes)| InstanceSeries {
                    instance: instance.to_string(),
                    file: format!("{}-cp.log", instance),
                    rows: vec![CheckpointRow {
                        timestamp: 1.0,
                        forced: false,
                        taken_ms: 1.0,
                        bytes,
                    }],
                })
                .collect(),
            recoveries: Vec::new(),
            recovery_files: 0,
            failures: vec![
                FailureRow { timestamp: 4000.0 },
                FailureRow { timestamp: 20_000.0 },
            ],
        }
    }

    fn smoother() -> SavitzkyGolay {
        SavitzkyGolay::new(3, 1).unwrap()
    }

    #[test]
    fn throughput_is_windowed_after_smoothing() {
        let plot = throughput_chart(&experiment(), &smoother(), TimeWindow::new(2.0, 5.0));
        assert_eq!(plot.series.len(), 1);
        let xs: Vec<f64> = plot.series[0].points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![3.0, 4.0]);
        assert!(plot.series[0].points.iter().all(|p| (p.1 - 100.0).abs() < 1e-9));
        assert_eq!(plot.markers.len(), 1);
        assert_eq!(plot.markers[0].x, 4.0);
        assert_eq!(plot.x_range, Some((2.0, 5.0)));
    }

    #[test]
    fn latency_per_shard_series() {
        let plot = latency_chart(
            &experiment(),
            &smoother(),
            LatencyMode::PerShard,
            TimeWindow::default(),
        );
        let labels: Vec<&str> = plot.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["shard-0", "shard-1"]);
    }

    #[test]
    fn smoothed_latency_never_goes_negative() {
        let mut exp = experiment();
        exp.latency[0].rows = [0.0, 0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 0.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, v)| lat((i as f64 + 1.0) * 1000.0, *v, 0))
            .collect();
        let sg = SavitzkyGolay::new(5, 2).unwrap();

        for mode in [LatencyMode::PerShard, LatencyMode::MeanPerTime] {
            let plot = latency_chart(&exp, &sg, mode, TimeWindow::default());
            assert_eq!(plot.series.len(), 1);
            let ys: Vec<f64> = plot.series[0].points.iter().map(|p| p.1).collect();
            assert_eq!(ys.len(), 9);
            assert!(ys.iter().all(|y| *y >= 0.0), "{:?} {:?}", mode, ys);
            assert!(ys[4] > 0.0);
        }
    }

    #[test]
    fn latency_mean_per_time_collapses_shards() {
        let plot = latency_chart(
            &experiment(),
            &smoother(),
            LatencyMode::MeanPerTime,
            TimeWindow::new(0.0, 5.0),
        );
        assert_eq!(plot.series.len(), 1);
        let xs: Vec<f64> = plot.series[0].points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn checkpoint_sizes_pool_into_one_box() {
        let plot = checkpoint_size_chart(&experiment());
        assert_eq!(plot.boxes.len(), 1);
        assert_eq!(plot.boxes[0].label, "run");
        assert_eq!(plot.boxes[0].stats.median, 4.0);
    }
}
