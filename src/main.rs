use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use sp_benchlog::Result;
use sp_benchlog::config::AnalysisConfig;
use sp_benchlog::experiment::{Experiment, check_files};
use sp_benchlog::logs::{LogKind, list_experiments};
use sp_benchlog::model::{
    AggregateRow, aggregate_checkpoints, aggregate_latency, aggregate_recovery, summarize,
};
use sp_benchlog::render::{
    LatencyMode, PlotSession, TableFormat, checkpoint_size_chart, latency_chart, render_table,
    throughput_chart,
};
use sp_benchlog::series::TimeWindow;

#[derive(Parser)]
#[command(name = "sp-benchlog")]
#[command(about = "Stream-processing benchmark log analyzer", long_about = None)]
struct Cli {
    /// Analysis settings (JSON); defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(clap::Args)]
struct WindowArgs {
    /// Start of the plotted range, in seconds (exclusive).
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// End of the plotted range, in seconds (exclusive).
    #[arg(long, default_value_t = 9999.0)]
    to: f64,

    /// Upper bound of the value axis; the lower bound is 0.
    #[arg(long)]
    y_max: Option<f64>,
}

impl WindowArgs {
    fn time_window(&self) -> TimeWindow {
        TimeWindow::new(self.from, self.to)
    }

    fn apply_y_max(&self, mut plot: PlotSession) -> PlotSession {
        if let Some(max) = self.y_max {
            plot.set_y_range(0.0, max);
        }
        plot
    }
}

#[derive(clap::Args)]
struct TableArgs {
    /// Folder holding one subfolder per query, each with run folders.
    #[arg(long)]
    root: PathBuf,

    #[arg(long, value_enum, default_value_t = TableFormat::Text)]
    format: TableFormat,

    /// Write the table here instead of stdout.
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every log of every experiment and report row counts.
    Check {
        #[arg(long)]
        root: PathBuf,
    },
    /// Smoothed throughput per instance with failure markers.
    Throughput {
        #[arg(long)]
        root: PathBuf,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Latency samples, per shard or averaged over shards.
    Latency {
        #[arg(long)]
        root: PathBuf,

        #[arg(long, value_enum, default_value_t = LatencyMode::Raw)]
        mode: LatencyMode,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Box plot of checkpoint sizes, one box per experiment.
    CheckpointSizes {
        #[arg(long)]
        root: PathBuf,
    },
    /// Checkpoint counts, sizes and durations per protocol and interval.
    CheckpointSummary(TableArgs),
    /// Recovery restore times and rollback distances per protocol and interval.
    RecoverySummary(TableArgs),
    /// Latency distribution per protocol and interval.
    LatencySummary(TableArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AnalysisConfig::load(cli.config.as_deref())?;

    match cli.cmd {
        Commands::Check { root } => {
            for name in list_experiments(&root)? {
                let exp = match Experiment::load(&root, &name, &LogKind::ALL) {
                    Ok(exp) => exp,
                    Err(e) => {
                        error!("skipping {}: {}", name, e);
                        continue;
                    }
                };
                println!("{} (init from {:?} at {})", name, exp.init.source, exp.init.timestamp);
                for (kind, rows) in exp.row_counts() {
                    println!("  {:<10} {:>8} rows", kind.name(), rows);
                }
                for check in check_files(&root, &name) {
                    let kind = check.kind.name();
                    match &check.error {
                        None => println!("  {:<10} {:>8}  {}", kind, check.records, check.file),
                        Some(e) => println!("  {:<10} {:>8}  {}: {}", kind, "-", check.file, e),
                    }
                }
            }
        }
        Commands::Throughput { root, window } => {
            let kinds = [LogKind::Throughput, LogKind::Failure];
            for_each_experiment(&root, &kinds, "throughput", |exp| {
                let plot = throughput_chart(exp, &config.smoother, window.time_window());
                window.apply_y_max(plot)
            })?;
        }
        Commands::Latency { root, mode, window } => {
            let kinds = [LogKind::Latency, LogKind::Failure];
            for_each_experiment(&root, &kinds, "latency", |exp| {
                let plot = latency_chart(exp, &config.smoother, mode, window.time_window());
                window.apply_y_max(plot)
            })?;
        }
        Commands::CheckpointSizes { root } => {
            let kinds = [LogKind::Checkpoint];
            for_each_experiment(&root, &kinds, "checkpoint-size", checkpoint_size_chart)?;
        }
        Commands::CheckpointSummary(args) => {
            let kinds = [LogKind::Checkpoint];
            let rows = summarize(&args.root, &kinds, &config, aggregate_checkpoints)?;
            emit_table(&rows, &args)?;
        }
        Commands::RecoverySummary(args) => {
            let rows = summarize(&args.root, &[LogKind::Recovery], &config, |group| {
                aggregate_recovery(group, &config)
            })?;
            emit_table(&rows, &args)?;
        }
        Commands::LatencySummary(args) => {
            let kinds = [LogKind::Latency];
            let rows = summarize(&args.root, &kinds, &config, aggregate_latency)?;
            emit_table(&rows, &args)?;
        }
    }

    Ok(())
}

/// Build one chart per experiment under `root` and write it next to the
/// experiment folders as `{experiment}-{suffix}.html`.
fn for_each_experiment(
    root: &Path,
    kinds: &[LogKind],
    suffix: &str,
    build: impl Fn(&Experiment) -> PlotSession,
) -> Result<()> {
    let names = list_experiments(root)
        .with_context(|| format!("list experiments under {}", root.display()))?;
    for name in names {
        let exp = match Experiment::load(root, &name, kinds) {
            Ok(exp) => exp,
            Err(e) => {
                error!("skipping {}: {}", name, e);
                continue;
            }
        };

        let plot = build(&exp);
        if plot.is_empty() {
            warn!("{}: nothing to plot for {}", name, suffix);
            continue;
        }
        let path = plot.finalize(&root.join(format!("{}-{}.html", name, suffix)))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn emit_table<R: AggregateRow>(rows: &[R], args: &TableArgs) -> Result<()> {
    let text = render_table(rows, args.format)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
