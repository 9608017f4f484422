//! BreadthLab CLI: market breadth from daily closes.
//!
//! Commands:
//! - `download`: fetch closes for a symbol list and save `data/{universe}/close.csv`
//! - `breadth`: compute % above fast/slow DMA from a close matrix and write reports
//! - `run`: both, in one process
//!
//! Exit status is 1 on error and 2 when the breadth table came out empty.

use anyhow::{bail, Result};
use breadthlab_core::data::{LookbackPeriod, YahooProvider};
use breadthlab_runner::{
    run_all, run_breadth, run_download, BreadthConfig, BreadthOutcome, DownloadSummary,
    ReportOptions,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const NO_RESULT: u8 = 2;

#[derive(Parser)]
#[command(name = "breadthlab", about = "BreadthLab CLI: % of stocks above their moving averages")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily closes for every symbol in a CSV list.
    Download {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Compute breadth from a saved close matrix.
    Breadth {
        #[command(flatten)]
        common: CommonArgs,

        /// Close matrix CSV. Defaults to data/{universe}/close.csv.
        #[arg(long)]
        close_csv: Option<PathBuf>,

        #[command(flatten)]
        breadth: BreadthArgs,
    },
    /// Download, then compute breadth.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        download: DownloadArgs,

        #[command(flatten)]
        breadth: BreadthArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Universe name used in output paths (e.g. nifty500).
    #[arg(long)]
    universe: Option<String>,

    /// TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    /// CSV with a `Symbol` column.
    #[arg(long)]
    symbols_csv: PathBuf,

    /// Lookback period (5d, 6mo, 1y, 2y, ytd, max).
    #[arg(long)]
    period: Option<LookbackPeriod>,

    /// Symbols per request.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Seconds to wait between batches.
    #[arg(long)]
    pause: Option<f64>,

    /// Retries per batch after the first attempt.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Use split/dividend adjusted closes.
    #[arg(long, default_value_t = false)]
    auto_adjust: bool,
}

#[derive(Args)]
struct BreadthArgs {
    /// Fast moving-average window.
    #[arg(long)]
    fast: Option<usize>,

    /// Slow moving-average window.
    #[arg(long)]
    slow: Option<usize>,

    /// Minimum fraction of non-missing closes to keep a symbol.
    #[arg(long)]
    min_coverage: Option<f64>,

    /// Also write the breadth table as Parquet.
    #[arg(long, default_value_t = false)]
    parquet: bool,

    /// Skip the SVG chart.
    #[arg(long, default_value_t = false)]
    no_chart: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Download { common, download } => {
            let mut config = load_config(&common)?;
            download.apply(&mut config);
            run_download_cmd(&config, &download)
        }
        Commands::Breadth {
            common,
            close_csv,
            breadth,
        } => {
            let mut config = load_config(&common)?;
            breadth.apply(&mut config);
            let close_csv = close_csv.unwrap_or_else(|| config.close_csv_path());
            let outcome = run_breadth(&config, &close_csv, report_options(&config))?;
            Ok(print_outcome(&outcome))
        }
        Commands::Run {
            common,
            download,
            breadth,
        } => {
            let mut config = load_config(&common)?;
            download.apply(&mut config);
            breadth.apply(&mut config);
            let provider = YahooProvider::new()?;
            let (summary, outcome) = run_all(
                &config,
                &provider,
                &download.symbols_csv,
                report_options(&config),
            )?;
            print_download(&summary);
            Ok(print_outcome(&outcome))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,breadthlab=debug"
    } else {
        "warn,breadthlab=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(common: &CommonArgs) -> Result<BreadthConfig> {
    let mut config = match &common.config {
        Some(path) => BreadthConfig::from_file(path)?,
        None => BreadthConfig::default(),
    };
    if let Some(universe) = &common.universe {
        config.universe = universe.clone();
    }
    if config.universe.trim().is_empty() {
        bail!("--universe is required (or set `universe` in the config file)");
    }
    config.validate()?;
    Ok(config)
}

impl DownloadArgs {
    fn apply(&self, config: &mut BreadthConfig) {
        let dl = &mut config.download;
        if let Some(period) = self.period {
            dl.period = period;
        }
        if let Some(size) = self.chunk_size {
            dl.batch_size = size;
        }
        if let Some(pause) = self.pause {
            dl.pause_secs = pause;
        }
        if let Some(retries) = self.max_retries {
            dl.max_retries = retries;
        }
        if self.auto_adjust {
            dl.adjusted = true;
        }
    }
}

impl BreadthArgs {
    fn apply(&self, config: &mut BreadthConfig) {
        let br = &mut config.breadth;
        if let Some(fast) = self.fast {
            br.fast = fast;
        }
        if let Some(slow) = self.slow {
            br.slow = slow;
        }
        if let Some(min) = self.min_coverage {
            br.min_coverage = min;
        }
        if self.parquet {
            config.output.parquet = true;
        }
        if self.no_chart {
            config.output.chart = false;
        }
    }
}

fn report_options(config: &BreadthConfig) -> ReportOptions {
    ReportOptions {
        parquet: config.output.parquet,
        chart: config.output.chart,
    }
}

fn run_download_cmd(config: &BreadthConfig, args: &DownloadArgs) -> Result<ExitCode> {
    let provider = YahooProvider::new()?;
    let summary = run_download(config, &provider, &args.symbols_csv)?;
    print_download(&summary);
    Ok(ExitCode::SUCCESS)
}

fn print_download(summary: &DownloadSummary) {
    println!("Saved: {}", summary.path.display());
    println!(
        "  {} rows x {} symbols ({} requested)",
        summary.rows, summary.cols, summary.requested
    );
    if summary.failed_batches > 0 {
        println!(
            "  {} of {} batches skipped after retries",
            summary.failed_batches, summary.batches
        );
    }
}

fn print_outcome(outcome: &BreadthOutcome) -> ExitCode {
    match outcome {
        BreadthOutcome::Written {
            table,
            coverage,
            paths,
            ..
        } => {
            for path in paths.all() {
                println!("Saved: {}", path.display());
            }
            println!(
                "  {} rows, {} symbols kept, {} dropped below {:.0}% coverage",
                table.len(),
                coverage.kept().count(),
                coverage.dropped().count(),
                coverage.threshold * 100.0
            );
            if let (Some(first), Some(last)) = (table.first_date(), table.last_date()) {
                println!("  {first} .. {last}");
            }
            ExitCode::SUCCESS
        }
        BreadthOutcome::NoResult { reason, .. } => {
            eprintln!("no result: {reason}");
            ExitCode::from(NO_RESULT)
        }
    }
}
