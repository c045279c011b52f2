//! CandleLab CLI: run and sensitivity commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML run file and export artifacts
//! - `sensitivity`: run the eight filter scenarios and compare them
//!
//! Logging goes to stderr through `tracing-subscriber`; `RUST_LOG` overrides
//! `--log-level`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use candlelab_core::domain::CloseReason;
use candlelab_runner::export::{save_artifacts, save_sensitivity};
use candlelab_runner::synthetic::SyntheticConfig;
use candlelab_runner::{
    load_data, reference_scenarios, run_file_with_limit, run_sensitivity, FilterVerdict,
    ReferenceSource, RunFile, RunReport, SensitivityReport,
};

#[derive(Parser)]
#[command(
    name = "candlelab",
    about = "CandleLab CLI: candle-by-candle strategy backtester"
)]
struct Cli {
    /// Default log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Candle source overrides shared by both commands.
#[derive(clap::Args)]
struct DataArgs {
    /// Path to a TOML run file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Candle CSV, replacing the run file's [data] section.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Seed for synthetic candles, replacing the run file's [data] section.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of synthetic candles (with --seed).
    #[arg(long)]
    candles: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest and save report.json, trades.csv, equity.csv.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Stop after this many ticks; open positions are force-closed.
        #[arg(long)]
        max_ticks: Option<usize>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only.
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// Compare the baseline filter set against each filter removed in turn.
    Sensitivity {
        #[command(flatten)]
        data: DataArgs,

        /// Output directory for sensitivity.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run {
            data,
            max_ticks,
            output_dir,
            no_export,
        } => run_cmd(&data, max_ticks, &output_dir, no_export),
        Commands::Sensitivity { data, output_dir } => sensitivity_cmd(&data, &output_dir),
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter '{level}'"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn load_run_file(args: &DataArgs) -> Result<RunFile> {
    if args.csv.is_some() && args.seed.is_some() {
        bail!("--csv and --seed are mutually exclusive");
    }
    if args.candles.is_some() && args.seed.is_none() {
        bail!("--candles requires --seed");
    }

    let mut file = match &args.config {
        Some(path) => RunFile::from_file(path)
            .with_context(|| format!("failed to load run file {}", path.display()))?,
        None => RunFile::default(),
    };

    if let Some(csv) = &args.csv {
        file.data.path = Some(csv.clone());
        file.data.synthetic = None;
    }
    if let Some(seed) = args.seed {
        let mut syn = file.data.synthetic.take().unwrap_or_default();
        syn.seed = seed;
        if let Some(n) = args.candles {
            syn.candles = n;
        }
        file.data.path = None;
        file.data.synthetic = Some(syn);
    }
    if file.data.path.is_none() && file.data.synthetic.is_none() {
        warn!(
            seed = SyntheticConfig::default().seed,
            "no candle source given; using synthetic candles"
        );
    }
    Ok(file)
}

fn run_cmd(
    args: &DataArgs,
    max_ticks: Option<usize>,
    output_dir: &Path,
    no_export: bool,
) -> Result<()> {
    let file = load_run_file(args)?;
    let report = run_file_with_limit(&file, max_ticks)?;

    print_summary(&report);

    if !no_export {
        let run_dir = save_artifacts(&report, output_dir)?;
        info!(dir = %run_dir.display(), "artifacts saved");
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sensitivity_cmd(args: &DataArgs, output_dir: &Path) -> Result<()> {
    let file = load_run_file(args)?;
    let config = file.to_sim_config()?;
    let loaded = load_data(&file.data_spec()?)?;
    let source = ReferenceSource::new(file.signal.clone());
    let scenarios = reference_scenarios(&config.filters);

    let report = run_sensitivity(&loaded.candles, &source, &config, &scenarios)?;
    print_sensitivity(&report);

    let path = save_sensitivity(&report, output_dir)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn print_summary(report: &RunReport) {
    let s = &report.stats;
    let d = &report.diagnostics;
    println!();
    println!("=== Backtest Result ===");
    println!("Fingerprint:    {}", report.short_id());
    println!(
        "Candles:        {} ({} warmup)",
        report.candle_count, report.config.warmup_candles
    );
    println!("Ticks:          {}", d.ticks);
    println!(
        "Signals:        {} directional, {} opened, {} blocked",
        d.directional_signals, d.entries_opened, d.entries_blocked
    );
    println!("Trades:         {}", s.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", s.initial_balance);
    println!("Final:          {:.2}", s.final_balance);
    println!("Total Return:   {:.2}%", s.total_return);
    println!("Win Rate:       {:.1}%", s.win_rate);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Avg Win/Loss:   {:.4} / {:.4}", s.avg_win, s.avg_loss);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown);
    println!("Sharpe:         {:.3}", s.sharpe_ratio);
    println!("Max Consec Win: {}", s.max_consecutive_wins);
    println!("Max Consec Loss:{}", s.max_consecutive_losses);
    println!("Exposure:       {:.1}%", s.exposure * 100.0);
    println!();
    println!("--- Closures ---");
    for reason in CloseReason::ALL {
        println!("{:<15} {}", reason.as_str(), s.closures(reason));
    }
    if report.truncated {
        println!();
        println!("NOTE: run stopped early by --max-ticks");
    }
    for warn in &report.data_quality_warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn print_sensitivity(report: &SensitivityReport) {
    println!();
    println!("=== Filter Sensitivity ===");
    println!(
        "{:<4} {:<24} {:>9} {:>7} {:>9} {:>7}",
        "#", "scenario", "return", "trades", "win rate", "PF"
    );
    for (rank, r) in report.ranked().iter().enumerate() {
        let marker = if r.name == report.baseline { "→" } else { " " };
        println!(
            "{:<4} {}{:<23} {:>8.2}% {:>7} {:>8.1}% {:>7.2}",
            rank + 1,
            marker,
            r.name,
            r.stats.total_return,
            r.stats.total_trades,
            r.stats.win_rate,
            r.stats.profit_factor,
        );
    }

    println!();
    println!("--- Impact vs {} ---", report.baseline);
    for r in report.results.iter().filter(|r| r.verdict.is_some()) {
        let verdict = match r.verdict {
            Some(FilterVerdict::Limiting) => "filter is limiting returns",
            Some(FilterVerdict::Useful) => "filter is protecting returns",
            _ => "no material effect",
        };
        println!(
            "{:<24} return {:+.2} pts, trades {:+}, win rate {:+.1} pts: {}",
            r.name, r.delta.total_return, r.delta.trades, r.delta.win_rate, verdict
        );
    }
    println!();
}
