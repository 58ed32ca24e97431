//! breakscan CLI — momentum breakout screening.
//!
//! Commands:
//! - `screen` — fetch history for a universe, rank breakout candidates, write JSON
//! - `config` — print the effective screen config as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use breakscan_core::data::{
    BatchSource, CircuitBreaker, CsvSource, SyntheticSource, Universe, YahooSource,
};
use breakscan_core::{BreakoutCandidate, ScreenConfig};
use breakscan_runner::{candidates_csv, init_logging, screen_to_file, ScreenOutcome, ScreenRun};

#[derive(Parser)]
#[command(
    name = "breakscan",
    about = "breakscan CLI — screen equities for momentum breakouts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a universe and write ranked candidates as JSON.
    Screen {
        /// Symbols to screen (e.g., AAPL MSFT BRK.B).
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        /// Universe file: TOML sector table or one symbol per line.
        #[arg(long)]
        universe_file: Option<PathBuf>,

        /// Add the current S&P 500 constituents to the universe.
        #[arg(long, default_value_t = false)]
        sp500: bool,

        /// Screen config TOML. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where bars come from.
        #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
        source: SourceKind,

        /// Directory of <TICKER>.csv files (for --source csv).
        #[arg(long, default_value = "data/csv")]
        csv_dir: PathBuf,

        /// RNG seed (for --source synthetic).
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Start date (YYYY-MM-DD). Defaults to end minus lookback_days.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), exclusive. Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// JSON report path.
        #[arg(long, default_value = "data/screener_momentum.json")]
        output: PathBuf,

        /// Also write candidates as CSV.
        #[arg(long)]
        csv_output: Option<PathBuf>,

        /// Override the config's batch size.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override the config's benchmark symbol.
        #[arg(long)]
        benchmark: Option<String>,

        /// Log level (RUST_LOG takes precedence).
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Print the effective screen config as TOML.
    Config {
        /// Config TOML to load and validate instead of the defaults.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Screen {
            tickers,
            universe_file,
            sp500,
            config,
            source,
            csv_dir,
            seed,
            start,
            end,
            output,
            csv_output,
            batch_size,
            benchmark,
            log_level,
        } => {
            init_logging(&log_level);
            let mut config = load_config(config.as_deref())?;
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            if let Some(b) = benchmark {
                config.benchmark = b;
            }
            config.validate()?;

            let universe = build_universe(tickers, universe_file.as_deref(), sp500)?;
            let (start, end) = resolve_range(&config, start.as_deref(), end.as_deref())?;
            let source = build_source(source, &csv_dir, seed)?;
            run_screen_cmd(
                source.as_ref(),
                &universe,
                &config,
                start,
                end,
                &output,
                csv_output.as_deref(),
            )
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScreenConfig> {
    match path {
        Some(p) => ScreenConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(ScreenConfig::default()),
    }
}

fn build_universe(
    tickers: Vec<String>,
    universe_file: Option<&Path>,
    sp500: bool,
) -> Result<Universe> {
    let mut symbols: Vec<String> = tickers;
    if let Some(path) = universe_file {
        let from_file = Universe::from_file(path)
            .with_context(|| format!("failed to load universe {}", path.display()))?;
        symbols.extend(from_file.tickers().iter().map(|t| t.to_string()));
    }
    if sp500 {
        let index = Universe::sp500().context("failed to fetch S&P 500 constituents")?;
        symbols.extend(index.tickers().iter().map(|t| t.to_string()));
    }

    let universe = Universe::from_symbols(symbols);
    if universe.is_empty() {
        bail!("no tickers given (use --tickers, --universe-file or --sp500)");
    }
    Ok(universe)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn resolve_range(
    config: &ScreenConfig,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = end
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let start = match start {
        Some(s) => parse_date(s)?,
        None => config.default_range(end).0,
    };
    if start >= end {
        bail!("start {start} must be before end {end}");
    }
    Ok((start, end))
}

fn build_source(kind: SourceKind, csv_dir: &Path, seed: u64) -> Result<Box<dyn BatchSource>> {
    Ok(match kind {
        SourceKind::Yahoo => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooSource::new(circuit_breaker, 8)?)
        }
        SourceKind::Csv => Box::new(CsvSource::new(csv_dir)),
        SourceKind::Synthetic => {
            eprintln!("WARNING: screening SYNTHETIC data (seed {seed})");
            Box::new(SyntheticSource::new(seed))
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn run_screen_cmd(
    source: &dyn BatchSource,
    universe: &Universe,
    config: &ScreenConfig,
    start: NaiveDate,
    end: NaiveDate,
    output: &Path,
    csv_output: Option<&Path>,
) -> Result<()> {
    let candidates = match screen_to_file(source, universe, config, start, end, output)? {
        ScreenOutcome::Completed(run) => {
            print_summary(&run, config);
            run.candidates
        }
        ScreenOutcome::Aborted(e) => {
            eprintln!("Screen aborted: {e}");
            eprintln!("Wrote empty report to {}", output.display());
            Vec::new()
        }
    };

    if let Some(path) = csv_output {
        std::fs::write(path, candidates_csv(&candidates)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(run: &ScreenRun, config: &ScreenConfig) {
    let s = &run.summary;
    println!();
    println!("=== Breakout Screen ===");
    println!("Source:         {}", s.source);
    match (s.panel_start, s.panel_end) {
        (Some(first), Some(last)) => {
            println!("Period:         {first} to {last} ({} rows)", s.panel_rows)
        }
        _ => println!("Period:         (no rows)"),
    }
    println!(
        "Tickers:        {} requested, {} fetched, {} failed",
        s.requested, s.succeeded, s.failed
    );
    println!("Evaluated:      {}", s.evaluated);
    println!("Candidates:     {}", s.candidates);
    println!("Config:         {}", &s.config_hash[..12]);
    println!();

    if run.candidates.is_empty() {
        println!("No breakout candidates.");
    } else {
        print_candidates(&run.candidates, config.proximity_threshold);
    }

    for failed in &run.failed {
        println!("WARNING: {} not fetched ({:?})", failed.ticker, failed.reason);
    }
    println!();
}

fn print_candidates(candidates: &[BreakoutCandidate], proximity_threshold: f64) {
    println!(
        "{:<8} {:>10} {:>10} {:>8} {:>8} {:>8}  ",
        "Ticker", "Price", "High", "Dist%", "VolX", "RS"
    );
    for c in candidates {
        let flag = if c.is_near_high(proximity_threshold) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<8} {:>10.2} {:>10.2} {:>8.2} {:>8.2} {:>8.2}  {flag}",
            c.ticker.as_str(),
            c.price,
            c.high_52w,
            c.dist_to_high_pct,
            c.volume_ratio,
            c.rs_score
        );
    }
    println!();
    println!(
        "* within {:.0}% of the trailing high",
        proximity_threshold * 100.0
    );
}
