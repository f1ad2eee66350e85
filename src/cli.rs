//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{BacktestConfig, CodeResult, run_batch};
use crate::domain::config_validation::{
    DateWindow, build_backtest_config, build_date_window, parse_date, parse_end_of_series,
    parse_reentry,
};
use crate::domain::error::RuletraderError;
use crate::domain::metrics::max_drawdown_pct;
use crate::domain::normalizer::parse_strategy;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "ruletrader", about = "Rule-based long-only strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a strategy over one or more instruments
    Backtest {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated instrument codes
        #[arg(long)]
        codes: Option<String>,
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// same_bar or next_bar
        #[arg(long)]
        reentry: Option<String>,
        /// mark_to_market or liquidate
        #[arg(long)]
        end_of_series: Option<String>,
        /// Report path; the report goes to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a strategy file and print its normalized form
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// Flag values that override the `[backtest]` config section.
#[derive(Debug, Default)]
pub struct BacktestOverrides {
    pub codes: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub reentry: Option<String>,
    pub end_of_series: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            strategy,
            config,
            data_dir,
            codes,
            start,
            end,
            reentry,
            end_of_series,
            output,
        } => {
            let overrides = BacktestOverrides {
                codes,
                start,
                end,
                reentry,
                end_of_series,
            };
            run_backtest(
                &strategy,
                config.as_deref(),
                data_dir.as_deref(),
                &overrides,
                output.as_deref(),
            )
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::ListSymbols { config, data_dir } => {
            run_list_symbols(config.as_deref(), data_dir.as_deref())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load the INI file at `path`, or an empty config when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, RuletraderError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `[log] level`.
pub fn init_logging(config: &dyn ConfigPort) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config
            .get_string("log", "level")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    });

    // a subscriber may already be installed when run() is called in-process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_backtest(
    strategy_path: &Path,
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    overrides: &BacktestOverrides,
    output_path: Option<&Path>,
) -> Result<(), RuletraderError> {
    let config = load_config(config_path)?;
    init_logging(&config);

    let strategy = load_strategy(strategy_path)?;
    eprintln!("Loaded strategy: {} ({} rules)", strategy.name, strategy.rules.len());

    let bt_config = resolve_backtest_config(&config, overrides)?;
    let window = resolve_window(&config, overrides)?;
    let codes = resolve_codes(overrides.codes.as_deref(), &config);
    if codes.is_empty() {
        return Err(RuletraderError::ConfigMissing {
            section: "backtest".into(),
            key: "codes".into(),
        });
    }

    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &config)?);
    let results = run_backtest_pipeline(&data_port, &strategy, &bt_config, &codes, window)?;

    print_summary(&results);

    let report = JsonReportAdapter::new();
    match output_path {
        Some(path) => {
            report.write(&results, &strategy, path)?;
            eprintln!("\nReport written to: {}", path.display());
        }
        None => print!("{}", report.render(&results, &strategy)?),
    }
    Ok(())
}

/// Fetch every code, skipping those without data, and run the batch.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    codes: &[String],
    window: DateWindow,
) -> Result<Vec<CodeResult>, RuletraderError> {
    let mut series = Vec::with_capacity(codes.len());

    for code in codes {
        match data_port.fetch_ohlcv(code, window.start, window.end) {
            Ok(bars) if bars.is_empty() => {
                warn!(code = %code, "no bars in window, skipping");
                eprintln!("warning: skipping {} (no bars in window)", code);
            }
            Ok(bars) => series.push((code.clone(), bars)),
            Err(e @ RuletraderError::NoData { .. }) => {
                warn!(code = %code, "no data file, skipping");
                eprintln!("warning: skipping {} ({})", code, e);
            }
            Err(e) => return Err(e),
        }
    }

    if series.is_empty() {
        return Err(RuletraderError::NoData {
            code: codes.join(","),
        });
    }

    info!(
        codes = series.len(),
        reentry = ?bt_config.reentry,
        end_of_series = ?bt_config.end_of_series,
        "running backtest"
    );
    eprintln!("Running backtest: {} codes", series.len());

    Ok(run_batch(strategy, &series, bt_config))
}

fn load_strategy(path: &Path) -> Result<Strategy, RuletraderError> {
    let text = fs::read_to_string(path)?;
    parse_strategy(&text)
}

pub fn resolve_backtest_config(
    config: &dyn ConfigPort,
    overrides: &BacktestOverrides,
) -> Result<BacktestConfig, RuletraderError> {
    let mut bt_config = build_backtest_config(config)?;
    if let Some(raw) = overrides.reentry.as_deref() {
        bt_config.reentry = parse_reentry(raw)?;
    }
    if let Some(raw) = overrides.end_of_series.as_deref() {
        bt_config.end_of_series = parse_end_of_series(raw)?;
    }
    Ok(bt_config)
}

pub fn resolve_window(
    config: &dyn ConfigPort,
    overrides: &BacktestOverrides,
) -> Result<DateWindow, RuletraderError> {
    let configured = build_date_window(config)?;
    let start = match overrides.start.as_deref() {
        Some(raw) => Some(parse_date(raw, "start_date")?),
        None => configured.start,
    };
    let end = match overrides.end.as_deref() {
        Some(raw) => Some(parse_date(raw, "end_date")?),
        None => configured.end,
    };
    DateWindow::new(start, end)
}

pub fn resolve_codes(code_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    match code_override {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => config.get_list("backtest", "codes"),
    }
}

pub fn resolve_data_dir(
    data_dir: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, RuletraderError> {
    if let Some(dir) = data_dir {
        return Ok(dir.to_path_buf());
    }
    config
        .get_string("data", "dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .ok_or_else(|| RuletraderError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

fn print_summary(results: &[CodeResult]) {
    eprintln!("\n=== Results ===");
    for cr in results {
        let stats = &cr.result.stats;
        eprintln!("{}:", cr.code);
        eprintln!("  Total Return:   {:.2}%", stats.total_return_pct);
        eprintln!("  Max Drawdown:   -{:.2}%", max_drawdown_pct(&cr.result.equity));
        eprintln!("  Trades:         {}", stats.trades);
        eprintln!("  Win Rate:       {:.1}%", stats.win_rate_pct);
        eprintln!("  Avg Trade:      {:.2}%", stats.avg_trade_pct);
        if let Some(open) = &cr.result.open_position {
            eprintln!(
                "  Open Position:  since {} at {:.2}, {:+.2}%",
                open.entry_date, open.entry_price, open.unrealized_pct
            );
        }
    }
}

fn run_validate(strategy_path: &Path) -> Result<(), RuletraderError> {
    init_logging(&FileConfigAdapter::from_string("")?);
    eprintln!("Validating strategy: {}", strategy_path.display());

    let strategy = load_strategy(strategy_path)?;
    for (i, rule) in strategy.rules.iter().enumerate() {
        eprintln!("  Rule {} [{}]: {}", i, rule.kind(), rule);
    }
    eprintln!(
        "Strategy '{}' is valid: {} rules, warm-up {} bars",
        strategy.name,
        strategy.rules.len(),
        strategy.warmup()
    );

    println!("{}", serde_json::to_string_pretty(&strategy)?);
    Ok(())
}

fn run_list_symbols(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<(), RuletraderError> {
    let config = load_config(config_path)?;
    init_logging(&config);

    let adapter = CsvAdapter::new(resolve_data_dir(data_dir, &config)?);
    let symbols = adapter.list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
