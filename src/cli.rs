//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{write_flat_rulebook, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{simulate_with_trace, SimulationConfig, SimulationResult};
use crate::domain::candle::validate_candles;
use crate::domain::config_validation::{
    build_simulation_config, validate_data_config, validate_simulation_config, DATA, REPORT,
};
use crate::domain::error::{ConfigurationError, RuletraderError};
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::Portfolio;
use crate::domain::rulebook::{feature_width, rule_length, rulebook_length, slot_count, Rulebook};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ruletrader", about = "Linear-bound rulebook backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a rulebook over a price series
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        candles: Option<PathBuf>,
        #[arg(long)]
        rulebook: Option<PathBuf>,
        #[arg(short, long)]
        trace: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration and input shapes without simulating
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        candles: Option<PathBuf>,
        #[arg(long)]
        rulebook: Option<PathBuf>,
    },
    /// Print the rulebook layout for a window size
    Shape {
        #[arg(short, long)]
        window: usize,
        #[arg(short, long, default_value_t = 1)]
        rule_count: usize,
    },
    /// Write a rulebook with every coefficient set to one value
    Template {
        #[arg(short, long)]
        window: usize,
        #[arg(short, long)]
        rule_count: usize,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        coefficient: f64,
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        weight: f64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            candles,
            rulebook,
            trace,
            dry_run,
        } => {
            let inputs = InputPaths { candles, rulebook };
            if dry_run {
                run_validate(&config, &inputs)
            } else {
                run_simulate(&config, &inputs, trace.as_ref())
            }
        }
        Command::Validate {
            config,
            candles,
            rulebook,
        } => run_validate(&config, &InputPaths { candles, rulebook }),
        Command::Shape { window, rule_count } => run_shape(window, rule_count),
        Command::Template {
            window,
            rule_count,
            output,
            coefficient,
            weight,
        } => run_template(window, rule_count, &output, coefficient, weight),
    }
}

/// CLI overrides for the `[data]` paths.
#[derive(Debug, Default, Clone)]
pub struct InputPaths {
    pub candles: Option<PathBuf>,
    pub rulebook: Option<PathBuf>,
}

/// Resolve a data path: CLI override first, then `[data] key`. Relative
/// config paths are taken from the config file's directory.
pub fn resolve_path(
    key: &str,
    override_path: Option<&PathBuf>,
    config: &dyn ConfigPort,
    config_path: &Path,
) -> Result<PathBuf, RuletraderError> {
    if let Some(p) = override_path {
        return Ok(p.clone());
    }
    let raw = config
        .get_string(DATA, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| RuletraderError::ConfigMissing {
            section: DATA.to_string(),
            key: key.to_string(),
        })?;
    Ok(relative_to_config(PathBuf::from(raw.trim()), config_path))
}

fn relative_to_config(path: PathBuf, config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

/// Config, typed parameters and data adapter for one run.
pub struct Prepared {
    pub config: FileConfigAdapter,
    pub sim: SimulationConfig,
    pub portfolio: Portfolio,
    pub data: CsvAdapter,
}

pub fn prepare(config_path: &Path, inputs: &InputPaths) -> Result<Prepared, RuletraderError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    validate_simulation_config(&config)?;
    validate_data_config(&config)?;
    let (sim, portfolio) = build_simulation_config(&config)?;

    let candles = resolve_path("candles", inputs.candles.as_ref(), &config, config_path)?;
    let rulebook = resolve_path("rulebook", inputs.rulebook.as_ref(), &config, config_path)?;

    Ok(Prepared {
        config,
        sim,
        portfolio,
        data: CsvAdapter::new(candles, rulebook),
    })
}

/// Load data and run the kernel with a full trace.
pub fn execute(prepared: &Prepared) -> Result<SimulationResult, RuletraderError> {
    let candles = prepared.data.load_candles()?;
    let rulebook = prepared
        .data
        .load_rulebook(prepared.sim.window, prepared.sim.rule_count)?;
    Ok(simulate_with_trace(
        &candles,
        &rulebook,
        prepared.portfolio,
        &prepared.sim,
    )?)
}

fn run_simulate(config_path: &Path, inputs: &InputPaths, trace: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let prepared = match prepare(config_path, inputs) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Load data and simulate
    eprintln!(
        "Simulating {} rule(s), {} candle window, EMA width {}",
        prepared.sim.rule_count, prepared.sim.window, prepared.sim.ema_width
    );
    let result = match execute(&prepared) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Summary
    if prepared.config.get_bool(REPORT, "summary", true) {
        print_summary(&result);
    }

    // Stage 4: Trace report
    let trace_path = trace.cloned().or_else(|| {
        prepared
            .config
            .get_string(REPORT, "trace")
            .filter(|s| !s.trim().is_empty())
            .map(|s| relative_to_config(PathBuf::from(s.trim()), config_path))
    });
    if let Some(path) = trace_path {
        if let Err(e) = CsvReportAdapter.write(&result, &path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nTrace written to: {}", path.display());
    }

    println!("{}", result.profit);
    ExitCode::SUCCESS
}

fn print_summary(result: &SimulationResult) {
    eprint!("{}", format_summary(result));
}

fn format_summary(result: &SimulationResult) -> String {
    use std::fmt::Write;

    let metrics = Metrics::compute(result);
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Simulation Results ===");
    let _ = writeln!(out, "Baseline:         {:.2}", result.baseline);
    let _ = writeln!(out, "Final Value:      {:.2}", result.final_value);
    let _ = writeln!(out, "Profit:           {:.2}", result.profit);
    let _ = writeln!(out, "Return:           {:.2}%", metrics.total_return * 100.0);
    let _ = writeln!(out, "Steps:            {}", metrics.steps);
    let _ = writeln!(
        out,
        "Buys/Sells/Holds: {}/{}/{}",
        metrics.buy_steps, metrics.sell_steps, metrics.idle_steps
    );
    let _ = writeln!(out, "Full Exits:       {}", metrics.full_exits);
    let _ = writeln!(
        out,
        "Peak/Trough:      {:.2} / {:.2}",
        metrics.peak_value, metrics.trough_value
    );
    let _ = writeln!(
        out,
        "Max Drawdown:     -{:.1}% over {} steps",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    let _ = writeln!(
        out,
        "Holdings:         {:.4} units, {:.2} cash",
        result.portfolio.invested_units, result.portfolio.available_money
    );
    out
}

/// Loads everything the simulation needs and checks it without running a step.
pub fn validate_inputs(prepared: &Prepared) -> Result<(usize, Rulebook), RuletraderError> {
    let candles = prepared.data.load_candles()?;
    if candles.len() < prepared.sim.ema_width {
        return Err(ConfigurationError::InsufficientCandles {
            have: candles.len(),
            need: prepared.sim.ema_width,
        }
        .into());
    }
    validate_candles(&candles)?;
    let rulebook = prepared
        .data
        .load_rulebook(prepared.sim.window, prepared.sim.rule_count)?;
    Ok((candles.len(), rulebook))
}

fn run_validate(config_path: &Path, inputs: &InputPaths) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let prepared = match prepare(config_path, inputs) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Config validated successfully: {}", prepared.config.source());

    let (candle_count, rulebook) = match validate_inputs(&prepared) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nInputs:");
    eprintln!(
        "  candles:  {} ({} candles, {} steps)",
        prepared.data.candles_path().display(),
        candle_count,
        candle_count - prepared.sim.ema_width
    );
    eprintln!(
        "  rulebook: {} ({} rules x {} values)",
        prepared.data.rulebook_path().display(),
        rulebook.rule_count(),
        rule_length(rulebook.window())
    );
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_shape(window: usize, rule_count: usize) -> ExitCode {
    if window == 0 || rule_count == 0 {
        eprintln!("error: window and rule count must be positive");
        return ExitCode::from(4);
    }
    let total = match rulebook_length(window, rule_count) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(4);
        }
    };
    println!("feature width:  {}", feature_width(window));
    println!("bound slots:    {}", slot_count(window));
    println!("rule length:    {}", total / rule_count);
    println!("rulebook length: {}", total);
    ExitCode::SUCCESS
}

fn run_template(
    window: usize,
    rule_count: usize,
    output: &Path,
    coefficient: f64,
    weight: f64,
) -> ExitCode {
    let rulebook = match Rulebook::uniform(window, rule_count, coefficient, weight) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(4);
        }
    };
    match write_flat_rulebook(output, &rulebook) {
        Ok(()) => {
            eprintln!(
                "Rulebook written to: {} ({} rules x {} values)",
                output.display(),
                rule_count,
                rule_length(window)
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
