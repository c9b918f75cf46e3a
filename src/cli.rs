//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::parquet_adapter::ParquetAdapter;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::adapters::terminal_table::format_tail;
use crate::domain::config_validation::{
    output_show_from_config, price_type_from_config, spec_from_config, validate_config,
};
use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;
use crate::domain::indicator::kelly::kelly_fraction;
use crate::domain::indicator::{self, IndicatorKind, IndicatorSpec};
use crate::domain::ohlcv::PriceType;
use crate::ports::chart_port::ChartPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::frame_port::FramePort;

const DEFAULT_SHOW_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "neozork", about = "Technical indicators over OHLCV price data")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators on a CSV or Parquet file and append them as columns
    Calc {
        #[arg(short, long)]
        input: PathBuf,
        /// rsi, rsi_mom, rsi_div, kelly or montecarlo (repeatable)
        #[arg(short = 'I', long = "indicator", default_value = "rsi")]
        indicators: Vec<IndicatorKind>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        price_type: Option<PriceType>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Monte Carlo seed override
        #[arg(long)]
        seed: Option<u64>,
        /// Print the last N rows to stdout
        #[arg(long)]
        show: Option<usize>,
    },
    /// Kelly fraction for a win rate and reward-to-risk ratio
    Kelly {
        #[arg(long)]
        win_rate: f64,
        #[arg(long)]
        risk_reward: f64,
    },
    /// Show bar count and time range of a CSV or Parquet file
    Info {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Validate an indicator configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Calc {
            input,
            indicators,
            config,
            price_type,
            output,
            chart,
            seed,
            show,
        } => run_calc(CalcArgs {
            input,
            indicators,
            config,
            price_type,
            output,
            chart,
            seed,
            show,
        }),
        Command::Kelly {
            win_rate,
            risk_reward,
        } => run_kelly(win_rate, risk_reward),
        Command::Info { input } => run_info(&input),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub struct CalcArgs {
    pub input: PathBuf,
    pub indicators: Vec<IndicatorKind>,
    pub config: Option<PathBuf>,
    pub price_type: Option<PriceType>,
    pub output: Option<PathBuf>,
    pub chart: Option<PathBuf>,
    pub seed: Option<u64>,
    pub show: Option<usize>,
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, NeozorkError> {
    match path {
        Some(p) => {
            info!("Loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// Resolve indicator specs: config values first, then CLI overrides.
pub fn build_specs(
    kinds: &[IndicatorKind],
    config: &dyn ConfigPort,
    seed: Option<u64>,
) -> Result<Vec<IndicatorSpec>, NeozorkError> {
    let mut specs = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let mut spec = spec_from_config(*kind, config)?;
        if let (IndicatorSpec::MonteCarlo(params), Some(seed)) = (&mut spec, seed) {
            params.seed = seed;
        }
        if specs.contains(&spec) {
            warn!("duplicate indicator {} ignored", spec.indicator_type());
            continue;
        }
        specs.push(spec);
    }
    Ok(specs)
}

/// Load bars, compute every indicator, and hand the frame to the optional sinks.
pub fn run_calc_pipeline(
    data_port: &dyn DataPort,
    specs: &[IndicatorSpec],
    price_type: PriceType,
    sink: Option<&dyn FramePort>,
    chart: Option<&dyn ChartPort>,
) -> Result<OhlcvFrame, NeozorkError> {
    let bars = data_port.load()?;
    if bars.is_empty() {
        return Err(NeozorkError::EmptyData {
            reason: "input contains no bars".into(),
        });
    }

    let mut frame = OhlcvFrame::new(bars)?;
    info!(
        "Computing {} indicator(s) on {} bars using {} price",
        specs.len(),
        frame.len(),
        price_type
    );

    for spec in specs {
        let series = indicator::compute(frame.bars(), spec, price_type)?;
        if series.valid_count() == 0 {
            warn!(
                "{}: not enough bars for a single valid value",
                series.indicator_type
            );
        }
        frame.append_series(&series)?;
    }

    if let Some(sink) = sink {
        sink.write(&frame)?;
    }

    if let Some(chart) = chart {
        let columns: Vec<String> = specs
            .iter()
            .map(|s| s.indicator_type().to_string())
            .collect();
        chart.render(&frame, &columns, &columns.join(", "))?;
    }

    Ok(frame)
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"))
}

/// Pick the reader for `path` by extension; anything not Parquet is read as CSV.
pub fn data_source(path: &Path) -> Box<dyn DataPort> {
    if is_parquet(path) {
        Box::new(ParquetAdapter::new(path))
    } else {
        Box::new(CsvAdapter::new(path))
    }
}

/// Pick the writer for `path` by extension; anything not Parquet is written as CSV.
pub fn frame_sink(path: &Path) -> Box<dyn FramePort> {
    if is_parquet(path) {
        Box::new(ParquetAdapter::new(path))
    } else {
        Box::new(CsvAdapter::new(path))
    }
}

fn chart_adapter(path: PathBuf, price_type: PriceType, specs: &[IndicatorSpec]) -> SvgChartAdapter {
    specs
        .iter()
        .fold(SvgChartAdapter::new(path, price_type), |adapter, spec| {
            let column = spec.indicator_type().to_string();
            match spec {
                IndicatorSpec::Rsi(p) => adapter.with_guides(column, vec![p.oversold, p.overbought]),
                IndicatorSpec::Kelly(p) => adapter.with_guides(column, vec![p.threshold]),
                IndicatorSpec::MonteCarlo(_) => adapter,
            }
        })
}

pub fn run_calc(args: CalcArgs) -> Result<(), NeozorkError> {
    let config = load_config(args.config.as_ref())?;
    validate_config(&config)?;

    let price_type = match args.price_type {
        Some(p) => p,
        None => price_type_from_config(&config)?,
    };
    let specs = build_specs(&args.indicators, &config, args.seed)?;

    let output = args
        .output
        .or_else(|| config.get_string("output", "path").map(PathBuf::from));
    let chart_path = args
        .chart
        .or_else(|| config.get_string("output", "chart").map(PathBuf::from));

    let source = data_source(&args.input);
    let sink = output.as_deref().map(frame_sink);
    let chart = chart_path.map(|p| chart_adapter(p, price_type, &specs));

    let frame = run_calc_pipeline(
        source.as_ref(),
        &specs,
        price_type,
        sink.as_deref(),
        chart.as_ref().map(|c| c as &dyn ChartPort),
    )?;

    let show = match args.show {
        Some(n) => Some(n),
        None => output_show_from_config(&config)?,
    };
    let show = match (show, sink.is_some()) {
        (Some(n), _) => n,
        (None, false) => DEFAULT_SHOW_ROWS,
        (None, true) => 0,
    };
    if show > 0 {
        print!("{}", format_tail(&frame, show));
    }

    Ok(())
}

pub fn run_kelly(win_rate: f64, risk_reward: f64) -> Result<(), NeozorkError> {
    let fraction = kelly_fraction(win_rate, risk_reward)?;
    if fraction <= 0.0 {
        warn!("no edge: Kelly fraction is {:.4}, do not size a position", fraction);
    }
    println!("{:.4}", fraction);
    Ok(())
}

pub fn run_info(input: &PathBuf) -> Result<(), NeozorkError> {
    let bars = data_source(input).load()?;
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(NeozorkError::EmptyData {
                reason: format!("{} contains no bars", input.display()),
            });
        }
    };

    println!(
        "{}: {} bars, {} to {}, last close {}",
        input.display(),
        bars.len(),
        first.timestamp,
        last.timestamp,
        last.close
    );
    Ok(())
}

pub fn run_validate(path: &PathBuf) -> Result<(), NeozorkError> {
    let config = load_config(Some(path))?;
    validate_config(&config)?;
    println!("{}: configuration is valid", path.display());
    Ok(())
}
