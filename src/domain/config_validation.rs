//! Configuration validation.
//!
//! Turns INI sections into validated indicator parameters. Missing keys fall
//! back to the indicator defaults; present but unparseable or out-of-range
//! values are rejected with the offending `[section] key`.

use crate::domain::error::NeozorkError;
use crate::domain::indicator::kelly::KellyParams;
use crate::domain::indicator::monte_carlo::MonteCarloParams;
use crate::domain::indicator::rsi::RsiParams;
use crate::domain::indicator::{IndicatorKind, IndicatorSpec, RsiMode};
use crate::domain::ohlcv::PriceType;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), NeozorkError> {
    price_type_from_config(config)?;
    rsi_params_from_config(config, RsiMode::Plain)?;
    kelly_params_from_config(config)?;
    monte_carlo_params_from_config(config)?;
    output_show_from_config(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> NeozorkError {
    NeozorkError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, NeozorkError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw))),
    }
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, NeozorkError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("'{}' is not a non-negative integer", raw))),
    }
}

/// Re-tag a parameter error (named `section.key`) as a config error.
fn as_config_error(err: NeozorkError) -> NeozorkError {
    match err {
        NeozorkError::InvalidParameter { name, reason } => match name.split_once('.') {
            Some((section, key)) => invalid(section, key, reason),
            None => invalid("", &name, reason),
        },
        other => other,
    }
}

pub fn price_type_from_config(config: &dyn ConfigPort) -> Result<PriceType, NeozorkError> {
    match config.get_string("data", "price_type") {
        None => Ok(PriceType::default()),
        Some(raw) => raw
            .parse::<PriceType>()
            .map_err(|reason| invalid("data", "price_type", reason)),
    }
}

pub fn rsi_params_from_config(
    config: &dyn ConfigPort,
    mode: RsiMode,
) -> Result<RsiParams, NeozorkError> {
    let defaults = RsiParams::default();
    let params = RsiParams {
        period: read_usize(config, "rsi", "period", defaults.period)?,
        oversold: read_f64(config, "rsi", "oversold", defaults.oversold)?,
        overbought: read_f64(config, "rsi", "overbought", defaults.overbought)?,
        mode,
    };
    params.validate().map_err(as_config_error)?;
    Ok(params)
}

pub fn kelly_params_from_config(config: &dyn ConfigPort) -> Result<KellyParams, NeozorkError> {
    let defaults = KellyParams::default();
    let params = KellyParams {
        period: read_usize(config, "kelly", "period", defaults.period)?,
        threshold: read_f64(config, "kelly", "threshold", defaults.threshold)?,
        max_fraction: read_f64(config, "kelly", "max_fraction", defaults.max_fraction)?,
        multiplier: read_f64(config, "kelly", "multiplier", defaults.multiplier)?,
    };
    params.validate().map_err(as_config_error)?;
    Ok(params)
}

pub fn monte_carlo_params_from_config(
    config: &dyn ConfigPort,
) -> Result<MonteCarloParams, NeozorkError> {
    let defaults = MonteCarloParams::default();
    let seed = match config.get_string("monte_carlo", "seed") {
        None => defaults.seed,
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid("monte_carlo", "seed", format!("'{}' is not a u64", raw)))?,
    };
    let params = MonteCarloParams {
        simulations: read_usize(config, "monte_carlo", "simulations", defaults.simulations)?,
        period: read_usize(config, "monte_carlo", "period", defaults.period)?,
        horizon: read_usize(config, "monte_carlo", "horizon", defaults.horizon)?,
        buy_threshold: read_f64(config, "monte_carlo", "buy_threshold", defaults.buy_threshold)?,
        seed,
    };
    params.validate().map_err(as_config_error)?;
    Ok(params)
}

/// Rows to print after `calc`, from `[output] show`. `None` when unset.
pub fn output_show_from_config(config: &dyn ConfigPort) -> Result<Option<usize>, NeozorkError> {
    match config.get_string("output", "show") {
        None => Ok(None),
        Some(_) => read_usize(config, "output", "show", 0).map(Some),
    }
}

/// Build the full parameter set for one indicator from config.
pub fn spec_from_config(
    kind: IndicatorKind,
    config: &dyn ConfigPort,
) -> Result<IndicatorSpec, NeozorkError> {
    Ok(match kind {
        IndicatorKind::Rsi => IndicatorSpec::Rsi(rsi_params_from_config(config, RsiMode::Plain)?),
        IndicatorKind::RsiMomentum => {
            IndicatorSpec::Rsi(rsi_params_from_config(config, RsiMode::Momentum)?)
        }
        IndicatorKind::RsiDivergence => {
            IndicatorSpec::Rsi(rsi_params_from_config(config, RsiMode::Divergence)?)
        }
        IndicatorKind::Kelly => IndicatorSpec::Kelly(kelly_params_from_config(config)?),
        IndicatorKind::MonteCarlo => {
            IndicatorSpec::MonteCarlo(monte_carlo_params_from_config(config)?)
        }
    })
}
