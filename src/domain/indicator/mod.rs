//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key
//!   and as the prefix of the columns a series appends to a frame)
//! - `IndicatorSpec`: Full parameter set for one calculation
//! - `IndicatorSeries`: A time series of indicator values

pub mod kelly;
pub mod monte_carlo;
pub mod rsi;

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::NeozorkError;
use crate::domain::ohlcv::{OhlcvBar, PriceType};

use kelly::KellyParams;
use monte_carlo::MonteCarloParams;
use rsi::RsiParams;

/// Trading signal attached to every indicator point.
///
/// Serialized into frame columns as 0 (no trade), 1 (buy), 2 (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    #[default]
    NoTrade,
    Buy,
    Sell,
}

impl Signal {
    pub fn code(self) -> f64 {
        match self {
            Signal::NoTrade => 0.0,
            Signal::Buy => 1.0,
            Signal::Sell => 2.0,
        }
    }

    /// Inverse of [`Signal::code`].
    pub fn from_code(code: f64) -> Option<Signal> {
        match code {
            c if c == 0.0 => Some(Signal::NoTrade),
            c if c == 1.0 => Some(Signal::Buy),
            c if c == 2.0 => Some(Signal::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::NoTrade => write!(f, "NOTRADE"),
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

/// How RSI readings are turned into signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RsiMode {
    #[default]
    Plain,
    Momentum,
    Divergence,
}

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Rsi {
        value: f64,
        signal: Signal,
    },
    Kelly {
        win_rate: f64,
        risk_reward: f64,
        fraction: f64,
        signal: Signal,
    },
    MonteCarlo {
        forecast: f64,
        prob_up: f64,
        lower: f64,
        upper: f64,
        signal: Signal,
    },
}

impl IndicatorValue {
    pub fn signal(&self) -> Signal {
        match self {
            IndicatorValue::Rsi { signal, .. }
            | IndicatorValue::Kelly { signal, .. }
            | IndicatorValue::MonteCarlo { signal, .. } => *signal,
        }
    }

    /// Output fields as (column suffix, value). An empty suffix is the primary column.
    fn fields(&self) -> Vec<(&'static str, f64)> {
        match self {
            IndicatorValue::Rsi { value, signal } => vec![("", *value), ("signal", signal.code())],
            IndicatorValue::Kelly {
                win_rate,
                risk_reward,
                fraction,
                signal,
            } => vec![
                ("win_rate", *win_rate),
                ("risk_reward", *risk_reward),
                ("", *fraction),
                ("signal", signal.code()),
            ],
            IndicatorValue::MonteCarlo {
                forecast,
                prob_up,
                lower,
                upper,
                signal,
            } => vec![
                ("", *forecast),
                ("prob_up", *prob_up),
                ("lower", *lower),
                ("upper", *upper),
                ("signal", signal.code()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi { period: usize, mode: RsiMode },
    Kelly { period: usize },
    MonteCarlo { simulations: usize, period: usize },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi { period, mode } => match mode {
                RsiMode::Plain => write!(f, "rsi_{}", period),
                RsiMode::Momentum => write!(f, "rsi_mom_{}", period),
                RsiMode::Divergence => write!(f, "rsi_div_{}", period),
            },
            IndicatorType::Kelly { period } => write!(f, "kelly_{}", period),
            IndicatorType::MonteCarlo {
                simulations,
                period,
            } => write!(f, "montecarlo_{}_{}", simulations, period),
        }
    }
}

/// Indicator names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Rsi,
    RsiMomentum,
    RsiDivergence,
    Kelly,
    MonteCarlo,
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rsi" => Ok(IndicatorKind::Rsi),
            "rsi_mom" | "rsi-mom" => Ok(IndicatorKind::RsiMomentum),
            "rsi_div" | "rsi-div" => Ok(IndicatorKind::RsiDivergence),
            "kelly" => Ok(IndicatorKind::Kelly),
            "montecarlo" | "monte_carlo" | "mc" => Ok(IndicatorKind::MonteCarlo),
            other => Err(format!(
                "unknown indicator '{other}' (expected rsi, rsi_mom, rsi_div, kelly or montecarlo)"
            )),
        }
    }
}

/// Complete parameter set for one indicator calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSpec {
    Rsi(RsiParams),
    Kelly(KellyParams),
    MonteCarlo(MonteCarloParams),
}

impl IndicatorSpec {
    pub fn indicator_type(&self) -> IndicatorType {
        match self {
            IndicatorSpec::Rsi(p) => IndicatorType::Rsi {
                period: p.period,
                mode: p.mode,
            },
            IndicatorSpec::Kelly(p) => IndicatorType::Kelly { period: p.period },
            IndicatorSpec::MonteCarlo(p) => IndicatorType::MonteCarlo {
                simulations: p.simulations,
                period: p.period,
            },
        }
    }

    pub fn validate(&self) -> Result<(), NeozorkError> {
        match self {
            IndicatorSpec::Rsi(p) => p.validate(),
            IndicatorSpec::Kelly(p) => p.validate(),
            IndicatorSpec::MonteCarlo(p) => p.validate(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Flatten the series into named columns, one value per point.
    /// Invalid (warmup) points become `None`.
    pub fn column_values(&self) -> Vec<(String, Vec<Option<f64>>)> {
        let prefix = self.indicator_type.to_string();
        let template = match self.values.first() {
            Some(p) => p.value.fields(),
            None => return Vec::new(),
        };

        template
            .iter()
            .enumerate()
            .map(|(idx, (suffix, _))| {
                let name = if suffix.is_empty() {
                    prefix.clone()
                } else {
                    format!("{}_{}", prefix, suffix)
                };
                let values = self
                    .values
                    .iter()
                    .map(|p| {
                        if p.valid {
                            p.value.fields().get(idx).map(|(_, v)| *v)
                        } else {
                            None
                        }
                    })
                    .collect();
                (name, values)
            })
            .collect()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

/// Run one indicator over the bars using the chosen price column.
pub fn compute(
    bars: &[OhlcvBar],
    spec: &IndicatorSpec,
    price_type: PriceType,
) -> Result<IndicatorSeries, NeozorkError> {
    spec.validate()?;
    let series = match spec {
        IndicatorSpec::Rsi(p) => rsi::calculate_rsi(bars, p, price_type),
        IndicatorSpec::Kelly(p) => kelly::calculate_kelly(bars, p, price_type),
        IndicatorSpec::MonteCarlo(p) => monte_carlo::calculate_monte_carlo(bars, p, price_type),
    };
    tracing::debug!(
        indicator = %series.indicator_type,
        bars = bars.len(),
        valid = series.valid_count(),
        "indicator computed"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn indicator_type_display_rsi_modes() {
        let plain = IndicatorType::Rsi {
            period: 14,
            mode: RsiMode::Plain,
        };
        let mom = IndicatorType::Rsi {
            period: 14,
            mode: RsiMode::Momentum,
        };
        let div = IndicatorType::Rsi {
            period: 7,
            mode: RsiMode::Divergence,
        };
        assert_eq!(plain.to_string(), "rsi_14");
        assert_eq!(mom.to_string(), "rsi_mom_14");
        assert_eq!(div.to_string(), "rsi_div_7");
    }

    #[test]
    fn indicator_type_display_kelly_and_monte_carlo() {
        assert_eq!(IndicatorType::Kelly { period: 20 }.to_string(), "kelly_20");
        assert_eq!(
            IndicatorType::MonteCarlo {
                simulations: 1000,
                period: 20
            }
            .to_string(),
            "montecarlo_1000_20"
        );
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        let rsi14 = IndicatorType::Rsi {
            period: 14,
            mode: RsiMode::Plain,
        };
        let kelly = IndicatorType::Kelly { period: 20 };
        map.insert(rsi14.clone(), "rsi");
        map.insert(kelly.clone(), "kelly");

        assert_eq!(map.get(&rsi14), Some(&"rsi"));
        assert_eq!(map.get(&IndicatorType::Kelly { period: 20 }), Some(&"kelly"));
        assert_eq!(
            map.get(&IndicatorType::Rsi {
                period: 14,
                mode: RsiMode::Momentum
            }),
            None
        );
    }

    #[test]
    fn signal_codes() {
        assert_eq!(Signal::NoTrade.code(), 0.0);
        assert_eq!(Signal::Buy.code(), 1.0);
        assert_eq!(Signal::Sell.code(), 2.0);
        assert_eq!(Signal::Sell.to_string(), "SELL");
        assert_eq!(Signal::from_code(1.0), Some(Signal::Buy));
        assert_eq!(Signal::from_code(Signal::Sell.code()), Some(Signal::Sell));
        assert_eq!(Signal::from_code(0.5), None);
    }

    #[test]
    fn indicator_kind_parses_aliases() {
        assert_eq!("RSI".parse::<IndicatorKind>(), Ok(IndicatorKind::Rsi));
        assert_eq!("rsi-mom".parse::<IndicatorKind>(), Ok(IndicatorKind::RsiMomentum));
        assert_eq!("rsi_div".parse::<IndicatorKind>(), Ok(IndicatorKind::RsiDivergence));
        assert_eq!("mc".parse::<IndicatorKind>(), Ok(IndicatorKind::MonteCarlo));
        assert!("macd".parse::<IndicatorKind>().is_err());
    }

    #[test]
    fn column_values_maps_invalid_to_none() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Rsi {
                period: 2,
                mode: RsiMode::Plain,
            },
            values: vec![
                IndicatorPoint {
                    timestamp: ts(1),
                    valid: false,
                    value: IndicatorValue::Rsi {
                        value: 0.0,
                        signal: Signal::NoTrade,
                    },
                },
                IndicatorPoint {
                    timestamp: ts(2),
                    valid: true,
                    value: IndicatorValue::Rsi {
                        value: 25.0,
                        signal: Signal::Buy,
                    },
                },
            ],
        };

        let columns = series.column_values();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].0, "rsi_2");
        assert_eq!(columns[0].1, vec![None, Some(25.0)]);
        assert_eq!(columns[1].0, "rsi_2_signal");
        assert_eq!(columns[1].1, vec![None, Some(1.0)]);
    }

    #[test]
    fn column_values_kelly_names() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Kelly { period: 5 },
            values: vec![IndicatorPoint {
                timestamp: ts(1),
                valid: true,
                value: IndicatorValue::Kelly {
                    win_rate: 0.6,
                    risk_reward: 2.0,
                    fraction: 0.4,
                    signal: Signal::Buy,
                },
            }],
        };

        let names: Vec<String> = series.column_values().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["kelly_5_win_rate", "kelly_5_risk_reward", "kelly_5", "kelly_5_signal"]
        );
    }

    #[test]
    fn column_values_empty_series() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Kelly { period: 5 },
            values: vec![],
        };
        assert!(series.column_values().is_empty());
    }

    #[test]
    fn compute_rejects_invalid_spec() {
        let spec = IndicatorSpec::Rsi(RsiParams {
            oversold: 80.0,
            overbought: 20.0,
            ..RsiParams::default()
        });
        let err = compute(&[], &spec, PriceType::Close).unwrap_err();
        assert!(matches!(err, NeozorkError::InvalidParameter { .. }));
    }

    #[test]
    fn spec_indicator_type_carries_parameters() {
        let spec = IndicatorSpec::MonteCarlo(MonteCarloParams {
            simulations: 250,
            period: 30,
            ..MonteCarloParams::default()
        });
        assert_eq!(
            spec.indicator_type(),
            IndicatorType::MonteCarlo {
                simulations: 250,
                period: 30
            }
        );
    }
}
