//! Kelly Criterion position sizing.
//!
//! f* = p - (1 - p) / b, with p the win probability and b the
//! reward-to-risk ratio (average win / average loss).
//!
//! The rolling indicator estimates p and b from the last n price changes:
//! up moves count as wins, down moves as losses, unchanged bars as neither.
//! The position fraction is f* scaled by a fractional-Kelly multiplier and
//! clamped to [0, max_fraction].
//!
//! Warmup: first n bars are invalid.

use crate::domain::error::NeozorkError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Signal};
use crate::domain::ohlcv::{OhlcvBar, PriceType};

#[derive(Debug, Clone, PartialEq)]
pub struct KellyParams {
    pub period: usize,
    pub threshold: f64,
    pub max_fraction: f64,
    pub multiplier: f64,
}

impl Default for KellyParams {
    fn default() -> Self {
        Self {
            period: 20,
            threshold: 0.1,
            max_fraction: 1.0,
            multiplier: 1.0,
        }
    }
}

impl KellyParams {
    pub fn validate(&self) -> Result<(), NeozorkError> {
        if self.period == 0 {
            return Err(NeozorkError::invalid_parameter("kelly.period", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(NeozorkError::invalid_parameter("kelly.threshold", "must lie in [0, 1]"));
        }
        if !(self.max_fraction > 0.0 && self.max_fraction <= 1.0) {
            return Err(NeozorkError::invalid_parameter(
                "kelly.max_fraction",
                "must lie in (0, 1]",
            ));
        }
        if !(self.multiplier > 0.0 && self.multiplier.is_finite()) {
            return Err(NeozorkError::invalid_parameter(
                "kelly.multiplier",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Raw Kelly fraction for a win probability and reward-to-risk ratio.
///
/// The result is not clamped: a negative value means the edge is negative.
pub fn kelly_fraction(win_rate: f64, risk_reward: f64) -> Result<f64, NeozorkError> {
    if !(0.0..=1.0).contains(&win_rate) {
        return Err(NeozorkError::invalid_parameter(
            "win_rate",
            format!("{} is outside [0, 1]", win_rate),
        ));
    }
    if !(risk_reward > 0.0 && risk_reward.is_finite()) {
        return Err(NeozorkError::invalid_parameter(
            "risk_reward",
            format!("{} must be positive and finite", risk_reward),
        ));
    }
    Ok(win_rate - (1.0 - win_rate) / risk_reward)
}

/// Win statistics over a window of price changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub win_rate: f64,
    pub risk_reward: f64,
    pub raw_kelly: f64,
}

pub fn window_stats(changes: &[f64]) -> WindowStats {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut total_win = 0.0;
    let mut total_loss = 0.0;

    for &c in changes {
        if c > 0.0 {
            wins += 1;
            total_win += c;
        } else if c < 0.0 {
            losses += 1;
            total_loss += -c;
        }
    }

    let decided = wins + losses;
    if decided == 0 {
        return WindowStats {
            win_rate: 0.0,
            risk_reward: 0.0,
            raw_kelly: 0.0,
        };
    }

    let win_rate = wins as f64 / decided as f64;
    if losses == 0 {
        return WindowStats {
            win_rate,
            risk_reward: 0.0,
            raw_kelly: 1.0,
        };
    }
    if wins == 0 {
        return WindowStats {
            win_rate,
            risk_reward: 0.0,
            raw_kelly: -1.0,
        };
    }

    let risk_reward = (total_win / wins as f64) / (total_loss / losses as f64);
    let raw_kelly = win_rate - (1.0 - win_rate) / risk_reward;
    WindowStats {
        win_rate,
        risk_reward,
        raw_kelly,
    }
}

pub fn calculate_kelly(
    bars: &[OhlcvBar],
    params: &KellyParams,
    price_type: PriceType,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Kelly {
        period: params.period,
    };
    let prices: Vec<f64> = bars.iter().map(|b| b.price(price_type)).collect();
    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if params.period == 0 || i < params.period {
                return IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: false,
                    value: IndicatorValue::Kelly {
                        win_rate: 0.0,
                        risk_reward: 0.0,
                        fraction: 0.0,
                        signal: Signal::NoTrade,
                    },
                };
            }

            // changes[j] is the move into bar j + 1
            let stats = window_stats(&changes[i - params.period..i]);
            let fraction = (stats.raw_kelly * params.multiplier).clamp(0.0, params.max_fraction);
            let signal = if fraction > params.threshold {
                Signal::Buy
            } else if stats.raw_kelly < 0.0 {
                Signal::Sell
            } else {
                Signal::NoTrade
            };

            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Kelly {
                    win_rate: stats.win_rate,
                    risk_reward: stats.risk_reward,
                    fraction,
                    signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
