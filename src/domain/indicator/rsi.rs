//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (or 50 when avg_gain is also 0).
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).
//!
//! Signals depend on [`RsiMode`]:
//! - `Plain`: below oversold → buy, above overbought → sell
//! - `Momentum`: as plain, but only while RSI is turning in the signal direction
//! - `Divergence`: price and RSI move in opposite directions on either side of 50

use crate::domain::error::NeozorkError;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, RsiMode, Signal,
};
use crate::domain::ohlcv::{OhlcvBar, PriceType};

const MIDLINE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub mode: RsiMode,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            mode: RsiMode::Plain,
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<(), NeozorkError> {
        if self.period == 0 {
            return Err(NeozorkError::invalid_parameter(
                "rsi.period",
                "must be at least 1",
            ));
        }
        if !(0.0..=100.0).contains(&self.oversold) || !(0.0..=100.0).contains(&self.overbought) {
            return Err(NeozorkError::invalid_parameter(
                "rsi.levels",
                "oversold and overbought must lie in [0, 100]",
            ));
        }
        if self.oversold >= self.overbought {
            return Err(NeozorkError::invalid_parameter(
                "rsi.levels",
                format!(
                    "oversold ({}) must be below overbought ({})",
                    self.oversold, self.overbought
                ),
            ));
        }
        Ok(())
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { MIDLINE } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

/// Raw Wilder RSI values, `None` during warmup.
pub fn wilder_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return out;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (period + 1)..prices.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn signal_at(
    params: &RsiParams,
    rsi: f64,
    prev_rsi: Option<f64>,
    price: f64,
    prev_price: f64,
) -> Signal {
    match params.mode {
        RsiMode::Plain => {
            if rsi < params.oversold {
                Signal::Buy
            } else if rsi > params.overbought {
                Signal::Sell
            } else {
                Signal::NoTrade
            }
        }
        RsiMode::Momentum => match prev_rsi {
            Some(prev) if rsi < params.oversold && rsi > prev => Signal::Buy,
            Some(prev) if rsi > params.overbought && rsi < prev => Signal::Sell,
            _ => Signal::NoTrade,
        },
        RsiMode::Divergence => match prev_rsi {
            Some(prev) if price < prev_price && rsi > prev && rsi < MIDLINE => Signal::Buy,
            Some(prev) if price > prev_price && rsi < prev && rsi > MIDLINE => Signal::Sell,
            _ => Signal::NoTrade,
        },
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], params: &RsiParams, price_type: PriceType) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi {
        period: params.period,
        mode: params.mode,
    };
    let prices: Vec<f64> = bars.iter().map(|b| b.price(price_type)).collect();
    let raw = wilder_rsi(&prices, params.period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match raw[i] {
            Some(rsi) => {
                let prev_rsi = if i > 0 { raw[i - 1] } else { None };
                let prev_price = if i > 0 { prices[i - 1] } else { prices[i] };
                IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: true,
                    value: IndicatorValue::Rsi {
                        value: rsi,
                        signal: signal_at(params, rsi, prev_rsi, prices[i], prev_price),
                    },
                }
            }
            None => IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Rsi {
                    value: 0.0,
                    signal: Signal::NoTrade,
                },
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
