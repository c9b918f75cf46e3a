//! Monte Carlo price projection by bootstrap resampling.
//!
//! For each bar, the trailing n log returns form an empirical distribution.
//! `simulations` paths of `horizon` steps draw from it with replacement; the
//! terminal prices give the mean forecast, the share of paths ending above
//! the current price, and a 5%/95% band.
//!
//! One `StdRng` seeded from `seed` drives the whole series, so the output is
//! a pure function of (prices, params).
//!
//! Warmup: first n bars are invalid. Windows containing a non-positive price
//! are invalid as well.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::NeozorkError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Signal};
use crate::domain::ohlcv::{OhlcvBar, PriceType};

const LOWER_QUANTILE: f64 = 0.05;
const UPPER_QUANTILE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloParams {
    pub simulations: usize,
    pub period: usize,
    pub horizon: usize,
    pub buy_threshold: f64,
    pub seed: u64,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        Self {
            simulations: 1000,
            period: 20,
            horizon: 5,
            buy_threshold: 0.6,
            seed: 42,
        }
    }
}

impl MonteCarloParams {
    pub fn validate(&self) -> Result<(), NeozorkError> {
        if self.simulations == 0 {
            return Err(NeozorkError::invalid_parameter(
                "monte_carlo.simulations",
                "must be at least 1",
            ));
        }
        if self.period == 0 {
            return Err(NeozorkError::invalid_parameter(
                "monte_carlo.period",
                "must be at least 1",
            ));
        }
        if self.horizon == 0 {
            return Err(NeozorkError::invalid_parameter(
                "monte_carlo.horizon",
                "must be at least 1",
            ));
        }
        if !(self.buy_threshold > 0.5 && self.buy_threshold <= 1.0) {
            return Err(NeozorkError::invalid_parameter(
                "monte_carlo.buy_threshold",
                "must lie in (0.5, 1]",
            ));
        }
        Ok(())
    }
}

/// Outcome of one batch of simulated paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub forecast: f64,
    pub prob_up: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Nearest-rank quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Simulate terminal prices from `price` by resampling `log_returns`.
///
/// `log_returns` and `simulations` must be non-empty / non-zero.
pub fn project<R: Rng>(
    rng: &mut R,
    price: f64,
    log_returns: &[f64],
    simulations: usize,
    horizon: usize,
) -> Projection {
    let mut terminals: Vec<f64> = (0..simulations)
        .map(|_| {
            let drift: f64 = (0..horizon)
                .map(|_| log_returns[rng.gen_range(0..log_returns.len())])
                .sum();
            price * drift.exp()
        })
        .collect();

    let forecast = terminals.iter().sum::<f64>() / simulations as f64;
    let prob_up = terminals.iter().filter(|&&t| t > price).count() as f64 / simulations as f64;

    terminals.sort_by(|a, b| a.total_cmp(b));

    Projection {
        forecast,
        prob_up,
        lower: quantile(&terminals, LOWER_QUANTILE),
        upper: quantile(&terminals, UPPER_QUANTILE),
    }
}

fn signal_for(projection: &Projection, price: f64, buy_threshold: f64) -> Signal {
    if projection.prob_up >= buy_threshold && projection.forecast > price {
        Signal::Buy
    } else if projection.prob_up <= 1.0 - buy_threshold && projection.forecast < price {
        Signal::Sell
    } else {
        Signal::NoTrade
    }
}

fn invalid_point(bar: &OhlcvBar) -> IndicatorPoint {
    IndicatorPoint {
        timestamp: bar.timestamp,
        valid: false,
        value: IndicatorValue::MonteCarlo {
            forecast: 0.0,
            prob_up: 0.0,
            lower: 0.0,
            upper: 0.0,
            signal: Signal::NoTrade,
        },
    }
}

pub fn calculate_monte_carlo(
    bars: &[OhlcvBar],
    params: &MonteCarloParams,
    price_type: PriceType,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::MonteCarlo {
        simulations: params.simulations,
        period: params.period,
    };
    if params.simulations == 0 || params.period == 0 || params.horizon == 0 {
        return IndicatorSeries {
            indicator_type,
            values: bars.iter().map(invalid_point).collect(),
        };
    }

    let prices: Vec<f64> = bars.iter().map(|b| b.price(price_type)).collect();
    // None where either neighbour is non-positive
    let log_returns: Vec<Option<f64>> = prices
        .windows(2)
        .map(|w| (w[0] > 0.0 && w[1] > 0.0).then(|| (w[1] / w[0]).ln()))
        .collect();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i < params.period {
            values.push(invalid_point(bar));
            continue;
        }

        let window: Option<Vec<f64>> = log_returns[i - params.period..i].iter().copied().collect();
        let window = match window {
            Some(w) => w,
            None => {
                values.push(invalid_point(bar));
                continue;
            }
        };

        let price = prices[i];
        let projection = project(&mut rng, price, &window, params.simulations, params.horizon);
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::MonteCarlo {
                forecast: projection.forecast,
                prob_up: projection.prob_up,
                lower: projection.lower,
                upper: projection.upper,
                signal: signal_for(&projection, price, params.buy_threshold),
            },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
