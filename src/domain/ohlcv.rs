//! OHLCV bar representation.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Which bar price feeds an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceType {
    Open,
    #[default]
    Close,
}

impl OhlcvBar {
    pub fn price(&self, price_type: PriceType) -> f64 {
        match price_type {
            PriceType::Open => self.open,
            PriceType::Close => self.close,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

impl FromStr for PriceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceType::Open),
            "close" => Ok(PriceType::Close),
            other => Err(format!("unknown price type '{other}' (expected open or close)")),
        }
    }
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceType::Open => write!(f, "open"),
            PriceType::Close => write!(f, "close"),
        }
    }
}
