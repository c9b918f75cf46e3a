//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod frame;
pub mod indicator;
pub mod ohlcv;
