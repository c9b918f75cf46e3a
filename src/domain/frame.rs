//! In-memory OHLCV table with derived indicator columns.

use crate::domain::error::NeozorkError;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::OhlcvBar;

/// A derived column. `None` marks a bar the indicator could not compute.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct OhlcvFrame {
    bars: Vec<OhlcvBar>,
    columns: Vec<Column>,
}

impl OhlcvFrame {
    /// Build a frame from bars sorted strictly ascending by timestamp.
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, NeozorkError> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(NeozorkError::Frame {
                    reason: format!("non-finite value in bar at {}", bar.timestamp),
                });
            }
            if i > 0 && bars[i - 1].timestamp >= bar.timestamp {
                return Err(NeozorkError::Frame {
                    reason: format!(
                        "timestamps not strictly ascending at {} (previous {})",
                        bar.timestamp,
                        bars[i - 1].timestamp
                    ),
                });
            }
        }
        Ok(Self {
            bars,
            columns: Vec::new(),
        })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Add a column, replacing any existing column of the same name in place.
    pub fn push_column(&mut self, column: Column) -> Result<(), NeozorkError> {
        if column.values.len() != self.bars.len() {
            return Err(NeozorkError::Frame {
                reason: format!(
                    "column '{}' has {} values, frame has {} bars",
                    column.name,
                    column.values.len(),
                    self.bars.len()
                ),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Append every output column of an indicator series.
    pub fn append_series(&mut self, series: &IndicatorSeries) -> Result<(), NeozorkError> {
        if series.values.len() != self.bars.len() {
            return Err(NeozorkError::Frame {
                reason: format!(
                    "series {} has {} points, frame has {} bars",
                    series.indicator_type,
                    series.values.len(),
                    self.bars.len()
                ),
            });
        }
        for (name, values) in series.column_values() {
            self.push_column(Column { name, values })?;
        }
        Ok(())
    }
}
