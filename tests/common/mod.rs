#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use neozork::domain::error::NeozorkError;
use neozork::domain::frame::OhlcvFrame;
pub use neozork::domain::ohlcv::OhlcvBar;
use neozork::ports::chart_port::ChartPort;
use neozork::ports::data_port::DataPort;
use neozork::ports::frame_port::FramePort;
use std::cell::RefCell;

pub struct MockDataPort {
    pub bars: Vec<OhlcvBar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<OhlcvBar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load(&self) -> Result<Vec<OhlcvBar>, NeozorkError> {
        match &self.error {
            Some(reason) => Err(NeozorkError::DataFormat {
                row: 1,
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

/// Captures every frame handed to it.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: RefCell<Vec<OhlcvFrame>>,
}

impl FramePort for RecordingSink {
    fn write(&self, frame: &OhlcvFrame) -> Result<(), NeozorkError> {
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }
}

/// Captures the column list and title of each render call.
#[derive(Default)]
pub struct RecordingChart {
    pub calls: RefCell<Vec<(Vec<String>, String)>>,
}

impl ChartPort for RecordingChart {
    fn render(
        &self,
        _frame: &OhlcvFrame,
        columns: &[String],
        title: &str,
    ) -> Result<(), NeozorkError> {
        self.calls
            .borrow_mut()
            .push((columns.to_vec(), title.to_string()));
        Ok(())
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(hour: i64, close: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: start() + chrono::Duration::hours(hour),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i as i64, c))
        .collect()
}

/// Deterministic oscillating series with a mild upward drift.
pub fn generate_bars(count: usize, start_price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let close = start_price + i as f64 * 0.1 + (i as f64 * 0.5).sin() * 3.0;
            make_bar(i as i64, close)
        })
        .collect()
}

pub fn write_csv(dir: &tempfile::TempDir, name: &str, bars: &[OhlcvBar]) -> std::path::PathBuf {
    let mut content = String::from("Timestamp,Open,High,Low,Close,Volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}
