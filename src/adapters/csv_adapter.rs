//! CSV file adapter: OHLCV source and frame sink.
//!
//! Columns are located by header name (case-insensitive), so exports with
//! extra columns or a different column order load without preprocessing.

use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use crate::ports::frame_port::FramePort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub(crate) const TIMESTAMP_HEADERS: &[&str] = &["timestamp", "datetime", "date", "time"];
pub(crate) const VOLUME_HEADERS: &[&str] = &["volume", "tick_volume", "tickvolume"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d"];
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

fn require_column(headers: &csv::StringRecord, name: &str) -> Result<usize, NeozorkError> {
    find_column(headers, &[name]).ok_or_else(|| NeozorkError::MissingColumn {
        column: name.to_string(),
    })
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    row: usize,
) -> Result<f64, NeozorkError> {
    let raw = record.get(idx).ok_or_else(|| NeozorkError::DataFormat {
        row,
        reason: format!("missing {} field", name),
    })?;
    raw.trim().parse().map_err(|e| NeozorkError::DataFormat {
        row,
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn load(&self) -> Result<Vec<OhlcvBar>, NeozorkError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let headers = rdr.headers()?.clone();
        let ts_idx = find_column(&headers, TIMESTAMP_HEADERS).ok_or_else(|| {
            NeozorkError::MissingColumn {
                column: "timestamp".into(),
            }
        })?;
        let open_idx = require_column(&headers, "open")?;
        let high_idx = require_column(&headers, "high")?;
        let low_idx = require_column(&headers, "low")?;
        let close_idx = require_column(&headers, "close")?;
        let volume_idx = find_column(&headers, VOLUME_HEADERS);

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(i + 2);

            let raw_ts = record.get(ts_idx).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| NeozorkError::DataFormat {
                row,
                reason: format!("invalid timestamp '{}'", raw_ts),
            })?;

            let volume = match volume_idx {
                Some(idx) => parse_field(&record, idx, "volume", row)?,
                None => 0.0,
            };

            bars.push(OhlcvBar {
                timestamp,
                open: parse_field(&record, open_idx, "open", row)?,
                high: parse_field(&record, high_idx, "high", row)?,
                low: parse_field(&record, low_idx, "low", row)?,
                close: parse_field(&record, close_idx, "close", row)?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        tracing::info!(path = %self.path.display(), bars = bars.len(), "loaded OHLCV data");
        Ok(bars)
    }
}

impl FramePort for CsvAdapter {
    fn write(&self, frame: &OhlcvFrame) -> Result<(), NeozorkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(&self.path)?;

        let mut header: Vec<String> = ["timestamp", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(frame.columns().iter().map(|c| c.name.clone()));
        wtr.write_record(&header)?;

        for (i, bar) in frame.bars().iter().enumerate() {
            let mut row = vec![
                bar.timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ];
            row.extend(
                frame
                    .columns()
                    .iter()
                    .map(|c| c.values[i].map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        tracing::info!(
            path = %self.path.display(),
            rows = frame.len(),
            columns = frame.columns().len(),
            "frame written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::Column;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_reads_bars_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "eurusd.csv",
            "Timestamp,Open,High,Low,Close,Volume\n\
             2024-01-16 00:00:00,105.0,115.0,100.0,110.0,60000\n\
             2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n",
        );

        let bars = CsvAdapter::new(path).load().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[1].high, 115.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn load_accepts_reordered_columns_and_missing_volume() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "mt.csv",
            "close,low,high,open,DateTime\n1.1,1.0,1.2,1.05,2024.02.01 13:30\n",
        );

        let bars = CsvAdapter::new(path).load().unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 1.05);
        assert_eq!(bars[0].volume, 0.0);
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(13, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn load_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", "date,open,high,close\n2024-01-01,1,2,1.5\n");
        let err = CsvAdapter::new(path).load().unwrap_err();
        assert!(matches!(err, NeozorkError::MissingColumn { ref column } if column == "low"));
    }

    #[test]
    fn load_malformed_value_names_row() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "bad.csv",
            "date,open,high,low,close\n2024-01-01,1,2,0.5,1.5\n2024-01-02,1,2,0.5,abc\n",
        );
        let err = CsvAdapter::new(path).load().unwrap_err();
        match err {
            NeozorkError::DataFormat { row, reason } => {
                assert_eq!(row, 3);
                assert!(reason.contains("close"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = CsvAdapter::new(dir.path().join("nope.csv")).load();
        assert!(result.is_err());
    }

    #[test]
    fn parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-15").is_some());
        assert!(parse_timestamp("2024-01-15 10:00:00").is_some());
        assert!(parse_timestamp("2024-01-15T10:00:00").is_some());
        assert!(parse_timestamp("2024.01.15 10:00").is_some());
        assert!(parse_timestamp("15/01/2024").is_none());
    }

    #[test]
    fn write_round_trips_derived_columns() {
        let dir = TempDir::new().unwrap();
        let input = write_file(
            &dir,
            "in.csv",
            "date,open,high,low,close,volume\n2024-01-01,1,2,0.5,1.5,10\n2024-01-02,1.5,2.5,1,2,20\n",
        );
        let bars = CsvAdapter::new(input).load().unwrap();
        let mut frame = OhlcvFrame::new(bars).unwrap();
        frame
            .push_column(Column {
                name: "rsi_14".into(),
                values: vec![None, Some(55.5)],
            })
            .unwrap();

        let output = dir.path().join("nested/out.csv");
        CsvAdapter::new(&output).write(&frame).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,open,high,low,close,volume,rsi_14");
        assert_eq!(lines[1], "2024-01-01 00:00:00,1,2,0.5,1.5,10,");
        assert_eq!(lines[2], "2024-01-02 00:00:00,1.5,2.5,1,2,20,55.5");

        let reloaded = CsvAdapter::new(&output).load().unwrap();
        assert_eq!(reloaded, frame.bars());
    }
}
