//! Parquet file adapter: OHLCV source and frame sink.
//!
//! Reading locates columns by name (case-insensitive) like the CSV adapter.
//! Timestamps may be stored as any Arrow timestamp or date type, as epoch
//! milliseconds, or as text in one of the CSV timestamp formats. Price and
//! volume columns may be any numeric type.
//!
//! Writing stores the timestamp as `Timestamp(Millisecond)` and every other
//! column as nullable `Float64`.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::adapters::csv_adapter::{TIMESTAMP_HEADERS, VOLUME_HEADERS, parse_timestamp};
use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use crate::ports::frame_port::FramePort;

pub struct ParquetAdapter {
    path: PathBuf,
}

impl ParquetAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn find_column(schema: &Schema, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|name| {
        schema
            .fields()
            .iter()
            .position(|f| f.name().trim().eq_ignore_ascii_case(name))
    })
}

fn require_column(schema: &Schema, name: &str) -> Result<usize, NeozorkError> {
    find_column(schema, &[name]).ok_or_else(|| NeozorkError::MissingColumn {
        column: name.to_string(),
    })
}

fn float_column(batch: &RecordBatch, idx: usize) -> Result<Float64Array, NeozorkError> {
    let casted = cast(batch.column(idx), &DataType::Float64)?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| NeozorkError::DataFormat {
            row: 0,
            reason: format!("column '{}' is not numeric", batch.schema().field(idx).name()),
        })
}

/// Decode the timestamp column of one batch; `None` marks a null or unparseable cell.
fn timestamp_column(batch: &RecordBatch, idx: usize) -> Result<Vec<Option<NaiveDateTime>>, NeozorkError> {
    let column = batch.column(idx);
    match column.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = cast(column, &DataType::Utf8)?;
            let text = text
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| NeozorkError::DataFormat {
                    row: 0,
                    reason: "timestamp column is not text".into(),
                })?;
            Ok((0..text.len())
                .map(|i| {
                    if text.is_null(i) {
                        None
                    } else {
                        parse_timestamp(text.value(i))
                    }
                })
                .collect())
        }
        _ => {
            let millis = cast(column, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            let millis = millis
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .ok_or_else(|| NeozorkError::DataFormat {
                    row: 0,
                    reason: format!("unsupported timestamp type {}", column.data_type()),
                })?;
            Ok((0..millis.len())
                .map(|i| {
                    if millis.is_null(i) {
                        None
                    } else {
                        DateTime::from_timestamp_millis(millis.value(i)).map(|dt| dt.naive_utc())
                    }
                })
                .collect())
        }
    }
}

fn value_at(array: &Float64Array, i: usize, name: &str, row: usize) -> Result<f64, NeozorkError> {
    if array.is_null(i) {
        return Err(NeozorkError::DataFormat {
            row,
            reason: format!("missing {} value", name),
        });
    }
    Ok(array.value(i))
}

impl DataPort for ParquetAdapter {
    fn load(&self) -> Result<Vec<OhlcvBar>, NeozorkError> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut bars = Vec::new();
        for batch in reader {
            let batch = batch?;
            let schema = batch.schema();

            let ts_idx = find_column(&schema, TIMESTAMP_HEADERS).ok_or_else(|| {
                NeozorkError::MissingColumn {
                    column: "timestamp".into(),
                }
            })?;
            let timestamps = timestamp_column(&batch, ts_idx)?;
            let open = float_column(&batch, require_column(&schema, "open")?)?;
            let high = float_column(&batch, require_column(&schema, "high")?)?;
            let low = float_column(&batch, require_column(&schema, "low")?)?;
            let close = float_column(&batch, require_column(&schema, "close")?)?;
            let volume = match find_column(&schema, VOLUME_HEADERS) {
                Some(idx) => Some(float_column(&batch, idx)?),
                None => None,
            };

            let offset = bars.len();
            for (i, timestamp) in timestamps.into_iter().enumerate() {
                let row = offset + i + 1;
                let timestamp = timestamp.ok_or_else(|| NeozorkError::DataFormat {
                    row,
                    reason: "missing or invalid timestamp".into(),
                })?;
                bars.push(OhlcvBar {
                    timestamp,
                    open: value_at(&open, i, "open", row)?,
                    high: value_at(&high, i, "high", row)?,
                    low: value_at(&low, i, "low", row)?,
                    close: value_at(&close, i, "close", row)?,
                    volume: match &volume {
                        Some(v) => value_at(v, i, "volume", row)?,
                        None => 0.0,
                    },
                });
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        tracing::info!(path = %self.path.display(), bars = bars.len(), "loaded OHLCV data");
        Ok(bars)
    }
}

impl FramePort for ParquetAdapter {
    fn write(&self, frame: &OhlcvFrame) -> Result<(), NeozorkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut fields = vec![Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        )];
        fields.extend(
            ["open", "high", "low", "close", "volume"]
                .iter()
                .map(|name| Field::new(*name, DataType::Float64, false)),
        );
        fields.extend(
            frame
                .columns()
                .iter()
                .map(|c| Field::new(c.name.as_str(), DataType::Float64, true)),
        );
        let schema = Arc::new(Schema::new(fields));

        let bars = frame.bars();
        let price = |f: fn(&OhlcvBar) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from(bars.iter().map(f).collect::<Vec<_>>()))
        };
        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(TimestampMillisecondArray::from(
                bars.iter()
                    .map(|b| b.timestamp.and_utc().timestamp_millis())
                    .collect::<Vec<_>>(),
            )),
            price(|b| b.open),
            price(|b| b.high),
            price(|b| b.low),
            price(|b| b.close),
            price(|b| b.volume),
        ];
        arrays.extend(
            frame
                .columns()
                .iter()
                .map(|c| Arc::new(Float64Array::from(c.values.clone())) as ArrayRef),
        );

        let batch = RecordBatch::try_new(schema.clone(), arrays)?;
        let file = File::create(&self.path)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::info!(
            path = %self.path.display(),
            rows = frame.len(),
            columns = frame.columns().len(),
            "frame written"
        );
        Ok(())
    }
}
