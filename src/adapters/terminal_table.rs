//! Plain-text rendering of the tail of a frame for terminal output.

use crate::domain::frame::{Column, OhlcvFrame};
use crate::domain::indicator::Signal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

/// Signal columns print as labels, everything else as numbers.
fn column_cell(column: &Column, i: usize) -> String {
    let value = column.values[i];
    if column.name.ends_with("_signal") {
        if let Some(signal) = value.and_then(Signal::from_code) {
            return signal.to_string();
        }
    }
    cell(value)
}

/// Render the last `rows` bars with every derived column, right-aligned.
pub fn format_tail(frame: &OhlcvFrame, rows: usize) -> String {
    let mut header = vec!["timestamp".to_string(), "close".to_string()];
    header.extend(frame.columns().iter().map(|c| c.name.clone()));

    let start = frame.len().saturating_sub(rows);
    let body: Vec<Vec<String>> = (start..frame.len())
        .map(|i| {
            let bar = &frame.bars()[i];
            let mut row = vec![
                bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                cell(Some(bar.close)),
            ];
            row.extend(frame.columns().iter().map(|c| column_cell(c, i)));
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            body.iter()
                .map(|r| r[col].len())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let join = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:>width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = join(&header[..]);
    out.push('\n');
    for row in &body {
        out.push_str(&join(&row[..]));
        out.push('\n');
    }
    out
}
