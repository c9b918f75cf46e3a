//! SVG chart adapter implementing ChartPort.
//!
//! Draws the price series in the top panel and one panel per selected
//! derived column below it. Missing values split a line into segments.

use std::fs;
use std::path::PathBuf;

use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;
use crate::domain::ohlcv::PriceType;
use crate::ports::chart_port::ChartPort;

const WIDTH: f64 = 900.0;
const PRICE_PANEL_HEIGHT: f64 = 260.0;
const INDICATOR_PANEL_HEIGHT: f64 = 140.0;
const PADDING: f64 = 40.0;
const TITLE_HEIGHT: f64 = 30.0;
const PANEL_COLORS: &[&str] = &["#d62728", "#2ca02c", "#9467bd", "#ff7f0e", "#17becf"];

/// Plot area inside an SVG document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn value_range(values: &[Option<f64>], guides: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .flatten()
        .chain(guides.iter())
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn scale_y(value: f64, min: f64, max: f64, view: &Viewport) -> f64 {
    let range = max - min;
    let scale = if range > 0.0 { view.height / range } else { 1.0 };
    let offset = if range > 0.0 { value - min } else { 0.0 };
    view.y + view.height - offset * scale
}

/// Convert a column into polyline point lists, one per unbroken run.
pub fn format_polyline(values: &[Option<f64>], min: f64, max: f64, view: &Viewport) -> Vec<String> {
    let scale_x = if values.len() > 1 {
        view.width / (values.len() - 1) as f64
    } else {
        0.0
    };

    let mut segments = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                let x = view.x + i as f64 * scale_x;
                let y = scale_y(v, min, max, view);
                current.push(format!("{:.1},{:.1}", x, y));
            }
            None => {
                if !current.is_empty() {
                    segments.push(current.join(" "));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current.join(" "));
    }
    segments
}

fn render_panel(
    out: &mut String,
    label: &str,
    values: &[Option<f64>],
    guides: &[f64],
    view: &Viewport,
    color: &str,
) {
    out.push_str(&format!(
        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#cccccc"/>
<text x="{:.1}" y="{:.1}" font-size="12" fill="#333333">{}</text>
"##,
        view.x,
        view.y,
        view.width,
        view.height,
        view.x + 4.0,
        view.y + 14.0,
        escape(label)
    ));

    let (min, max) = match value_range(values, guides) {
        Some(r) => r,
        None => return,
    };

    for guide in guides {
        let y = scale_y(*guide, min, max, view);
        out.push_str(&format!(
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#999999" stroke-dasharray="4 3"/>
"##,
            view.x,
            y,
            view.x + view.width,
            y
        ));
    }

    for segment in format_polyline(values, min, max, view) {
        out.push_str(&format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1" points="{}"/>
"#,
            color, segment
        ));
    }

    out.push_str(&format!(
        r##"<text x="{:.1}" y="{:.1}" font-size="10" fill="#666666" text-anchor="end">{:.2}</text>
<text x="{:.1}" y="{:.1}" font-size="10" fill="#666666" text-anchor="end">{:.2}</text>
"##,
        view.x - 4.0,
        view.y + 10.0,
        max,
        view.x - 4.0,
        view.y + view.height,
        min
    ));
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub struct SvgChartAdapter {
    path: PathBuf,
    price_type: PriceType,
    guides: Vec<(String, Vec<f64>)>,
}

impl SvgChartAdapter {
    pub fn new(path: impl Into<PathBuf>, price_type: PriceType) -> Self {
        Self {
            path: path.into(),
            price_type,
            guides: Vec::new(),
        }
    }

    /// Horizontal reference lines drawn in the panel of `column`.
    pub fn with_guides(mut self, column: impl Into<String>, levels: Vec<f64>) -> Self {
        self.guides.push((column.into(), levels));
        self
    }

    fn guides_for(&self, column: &str) -> &[f64] {
        self.guides
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, levels)| levels.as_slice())
            .unwrap_or(&[])
    }

    /// Build the SVG document without touching the filesystem.
    pub fn to_svg(
        &self,
        frame: &OhlcvFrame,
        columns: &[String],
        title: &str,
    ) -> Result<String, NeozorkError> {
        let panels: Vec<(&str, &[Option<f64>])> = columns
            .iter()
            .map(|name| {
                frame
                    .column(name)
                    .map(|c| (c.name.as_str(), c.values.as_slice()))
                    .ok_or_else(|| NeozorkError::MissingColumn {
                        column: name.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let height = TITLE_HEIGHT
            + PRICE_PANEL_HEIGHT
            + panels.len() as f64 * (INDICATOR_PANEL_HEIGHT + PADDING / 2.0)
            + PADDING;
        let plot_width = WIDTH - 2.0 * PADDING;

        let mut out = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{:.1}" y="20" font-size="16" fill="#000000">{}</text>
"##,
            WIDTH,
            height,
            WIDTH,
            height,
            PADDING,
            escape(title)
        );

        let prices: Vec<Option<f64>> = frame
            .bars()
            .iter()
            .map(|b| Some(b.price(self.price_type)))
            .collect();
        let price_view = Viewport {
            x: PADDING,
            y: TITLE_HEIGHT,
            width: plot_width,
            height: PRICE_PANEL_HEIGHT,
        };
        render_panel(
            &mut out,
            &self.price_type.to_string(),
            &prices,
            &[],
            &price_view,
            "#1f77b4",
        );

        let mut y = TITLE_HEIGHT + PRICE_PANEL_HEIGHT + PADDING / 2.0;
        for (i, (name, values)) in panels.iter().enumerate() {
            let view = Viewport {
                x: PADDING,
                y,
                width: plot_width,
                height: INDICATOR_PANEL_HEIGHT,
            };
            render_panel(
                &mut out,
                name,
                values,
                self.guides_for(name),
                &view,
                PANEL_COLORS[i % PANEL_COLORS.len()],
            );
            y += INDICATOR_PANEL_HEIGHT + PADDING / 2.0;
        }

        out.push_str("</svg>\n");
        Ok(out)
    }
}

impl ChartPort for SvgChartAdapter {
    fn render(
        &self,
        frame: &OhlcvFrame,
        columns: &[String],
        title: &str,
    ) -> Result<(), NeozorkError> {
        let svg = self.to_svg(frame, columns, title)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, svg)?;
        tracing::info!(path = %self.path.display(), panels = columns.len() + 1, "chart written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::Column;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_frame() -> OhlcvFrame {
        let bars = (0..4)
            .map(|i| {
                let close = 100.0 + i as f64;
                OhlcvBar {
                    timestamp: NaiveDate::from_ymd_opt(2024, 1, 1 + i)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1.0,
                }
            })
            .collect();
        let mut frame = OhlcvFrame::new(bars).unwrap();
        frame
            .push_column(Column {
                name: "rsi_2".into(),
                values: vec![None, None, Some(40.0), Some(60.0)],
            })
            .unwrap();
        frame
    }

    fn view() -> Viewport {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: 300.0,
            height: 100.0,
        }
    }

    #[test]
    fn polyline_scales_into_viewport() {
        let segments = format_polyline(&[Some(0.0), Some(5.0), Some(10.0)], 0.0, 10.0, &view());
        assert_eq!(segments, vec!["0.0,100.0 150.0,50.0 300.0,0.0"]);
    }

    #[test]
    fn polyline_breaks_on_gaps() {
        let segments = format_polyline(
            &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)],
            0.0,
            4.0,
            &view(),
        );
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn polyline_flat_series_sits_on_baseline() {
        let segments = format_polyline(&[Some(5.0), Some(5.0)], 5.0, 5.0, &view());
        assert_eq!(segments, vec!["0.0,100.0 300.0,100.0"]);
    }

    #[test]
    fn polyline_all_missing() {
        assert!(format_polyline(&[None, None], 0.0, 1.0, &view()).is_empty());
    }

    #[test]
    fn svg_has_panels_and_guides() {
        let adapter =
            SvgChartAdapter::new("unused.svg", PriceType::Close).with_guides("rsi_2", vec![30.0, 70.0]);
        let svg = adapter
            .to_svg(&sample_frame(), &["rsi_2".to_string()], "EURUSD <H1>")
            .unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("EURUSD &lt;H1&gt;"));
        assert!(svg.contains(">rsi_2</text>"));
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn unknown_column_is_error() {
        let adapter = SvgChartAdapter::new("unused.svg", PriceType::Close);
        let err = adapter
            .to_svg(&sample_frame(), &["kelly_20".to_string()], "x")
            .unwrap_err();
        assert!(matches!(err, NeozorkError::MissingColumn { .. }));
    }

    #[test]
    fn render_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deep/chart.svg");
        SvgChartAdapter::new(&path, PriceType::Open)
            .render(&sample_frame(), &[], "price only")
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("price only"));
        assert!(contents.contains(">open</text>"));
    }
}
