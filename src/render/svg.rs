// =============================================================================
// SVG Chart Renderer — plotters
// =============================================================================
//
// Draws one line per symbol (legend in configured order) on a shared date
// axis, rates shown as percentages, into an in-memory SVG document.
// =============================================================================

use chrono::{Days, NaiveDate};
use plotters::prelude::*;

use crate::error::RenderError;
use crate::indicators::avg_rate::RECENT_WINDOW;
use crate::types::{Artifact, SymbolSeries, SVG_CONTENT_TYPE};

/// 11 x 8 inches at 96 dpi.
const CHART_SIZE: (u32, u32) = (1056, 768);

/// Turns named series into a servable artifact.
pub trait Renderer: Send + Sync {
    fn render(&self, series: &[SymbolSeries]) -> Result<Artifact, RenderError>;
}

/// Renders the average-rate chart as SVG.
pub struct SvgRenderer {
    lookback: usize,
    size: (u32, u32),
}

impl SvgRenderer {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            size: CHART_SIZE,
        }
    }

    fn title(&self) -> String {
        format!(
            "Normalized Rate of Change Over Time: ((Prior {RECENT_WINDOW} Day(s) Average Price) - (Prior {n} Day(s) Average Price)) / (Prior {n} Day(s) Average Price)",
            n = self.lookback
        )
    }
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Date and rate bounds over every point, padded so lines never touch the frame.
fn bounds(series: &[SymbolSeries]) -> ((NaiveDate, NaiveDate), (f64, f64)) {
    let points = series.iter().flat_map(|s| s.points.iter());

    let mut x_min = NaiveDate::MAX;
    let mut x_max = NaiveDate::MIN;
    // The zero line is always visible.
    let mut y_min = 0.0_f64;
    let mut y_max = 0.0_f64;
    for p in points {
        x_min = x_min.min(p.date);
        x_max = x_max.max(p.date);
        y_min = y_min.min(p.rate);
        y_max = y_max.max(p.rate);
    }
    if x_max <= x_min {
        x_max = x_min.checked_add_days(Days::new(1)).unwrap_or(x_min);
    }

    let padding = ((y_max - y_min) * 0.1).max(0.01);
    ((x_min, x_max), (y_min - padding, y_max + padding))
}

impl Renderer for SvgRenderer {
    fn render(&self, series: &[SymbolSeries]) -> Result<Artifact, RenderError> {
        if series.is_empty() {
            return Err(RenderError::NoData("no symbols configured".to_string()));
        }
        if let Some(empty) = series.iter().find(|s| s.points.is_empty()) {
            return Err(RenderError::NoData(format!(
                "{} has no points after the {}-day lookback",
                empty.symbol, self.lookback
            )));
        }
        if let Some(bad) = series
            .iter()
            .find(|s| s.points.iter().any(|p| !p.rate.is_finite()))
        {
            return Err(RenderError::NoData(format!(
                "{} has non-finite rates",
                bad.symbol
            )));
        }

        let ((x_min, x_max), (y_min, y_max)) = bounds(series);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(self.title(), ("sans-serif", 16))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .light_line_style(BLACK.mix(0.05))
                .x_labels(12)
                .y_labels(10)
                .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
                .y_label_formatter(&|v: &f64| format!("{:02}%", (v * 100.0) as i64))
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(LineSeries::new(
                    vec![(x_min, 0.0), (x_max, 0.0)],
                    BLACK.mix(0.6).stroke_width(1),
                ))
                .map_err(draw_err)?;

            for (idx, s) in series.iter().enumerate() {
                let style = Palette99::pick(idx).stroke_width(2);
                chart
                    .draw_series(LineSeries::new(
                        s.points.iter().map(|p| (p.date, p.rate)),
                        style,
                    ))
                    .map_err(draw_err)?
                    .label(s.symbol.to_string())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }

        Ok(Artifact::new(SVG_CONTENT_TYPE, svg.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Symbol, TransformedPoint};

    fn series(name: &str, rates: &[f64]) -> SymbolSeries {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        SymbolSeries {
            symbol: Symbol::new(name),
            points: rates
                .iter()
                .enumerate()
                .map(|(i, &rate)| TransformedPoint {
                    date: start + Days::new(i as u64),
                    rate,
                })
                .collect(),
        }
    }

    #[test]
    fn renders_svg_with_legend() {
        let renderer = SvgRenderer::new(365);
        let artifact = renderer
            .render(&[
                series("spy", &[0.01, 0.02, -0.03]),
                series("vt", &[0.0, 0.05, 0.04]),
            ])
            .unwrap();
        assert_eq!(artifact.content_type(), "image/svg+xml");
        let text = std::str::from_utf8(artifact.bytes()).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("spy"));
        assert!(text.contains("vt"));
        assert!(text.contains("Prior 365 Day(s)"));
    }

    #[test]
    fn single_point_series_renders() {
        let renderer = SvgRenderer::new(20);
        assert!(renderer.render(&[series("dia", &[0.0])]).is_ok());
    }

    #[test]
    fn empty_input_is_an_error() {
        let renderer = SvgRenderer::new(20);
        assert!(matches!(renderer.render(&[]), Err(RenderError::NoData(_))));
        assert!(matches!(
            renderer.render(&[series("spy", &[0.1]), series("vt", &[])]),
            Err(RenderError::NoData(msg)) if msg.starts_with("vt")
        ));
        assert!(matches!(
            renderer.render(&[series("spy", &[f64::NAN])]),
            Err(RenderError::NoData(_))
        ));
    }

    #[test]
    fn bounds_include_zero_and_pad() {
        let ((x0, x1), (y0, y1)) = bounds(&[series("spy", &[0.1, 0.2])]);
        assert!(x0 < x1);
        assert!(y0 < 0.0);
        assert!(y1 > 0.2);
    }
}
