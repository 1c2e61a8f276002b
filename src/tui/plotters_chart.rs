//! Plotters-powered isochrone chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using
//! `plotters-ratatui-backend`.
//!
//! Axis inversion (magnitudes grow downward, temperature grows leftward) is
//! done by negating coordinates and un-negating tick labels, so the chart
//! builder only ever sees increasing ranges.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One curve, already split into finite runs.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub segments: Vec<Vec<(f64, f64)>>,
    pub color: RGBColor,
}

impl ChartSeries {
    pub fn new(x: &[f64], y: &[f64], color: RGBColor) -> Self {
        Self {
            segments: finite_segments(x, y),
            color,
        }
    }

    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.segments.iter().flatten().copied()
    }
}

/// A render-only chart description; bounds are computed before render.
pub struct IsoPlottersChart<'a> {
    pub series: &'a [ChartSeries],
    /// Unconnected points (the observational overlay).
    pub points: &'a [(f64, f64)],
    /// Data-space bounds, `[min, max]`.
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Draw larger x values on the left.
    pub flip_x: bool,
    /// Draw larger y values at the bottom.
    pub flip_y: bool,
}

impl<'a> Widget for IsoPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let sx = if self.flip_x { -1.0 } else { 1.0 };
        let sy = if self.flip_y { -1.0 } else { 1.0 };
        let (cx0, cx1) = oriented(x0, x1, sx);
        let (cy0, cy1) = oriented(y0, y1, sy);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(cx0..cx1, cy0..cy1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{:.2}", v * sx))
                .y_label_formatter(&|v| format!("{:.1}", v * sy))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for series in self.series {
                for segment in &series.segments {
                    chart.draw_series(LineSeries::new(
                        segment.iter().map(|&(x, y)| (x * sx, y * sy)),
                        &series.color,
                    ))?;
                }
            }

            // Circle markers map radii badly through the backend; pixels are clean dots.
            chart.draw_series(
                self.points
                    .iter()
                    .map(|&(x, y)| Pixel::new((x * sx, y * sy), WHITE)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

fn oriented(lo: f64, hi: f64, sign: f64) -> (f64, f64) {
    if sign < 0.0 { (-hi, -lo) } else { (lo, hi) }
}

/// Split parallel sequences into runs of consecutive finite points.
pub fn finite_segments(x: &[f64], y: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        if xv.is_finite() && yv.is_finite() {
            current.push((xv, yv));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Padded data bounds over every series and point, or `None` when empty.
pub fn chart_bounds(series: &[ChartSeries], points: &[(f64, f64)]) -> Option<([f64; 2], [f64; 2])> {
    let all = series.iter().flat_map(ChartSeries::points).chain(points.iter().copied());
    let (mut x_min, mut x_max, mut y_min, mut y_max) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !(x_min.is_finite() && y_min.is_finite()) {
        return None;
    }
    Some((pad(x_min, x_max), pad(y_min, y_max)))
}

fn pad(min: f64, max: f64) -> [f64; 2] {
    let span = max - min;
    if span <= 0.0 {
        return [min - 0.5, max + 0.5];
    }
    let p = span * 0.05;
    [min - p, max + p]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_at_non_finite_values() {
        let x = [0.0, 1.0, f64::NAN, 3.0, 4.0, 5.0];
        let y = [0.0, 1.0, 2.0, f64::INFINITY, 4.0, 5.0];
        let segs = finite_segments(&x, &y);
        assert_eq!(segs, vec![vec![(0.0, 0.0), (1.0, 1.0)], vec![(4.0, 4.0), (5.0, 5.0)]]);
    }

    #[test]
    fn bounds_cover_series_and_points() {
        let series = [ChartSeries::new(&[0.0, 1.0], &[10.0, 20.0], RGBColor(0, 255, 255))];
        let (xb, yb) = chart_bounds(&series, &[(2.0, 15.0)]).unwrap();
        assert!((xb[0] + 0.1).abs() < 1e-12 && (xb[1] - 2.1).abs() < 1e-12);
        assert!((yb[0] - 9.5).abs() < 1e-12 && (yb[1] - 20.5).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_have_no_bounds() {
        let series = [ChartSeries::new(&[f64::NAN], &[1.0], RGBColor(0, 0, 0))];
        assert!(chart_bounds(&series, &[]).is_none());
    }

    #[test]
    fn flipped_ranges_stay_increasing() {
        assert_eq!(oriented(10.0, 15.0, -1.0), (-15.0, -10.0));
        assert_eq!(oriented(10.0, 15.0, 1.0), (10.0, 15.0));
    }
}
