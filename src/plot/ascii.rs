//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output (golden tests below).
//!
//! Layers are drawn in order. Line layers only fill blank cells, so an
//! earlier line wins where curves cross; point layers always overwrite.
//! Lines break at non-finite entries instead of bridging the gap.

use crate::domain::CurveResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStyle {
    Line,
    Points,
}

#[derive(Debug, Clone, Copy)]
pub struct PlotLayer<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub glyph: char,
    pub style: LayerStyle,
}

impl<'a> PlotLayer<'a> {
    pub fn line(x: &'a [f64], y: &'a [f64], glyph: char) -> Self {
        Self { x, y, glyph, style: LayerStyle::Line }
    }

    pub fn points(x: &'a [f64], y: &'a [f64], glyph: char) -> Self {
        Self { x, y, glyph, style: LayerStyle::Points }
    }

    pub fn curve(curve: &'a CurveResult, glyph: char) -> Self {
        Self::line(&curve.x, &curve.y, glyph)
    }

    fn finite(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

/// Grid size and orientation.
#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    pub width: usize,
    pub height: usize,
    /// Put the smallest y on the top row (magnitudes: brighter is up).
    pub invert_y: bool,
}

pub fn render_ascii_plot(layers: &[PlotLayer<'_>], x_label: &str, y_label: &str, opts: PlotOptions) -> String {
    let width = opts.width.max(10);
    let height = opts.height.max(5);

    let (x_min, x_max) = axis_range(layers.iter().flat_map(|l| l.finite().map(|(x, _)| x)));
    let (y_min, y_max) = axis_range(layers.iter().flat_map(|l| l.finite().map(|(_, y)| y)));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let project = |x: f64, y: f64| {
        (
            map_x(x, x_min, x_max, width),
            map_y(y, y_min, y_max, height, opts.invert_y),
        )
    };

    for layer in layers {
        match layer.style {
            LayerStyle::Line => {
                let mut prev: Option<(usize, usize)> = None;
                for (&x, &y) in layer.x.iter().zip(layer.y.iter()) {
                    if !(x.is_finite() && y.is_finite()) {
                        prev = None;
                        continue;
                    }
                    let (cx, cy) = project(x, y);
                    match prev {
                        Some((x0, y0)) => draw_line(&mut grid, x0, y0, cx, cy, layer.glyph),
                        None => {
                            if grid[cy][cx] == ' ' {
                                grid[cy][cx] = layer.glyph;
                            }
                        }
                    }
                    prev = Some((cx, cy));
                }
            }
            LayerStyle::Points => {
                for (x, y) in layer.finite() {
                    let (cx, cy) = project(x, y);
                    grid[cy][cx] = layer.glyph;
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.3}, {y_max:.3}]{}\n",
        if opts.invert_y { " (inverted)" } else { "" }
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(min.is_finite() && max.is_finite()) {
        (0.0, 1.0)
    } else if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize, invert: bool) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    let rows = height as f64 - 1.0;
    if invert {
        (u * rows).round() as usize
    } else {
        // y max on row 0
        (rows - u * rows).round() as usize
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
