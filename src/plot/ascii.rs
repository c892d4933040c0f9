//! ASCII plotting of thermal transients for terminal output.
//!
//! Fixed-size character grid with a logarithmic time axis, since transients
//! span many decades. Plot elements:
//! - measured samples: `o`
//! - model curves: one marker character per curve (`-` for the main fit)

use crate::domain::Measurement;

/// A model curve to draw, with its marker character.
#[derive(Debug, Clone, Copy)]
pub struct Curve<'a> {
    pub points: &'a [Measurement],
    pub marker: char,
}

impl<'a> Curve<'a> {
    pub fn new(points: &'a [Measurement], marker: char) -> Self {
        Self { points, marker }
    }
}

/// Render measured samples with a single fitted curve.
pub fn render_ascii_plot(
    observed: &[Measurement],
    fitted: &[Measurement],
    width: usize,
    height: usize,
) -> String {
    render_plot(observed, &[Curve::new(fitted, '-')], width, height)
}

/// Render measured samples with any number of curves (drawn in order).
pub fn render_plot(observed: &[Measurement], curves: &[Curve<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || {
        observed
            .iter()
            .chain(curves.iter().flat_map(|c| c.points.iter()))
            .filter(|p| p.t > 0.0 && p.t.is_finite() && p.zth.is_finite())
    };

    let (t_min, t_max) = range(all().map(|p| p.t)).unwrap_or((1e-3, 1.0));
    let (y_min, y_max) = range(all().map(|p| p.zth)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so samples overlay them.
    for curve in curves {
        draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);
    }
    for p in observed.iter().filter(|p| p.t > 0.0) {
        let x = map_x(p.t, t_min, t_max, width);
        let y = map_y(p.zth, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.3e}, {t_max:.3e}] s (log) | Zth=[{y_min:.3}, {y_max:.3}] K/W\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t.log10() - t_min.log10()) / (t_max.log10() - t_min.log10())).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &Curve<'_>, t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for p in curve.points.iter().filter(|p| p.t > 0.0 && p.zth.is_finite()) {
        let x = map_x(p.t, t_min, t_max, width);
        let y = map_y(p.zth, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, curve.marker),
            None => grid[y][x] = curve.marker,
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham). Never overwrites a non-blank cell.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let observed = vec![Measurement::new(0.1, 0.0), Measurement::new(10.0, 1.0)];
        let fitted = vec![
            Measurement::new(0.1, 0.0),
            Measurement::new(1.0, 0.5),
            Measurement::new(10.0, 1.0),
        ];

        let txt = render_ascii_plot(&observed, &fitted, 11, 5);
        let expected = concat!(
            "Plot: t=[1.000e-1, 1.000e1] s (log) | Zth=[-0.050, 1.050] K/W\n",
            "         -o\n",
            "       --  \n",
            "    ---    \n",
            "  --       \n",
            "o-         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn second_curve_uses_its_own_marker() {
        let a = vec![Measurement::new(1.0, 0.0), Measurement::new(100.0, 0.0)];
        let b = vec![Measurement::new(1.0, 1.0), Measurement::new(100.0, 1.0)];
        let txt = render_plot(&[], &[Curve::new(&a, '-'), Curve::new(&b, '*')], 12, 6);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[0], "*".repeat(12));
        assert_eq!(rows[5], "-".repeat(12));
    }

    #[test]
    fn degenerate_input_still_renders() {
        let txt = render_ascii_plot(&[], &[], 10, 5);
        assert_eq!(txt.lines().count(), 6);
    }
}
