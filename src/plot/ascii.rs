//! ASCII plotting of the daily revenue series.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal or a Markdown code block
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - daily totals: `o`, joined by a `-` line
//! - anomalies: `A`

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::{Anomaly, DailyAggregate};

/// Render the daily series with anomalies highlighted.
///
/// The x-axis is calendar time, so gaps between dates stay visible.
pub fn render_daily_plot(daily: &[DailyAggregate], anomalies: &[Anomaly], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (daily.first(), daily.last()) else {
        return "Plot: (no data)\n".to_string();
    };
    let origin = first.date;
    let t_max = day_offset(origin, last.date).max(1.0);

    let (y_min, y_max) = y_range(daily).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let cells: Vec<(usize, usize)> = daily
        .iter()
        .map(|d| {
            (
                map_x(day_offset(origin, d.date), 0.0, t_max, width),
                map_y(d.total_sum, y_min, y_max, height),
            )
        })
        .collect();

    // Line first so markers overlay it.
    for pair in cells.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }

    let flagged: HashSet<NaiveDate> = anomalies.iter().map(|a| a.date).collect();
    for (d, &(x, y)) in daily.iter().zip(&cells) {
        grid[y][x] = if flagged.contains(&d.date) { 'A' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: dates=[{}, {}] | total=[{y_min:.2}, {y_max:.2}]\n",
        first.date, last.date
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn day_offset(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

fn y_range(daily: &[DailyAggregate]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for d in daily {
        min_y = min_y.min(d.total_sum);
        max_y = max_y.max(d.total_sum);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
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
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
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

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, n).unwrap()
    }

    fn agg(n: u32, total_sum: f64) -> DailyAggregate {
        DailyAggregate {
            date: day(n),
            total_sum,
            record_count: 1,
            z_score: None,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let daily = vec![agg(1, 10.0), agg(2, 10.0), agg(3, 100.0)];
        let anomalies = vec![Anomaly {
            date: day(3),
            total_sum: 100.0,
            z_score: 1.41,
        }];

        let txt = render_daily_plot(&daily, &anomalies, 10, 5);
        let expected = concat!(
            "Plot: dates=[2019-01-01, 2019-01-03] | total=[5.50, 104.50]\n",
            "         A\n",
            "        - \n",
            "       -  \n",
            "      -   \n",
            "o----o    \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_series_renders_placeholder() {
        assert_eq!(render_daily_plot(&[], &[], 20, 5), "Plot: (no data)\n");
    }
}
