//! Plotters-powered daily revenue chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; all series and bounds are computed
/// outside the render call.
pub struct DailyPlottersChart<'a> {
    /// Daily totals as (day offset, total), in date order.
    pub series: &'a [(f64, f64)],
    /// Flagged days (a subset of `series`).
    pub anomalies: &'a [(f64, f64)],
    /// Horizontal reference line at the series mean.
    pub mean: f64,
    /// X bounds (days since the first date).
    pub x_bounds: [f64; 2],
    /// Y bounds (revenue).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Tick label formatting; the x formatter maps a day offset to a date.
    pub fmt_x: &'a dyn Fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for DailyPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters can fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let series_color = RGBColor(0, 255, 255); // cyan
            let mean_color = RGBColor(128, 128, 128);
            let anomaly_color = RGBColor(255, 0, 0); // red

            chart.draw_series(LineSeries::new([(x0, self.mean), (x1, self.mean)], &mean_color))?;
            chart.draw_series(LineSeries::new(self.series.iter().copied(), &series_color))?;

            // Circle radii come out wrong through the ratatui backend; a colored
            // pixel is the reliable marker.
            chart.draw_series(
                self.anomalies
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), anomaly_color)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
