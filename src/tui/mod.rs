//! Ratatui-based terminal UI.
//!
//! The TUI runs the analysis once, then shows the daily revenue chart, the
//! flagged days, and the cleaning summary. `+`/`-` move the threshold and only
//! re-run the detection step; the narrative service is never called here.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_analysis};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::report::fmt_money;

mod plotters_chart;

use plotters_chart::DailyPlottersChart;

/// Threshold change per `+`/`-` key press.
const THRESHOLD_STEP: f64 = 0.1;

/// Start the TUI.
pub fn run(config: PipelineConfig) -> Result<(), AppError> {
    // Analysis errors surface before the terminal switches screens.
    let run = run_analysis(&config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(run);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    run: RunOutput,
    status: String,
}

impl App {
    fn new(run: RunOutput) -> Self {
        let status = format!("{} anomalies at |z| > {}", run.anomalies.len(), run.threshold);
        Self { run, status }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => self.adjust_threshold(THRESHOLD_STEP),
            KeyCode::Char('-') | KeyCode::Down => self.adjust_threshold(-THRESHOLD_STEP),
            _ => {}
        }
        false
    }

    fn adjust_threshold(&mut self, delta: f64) {
        let next = step_threshold(self.run.threshold, delta);
        match self.run.with_threshold(next) {
            Ok(run) => {
                self.status = format!("{} anomalies at |z| > {}", run.anomalies.len(), run.threshold);
                self.run = run;
            }
            Err(err) => {
                self.status = err.to_string();
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let run = &self.run;
        let period = run
            .clean
            .date_range()
            .map(|(a, b)| format!("{a} to {b}"))
            .unwrap_or_else(|| "-".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("sar", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" | {}", run.input.display())),
            ]),
            Line::from(Span::styled(
                format!(
                    "revenue: {} | days: {} ({period}) | mean: {} | std: {} | threshold: {}",
                    fmt_money(run.clean.total_revenue()),
                    run.daily.len(),
                    fmt_money(run.stats.mean),
                    fmt_money(run.stats.std_dev),
                    run.threshold,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area);

        self.draw_chart(frame, chunks[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(9)])
            .split(chunks[1]);
        self.draw_anomalies(frame, side[0]);
        self.draw_cleaning(frame, side[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Daily Revenue").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(origin) = self.run.daily.first().map(|d| d.date) else {
            let msg = Paragraph::new("No daily data.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let data = chart_series(&self.run);
        let fmt_x = move |v: f64| fmt_day_offset(origin, v);
        let widget = DailyPlottersChart {
            series: &data.series,
            anomalies: &data.anomalies,
            mean: self.run.stats.mean,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "date",
            y_label: "total ($)",
            fmt_x: &fmt_x,
            fmt_y: fmt_axis_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_anomalies(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("Anomalies (|z| > {})", self.run.threshold);
        let items: Vec<ListItem> = if self.run.anomalies.is_empty() {
            vec![ListItem::new("none")]
        } else {
            self.run
                .anomalies
                .iter()
                .map(|a| {
                    let color = if a.z_score > 0.0 { Color::Red } else { Color::Blue };
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{} ", a.date)),
                        Span::raw(format!("{:>12} ", fmt_money(a.total_sum))),
                        Span::styled(format!("{:+.2}", a.z_score), Style::default().fg(color)),
                    ]))
                })
                .collect()
        };

        let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_cleaning(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let s = &self.run.clean.stats;
        let items = vec![
            ListItem::new(format!("rows read:       {}", s.rows_in)),
            ListItem::new(format!("duplicates:      {}", s.duplicates_removed)),
            ListItem::new(format!("price imputed:   {}", s.unit_price_imputed)),
            ListItem::new(format!("total imputed:   {}", s.total_imputed)),
            ListItem::new(format!("non-positive:    {}", s.non_positive_dropped)),
            ListItem::new(Span::styled(
                format!("rows kept:       {}", s.rows_out),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        let list = List::new(items).block(Block::default().title("Cleaning").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "+/- threshold  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Chart-ready series for the Plotters widget.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    series: Vec<(f64, f64)>,
    anomalies: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series with x = days since the first date.
fn chart_series(run: &RunOutput) -> ChartData {
    let origin = run.daily.first().map(|d| d.date);
    let offset = |date: NaiveDate| origin.map_or(0.0, |o| (date - o).num_days() as f64);

    let series: Vec<(f64, f64)> = run.daily.iter().map(|d| (offset(d.date), d.total_sum)).collect();
    let anomalies: Vec<(f64, f64)> = run.anomalies.iter().map(|a| (offset(a.date), a.total_sum)).collect();

    let x_max = series.last().map_or(1.0, |&(x, _)| x.max(1.0));

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in &series {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    y_min = y_min.min(run.stats.mean);
    y_max = y_max.max(run.stats.mean);
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    ChartData {
        series,
        anomalies,
        x_bounds: [0.0, x_max],
        y_bounds: [y_min - pad, y_max + pad],
    }
}

/// Step the threshold, rounded to one decimal so repeated presses don't drift.
fn step_threshold(current: f64, delta: f64) -> f64 {
    ((current + delta) * 10.0).round() / 10.0
}

fn fmt_day_offset(origin: NaiveDate, v: f64) -> String {
    let days = chrono::Days::new(v.max(0.0).round() as u64);
    origin
        .checked_add_days(days)
        .map(|d| d.format("%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.0}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Anomaly, CleanDataset, DailyAggregate, SeriesStats};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, d).unwrap()
    }

    fn fixture() -> RunOutput {
        let totals = [(1, 10.0, -0.5), (2, 10.0, -0.5), (5, 100.0, 2.0)];
        let daily = totals
            .iter()
            .map(|&(d, total_sum, z)| DailyAggregate {
                date: day(d),
                total_sum,
                record_count: 1,
                z_score: Some(z),
            })
            .collect();
        RunOutput {
            input: "sales.csv".into(),
            threshold: 1.5,
            clean: CleanDataset::default(),
            daily,
            stats: SeriesStats {
                n: 3,
                mean: 40.0,
                std_dev: 30.0,
            },
            anomalies: vec![Anomaly {
                date: day(5),
                total_sum: 100.0,
                z_score: 2.0,
            }],
        }
    }

    #[test]
    fn chart_uses_day_offsets_and_pads_bounds() {
        let data = chart_series(&fixture());
        assert_eq!(data.series, vec![(0.0, 10.0), (1.0, 10.0), (4.0, 100.0)]);
        assert_eq!(data.anomalies, vec![(4.0, 100.0)]);
        assert_eq!(data.x_bounds, [0.0, 4.0]);
        assert!((data.y_bounds[0] - 5.5).abs() < 1e-9);
        assert!((data.y_bounds[1] - 104.5).abs() < 1e-9);
    }

    #[test]
    fn threshold_keys_rerun_detection() {
        let mut app = App::new(fixture());
        assert!(!app.handle_key(KeyCode::Char('+')));
        assert_eq!(app.run.threshold, 1.6);
        assert_eq!(app.run.anomalies.len(), 1);

        for _ in 0..5 {
            app.handle_key(KeyCode::Char('+'));
        }
        assert_eq!(app.run.threshold, 2.1);
        assert!(app.run.anomalies.is_empty());
        assert!(app.status.starts_with("0 anomalies"));
    }

    #[test]
    fn threshold_cannot_reach_zero() {
        let mut run = fixture();
        run.threshold = 0.1;
        let mut app = App::new(run);
        app.handle_key(KeyCode::Char('-'));
        assert_eq!(app.run.threshold, 0.1);
        assert!(app.status.contains("threshold"));
    }

    #[test]
    fn q_quits() {
        let mut app = App::new(fixture());
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn axis_labels_show_dates() {
        assert_eq!(fmt_day_offset(day(1), 4.0), "01-05");
    }
}
