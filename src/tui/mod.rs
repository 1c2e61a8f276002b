//! Ratatui-based terminal UI.
//!
//! The TUI is an event-dispatch adapter: key presses become `ParamChange`
//! messages for the `ReactiveController`, and drawing reads back the
//! in-memory sinks the controller writes into. Nothing here computes curves.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use plotters::style::RGBColor;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Terminal,
};
use tracing::{info, warn};

use crate::app::pipeline;
use crate::controller::{BufferBoard, ExplorerState, Field, PassReport, ReactiveController, StepContext};
use crate::domain::{CurveRole, DisplayMode, ExplorerConfig};
use crate::error::AppError;
use crate::expr::is_magnitude;
use crate::grid::ModelGrid;
use crate::io::Overlay;

mod plotters_chart;

use plotters_chart::{chart_bounds, ChartSeries, IsoPlottersChart};

/// Load the grid, then start the TUI.
pub fn run(config: ExplorerConfig, out_dir: PathBuf) -> Result<(), AppError> {
    // Load before entering the alternate screen so load errors print normally.
    let grid = Arc::new(pipeline::build_grid(&config)?);
    let overlay = pipeline::load_overlay(&config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, grid, overlay, out_dir);
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
    config: ExplorerConfig,
    controller: ReactiveController,
    board: BufferBoard,
    selected_field: usize,
    status: String,
    out_dir: PathBuf,
}

impl App {
    fn new(config: ExplorerConfig, grid: Arc<ModelGrid>, overlay: Option<Overlay>, out_dir: PathBuf) -> Self {
        let board = BufferBoard::new();
        let state = ExplorerState::initial(&config, &grid);
        let mut controller = ReactiveController::new(grid, state, board.sinks());
        if let Some(overlay) = overlay {
            controller.set_overlay(overlay.x, overlay.y);
        }
        let report = controller.refresh();

        let mut app = Self {
            config,
            controller,
            board,
            selected_field: 0,
            status: String::new(),
            out_dir,
        };
        app.status = app.describe(&report, "ready");
        app
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

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
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
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < Field::ALL.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.step_field(-1),
            KeyCode::Right => self.step_field(1),
            KeyCode::Char('h') => {
                let mode = match self.controller.state().mode {
                    DisplayMode::Cmd => DisplayMode::CmdWithHrd,
                    DisplayMode::CmdWithHrd => DisplayMode::Cmd,
                };
                let report = self.controller.apply(crate::controller::ParamChange::Mode(mode));
                self.status = self.describe(&report, &format!("mode: {mode:?}"));
            }
            KeyCode::Char('r') => {
                let report = self.controller.refresh();
                self.status = self.describe(&report, "refreshed");
            }
            KeyCode::Char('d') => {
                self.status = match crate::snapshot::write_snapshot(&self.out_dir, &self.controller, &self.board) {
                    Ok(path) => format!("Wrote snapshot: {}", path.display()),
                    Err(err) => format!("Snapshot failed: {err}"),
                };
            }
            KeyCode::Char('e') => {
                self.status = match self.export_primary() {
                    Ok(path) => format!("Exported curve: {}", path.display()),
                    Err(err) => format!("Export failed: {err}"),
                };
            }
            _ => {}
        }

        false
    }

    fn step_field(&mut self, delta: i32) {
        let field = Field::ALL[self.selected_field];
        let change = {
            let ctx = StepContext {
                grid: self.controller.grid(),
                age_min: self.config.age_min,
                age_max: self.config.age_max,
            };
            field.step(self.controller.state(), &ctx, delta)
        };
        let Some(change) = change else {
            return;
        };
        let report = self.controller.apply(change);
        let done = format!("{}: {}", field.label(), field.value(self.controller.state()));
        self.status = self.describe(&report, &done);
    }

    /// Write the primary curve as CSV + JSON into the output directory.
    fn export_primary(&self) -> Result<PathBuf, AppError> {
        let request = self
            .controller
            .request_for(CurveRole::Primary)?
            .ok_or_else(|| AppError::new(3, "primary curve is not shown"))?;
        let curve = pipeline::run_curve(self.controller.grid(), &request)?;

        std::fs::create_dir_all(&self.out_dir)
            .map_err(|e| AppError::new(4, format!("Failed to create output dir: {e}")))?;
        let table = crate::io::table_file_name(request.key, &self.config.extra_tag);
        let stem = format!(
            "isox_{}_age{:.2}_{}",
            table.trim_end_matches(".csv"),
            request.age,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let csv_path = self.out_dir.join(format!("{stem}.csv"));
        crate::io::write_curve_csv(&csv_path, &curve)?;
        crate::io::write_curve_json(
            &self.out_dir.join(format!("{stem}.json")),
            self.config.photometry,
            &request,
            &curve,
        )?;
        info!(path = %csv_path.display(), "curve exported");
        Ok(csv_path)
    }

    fn describe(&self, report: &PassReport, done: &str) -> String {
        if let Some(err) = &report.rejected {
            warn!(%err, "change rejected");
            return format!("rejected: {err}");
        }
        match self.controller.diagnostic() {
            Some(diag) if !report.is_clean() => diag.to_string(),
            _ => done.to_string(),
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
        let grid = self.controller.grid();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("isox", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " | MIST isochrones | {} | {} tables | x: {} | y: {}",
                self.config.photometry,
                grid.len(),
                self.board.x_label.text(),
                self.board.y_label.text(),
            )),
        ]));

        let diag = self.board.diagnostics.text();
        let (text, color) = if diag.is_empty() {
            ("no diagnostics".to_string(), Color::Gray)
        } else {
            (diag, Color::Red)
        };
        lines.push(Line::from(Span::styled(text, Style::default().fg(color))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(32)])
            .split(area);

        if self.controller.state().mode == DisplayMode::CmdWithHrd {
            let charts = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[0]);
            self.draw_cmd(frame, charts[0]);
            self.draw_hrd(frame, charts[1]);
        } else {
            self.draw_cmd(frame, chunks[0]);
        }
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_cmd(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let reference = self.board.reference.snapshot();
        let primary = self.board.primary.snapshot();
        let highlight = self.board.mass_highlight.snapshot();
        let overlay = self.board.overlay.snapshot();

        // Later series draw on top.
        let series = [
            ChartSeries::new(&reference.x, &reference.y, RGBColor(160, 160, 160)),
            ChartSeries::new(&primary.x, &primary.y, RGBColor(0, 255, 255)),
            ChartSeries::new(&highlight.x, &highlight.y, RGBColor(255, 255, 0)),
        ];
        let points = overlay.finite_points();

        let x_label = self.board.x_label.text();
        let y_label = self.board.y_label.text();
        let flip_y = is_magnitude(&self.controller.state().y, self.controller.grid().catalog());
        self.draw_chart(frame, area, "Isochrones", &series, &points, &x_label, &y_label, false, flip_y);
    }

    fn draw_hrd(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let hrd = self.board.hrd.snapshot();
        let series = [ChartSeries::new(&hrd.x, &hrd.y, RGBColor(255, 128, 0))];
        // Hot stars on the left.
        self.draw_chart(frame, area, "HRD", &series, &[], "log_Teff", "log_L", true, false);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_chart(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        title: &str,
        series: &[ChartSeries],
        points: &[(f64, f64)],
        x_label: &str,
        y_label: &str,
        flip_x: bool,
        flip_y: bool,
    ) {
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some((x_bounds, y_bounds)) = chart_bounds(series, points) else {
            let msg = Paragraph::new("No curve to show.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let widget = IsoPlottersChart {
            series,
            points,
            x_bounds,
            y_bounds,
            x_label,
            y_label,
            flip_x,
            flip_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let state = self.controller.state();
        let items: Vec<ListItem> = Field::ALL
            .iter()
            .map(|f| ListItem::new(format!("{:<16} {}", f.label(), f.value(state))))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Parameters").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut list_state = ratatui::widgets::ListState::default();
        list_state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  h HRD  r refresh  e export  d snapshot  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}
