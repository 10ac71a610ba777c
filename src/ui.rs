//! Terminal User Interface module using Ratatui.
//!
//! Renders the dashboard from published view states: top talkers, protocol
//! mix, and the per-client drill-down overlay. All user input is translated
//! into controller commands; nothing here mutates the view state directly.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        BarChart, Block, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};

use crate::aggregate::{format_bytes, protocol_rollup, rank_protocols, top_talkers, total_volume};
use crate::config::{Theme, UiConfig};
use crate::controller::{Command, ViewState};
use crate::drilldown::{DrillDown, FetchState};
use crate::error::{Result, UiError};
use crate::model::{Period, TrafficRecord, ViewMode};

/// Terminal type alias for convenience.
type Term = Terminal<CrosstermBackend<Stdout>>;

/// UI state and configuration.
pub struct App {
    /// Latest published view state.
    state: ViewState,
    /// Channel into the controller.
    commands: mpsc::Sender<Command>,
    /// Table selection state.
    table_state: TableState,
    /// Scrollbar state.
    scroll_state: ScrollbarState,
    /// Whether to show help overlay.
    show_help: bool,
    /// Application running state.
    running: bool,
    /// Active color theme.
    theme: Theme,
    /// How many clients the chart and table show.
    top_n: usize,
}

impl App {
    pub fn new(commands: mpsc::Sender<Command>, theme: Theme, top_n: usize) -> Self {
        Self {
            state: ViewState::initial(),
            commands,
            table_state: TableState::default(),
            scroll_state: ScrollbarState::default(),
            show_help: false,
            running: true,
            theme,
            top_n,
        }
    }

    /// Applies a freshly published view state, keeping the selection valid.
    pub fn update_state(&mut self, state: ViewState) {
        self.state = state;
        let rows = self.visible_len();
        if rows == 0 {
            self.table_state.select(None);
        } else if let Some(i) = self.table_state.selected() {
            if i >= rows {
                self.table_state.select(Some(rows - 1));
            }
        }
        self.scroll_state = self.scroll_state.content_length(rows);
    }

    fn visible_len(&self) -> usize {
        self.state.snapshot.len().min(self.top_n)
    }

    fn ranked_rows(&self) -> Vec<TrafficRecord> {
        top_talkers(&self.state.snapshot, self.top_n)
    }

    fn overlay_open(&self) -> bool {
        self.state
            .drilldown
            .as_ref()
            .map(|session| session.visible)
            .unwrap_or(false)
    }

    fn send(&self, command: Command) {
        let _ = self.commands.try_send(command);
    }

    fn quit(&mut self) {
        self.running = false;
        let _ = self.commands.try_send(Command::Shutdown);
    }

    /// Handles keyboard input.
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else if self.state.drilldown.is_some() {
                    self.send(Command::ClearSelection);
                } else {
                    self.quit();
                }
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Down | KeyCode::Char('j') => self.next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_row(),
            KeyCode::Home => self.first_row(),
            KeyCode::End => self.last_row(),
            KeyCode::Enter => self.inspect_selected(),
            KeyCode::Char('r') => self.send(Command::SwitchToLive),
            KeyCode::Char('m') => self.send(Command::LoadHistorical(Period::Minute)),
            KeyCode::Char('h') => self.send(Command::LoadHistorical(Period::Hour)),
            KeyCode::Char('d') => self.send(Command::LoadHistorical(Period::Day)),
            KeyCode::Char('w') => self.send(Command::LoadHistorical(Period::Week)),
            KeyCode::Char('p') => self.rerun_prediction(),
            KeyCode::Char('f') => self.run_forecast(),
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            _ => {}
        }
    }

    fn next_row(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
        self.scroll_state = self.scroll_state.position(i);
    }

    fn prev_row(&mut self) {
        if self.visible_len() == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(i));
        self.scroll_state = self.scroll_state.position(i);
    }

    fn first_row(&mut self) {
        if self.visible_len() > 0 {
            self.table_state.select(Some(0));
            self.scroll_state = self.scroll_state.position(0);
        }
    }

    fn last_row(&mut self) {
        let len = self.visible_len();
        if len > 0 {
            self.table_state.select(Some(len - 1));
            self.scroll_state = self.scroll_state.position(len - 1);
        }
    }

    fn inspect_selected(&mut self) {
        if self.overlay_open() {
            return;
        }
        let rows = self.ranked_rows();
        if let Some(record) = self.table_state.selected().and_then(|i| rows.get(i)) {
            self.send(Command::SelectIp(record.client_ip.clone()));
        }
    }

    fn rerun_prediction(&self) {
        if let Some(session) = &self.state.drilldown {
            self.send(Command::RunPrediction(session.client_ip.clone()));
        }
    }

    fn run_forecast(&self) {
        if let Some(session) = &self.state.drilldown {
            self.send(Command::RunForecast(session.client_ip.clone()));
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Dark => Color::Cyan,
        Theme::Light => Color::Blue,
    }
}

fn muted(theme: Theme) -> Color {
    match theme {
        Theme::Dark => Color::Gray,
        Theme::Light => Color::DarkGray,
    }
}

/// Initializes the terminal for TUI rendering.
pub fn init_terminal() -> std::result::Result<Term, UiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
pub fn restore_terminal(terminal: &mut Term) -> std::result::Result<(), UiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Main UI rendering function.
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Stat tiles
            Constraint::Length(9), // Charts
            Constraint::Min(8),    // Talkers table
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_stats(frame, chunks[1], app);
    render_charts(frame, chunks[2], app);
    render_talkers_table(frame, chunks[3], app);
    render_footer(frame, chunks[4], app);

    if app.show_help {
        render_help_overlay(frame, app.theme);
    }

    if let Some(session) = app.state.drilldown.clone() {
        if session.visible {
            render_drilldown_overlay(frame, app.theme, &session);
        }
    }
}

fn mode_title(mode: ViewMode) -> String {
    match mode {
        ViewMode::Live => "live".to_string(),
        ViewMode::Historical(period) => format!("last {period}"),
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = vec![
        Span::styled(
            "  NETLENS",
            Style::default()
                .fg(accent(app.theme))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            "Network Traffic Dashboard",
            Style::default().fg(muted(app.theme)),
        ),
        Span::raw("  |  "),
        Span::styled(
            mode_title(app.state.mode),
            Style::default().fg(Color::Yellow),
        ),
    ];

    let header = Paragraph::new(Line::from(title)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent(app.theme))),
    );

    frame.render_widget(header, area);
}

fn render_stats(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let mode_block = Paragraph::new(mode_title(app.state.mode))
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .title(" View ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(mode_block, chunks[0]);

    let clients_block = Paragraph::new(format!("{}", app.state.snapshot.len()))
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(" Clients ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    frame.render_widget(clients_block, chunks[1]);

    let volume_block = Paragraph::new(format_bytes(total_volume(&app.state.snapshot)))
        .style(Style::default().fg(Color::Green))
        .block(
            Block::default()
                .title(" Total Volume ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        );
    frame.render_widget(volume_block, chunks[2]);

    let (status, status_color) = if app.state.loading {
        ("syncing...", Color::Yellow)
    } else if app.state.last_error.is_some() {
        ("degraded", Color::Red)
    } else {
        ("ok", Color::Green)
    };
    let status_block = Paragraph::new(status)
        .style(Style::default().fg(status_color))
        .block(
            Block::default()
                .title(" Status ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(status_color)),
        );
    frame.render_widget(status_block, chunks[3]);
}

fn render_charts(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let ranked = app.ranked_rows();
    let bars: Vec<(&str, u64)> = ranked
        .iter()
        .map(|record| (record.client_ip.as_str(), record.total()))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(" Top Talkers (bytes) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .data(bars.as_slice())
        .bar_width(15)
        .bar_gap(1)
        .bar_style(Style::default().fg(accent(app.theme)))
        .value_style(Style::default().fg(Color::Black).bg(accent(app.theme)));
    frame.render_widget(chart, chunks[0]);

    render_protocol_table(frame, chunks[1], app);
}

fn render_protocol_table(frame: &mut Frame, area: Rect, app: &App) {
    let rollup = protocol_rollup(&app.state.snapshot);
    let protocol_total: u64 = rollup.iter().map(|(_, count)| count).sum();

    let header_cells = ["Protocol", "Volume", "Share"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = rollup
        .iter()
        .map(|(name, count)| {
            let share = if protocol_total > 0 {
                format!("{:.1}%", *count as f64 * 100.0 / protocol_total as f64)
            } else {
                "-".to_string()
            };
            Row::new(vec![
                Cell::from(name.clone()),
                Cell::from(format_bytes(*count)),
                Cell::from(share),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Protocol Mix ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    frame.render_widget(table, area);
}

fn render_talkers_table(frame: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["#", "Client IP", "Inbound", "Outbound", "Total", "Share"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let grand_total = total_volume(&app.state.snapshot);
    let ranked = app.ranked_rows();
    let rows: Vec<Row> = ranked
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let share = if grand_total > 0 {
                format!("{:.1}%", record.total() as f64 * 100.0 / grand_total as f64)
            } else {
                "-".to_string()
            };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(record.client_ip.clone()),
                Cell::from(format_bytes(record.inbound)),
                Cell::from(format_bytes(record.outbound)),
                Cell::from(format_bytes(record.total())).style(Style::default().bold()),
                Cell::from(share),
            ])
        })
        .collect();

    let title = format!(" Top Talkers ({}) ", mode_title(app.state.mode));
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);

    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓")),
        area.inner(ratatui::layout::Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut app.scroll_state,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let keys = Line::from(vec![
        Span::styled(" q", Style::default().fg(Color::Yellow)),
        Span::raw(": Quit  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(": Live  "),
        Span::styled("m/h/d/w", Style::default().fg(Color::Yellow)),
        Span::raw(": History  "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(": Navigate  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(": Inspect  "),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::raw(": Help"),
    ]);

    let status = match &app.state.last_error {
        Some(message) => Line::from(Span::styled(
            format!(" backend: {message}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            " connected",
            Style::default().fg(muted(app.theme)),
        )),
    };

    let footer = Paragraph::new(vec![keys, status])
        .style(Style::default().fg(muted(app.theme)))
        .block(Block::default().borders(Borders::TOP));

    frame.render_widget(footer, area);
}

fn render_help_overlay(frame: &mut Frame, theme: Theme) {
    let area = centered_rect(60, 60, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().bold().fg(accent(theme)),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("q          ", Style::default().fg(Color::Yellow)),
            Span::raw("Quit application"),
        ]),
        Line::from(vec![
            Span::styled("r          ", Style::default().fg(Color::Yellow)),
            Span::raw("Live view (refreshes every poll interval)"),
        ]),
        Line::from(vec![
            Span::styled("m h d w    ", Style::default().fg(Color::Yellow)),
            Span::raw("Last minute / hour / day / week"),
        ]),
        Line::from(vec![
            Span::styled("↑/k ↓/j    ", Style::default().fg(Color::Yellow)),
            Span::raw("Move selection"),
        ]),
        Line::from(vec![
            Span::styled("Enter      ", Style::default().fg(Color::Yellow)),
            Span::raw("Inspect selected client"),
        ]),
        Line::from(vec![
            Span::styled("p          ", Style::default().fg(Color::Yellow)),
            Span::raw("Re-run prediction for inspected client"),
        ]),
        Line::from(vec![
            Span::styled("f          ", Style::default().fg(Color::Yellow)),
            Span::raw("Run volume forecast for inspected client"),
        ]),
        Line::from(vec![
            Span::styled("t          ", Style::default().fg(Color::Yellow)),
            Span::raw("Toggle color theme"),
        ]),
        Line::from(vec![
            Span::styled("Esc        ", Style::default().fg(Color::Yellow)),
            Span::raw("Close overlay, or quit"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "The drill-down overlay opens once capture history arrives;",
            Style::default().fg(muted(theme)),
        )),
        Line::from(Span::styled(
            "fetch errors keep the previous data on screen.",
            Style::default().fg(muted(theme)),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent(theme))),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn render_drilldown_overlay(frame: &mut Frame, theme: Theme, session: &DrillDown) {
    let area = centered_rect(80, 70, frame.area());
    frame.render_widget(Clear, area);

    let busy = session.prediction.is_loading() || session.forecast.is_loading();
    let title = if busy {
        format!(" Client {} (working...) ", session.client_ip)
    } else {
        format!(" Client {} ", session.client_ip)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(theme)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Summary
            Constraint::Length(2), // Prediction + forecast
            Constraint::Min(3),    // Captures
            Constraint::Length(1), // Hint
        ])
        .split(inner);

    render_session_summary(frame, sections[0], theme, session);
    render_session_flows(frame, sections[1], theme, session);
    render_session_captures(frame, sections[2], theme, session);

    let hint = Paragraph::new(Line::from(Span::styled(
        "Esc: close   p: re-run prediction   f: forecast",
        Style::default().fg(Color::DarkGray).italic(),
    )));
    frame.render_widget(hint, sections[3]);
}

fn render_session_summary(frame: &mut Frame, area: Rect, theme: Theme, session: &DrillDown) {
    let summary = &session.summary;
    let ranked = rank_protocols(&summary.protocols);
    let protocols_line = if ranked.is_empty() {
        "none recorded".to_string()
    } else {
        ranked
            .iter()
            .take(4)
            .map(|(name, count)| format!("{name} {}", format_bytes(*count)))
            .collect::<Vec<_>>()
            .join("   ")
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Inbound:  ", Style::default().fg(muted(theme))),
            Span::raw(format_bytes(summary.inbound)),
            Span::raw("    "),
            Span::styled("Outbound: ", Style::default().fg(muted(theme))),
            Span::raw(format_bytes(summary.outbound)),
            Span::raw("    "),
            Span::styled("Total: ", Style::default().fg(muted(theme))),
            Span::styled(format_bytes(summary.total()), Style::default().bold()),
        ]),
        Line::from(vec![
            Span::styled("Protocols: ", Style::default().fg(muted(theme))),
            Span::raw(protocols_line),
        ]),
    ];
    if let Some(error) = &session.captures_error {
        lines.push(Line::from(Span::styled(
            format!("captures unavailable: {error}"),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("{} capture rows", session.captures.len()),
            Style::default().fg(muted(theme)),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_session_flows(frame: &mut Frame, area: Rect, theme: Theme, session: &DrillDown) {
    let prediction_line = match &session.prediction {
        FetchState::Idle => Line::from(Span::styled(
            "Prediction: press p to run",
            Style::default().fg(muted(theme)),
        )),
        FetchState::Loading => Line::from(Span::styled(
            "Prediction: running classifier...",
            Style::default().fg(Color::Yellow),
        )),
        FetchState::Ready(_) => {
            let current = session.current_prediction();
            match current {
                Some(record) => {
                    let color = if record.label == "normal" {
                        Color::Green
                    } else {
                        Color::Red
                    };
                    let when = record
                        .created_at
                        .map(|ts| ts.format(" at %H:%M:%S").to_string())
                        .unwrap_or_default();
                    Line::from(vec![
                        Span::styled("Prediction: ", Style::default().fg(muted(theme))),
                        Span::styled(
                            format!("{} ({:.0}%)", record.label, record.probability * 100.0),
                            Style::default().fg(color).bold(),
                        ),
                        Span::styled(when, Style::default().fg(muted(theme))),
                    ])
                }
                None => Line::from(Span::styled(
                    "Prediction: no rows",
                    Style::default().fg(muted(theme)),
                )),
            }
        }
        FetchState::Failed(message) => Line::from(vec![
            Span::styled("Prediction: ", Style::default().fg(muted(theme))),
            Span::styled(message.clone(), Style::default().fg(Color::Red)),
        ]),
    };

    let forecast_line = match &session.forecast {
        FetchState::Idle => Line::from(Span::styled(
            "Forecast:   press f to run",
            Style::default().fg(muted(theme)),
        )),
        FetchState::Loading => Line::from(Span::styled(
            "Forecast:   computing...",
            Style::default().fg(Color::Yellow),
        )),
        FetchState::Ready(report) => {
            let amount = if report.unit == "bytes" {
                format_bytes(report.predicted_inbound_size.max(0.0) as u64)
            } else {
                format!("{:.1} {}", report.predicted_inbound_size, report.unit)
            };
            Line::from(vec![
                Span::styled("Forecast:   ", Style::default().fg(muted(theme))),
                Span::styled(format!("~{amount} inbound"), Style::default().fg(Color::Green)),
                Span::styled(
                    format!("  ({})", report.model_used),
                    Style::default().fg(muted(theme)),
                ),
            ])
        }
        FetchState::Failed(message) => Line::from(vec![
            Span::styled("Forecast:   ", Style::default().fg(muted(theme))),
            Span::styled(message.clone(), Style::default().fg(Color::Red)),
        ]),
    };

    frame.render_widget(Paragraph::new(vec![prediction_line, forecast_line]), area);
}

fn render_session_captures(frame: &mut Frame, area: Rect, theme: Theme, session: &DrillDown) {
    let header_cells = ["Time", "Inbound", "Outbound", "Top Protocol"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = session
        .captures
        .iter()
        .map(|capture| {
            let when = capture
                .event
                .created_at
                .map(|ts| ts.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let top = capture
                .top_protocol()
                .map(|(name, count)| format!("{name} ({})", format_bytes(*count)))
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(when),
                Cell::from(format_bytes(capture.event.inbound)),
                Cell::from(format_bytes(capture.event.outbound)),
                Cell::from(top),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Min(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Capture History ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(muted(theme))),
    );

    frame.render_widget(table, area);
}

/// Helper to create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Main UI event loop.
pub async fn run_ui(
    commands: mpsc::Sender<Command>,
    mut state_rx: watch::Receiver<ViewState>,
    ui_config: UiConfig,
    top_n: usize,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut app = App::new(commands, ui_config.theme, top_n);
    app.update_state(state_rx.borrow().clone());

    let tick_rate = Duration::from_millis(ui_config.tick_ms);

    while app.is_running() {
        // Pull the latest published state (non-blocking)
        if state_rx.has_changed().unwrap_or(false) {
            let state = state_rx.borrow_and_update().clone();
            app.update_state(state);
        }

        // Draw UI
        terminal.draw(|f| render(f, &mut app))?;

        // Handle input events
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}
