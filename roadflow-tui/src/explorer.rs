use crate::map_view::MapProjection;
use chrono::Datelike;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Wrap,
        canvas::{Canvas, Points, Rectangle},
    },
};
use roadflow_core::report::{category_label, format_count, percentage_bar, point_label};
use roadflow_core::state::DEFAULT_YEAR;
use roadflow_core::{AppController, RefreshOutcome};
use roadflow_gateway::error::Result as GatewayResult;
use roadflow_gateway::{Authority, FlowMetrics, FlowQuery, TrafficDataset, TrafficPoint};
use tokio::sync::mpsc;
use tracing::debug;

/// Oldest year the flow endpoint has data for.
pub const MIN_YEAR: u16 = 2000;
const PAGE: isize = 10;
const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

/// Completed gateway calls, sent back from spawned tasks to the UI loop.
#[derive(Debug)]
pub enum GatewayMessage {
    Authorities(GatewayResult<Vec<Authority>>),
    Flows {
        query: FlowQuery,
        result: GatewayResult<TrafficDataset>,
    },
}

/// Which panel arrow keys and Enter act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Authorities,
    Map,
}

/// Interactive explorer: sidebar, map and detail popup over one controller.
pub struct Explorer {
    controller: AppController,
    tx: mpsc::UnboundedSender<GatewayMessage>,
    rx: mpsc::UnboundedReceiver<GatewayMessage>,
    pending: usize,
    focus: Pane,
    authority_cursor: usize,
    focused_point: Option<usize>,
    status: String,
    map_area: Rect,
    tick: usize,
    should_quit: bool,
}

impl Explorer {
    pub fn new(controller: AppController) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller,
            tx,
            rx,
            pending: 0,
            focus: Pane::Authorities,
            authority_cursor: 0,
            focused_point: None,
            status: "Pick an authority, then press s".to_string(),
            map_area: Rect::default(),
            tick: 0,
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &AppController {
        &self.controller
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn focus(&self) -> Pane {
        self.focus
    }

    pub fn authority_cursor(&self) -> usize {
        self.authority_cursor
    }

    pub fn focused_point(&self) -> Option<usize> {
        self.focused_point
    }

    /// Gateway calls still in flight.
    pub fn pending_requests(&self) -> usize {
        self.pending
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Start loading the authority list. Must be called inside a tokio runtime.
    pub fn load_authorities(&mut self) {
        let gateway = self.controller.gateway();
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let result = gateway.list_local_authorities().await;
            let _ = tx.send(GatewayMessage::Authorities(result));
        });
    }

    /// Fetch flows for the current selection. Returns false when the
    /// selection is incomplete and nothing was requested.
    pub fn show_selection(&mut self) -> bool {
        let Some(query) = self.controller.pending_query() else {
            debug!("Show ignored, selection incomplete");
            return false;
        };

        let gateway = self.controller.gateway();
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let result = gateway.fetch(&query).await;
            let _ = tx.send(GatewayMessage::Flows { query, result });
        });
        true
    }

    /// Apply every completed gateway call without blocking.
    pub fn process_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
        }
    }

    /// Wait until all in-flight gateway calls have been applied.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            match self.rx.recv().await {
                Some(msg) => self.apply(msg),
                None => break,
            }
        }
    }

    // Results are applied in arrival order, so the last response to land wins.
    fn apply(&mut self, msg: GatewayMessage) {
        self.pending = self.pending.saturating_sub(1);
        match msg {
            GatewayMessage::Authorities(result) => {
                self.controller.apply_authorities(result);
                let len = self.controller.state().authorities.len();
                self.authority_cursor = self.authority_cursor.min(len.saturating_sub(1));
            }
            GatewayMessage::Flows { query, result } => {
                if let RefreshOutcome::Applied { points } = self.controller.apply_traffic_data(result) {
                    let name = self
                        .controller
                        .state()
                        .authority(&query.authority_id)
                        .map(|a| a.name.clone())
                        .unwrap_or_else(|| query.authority_id.clone());
                    self.status = format!("{} count points for {} ({})", points, name, query.year);
                    self.focused_point = None;
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.controller.state().detail.is_open {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter | KeyCode::Backspace
            ) {
                self.controller.close_detail();
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-PAGE),
            KeyCode::PageDown => self.move_cursor(PAGE),
            KeyCode::Home => self.move_cursor(isize::MIN),
            KeyCode::End => self.move_cursor(isize::MAX),
            KeyCode::Enter | KeyCode::Char(' ') => match (self.focus, self.focused_point) {
                (Pane::Map, Some(_)) => self.open_focused_point(),
                _ => self.select_authority_at_cursor(),
            },
            KeyCode::Char('[') | KeyCode::Char('-') => self.step_year(-1),
            KeyCode::Char(']') | KeyCode::Char('+') | KeyCode::Char('=') => self.step_year(1),
            KeyCode::Char('s') | KeyCode::Char('r') => {
                self.show_selection();
            }
            KeyCode::Tab => self.cycle_point(true),
            KeyCode::BackTab => self.cycle_point(false),
            _ => {}
        }
    }

    /// Left click on the map opens the nearest point.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) || self.controller.state().detail.is_open {
            return;
        }

        let state = self.controller.state();
        let projection = MapProjection::from_viewport(&state.viewport);
        if let Some(idx) = projection.pick(self.map_area, state.points(), mouse.column, mouse.row) {
            self.focus = Pane::Map;
            self.focused_point = Some(idx);
            self.open_focused_point();
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        self.focus = Pane::Authorities;
        let len = self.controller.state().authorities.len();
        if len == 0 {
            return;
        }
        let target = (self.authority_cursor as isize).saturating_add(delta);
        self.authority_cursor = target.clamp(0, len as isize - 1) as usize;
    }

    fn select_authority_at_cursor(&mut self) {
        let id = self
            .controller
            .state()
            .authorities
            .get(self.authority_cursor)
            .map(|a| a.id.clone());
        if let Some(id) = id {
            self.focus = Pane::Authorities;
            self.controller.select_authority(id);
        }
    }

    fn step_year(&mut self, delta: i32) {
        let max_year = chrono::Utc::now().year() as u16;
        let current = self.controller.selection().selected_year.unwrap_or(DEFAULT_YEAR);
        let year = (current as i32 + delta).clamp(MIN_YEAR as i32, max_year as i32) as u16;
        self.controller.select_year(year);
    }

    fn cycle_point(&mut self, forward: bool) {
        let len = self.controller.state().points().len();
        if len == 0 {
            return;
        }
        self.focus = Pane::Map;
        self.focused_point = Some(match (self.focused_point, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        });
    }

    fn open_focused_point(&mut self) {
        let point = self
            .focused_point
            .and_then(|i| self.controller.state().points().get(i))
            .cloned();
        if let Some(point) = point {
            self.controller.open_detail(point);
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        self.tick = self.tick.wrapping_add(1);

        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(1)])
            .split(f.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(38), Constraint::Min(20)])
            .split(vertical_chunks[0]);

        let sidebar_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(5),
                Constraint::Length(11),
            ])
            .split(main_chunks[0]);

        self.render_authorities(f, sidebar_chunks[0]);
        self.render_selection(f, sidebar_chunks[1]);
        self.render_stats(f, sidebar_chunks[2]);
        self.render_map(f, main_chunks[1]);
        self.render_hints(f, vertical_chunks[1]);

        if self.controller.state().detail.is_open {
            self.render_detail(f);
        }
    }

    fn border_style(&self, pane: Pane) -> Style {
        if self.focus == pane {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    fn render_authorities(&self, f: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Authorities ({}) ", state.authorities.len()))
            .border_style(self.border_style(Pane::Authorities));

        let inner = block.inner(area);
        f.render_widget(block, area);

        if state.authorities.is_empty() {
            let msg = if self.pending > 0 {
                "Loading local authorities..."
            } else {
                "No authorities loaded"
            };
            f.render_widget(
                Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let scroll_offset = if height > 0 && self.authority_cursor >= height {
            self.authority_cursor + 1 - height
        } else {
            0
        };
        let selected_id = state.selection.selected_authority_id.as_deref();

        let items: Vec<ListItem> = state
            .authorities
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(height)
            .map(|(idx, authority)| {
                let marker = if Some(authority.id.as_str()) == selected_id { "●" } else { " " };
                let mut style = Style::default().fg(Color::White);
                if Some(authority.id.as_str()) == selected_id {
                    style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
                }
                if idx == self.authority_cursor {
                    style = style.bg(Color::DarkGray);
                }
                ListItem::new(format!("{} {}", marker, authority.name)).style(style)
            })
            .collect();

        f.render_widget(List::new(items), inner);
    }

    fn render_selection(&self, f: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Selection ")
            .border_style(Style::default().fg(Color::Yellow));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let authority = state
            .selected_authority()
            .map(|a| a.name.clone())
            .or_else(|| state.selection.selected_authority_id.clone())
            .unwrap_or_else(|| "none".to_string());
        let year = state
            .selection
            .selected_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());

        let status = if self.pending > 0 {
            Line::from(vec![
                Span::styled(SPINNER[self.tick % SPINNER.len()], Style::default().fg(Color::Cyan)),
                Span::raw(" Loading..."),
            ])
        } else {
            Line::from(Span::styled(self.status.clone(), Style::default().fg(Color::DarkGray)))
        };

        let text = vec![
            Line::from(vec![
                Span::styled("Authority: ", Style::default().fg(Color::DarkGray)),
                Span::styled(authority, Style::default().fg(Color::Green)),
            ]),
            Line::from(vec![
                Span::styled("Year:      ", Style::default().fg(Color::DarkGray)),
                Span::raw("◀ "),
                Span::styled(year, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::raw(" ▶"),
            ]),
            status,
        ];

        f.render_widget(Paragraph::new(text), inner);
    }

    fn render_stats(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Traffic ")
            .border_style(Style::default().fg(Color::Magenta));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let Some(dataset) = self.controller.state().dataset.as_ref() else {
            f.render_widget(
                Paragraph::new("No data yet").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        };

        let mut text = vec![
            Line::from(vec![
                Span::styled("Count points: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    dataset.points.len().to_string(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Updated:      ", Style::default().fg(Color::DarkGray)),
                Span::raw(dataset.fetched_at.format("%H:%M:%S").to_string()),
            ]),
            Line::from(""),
        ];

        for (key, _) in FlowMetrics::default().categories() {
            let Some(pct) = dataset.percentages.get(key) else {
                continue;
            };
            text.push(Line::from(vec![
                Span::raw(format!("{:<13}", category_label(key))),
                Span::styled(percentage_bar(*pct, 10), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {:>5.1}%", pct)),
            ]));
        }

        f.render_widget(Paragraph::new(text), inner);
    }

    fn render_map(&mut self, f: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let title = match (&state.dataset, state.selected_authority()) {
            (Some(d), Some(a)) if a.id == d.authority_id => format!(" Map · {} ({}) ", a.name, d.year),
            (Some(d), _) => format!(" Map · authority {} ({}) ", d.authority_id, d.year),
            (None, _) => " Map ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(self.border_style(Pane::Map));
        self.map_area = block.inner(area);

        let projection = MapProjection::from_viewport(&state.viewport);
        let points = state.points();

        // green < 5k, yellow < 20k, red above
        let mut low = Vec::new();
        let mut mid = Vec::new();
        let mut high = Vec::new();
        for p in points {
            let coord = (p.position.lon, p.position.lat);
            match p.flows.all_motor_vehicles {
                0..=4_999 => low.push(coord),
                5_000..=19_999 => mid.push(coord),
                _ => high.push(coord),
            }
        }
        let focused = self.focused_point.and_then(|i| points.get(i));
        let fit_bounds = state.viewport.fit_bounds;
        let center = projection.window.center();
        let hint_x = projection.window.min.lon + projection.window.width() * 0.05;

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds(projection.x_bounds())
            .y_bounds(projection.y_bounds())
            .paint(|ctx| {
                if let Some(b) = fit_bounds {
                    ctx.draw(&Rectangle {
                        x: b.min.lon,
                        y: b.min.lat,
                        width: b.width(),
                        height: b.height(),
                        color: Color::DarkGray,
                    });
                }
                ctx.layer();
                ctx.draw(&Points { coords: &low, color: Color::Green });
                ctx.draw(&Points { coords: &mid, color: Color::Yellow });
                ctx.draw(&Points { coords: &high, color: Color::Red });

                if let Some(p) = focused {
                    ctx.layer();
                    ctx.print(
                        p.position.lon,
                        p.position.lat,
                        Span::styled("◉", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    );
                }

                if points.is_empty() {
                    ctx.print(
                        hint_x,
                        center.lat,
                        Span::styled(
                            "Select an authority and year, then press s",
                            Style::default().fg(Color::DarkGray),
                        ),
                    );
                }
            });

        f.render_widget(canvas, area);
    }

    fn render_detail(&self, f: &mut Frame) {
        let Some(point) = self.controller.state().detail.selected_point.as_ref() else {
            return;
        };

        let area = centered_rect(60, 70, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Count point #{} ", point.id))
            .border_style(Style::default().fg(Color::Yellow));

        let paragraph = Paragraph::new(detail_lines(point))
            .block(block)
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Black).bg(Color::Gray);
        let hints = if self.controller.state().detail.is_open {
            Line::from(vec![
                Span::styled(" Esc/q ", key),
                Span::raw(" Close  "),
                Span::styled(" Ctrl+C ", key),
                Span::raw(" Quit"),
            ])
        } else {
            Line::from(vec![
                Span::styled(" q/Esc ", key),
                Span::raw(" Quit  "),
                Span::styled(" ↑/↓ ", key),
                Span::raw(" Authority  "),
                Span::styled(" Enter ", key),
                Span::raw(" Select  "),
                Span::styled(" [/] ", key),
                Span::raw(" Year  "),
                Span::styled(" s ", key),
                Span::raw(" Show  "),
                Span::styled(" Tab ", key),
                Span::raw(" Next point  "),
                Span::styled(" Click ", key),
                Span::raw(" Details"),
            ])
        };

        f.render_widget(
            Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray)),
            area,
        );
    }
}

/// Body of the detail popup.
pub fn detail_lines(point: &TrafficPoint) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled(
            point_label(point),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Position: ", label),
            Span::raw(format!("{:.5}, {:.5}", point.position.lat, point.position.lon)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Annual average daily flow", heading)),
    ];

    for (key, value) in point.flows.categories() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<18}", category_label(key)), label),
            Span::raw(format!("{:>10}", format_count(value))),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled(format!("  {:<18}", "All motor vehicles"), label),
        Span::styled(
            format!("{:>10}", format_count(point.flows.all_motor_vehicles)),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));

    if !point.properties.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Properties", heading)));
        for (key, value) in &point.properties {
            let value = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", key), label),
                Span::raw(value),
            ]));
        }
    }
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
