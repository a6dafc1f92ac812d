use crate::calc::week_window::{current_week, week_label};
use crate::calc::{METRIC_COUNT, Metric, MetricValue, PlanBoard, WeekWindow};
use crate::data::AppSettings;
use crate::data::store::load_rows;
use crate::sync::{CommitRequest, Reconcile, SyncLayer};
use crate::ui::edit::{CellCoord, EditController, GridBounds, Move, is_cell_editable};
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{
    self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use std::io::Stdout;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const STYLE_COL_WIDTH: u16 = 10;
const NAME_COL_WIDTH: u16 = 18;
const METRIC_COL_WIDTH: u16 = 10;
const WEEK_COL_WIDTH: u16 = 9;
const COLUMN_SPACING: u16 = 1;
const HEADER_HEIGHT: u16 = 2;

const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

// Alternating style bands
const SECTION_BG: Color = Color::Rgb(40, 44, 52);
const EDIT_CURSOR: char = '▏';

/// Screen geometry of the last rendered grid, used to map mouse clicks to cells.
#[derive(Clone, Debug)]
struct GridLayout {
    inner: Rect,
    style_offset: usize,
    visible_styles: usize,
    visible_cols: usize,
}

impl GridLayout {
    fn frozen_width() -> u16 {
        STYLE_COL_WIDTH + NAME_COL_WIDTH + METRIC_COL_WIDTH + 3 * COLUMN_SPACING
    }

    fn hit(&self, x: u16, y: u16) -> Option<CellCoord> {
        let body_top = self.inner.y + HEADER_HEIGHT;
        if x < self.inner.x || x >= self.inner.right() || y < body_top || y >= self.inner.bottom() {
            return None;
        }
        let row = usize::from(y - body_top);
        if row / METRIC_COUNT >= self.visible_styles {
            return None;
        }
        let rel_x = x - self.inner.x;
        if rel_x < Self::frozen_width() {
            return None;
        }
        let col = usize::from((rel_x - Self::frozen_width()) / (WEEK_COL_WIDTH + COLUMN_SPACING));
        if col >= self.visible_cols {
            return None;
        }
        Some(CellCoord::new(
            self.style_offset + row / METRIC_COUNT,
            row % METRIC_COUNT,
            col,
        ))
    }
}

pub struct App {
    board: PlanBoard,
    window: WeekWindow,
    editor: EditController,
    sync: SyncLayer,
    pub settings: AppSettings,
    today: NaiveDate,
    /// First week that still accepts edits.
    current_week: u32,
    /// Result of the last action (message, color). Cleared on the next keypress.
    status: Option<(String, Color)>,
    /// First style shown; follows the selection when the grid is taller than the screen.
    style_offset: usize,
    grid_layout: Option<GridLayout>,
    last_click: Option<(CellCoord, Instant)>,
    /// Mirror copies to the OS clipboard and fall back to it on paste.
    system_clipboard: bool,
    /// Set once the season has been switched from the keyboard.
    season_toggled: bool,
}

impl App {
    pub fn new(board: PlanBoard, sync: SyncLayer, settings: AppSettings, today: NaiveDate) -> Self {
        let current_week = current_week(today, settings.anchor_year);
        let mut window = WeekWindow::new(board.weeks().to_vec(), settings.window_size);
        window.focus(current_week);
        App {
            board,
            window,
            editor: EditController::default(),
            sync,
            settings,
            today,
            current_week,
            status: None,
            style_offset: 0,
            grid_layout: None,
            last_click: None,
            system_clipboard: false,
            season_toggled: false,
        }
    }

    pub fn with_system_clipboard(mut self, enabled: bool) -> Self {
        self.system_clipboard = enabled;
        self
    }

    pub fn season_toggled(&self) -> bool {
        self.season_toggled
    }

    fn bounds(&self) -> GridBounds {
        GridBounds { styles: self.board.style_count(), cols: self.window.visible().len() }
    }

    fn cell_metric_week(&self, coord: CellCoord) -> Option<(Metric, u32)> {
        Some((Metric::from_index(coord.metric)?, self.window.week_at(coord.week_col)?))
    }

    fn cell_value(&self, coord: CellCoord) -> Option<MetricValue> {
        let (metric, week) = self.cell_metric_week(coord)?;
        Some(self.board.value(coord.style, metric, week))
    }

    fn cell_editable(&self, coord: CellCoord) -> bool {
        self.cell_metric_week(coord)
            .map(|(metric, week)| is_cell_editable(metric, week, self.current_week))
            .unwrap_or(false)
    }

    // ── Sync reconciliation ──────────────────────────────────────────────────

    /// Applies commit results that arrived since the last tick.
    pub fn tick(&mut self) {
        for outcome in self.sync.drain() {
            self.apply_reconcile(outcome);
        }
    }

    /// Waits for in-flight commits before the app goes away.
    pub fn shutdown(&mut self) {
        for outcome in self.sync.settle(SETTLE_TIMEOUT) {
            self.apply_reconcile(outcome);
        }
    }

    fn apply_reconcile(&mut self, outcome: Reconcile) {
        match outcome {
            Reconcile::Confirmed { target, value } => {
                // A reload may have replaced the optimistic value with an older fetch.
                self.board.apply(&target, Some(value));
                self.status = Some((
                    format!(
                        "Saved {} W{} {} = {}",
                        target.style_number, target.week_number, target.field, value
                    ),
                    Color::Green,
                ));
            }
            Reconcile::Reverted { target, restore, error } => {
                self.board.apply(&target, restore);
                self.status = Some((
                    format!(
                        "Save failed for {} W{} {}: {} (reverted)",
                        target.style_number, target.week_number, target.field, error
                    ),
                    Color::Red,
                ));
            }
            Reconcile::Stale { .. } => {}
        }
    }

    // ── Data scope ───────────────────────────────────────────────────────────

    /// Full refetch for the configured years and season.
    pub fn reload(&mut self) {
        let fetched = load_rows(
            self.sync.store().as_ref(),
            &self.settings.years,
            self.settings.season,
        );
        match fetched {
            Ok(rows) => {
                let count = rows.len();
                self.board.replace_rows(rows);
                self.window.set_weeks(self.board.weeks().to_vec());
                self.editor.clamp(self.bounds());
                self.style_offset = self.style_offset.min(self.board.style_count().saturating_sub(1));
                self.status = Some((format!("Loaded {count} rows"), Color::Cyan));
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.status = Some((format!("Reload failed: {e}"), Color::Red));
            }
        }
    }

    fn toggle_season(&mut self) {
        self.settings.season = self.settings.toggled_season();
        self.season_toggled = true;
        info!(season = self.settings.season, "season switched");
        self.reload();
        self.focus_current();
    }

    /// Moves the week window to the page holding the current week.
    pub fn focus_current(&mut self) {
        self.window.focus(self.current_week);
        self.editor.clamp(self.bounds());
    }

    fn page(&mut self, forward: bool) {
        let moved = if forward { self.window.advance() } else { self.window.retreat() };
        if moved {
            self.editor.clamp(self.bounds());
        }
    }

    // ── Editing ──────────────────────────────────────────────────────────────

    fn begin_edit_selected(&mut self) {
        let Some(coord) = self.editor.selected() else {
            return;
        };
        let editable = self.cell_editable(coord);
        let seed = self.cell_value(coord).map(|v| v.to_string()).unwrap_or_default();
        if !self.editor.begin_edit(seed, editable) {
            if let Some((_, week)) = self.cell_metric_week(coord) {
                self.status = Some((format!("W{week} {} is locked", self.locked_reason(coord)), Color::DarkGray));
            }
        }
    }

    fn locked_reason(&self, coord: CellCoord) -> &'static str {
        match Metric::from_index(coord.metric) {
            Some(m) if !m.is_editable() => "(derived metric)",
            _ => "(past week)",
        }
    }

    fn commit_draft(&mut self) {
        if let Some((coord, value)) = self.editor.finish() {
            self.commit_value(coord, value);
        }
    }

    /// Optimistically applies `value` and hands it to the sync layer.
    fn commit_value(&mut self, coord: CellCoord, value: i64) {
        if !self.cell_editable(coord) {
            return;
        }
        if self.cell_value(coord).and_then(MetricValue::as_qty) == Some(value) {
            return;
        }
        let Some(target) =
            self.board
                .translate(coord.style, coord.metric, coord.week_col, &self.window)
        else {
            return;
        };
        let previous = self.board.raw_value(&target);
        if !self.board.apply(&target, Some(value)) {
            self.status = Some((
                format!(
                    "{} has no data before W{}",
                    target.style_number,
                    self.board
                        .find_group(&target.style_number)
                        .and_then(|g| g.weeks.keys().next().copied())
                        .unwrap_or(target.week_number)
                ),
                Color::DarkGray,
            ));
            return;
        }
        self.sync.submit(CommitRequest { target, value }, previous);
    }

    fn copy_selected(&mut self) {
        let Some(text) = self
            .editor
            .selected()
            .and_then(|c| self.cell_value(c))
            .map(|v| v.to_string())
        else {
            return;
        };
        if self.system_clipboard {
            if let Err(e) = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                warn!(error = %e, "system clipboard unavailable");
            }
        }
        self.status = Some((format!("Copied {text}"), Color::Cyan));
        self.editor.copy(text);
    }

    fn paste_selected(&mut self) {
        let Some(coord) = self.editor.selected() else {
            return;
        };
        if !self.cell_editable(coord) {
            return;
        }
        let text = match self.editor.clipboard() {
            Some(t) => Some(t.to_string()),
            None if self.system_clipboard => arboard::Clipboard::new()
                .and_then(|mut cb| cb.get_text())
                .ok(),
            None => None,
        };
        if let Some(value) = text.and_then(|t| t.trim().parse::<i64>().ok()) {
            self.commit_value(coord, value);
        }
    }

    fn navigate(&mut self, mv: Move) {
        self.editor.navigate(mv, self.bounds());
    }

    /// Commits the open draft (blur) and moves on from the same cell.
    fn commit_and_move(&mut self, mv: Move) {
        let coord = self.editor.selected();
        self.commit_draft();
        if let Some(c) = coord {
            self.editor.select(c);
            self.navigate(mv);
        }
    }

    // ── Input ────────────────────────────────────────────────────────────────

    /// Returns true if the app should quit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status = None;
        let command = modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);

        if self.editor.is_editing() {
            match code {
                KeyCode::Enter => self.commit_draft(),
                KeyCode::Esc => self.editor.cancel(),
                KeyCode::Tab => self.commit_and_move(Move::Right),
                KeyCode::BackTab => self.commit_and_move(Move::Left),
                KeyCode::Backspace => self.editor.backspace(),
                KeyCode::Delete => self.editor.clear_draft(),
                KeyCode::Char(c) if !command => self.editor.push_char(c),
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Char('c') if command => {
                if self.editor.selected().is_some() {
                    self.copy_selected();
                } else {
                    return true;
                }
            }
            KeyCode::Char('v') if command => self.paste_selected(),
            KeyCode::Up => self.navigate(Move::Up),
            KeyCode::Down => self.navigate(Move::Down),
            KeyCode::Left | KeyCode::BackTab => self.navigate(Move::Left),
            KeyCode::Right | KeyCode::Tab => self.navigate(Move::Right),
            KeyCode::Enter => self.begin_edit_selected(),
            KeyCode::Esc => self.editor.clear(),
            KeyCode::Char('n') => self.page(true),
            KeyCode::Char('p') => self.page(false),
            KeyCode::Char('c') => self.focus_current(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('s') => self.toggle_season(),
            KeyCode::Char('q') => return true,
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let hit = self
            .grid_layout
            .as_ref()
            .and_then(|layout| layout.hit(mouse.column, mouse.row));
        match hit {
            Some(coord) => self.click_cell(coord, Instant::now()),
            None => self.commit_draft(),
        }
    }

    /// Click selects; a second click on the same cell within the double-click
    /// interval starts editing. Clicking away from an open editor commits it.
    fn click_cell(&mut self, coord: CellCoord, now: Instant) {
        if let Some((editing, _)) = self.editor.editing() {
            if editing == coord {
                return;
            }
            self.commit_draft();
        }
        let double = matches!(
            self.last_click,
            Some((c, at)) if c == coord && now.duration_since(at) <= DOUBLE_CLICK
        );
        self.editor.select(coord);
        if double {
            self.last_click = None;
            self.begin_edit_selected();
        } else {
            self.last_click = Some((coord, now));
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),                                       // title / scope
                Constraint::Min(HEADER_HEIGHT + 2 + METRIC_COUNT as u16),    // grid
                Constraint::Length(3),                                       // status + help
            ])
            .split(f.area());

        self.render_title(f, chunks[0]);
        self.render_grid(f, chunks[1]);
        self.render_footer(f, chunks[2]);
    }

    fn render_title(&self, f: &mut Frame, area: Rect) {
        let visible = self.window.visible();
        let range = match (visible.first(), visible.last()) {
            (Some(a), Some(b)) => format!(
                "{}W{a}–W{b}{} ({} of {} wks)",
                if self.window.can_retreat() { "◀ " } else { "" },
                if self.window.can_advance() { " ▶" } else { "" },
                visible.len().min(self.window.size()),
                self.window.all().len()
            ),
            _ => "no weeks".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(" WSSI / OTB ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" {} ", self.settings.scope_label())),
            Span::styled(format!(" {range} "), Style::default().fg(Color::Gray)),
            Span::styled(
                format!(" today {} · W{} ", self.today.format("%Y-%m-%d"), self.current_week),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!(" {} styles ", self.board.style_count()),
                Style::default().fg(Color::Gray),
            ),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    fn scroll_to_selection(&mut self, visible_styles: usize) {
        if let Some(coord) = self.editor.selected() {
            if coord.style < self.style_offset {
                self.style_offset = coord.style;
            } else if coord.style >= self.style_offset + visible_styles {
                self.style_offset = coord.style + 1 - visible_styles;
            }
        }
        let max_offset = self.board.style_count().saturating_sub(visible_styles);
        self.style_offset = self.style_offset.min(max_offset);
    }

    fn render_grid(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);

        if self.board.style_count() == 0 {
            let msg = Paragraph::new(format!(
                "No weekly actuals for {}. Press r to reload or s to switch season.",
                self.settings.scope_label()
            ))
            .block(block);
            f.render_widget(msg, area);
            self.grid_layout = None;
            return;
        }

        let visible_styles = (usize::from(inner.height.saturating_sub(HEADER_HEIGHT)) / METRIC_COUNT).max(1);
        self.scroll_to_selection(visible_styles);
        let weeks: Vec<u32> = self.window.visible().to_vec();

        let mut header_cells = vec![
            Cell::from("Style"),
            Cell::from("Name"),
            Cell::from("Metric"),
        ];
        for &week in &weeks {
            let (top, bottom) = week_label(week, self.settings.anchor_year);
            let text = Text::from(vec![
                Line::from(top).alignment(Alignment::Right),
                Line::from(bottom).alignment(Alignment::Right),
            ]);
            header_cells.push(Cell::from(text).style(week_header_style(week, self.current_week)));
        }
        let header = Row::new(header_cells)
            .height(HEADER_HEIGHT)
            .style(Style::default().add_modifier(Modifier::BOLD));

        let end = (self.style_offset + visible_styles).min(self.board.style_count());
        let mut rows = Vec::with_capacity((end - self.style_offset) * METRIC_COUNT);
        for style_idx in self.style_offset..end {
            let Some(group) = self.board.group(style_idx) else {
                continue;
            };
            let band = if style_idx % 2 == 1 {
                Style::default().bg(SECTION_BG)
            } else {
                Style::default()
            };
            for (metric_idx, metric) in Metric::ALL.into_iter().enumerate() {
                let (lead, name) = match metric_idx {
                    0 => (
                        Cell::from(group.style_number.clone())
                            .style(Style::default().add_modifier(Modifier::BOLD)),
                        Cell::from(truncate(&group.style_name, NAME_COL_WIDTH)),
                    ),
                    1 => (
                        Cell::from(truncate(&group.category, STYLE_COL_WIDTH))
                            .style(Style::default().add_modifier(Modifier::DIM)),
                        Cell::from(format!("Plan {}", group.total_plan_qty))
                            .style(Style::default().add_modifier(Modifier::DIM)),
                    ),
                    _ => (Cell::from(""), Cell::from("")),
                };
                let label_style = if metric.is_editable() {
                    Style::default()
                } else {
                    Style::default().add_modifier(Modifier::ITALIC)
                };
                let mut cells = vec![lead, name, Cell::from(metric.label()).style(label_style)];
                for (col, &week) in weeks.iter().enumerate() {
                    cells.push(self.value_cell(CellCoord::new(style_idx, metric_idx, col), metric, week));
                }
                rows.push(Row::new(cells).style(band));
            }
        }

        let mut widths = vec![
            Constraint::Length(STYLE_COL_WIDTH),
            Constraint::Length(NAME_COL_WIDTH),
            Constraint::Length(METRIC_COL_WIDTH),
        ];
        widths.extend(weeks.iter().map(|_| Constraint::Length(WEEK_COL_WIDTH)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(COLUMN_SPACING)
            .flex(Flex::Start);
        f.render_widget(table, area);

        self.grid_layout = Some(GridLayout {
            inner,
            style_offset: self.style_offset,
            visible_styles: end - self.style_offset,
            visible_cols: weeks.len(),
        });
    }

    fn value_cell(&self, coord: CellCoord, metric: Metric, week: u32) -> Cell<'static> {
        if let Some((editing, draft)) = self.editor.editing() {
            if editing == coord {
                return Cell::from(
                    Line::from(format!("{draft}{EDIT_CURSOR}")).alignment(Alignment::Right),
                )
                .style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                );
            }
        }
        let value = self.board.value(coord.style, metric, week);
        let style = cell_style(
            self.editor.selected() == Some(coord),
            is_cell_editable(metric, week, self.current_week),
            value,
        );
        Cell::from(Line::from(value.to_string()).alignment(Alignment::Right)).style(style)
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let status = match &self.status {
            Some((msg, color)) => Line::from(Span::styled(msg.clone(), Style::default().fg(*color))),
            None => {
                let warnings = self.board.warnings().len();
                let warn_style = if warnings > 0 {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Line::from(vec![
                    Span::styled(
                        format!("{} pending", self.sync.pending()),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::raw("  "),
                    Span::styled(format!("{warnings} data warnings"), warn_style),
                    Span::raw("  "),
                    Span::styled(
                        format!("clipboard: {}", self.editor.clipboard().unwrap_or("-")),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            }
        };
        let help = Line::from(Span::styled(
            "←↑↓→/Tab move · Enter edit/commit · Esc cancel · ^C/^V copy/paste · n/p page · c this week · r reload · s season · q quit",
            Style::default().add_modifier(Modifier::DIM),
        ));
        let p = Paragraph::new(vec![status, help]).block(Block::default().borders(Borders::TOP));
        f.render_widget(p, area);
    }
}

/// Style for a week value cell.
pub(crate) fn cell_style(is_selected: bool, is_editable: bool, value: MetricValue) -> Style {
    if is_selected {
        let bg = if is_editable { Color::White } else { Color::Gray };
        return Style::default()
            .fg(Color::Black)
            .bg(bg)
            .add_modifier(Modifier::BOLD);
    }
    let base = if value.is_negative() {
        Style::default().fg(Color::Red)
    } else if value == MetricValue::Placeholder {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    if is_editable {
        base
    } else {
        base.add_modifier(Modifier::DIM)
    }
}

pub(crate) fn week_header_style(week: u32, current_week: u32) -> Style {
    if week == current_week {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else if week < current_week {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    }
}

fn truncate(s: &str, width: u16) -> String {
    let width = usize::from(width);
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ── App event loop ────────────────────────────────────────────────────────────

pub fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key.code, key.modifiers) {
                        break;
                    }
                }
                CEvent::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
        app.tick();
    }
    Ok(())
}
