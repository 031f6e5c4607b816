use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expense_ledger::{format_amount, Editor, LedgerError, LedgerStore, Outcome, Selection};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use tracing::debug;

const PAGE_STEP: usize = 20;
const LABEL_WIDTH: u16 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Date,
    Category,
    Amount,
    Notes,
    Table,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Date => Focus::Category,
            Focus::Category => Focus::Amount,
            Focus::Amount => Focus::Notes,
            Focus::Notes => Focus::Table,
            Focus::Table => Focus::Date,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::Date => Focus::Table,
            Focus::Category => Focus::Date,
            Focus::Amount => Focus::Category,
            Focus::Notes => Focus::Amount,
            Focus::Table => Focus::Notes,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Focus::Date => "Date (YYYY-MM-DD):",
            Focus::Category => "Category:",
            Focus::Amount => "Amount:",
            Focus::Notes => "Notes:",
            Focus::Table => "Expense History",
        }
    }
}

const FIELDS: [Focus; 4] = [Focus::Date, Focus::Category, Focus::Amount, Focus::Notes];

/// Modal dialog drawn over the main screen; it swallows every key until closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Notice {
        title: String,
        message: String,
        is_error: bool,
    },
    ConfirmDelete {
        summary: String,
    },
    ConfirmQuit,
}

pub struct App<S: LedgerStore> {
    pub editor: Editor<S>,
    pub state: TableState,
    pub focus: Focus,
    pub popup: Option<Popup>,
    pub currency: String,
    pub status: String,
    pub should_quit: bool,
}

impl<S: LedgerStore> App<S> {
    pub fn new(editor: Editor<S>, currency: String) -> Self {
        let mut state = TableState::default();
        if !editor.records().is_empty() {
            state.select(Some(0));
        }

        Self {
            editor,
            state,
            focus: Focus::Date,
            popup: None,
            currency,
            status: String::from("Ready"),
            should_quit: false,
        }
    }

    /// Route one key press. Popups take precedence over everything else.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.popup.is_some() {
            self.handle_popup_key(key);
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::F(2) => self.add(),
            KeyCode::F(3) => self.update(),
            KeyCode::F(4) => self.request_delete(),
            KeyCode::F(5) => self.clear(),
            KeyCode::Char('a') if ctrl => self.add(),
            KeyCode::Char('u') if ctrl => self.update(),
            KeyCode::Char('d') if ctrl => self.request_delete(),
            KeyCode::Char('l') if ctrl => self.clear(),
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => self.popup = Some(Popup::ConfirmQuit),
            KeyCode::Esc => self.popup = Some(Popup::ConfirmQuit),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.focus = self.focus.previous();
                } else {
                    self.focus = self.focus.next();
                }
            }
            _ if self.focus == Focus::Table => self.handle_table_key(key),
            _ => self.handle_field_key(key),
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) {
        let Some(popup) = self.popup.take() else {
            return;
        };

        match popup {
            Popup::Notice { .. } => {}
            Popup::ConfirmDelete { summary } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let result = self.editor.delete(true);
                    self.report(result);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    let result = self.editor.delete(false);
                    self.report(result);
                }
                _ => self.popup = Some(Popup::ConfirmDelete { summary }),
            },
            Popup::ConfirmQuit => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.should_quit = true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
                _ => self.popup = Some(Popup::ConfirmQuit),
            },
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.popup = Some(Popup::ConfirmQuit),
            KeyCode::Char('a') => self.add(),
            KeyCode::Char('u') => self.update(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('c') => self.clear(),
            KeyCode::Enter | KeyCode::Char(' ') => self.select_highlighted(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => {
                if !self.editor.records().is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                let len = self.editor.records().len();
                if len > 0 {
                    self.state.select(Some(len - 1));
                }
            }
            _ => {}
        }
    }

    fn handle_field_key(&mut self, key: KeyEvent) {
        let focus = self.focus;
        let form = self.editor.form_mut();
        let field = match focus {
            Focus::Date => &mut form.date,
            Focus::Category => &mut form.category,
            Focus::Amount => &mut form.amount,
            Focus::Notes => &mut form.notes,
            Focus::Table => return,
        };

        match key.code {
            KeyCode::Char(c) => field.push(c),
            KeyCode::Backspace => {
                field.pop();
            }
            KeyCode::Enter | KeyCode::Down => self.focus = focus.next(),
            KeyCode::Up => self.focus = focus.previous(),
            _ => {}
        }
    }

    pub fn add(&mut self) {
        let result = self.editor.add();
        self.report(result);
    }

    pub fn update(&mut self) {
        let result = self.editor.update();
        self.report(result);
    }

    pub fn clear(&mut self) {
        let outcome = self.editor.clear();
        self.report(Ok(outcome));
    }

    /// Ask for confirmation; without a selection this fails straight away.
    pub fn request_delete(&mut self) {
        match self.editor.require_selection("delete") {
            Ok(_) => {
                let summary = match self.editor.selected() {
                    Some(e) => format!(
                        "{}  {}  {}",
                        e.date,
                        e.category,
                        format_amount(e.amount, &self.currency)
                    ),
                    None => String::from("the selected expense"),
                };
                self.popup = Some(Popup::ConfirmDelete { summary });
            }
            Err(e) => self.report(Err(e)),
        }
    }

    /// Mirror the highlighted row into the form.
    pub fn select_highlighted(&mut self) {
        let Some(id) = self
            .state
            .selected()
            .and_then(|i| self.editor.records().get(i))
            .map(|e| e.id.clone())
        else {
            return;
        };

        match self.editor.select(&id) {
            Ok(()) => {
                debug!(%id, "row selected");
                self.status = String::from("Editing selected expense");
                self.focus = Focus::Date;
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn report(&mut self, result: Result<Outcome, LedgerError>) {
        match result {
            Ok(outcome @ (Outcome::Cleared | Outcome::Cancelled)) => {
                self.status = outcome.message().to_string();
                if outcome == Outcome::Cleared {
                    self.focus = Focus::Date;
                }
            }
            Ok(outcome) => {
                self.status = outcome.message().to_string();
                self.focus = Focus::Date;
                self.popup = Some(Popup::Notice {
                    title: String::from("Success"),
                    message: outcome.message().to_string(),
                    is_error: false,
                });
            }
            Err(e) => {
                self.status = e.to_string();
                self.popup = Some(Popup::Notice {
                    title: e.title().to_string(),
                    message: capitalize(&e.to_string()),
                    is_error: !e.is_soft(),
                });
            }
        }
        self.clamp_highlight();
    }

    fn clamp_highlight(&mut self) {
        let len = self.editor.records().len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.state.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.editor.records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.editor.records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.editor.records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_STEP).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.editor.records().is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(PAGE_STEP)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

pub fn run_ui<S: LedgerStore>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: LedgerStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            // Windows reports releases too
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key(key);
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

fn ui<S: LedgerStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(6), // Form
            Constraint::Length(3), // Actions
            Constraint::Min(0),    // Expense table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_form(f, chunks[1], app);
    render_actions(f, chunks[2]);
    render_table(f, chunks[3], app);
    render_status_bar(f, chunks[4], app);

    if let Some(popup) = &app.popup {
        render_popup(f, popup);
    }
}

fn render_header<S: LedgerStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let records = app.editor.records();
    let total: f64 = records.iter().map(|e| e.amount).sum();

    let (mode, mode_style) = match app.editor.selection() {
        Selection::Idle => ("NEW", Style::default().fg(Color::Green)),
        Selection::Editing { .. } => ("EDITING", Style::default().fg(Color::Yellow)),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Expense Tracker",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(mode, mode_style.add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::styled(
            format!("Records: {}", records.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Total: {}", format_amount(total, &app.currency)),
            Style::default().fg(Color::White),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_form<S: LedgerStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let form = app.editor.form();
    let values = [&form.date, &form.category, &form.amount, &form.notes];

    let lines: Vec<Line> = FIELDS
        .iter()
        .zip(values.iter())
        .map(|(field, value)| {
            let label_style = if *field == app.focus {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            let label = if *field == Focus::Amount {
                format!(" {} Amount:", app.currency)
            } else {
                format!(" {}", field.label())
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", label, width = LABEL_WIDTH as usize),
                    label_style,
                ),
                Span::raw(value.as_str()),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Enter Expense Details ");
    f.render_widget(Paragraph::new(lines).block(block), area);

    // Caret at the end of the focused input
    if let Some(row) = FIELDS.iter().position(|field| *field == app.focus) {
        let typed = values[row].chars().count() as u16;
        let x = (area.x + 1 + LABEL_WIDTH + typed).min(area.right().saturating_sub(2));
        f.set_cursor(x, area.y + 1 + row as u16);
    }
}

fn render_actions(f: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let actions = Paragraph::new(Line::from(vec![
        Span::styled(" F2 ", key),
        Span::raw("Add Expense   "),
        Span::styled("F3 ", key),
        Span::raw("Update Expense   "),
        Span::styled("F4 ", key),
        Span::raw("Delete Expense   "),
        Span::styled("F5 ", key),
        Span::raw("Clear Fields"),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Green)));

    f.render_widget(actions, area);
}

fn render_table<S: LedgerStore>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["Date", "Category", "Amount", "Notes"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let editing_id = match app.editor.selection() {
        Selection::Editing { id } => Some(id.as_str()),
        Selection::Idle => None,
    };

    let rows = app.editor.records().iter().map(|e| {
        let style = if Some(e.id.as_str()) == editing_id {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(e.date.clone()),
            Cell::from(truncate(&e.category, 20)),
            Cell::from(format!("{:>12}", format_amount(e.amount, &app.currency))),
            Cell::from(truncate(&e.notes, 40)),
        ])
        .style(style)
        .height(1)
    });

    let border_color = if app.focus == Focus::Table {
        Color::Yellow
    } else {
        Color::White
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Expense History "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar<S: LedgerStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.editor.records().len();
    let key = Style::default().fg(Color::Yellow);

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(truncate(&app.status, 40), Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled("Tab", key),
        Span::raw(" Focus | "),
        Span::styled("Enter", key),
        Span::raw(" Select row | "),
        Span::styled("↑/↓", key),
        Span::raw(" Nav | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_popup(f: &mut Frame, popup: &Popup) {
    let (title, body, color, hint) = match popup {
        Popup::Notice {
            title,
            message,
            is_error,
        } => (
            title.as_str(),
            message.clone(),
            if *is_error { Color::Red } else { Color::Green },
            "Press any key to continue",
        ),
        Popup::ConfirmDelete { summary } => (
            "Confirm Delete",
            format!("Are you sure you want to delete this expense?\n\n{}", summary),
            Color::Yellow,
            "y = delete   n = keep",
        ),
        Popup::ConfirmQuit => (
            "Quit",
            String::from("Do you want to quit the application?"),
            Color::Yellow,
            "y = quit   n = stay",
        ),
    };

    let area = centered_rect(50, 30, f.size());
    let mut lines: Vec<Line> = body.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        hint,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let dialog = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", title)),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
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
        .split(vertical[1])[1]
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
