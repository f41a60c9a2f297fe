use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::sync::mpsc;

use super::{Term, centered, draw_help, draw_toasts, enter, leave};
use crate::api::AdminBackend;
use crate::directory::{self, UserDirectory, ViewFilter};
use crate::error::ClientError;
use crate::models::{RowKey, UserRecord};
use crate::notify::ToastQueue;
use crate::truncate;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

enum Msg {
    Loaded(Result<(Vec<UserRecord>, Vec<UserRecord>), ClientError>),
    Deleted(RowKey, Result<(), ClientError>),
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Browse,
    Search,
    Confirm(RowKey, String),
}

struct AppState {
    directory: UserDirectory,
    view: ViewFilter,
    query: String,
    selected: usize,
    mode: Mode,
    api_base: String,
    tick: usize,
    toasts: ToastQueue,
}

impl AppState {
    fn rows(&self) -> Vec<RowKey> {
        self.directory
            .search(self.view, &self.query)
            .iter()
            .map(|e| e.key())
            .collect()
    }

    fn current(&self) -> Option<RowKey> {
        self.rows().get(self.selected).cloned()
    }

    fn clamp(&mut self) {
        let len = self.rows().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn next(&mut self) {
        let len = self.rows().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

pub async fn run_users<B>(
    backend: Arc<B>,
    api_base: &str,
    view: ViewFilter,
    query: Option<String>,
) -> Result<()>
where
    B: AdminBackend + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let loader = backend.clone();
    let load_tx = tx.clone();
    tokio::spawn(async move {
        let result = directory::fetch_all(&*loader).await;
        let _ = load_tx.send(Msg::Loaded(result));
    });

    let mut state = AppState {
        directory: UserDirectory::new(),
        view,
        query: query.unwrap_or_default(),
        selected: 0,
        mode: Mode::Browse,
        api_base: api_base.to_string(),
        tick: 0,
        toasts: ToastQueue::new(),
    };

    let mut terminal = enter()?;
    let result = run_loop(&mut terminal, &mut state, backend, tx, &mut rx);
    leave()?;

    result
}

fn run_loop<B>(
    terminal: &mut Term,
    state: &mut AppState,
    backend: Arc<B>,
    tx: mpsc::UnboundedSender<Msg>,
    rx: &mut mpsc::UnboundedReceiver<Msg>,
) -> Result<()>
where
    B: AdminBackend + Send + Sync + 'static,
{
    let mut list_state = ListState::default();

    loop {
        while let Ok(msg) = rx.try_recv() {
            match msg {
                Msg::Loaded(result) => state.directory.apply_load(result),
                Msg::Deleted(key, result) => {
                    state.directory.finish_delete(&key, result, &state.toasts);
                }
            }
            state.clamp();
        }

        state.tick = state.tick.wrapping_add(1);
        list_state.select(if state.rows().is_empty() { None } else { Some(state.selected) });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if !event::poll(Duration::from_millis(120))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match state.mode.clone() {
            Mode::Search => match key.code {
                KeyCode::Enter | KeyCode::Esc => state.mode = Mode::Browse,
                KeyCode::Backspace => {
                    state.query.pop();
                    state.selected = 0;
                }
                KeyCode::Char(c) => {
                    state.query.push(c);
                    state.selected = 0;
                }
                _ => {}
            },
            Mode::Confirm(row, _) => {
                state.mode = Mode::Browse;
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    if !state.directory.begin_delete(&row) {
                        continue;
                    }
                    let backend = backend.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let result = backend.delete_user(row.list, &row.id).await;
                        let _ = tx.send(Msg::Deleted(row, result));
                    });
                }
            }
            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('v') => {
                    state.view = state.view.next();
                    state.selected = 0;
                }
                KeyCode::Char('/') => state.mode = Mode::Search,
                KeyCode::Char('d') | KeyCode::Delete => {
                    if let Some(row) = state.current() {
                        if state.directory.is_deleting(&row) {
                            continue;
                        }
                        if let Some(prompt) = state.directory.confirm_prompt(&row) {
                            state.mode = Mode::Confirm(row, prompt);
                        }
                    }
                }
                _ => {}
            },
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    draw_toolbar(frame, state, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    let entries = state.directory.search(state.view, &state.query);

    if state.directory.is_loading() {
        let loading = Paragraph::new("Loading...")
            .block(Block::default().borders(Borders::ALL).title(" Users "));
        frame.render_widget(loading, chunks[0]);
    } else if state.directory.is_empty_state(state.view, &state.query) {
        let mut lines = Vec::new();
        if let Some(error) = state.directory.error() {
            lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "No users found",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from("Try adjusting your search or switching tabs."));
        let empty = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Users (0) "));
        frame.render_widget(empty, chunks[0]);
    } else {
        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| {
                let marker = if state.directory.is_deleting(&entry.key()) {
                    SPINNER[state.tick % SPINNER.len()]
                } else {
                    'x'
                };
                let name = entry.record.display_name();
                ListItem::new(format!(
                    "[{}] {:<24} {}",
                    marker,
                    truncate(&name, 24),
                    entry.record.email
                ))
            })
            .collect();

        let mut title = format!(" Users ({}) ", entries.len());
        if let Some(error) = state.directory.error() {
            title = format!(" Users ({}) - {} ", entries.len(), error);
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], list_state);
    }

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, chunks[1]);

    draw_help(
        frame,
        " j/k:navigate  v:switch view  /:search  d:delete  q:quit",
    );

    if let Mode::Confirm(_, prompt) = &state.mode {
        let area = centered(frame.area(), 60, 5);
        let dialog = Paragraph::new(vec![
            Line::from(prompt.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                "y: delete   any other key: cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Confirm "))
        .wrap(Wrap { trim: true });
        frame.render_widget(Clear, area);
        frame.render_widget(dialog, area);
    }

    draw_toasts(frame, &state.toasts);
}

fn draw_toolbar(frame: &mut Frame, state: &AppState, area: Rect) {
    let search_style = if state.mode == Mode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let query = if state.query.is_empty() && state.mode != Mode::Search {
        Span::styled("Search by name or email", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(state.query.as_str(), search_style)
    };
    let line = Line::from(vec![
        Span::styled(format!("[{}]", state.view.label()), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        query,
    ]);
    let toolbar =
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(" Users "));
    frame.render_widget(toolbar, area);
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(row) = state.current() else {
        return Text::raw("No user selected");
    };
    let Some(record) = state.directory.find(&row) else {
        return Text::raw("No user selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        record.display_name(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(record.email.clone()));
    lines.push(Line::from(Span::styled(
        format!("{} #{}", row.list.label(), record.id),
        Style::default().fg(Color::Cyan),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Avatar", Style::default().fg(Color::DarkGray))));
    lines.push(Line::from(directory::avatar_url(record, &state.api_base)));

    if state.directory.is_deleting(&row) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Deleting...", Style::default().fg(Color::Yellow))));
    }

    let hidden = state.directory.unknown_count();
    if hidden > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} record(s) with an unrecognized role are hidden", hidden),
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}
