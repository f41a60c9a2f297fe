mod apply;
mod users;

pub use apply::run_apply;
pub use users::run_users;

use std::io::{Stdout, stdout};

use anyhow::Result;
use chrono::Local;
use crossterm::{
    ExecutableCommand,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::notify::{NoticeLevel, ToastQueue};

type Term = Terminal<CrosstermBackend<Stdout>>;

fn enter() -> Result<Term> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn leave() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn level_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Success => Style::default().fg(Color::Green),
        NoticeLevel::Info => Style::default().fg(Color::Cyan),
        NoticeLevel::Error => Style::default().fg(Color::Red),
    }
}

/// Stacks live toasts in the top-right corner.
fn draw_toasts(frame: &mut Frame, toasts: &ToastQueue) {
    let area = frame.area();
    let width = 44.min(area.width);
    for (i, notice) in toasts.live(Local::now()).iter().enumerate() {
        let y = area.y + 1 + (i as u16) * 3;
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height: 3,
        };
        let toast = Paragraph::new(notice.message.as_str())
            .style(level_style(notice.level))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(Clear, rect);
        frame.render_widget(toast, rect);
    }
}

fn draw_help(frame: &mut Frame, text: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let help = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}
