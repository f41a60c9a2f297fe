use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::{Term, draw_help, draw_toasts, enter, leave};
use crate::api::JobsBackend;
use crate::application::{ApplicationForm, DEGREE_OPTIONS, Field, Phase, ProfileVariant};
use crate::models::{FactValue, ProfileType};
use crate::notify::ToastQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input(Field),
    Profile,
    Fresher,
    Skills,
    Submit,
}

struct Ui {
    focus: usize,
    suggestion: Option<usize>,
    submitting: bool,
    toasts: ToastQueue,
}

fn focus_order<B>(form: &ApplicationForm<B>) -> Vec<Focus>
where
    B: JobsBackend + Send + Sync + 'static,
{
    let fields = form.fields();
    let mut order = vec![Focus::Input(Field::Name), Focus::Input(Field::Email), Focus::Profile];
    if fields.profile_type == ProfileType::Postgraduate {
        order.push(Focus::Fresher);
    }
    order.extend(fields.variant().fields().iter().map(|f| Focus::Input(*f)));
    order.push(Focus::Skills);
    order.push(Focus::Submit);
    order
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Name => "Full Name",
        Field::Email => "Email",
        Field::College => "College",
        Field::Company => "Company Name",
        Field::Cgpa => "CGPA",
        Field::Degree => "Graduation Degree",
        Field::Lpa => "Current/Last CTC (LPA)",
        Field::YearsExp => "Years of Experience",
    }
}

fn cycle_degree(current: &str, forward: bool) -> &'static str {
    let pos = DEGREE_OPTIONS.iter().position(|d| *d == current);
    let len = DEGREE_OPTIONS.len();
    let next = match (pos, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    };
    DEGREE_OPTIONS[next]
}

pub async fn run_apply<B>(mut form: ApplicationForm<B>, toasts: ToastQueue) -> Result<()>
where
    B: JobsBackend + Send + Sync + 'static,
{
    form.ensure_job().await;

    let mut ui = Ui {
        focus: 0,
        suggestion: None,
        submitting: false,
        toasts,
    };

    let mut terminal = enter()?;
    let result = run_loop(&mut terminal, &mut form, &mut ui).await;
    leave()?;

    result
}

async fn run_loop<B>(terminal: &mut Term, form: &mut ApplicationForm<B>, ui: &mut Ui) -> Result<()>
where
    B: JobsBackend + Send + Sync + 'static,
{
    loop {
        form.poll_duplicate_check(&ui.toasts);

        let order = focus_order(form);
        ui.focus = ui.focus.min(order.len() - 1);
        terminal.draw(|frame| draw(frame, form, ui, &order))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let focus = order[ui.focus];
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        let quit_applied = form.phase() == Phase::Applied && key.code == KeyCode::Char('q');
        if key.code == KeyCode::Esc || quit_applied {
            break;
        }
        if ctrl && key.code == KeyCode::Char('s') {
            submit(terminal, form, ui, &order).await?;
            continue;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                ui.focus = (ui.focus + 1) % order.len();
                ui.suggestion = None;
                continue;
            }
            KeyCode::BackTab | KeyCode::Up => {
                ui.focus = (ui.focus + order.len() - 1) % order.len();
                ui.suggestion = None;
                continue;
            }
            _ => {}
        }

        match focus {
            Focus::Input(Field::Degree) => match key.code {
                KeyCode::Right | KeyCode::Char(' ') => {
                    let next = cycle_degree(&form.fields().degree, true);
                    form.set_field(Field::Degree, next);
                }
                KeyCode::Left => {
                    let prev = cycle_degree(&form.fields().degree, false);
                    form.set_field(Field::Degree, prev);
                }
                KeyCode::Backspace => form.set_field(Field::Degree, ""),
                _ => {}
            },
            Focus::Input(field) => match key.code {
                KeyCode::Char(c) => form.push_char(field, c),
                KeyCode::Backspace => form.pop_char(field),
                KeyCode::Enter => ui.focus = (ui.focus + 1) % order.len(),
                _ => {}
            },
            Focus::Profile => {
                if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                    let next = match form.fields().profile_type {
                        ProfileType::Student => ProfileType::Postgraduate,
                        ProfileType::Postgraduate => ProfileType::Student,
                    };
                    form.set_profile_type(next);
                }
            }
            Focus::Fresher => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                    let toggled = !form.fields().is_fresher;
                    form.set_fresher(toggled);
                }
            }
            Focus::Skills => {
                let suggestions = form.suggestions();
                match key.code {
                    KeyCode::Right if !suggestions.is_empty() => {
                        let len = suggestions.len();
                        ui.suggestion = Some(ui.suggestion.map_or(0, |i| (i + 1) % len));
                    }
                    KeyCode::Left if !suggestions.is_empty() => {
                        ui.suggestion = ui.suggestion.and_then(|i| i.checked_sub(1));
                    }
                    KeyCode::Enter => {
                        match ui.suggestion.and_then(|i| suggestions.get(i)) {
                            Some(choice) => {
                                form.add_skill(choice);
                            }
                            None => {
                                form.confirm_skill_input();
                            }
                        }
                        ui.suggestion = None;
                    }
                    KeyCode::Delete => {
                        if let Some(last) = form.skills().as_slice().last().cloned() {
                            form.remove_skill(&last);
                        }
                    }
                    KeyCode::Backspace => {
                        form.skill_backspace();
                        ui.suggestion = None;
                    }
                    KeyCode::Char(c) => {
                        form.skill_char(c);
                        ui.suggestion = None;
                    }
                    _ => {}
                }
            }
            Focus::Submit => {
                if key.code == KeyCode::Enter {
                    submit(terminal, form, ui, &order).await?;
                }
            }
        }
    }
    Ok(())
}

async fn submit<B>(
    terminal: &mut Term,
    form: &mut ApplicationForm<B>,
    ui: &mut Ui,
    order: &[Focus],
) -> Result<()>
where
    B: JobsBackend + Send + Sync + 'static,
{
    if !form.can_submit() {
        return Ok(());
    }
    ui.submitting = true;
    terminal.draw(|frame| draw(frame, form, ui, order))?;
    form.submit(&ui.toasts).await;
    ui.submitting = false;
    Ok(())
}

fn draw<B>(frame: &mut Frame, form: &ApplicationForm<B>, ui: &Ui, order: &[Focus])
where
    B: JobsBackend + Send + Sync + 'static,
{
    let cards = form.job().map(|j| j.fact_cards()).unwrap_or_default();
    let card_rows = if cards.is_empty() { 0 } else { cards.len() as u16 + 2 };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(card_rows.min(14)),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header
    let title = form
        .job()
        .and_then(|j| j.title())
        .unwrap_or_else(|| "Apply to job".to_string());
    let mut header = vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))];
    if let Some(company) = form.job().and_then(|j| j.company()) {
        header.push(Span::styled(format!("  {}", company), Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(header)).block(Block::default().borders(Borders::ALL)),
        rows[0],
    );

    // Job facts
    if !cards.is_empty() {
        let lines: Vec<Line> = cards
            .iter()
            .map(|card| {
                let value = match &card.value {
                    FactValue::Text(text) => text.clone(),
                    FactValue::Items(items) => items.join(" · "),
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:<18}", card.label.to_uppercase()),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(value),
                ])
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title(" Job "))
                .wrap(Wrap { trim: true }),
            rows[1],
        );
    }

    // Form
    let focused = order.get(ui.focus).copied();
    let mut lines: Vec<Line> = Vec::new();
    for item in order {
        let is_focused = Some(*item) == focused;
        let marker = if is_focused { "> " } else { "  " };
        let label_style = if is_focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        match item {
            Focus::Input(field) => {
                let value = form.fields().get(*field);
                let shown = if *field == Field::Degree && value.is_empty() {
                    Span::styled("Select degree (←/→)", Style::default().fg(Color::DarkGray))
                } else {
                    Span::raw(value.to_string())
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{:<24}", marker, field_label(*field)), label_style),
                    shown,
                ]));
                if let Some(error) = form.error(*field) {
                    lines.push(Line::from(Span::styled(
                        format!("  {:<24}{}", "", error),
                        Style::default().fg(Color::Red),
                    )));
                }
            }
            Focus::Profile => {
                let (student, post) = match form.fields().profile_type {
                    ProfileType::Student => ("(•) Student", "( ) Post Graduate"),
                    ProfileType::Postgraduate => ("( ) Student", "(•) Post Graduate"),
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{:<24}", marker, "Profile"), label_style),
                    Span::raw(format!("{}   {}", student, post)),
                ]));
            }
            Focus::Fresher => {
                let check = if form.fields().is_fresher { "[x]" } else { "[ ]" };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{:<24}", marker, "Are you a Fresher?"), label_style),
                    Span::raw(format!("{} Yes, I'm a fresher", check)),
                ]));
            }
            Focus::Skills => {
                let chips = if form.skills().is_empty() {
                    "none yet".to_string()
                } else {
                    form.skills()
                        .as_slice()
                        .iter()
                        .map(|s| format!("[{}]", s))
                        .collect::<Vec<_>>()
                        .join(" ")
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{:<24}", marker, "Skills"), label_style),
                    Span::styled(chips, Style::default().fg(Color::Cyan)),
                ]));
                lines.push(Line::from(format!("  {:<24}{}_", "", form.skill_input())));
                if is_focused {
                    let suggestions: Vec<Span> = form
                        .suggestions()
                        .iter()
                        .enumerate()
                        .map(|(i, s)| {
                            let style = if ui.suggestion == Some(i) {
                                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                            } else {
                                Style::default().fg(Color::DarkGray)
                            };
                            Span::styled(format!(" {} ", s), style)
                        })
                        .collect();
                    if !suggestions.is_empty() {
                        let mut line = vec![Span::raw(format!("  {:<24}", ""))];
                        line.extend(suggestions);
                        lines.push(Line::from(line));
                    }
                }
            }
            Focus::Submit => {
                lines.push(Line::from(""));
                let label = if ui.submitting {
                    "Submitting…"
                } else {
                    form.submit_label()
                };
                let style = if form.can_submit() && !ui.submitting {
                    label_style.fg(Color::White).bg(Color::Blue)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                lines.push(Line::from(Span::styled(format!("{}[ {} ]", marker, label), style)));
            }
        }
    }

    if let Some(message) = form.message() {
        lines.push(Line::from(""));
        let style = if message.is_error {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        };
        for line in textwrap::fill(&message.text, 70).lines() {
            lines.push(Line::from(Span::styled(format!("  {}", line), style)));
        }
    }

    let variant = match form.fields().variant() {
        ProfileVariant::Student => "student",
        ProfileVariant::Fresher => "postgraduate, fresher",
        ProfileVariant::Experienced => "postgraduate, experienced",
    };
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Application ({}) ", variant)),
            )
            .wrap(Wrap { trim: false }),
        rows[2],
    );

    draw_help(
        frame,
        " tab/↑↓:move  space:toggle  ←/→:choose  enter/,:add skill  del:drop skill  \
         ctrl-s:submit  esc:close",
    );
    draw_toasts(frame, &ui.toasts);
}
