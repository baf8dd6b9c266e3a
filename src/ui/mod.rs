//! Terminal rendering for the chat screen.
//!
//! Rendering is pure: everything drawn here is a projection of [`App`]
//! state. Business logic stays in `core`.

pub mod chat_loop;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::app::{ApiStatus, App};
use crate::core::message::TranscriptRole;

/// Lines of chrome around the transcript pane: one title line above, and
/// the three-line input pane below.
pub const INPUT_PANE_HEIGHT: u16 = 3;
pub const TRANSCRIPT_TITLE_HEIGHT: u16 = 1;

const STREAMING_CURSOR: &str = "▌";

pub fn draw(f: &mut Frame, app: &App) {
    match app.api_status {
        ApiStatus::Checking => draw_status_screen(
            f,
            vec![Line::from(Span::styled(
                "Connecting to the advisor service...",
                Style::default().fg(Color::DarkGray),
            ))],
        ),
        ApiStatus::Unhealthy => draw_status_screen(
            f,
            vec![
                Line::from(Span::styled(
                    "Cannot connect to the advisor service",
                    Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!(
                        "Please make sure the AI service is running at {}",
                        app.base_url()
                    ),
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        ),
        ApiStatus::Healthy => draw_chat_screen(f, app),
    }
}

fn draw_status_screen(f: &mut Frame, lines: Vec<Line>) {
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(3),
            Constraint::Percentage(40),
        ])
        .split(f.area());

    f.render_widget(paragraph, chunks[1]);
}

fn draw_chat_screen(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(INPUT_PANE_HEIGHT)])
        .split(f.area());

    let lines = build_display_lines(app);
    let total_lines = lines.len() as u16;
    let available_height = chunks[0].height.saturating_sub(TRANSCRIPT_TITLE_HEIGHT);

    let max_offset = total_lines.saturating_sub(available_height);
    let scroll_offset = if app.auto_scroll {
        max_offset
    } else {
        app.scroll_offset.min(max_offset)
    };

    let transcript = Paragraph::new(lines)
        .block(Block::default().title("Arcvale — Arctic Valley advisor"))
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, chunks[0]);

    let (input_title, input_style) = if app.is_loading {
        ("Thinking...", Style::default().fg(Color::DarkGray))
    } else {
        (
            "Ask about Arctic Valley (Enter to send, Ctrl+C to quit)",
            Style::default().fg(Color::Yellow),
        )
    };

    let input = Paragraph::new(app.input.as_str())
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    if !app.is_loading {
        f.set_cursor_position((chunks[1].x + app.input.len() as u16 + 1, chunks[1].y + 1));
    }
}

/// Number of transcript lines currently renderable; the event loop uses
/// this for scroll clamping.
pub fn transcript_line_count(app: &App) -> u16 {
    build_display_lines(app).len() as u16
}

fn build_display_lines(app: &App) -> Vec<Line<'_>> {
    let mut lines = Vec::new();

    for msg in app.transcript.iter() {
        match msg.role {
            TranscriptRole::User => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "You: ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(&msg.content, Style::default().fg(Color::Cyan)),
                ]));
                lines.push(Line::from(""));
            }
            TranscriptRole::Assistant => {
                push_content_lines(
                    &mut lines,
                    &msg.content,
                    Style::default().fg(Color::White),
                    msg.is_streaming,
                );
                if !msg.sources.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "Sources:",
                        Style::default().fg(Color::DarkGray),
                    )));
                    for source in &msg.sources {
                        lines.push(Line::from(Span::styled(
                            format!("  • {} ({})", source.title, source.origin),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
                lines.push(Line::from(""));
            }
            TranscriptRole::AppError => {
                push_content_lines(&mut lines, &msg.content, Style::default().fg(Color::Red), false);
                lines.push(Line::from(""));
            }
        }
    }

    if app.show_typing_indicator() {
        lines.push(Line::from(Span::styled(
            "● ● ●",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    lines
}

fn push_content_lines<'a>(
    lines: &mut Vec<Line<'a>>,
    content: &'a str,
    style: Style,
    streaming: bool,
) {
    let mut content_lines: Vec<&str> = content.lines().collect();
    if content_lines.is_empty() {
        content_lines.push("");
    }
    let last_index = content_lines.len() - 1;

    for (i, content_line) in content_lines.into_iter().enumerate() {
        let mut spans = Vec::new();
        if !content_line.is_empty() {
            spans.push(Span::styled(content_line, style));
        }
        // The cursor rides the tail of the text while the turn streams.
        if streaming && i == last_index {
            spans.push(Span::styled(
                STREAMING_CURSOR,
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }
}
