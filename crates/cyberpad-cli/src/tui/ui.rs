//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use cyberpad_core::{BlockKind, CalloutVariant, Page};

use super::app::{App, InputMode, TitleTarget};
use crate::output::display_title;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(outer_chunks[0]);

    draw_sidebar(frame, app, pane_chunks[0]);
    draw_page(frame, app, pane_chunks[1]);

    match app.input_mode {
        InputMode::Normal => draw_status_bar(frame, app, outer_chunks[1]),
        InputMode::Title => draw_title_input(frame, app, outer_chunks[1]),
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the page tree (left)
fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.data.active_page_id.as_ref();

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let marker = if !row.has_children {
                "  "
            } else if row.expanded {
                "▼ "
            } else {
                "▶ "
            };
            let style = if Some(&row.id) == active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::raw("  ".repeat(row.depth)),
                Span::styled(marker, Style::default().add_modifier(Modifier::DIM)),
                Span::styled(display_title(&row.title).to_string(), style),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(format!(" {} ", app.identity))
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED),
    );

    let mut state = ListState::default();
    if !app.rows.is_empty() {
        state.select(Some(app.selected));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the active page (right)
fn draw_page(frame: &mut Frame, app: &App, area: Rect) {
    let Some(page) = app.active_page() else {
        let block = Block::default().title(" No page ").borders(Borders::ALL);
        let hint = Paragraph::new(Line::from(Span::styled(
            "Select a page and press Enter, or press n to create one.",
            Style::default().add_modifier(Modifier::DIM),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let block = Block::default()
        .title(format!(" {} ", display_title(&page.title)))
        .borders(Borders::ALL);

    let paragraph = Paragraph::new(page_lines(page, area.width.saturating_sub(2)))
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn page_lines(page: &Page, width: u16) -> Vec<Line<'static>> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let mut lines = Vec::new();

    if page.blocks.is_empty() {
        lines.push(Line::from(Span::styled("(no blocks)", dim)));
    }

    for block in &page.blocks {
        let content = block.content.clone();
        match &block.kind {
            BlockKind::Text => lines.extend(content.lines().map(|l| Line::from(l.to_string()))),
            BlockKind::Heading => lines.push(Line::from(Span::styled(
                content,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))),
            BlockKind::Image => lines.push(Line::from(Span::styled(
                format!("[image, {} bytes]", content.len()),
                dim,
            ))),
            BlockKind::Code { language } => {
                lines.push(Line::from(Span::styled(
                    format!("```{}", language.as_deref().unwrap_or("")),
                    dim,
                )));
                lines.extend(content.lines().map(|l| {
                    Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Yellow)))
                }));
                lines.push(Line::from(Span::styled("```", dim)));
            }
            BlockKind::Checklist { checked } => {
                let (mark, style) = if *checked {
                    ("[x] ", dim.add_modifier(Modifier::CROSSED_OUT))
                } else {
                    ("[ ] ", Style::default())
                };
                lines.push(Line::from(vec![
                    Span::raw(mark),
                    Span::styled(content, style),
                ]));
            }
            BlockKind::Callout { variant } => {
                let variant = variant.unwrap_or_default();
                let color = match variant {
                    CalloutVariant::Info => Color::Blue,
                    CalloutVariant::Warning => Color::Yellow,
                    CalloutVariant::Alert => Color::Red,
                    CalloutVariant::Success => Color::Green,
                };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("▌{} ", variant.as_str().to_uppercase()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(content, Style::default().fg(color)),
                ]));
            }
            BlockKind::Divider => {
                lines.push(Line::from(Span::styled(
                    "─".repeat(width as usize),
                    dim,
                )));
            }
            BlockKind::Quote => lines.extend(content.lines().map(|l| {
                Line::from(Span::styled(
                    format!("│ {}", l),
                    Style::default().add_modifier(Modifier::ITALIC),
                ))
            })),
            BlockKind::Decoder => lines.push(Line::from(vec![
                Span::styled("[decoder] ", Style::default().fg(Color::Magenta)),
                Span::raw(content),
            ])),
            BlockKind::Redacted => lines.push(Line::from(Span::styled(
                "█".repeat(block.content.chars().count().clamp(3, 40)),
                dim,
            ))),
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        format!(
            "{}  n:new  c:child  r:rename  d:del  enter:open  ?:help  q:quit",
            app.usage
        )
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Draw title input at the bottom
fn draw_title_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = match app.title_target {
        Some(TitleTarget::Rename(_)) => "Rename: ",
        Some(TitleTarget::NewChild(_)) => "New child: ",
        _ => "New page: ",
    };

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Yellow)),
        Span::raw(app.input.as_str()),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    frame.set_cursor_position((cursor_x(area, prefix, app.cursor), area.y));
}

/// Screen column of the input cursor, clamped to the terminal's range
fn cursor_x(area: Rect, prefix: &str, cursor: usize) -> u16 {
    let offset = u16::try_from(prefix.chars().count().saturating_add(cursor)).unwrap_or(u16::MAX);
    area.x.saturating_add(offset)
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 18.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(ratatui::widgets::Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  g/G         First/last page"),
        Line::from("  Space       Expand/collapse"),
        Line::from("  l/h, →/←    Expand / collapse"),
        Line::from("  Enter       Open page"),
        Line::from(""),
        Line::from("Pages:"),
        Line::from("  n           New root page"),
        Line::from("  c           New child page"),
        Line::from("  r           Rename page"),
        Line::from("  d           Delete page"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}
