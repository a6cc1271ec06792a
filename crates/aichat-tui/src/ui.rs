use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use aichat_core::ChatRole;

use crate::app::App;

/// Split `**bold**` runs into styled spans; an unclosed marker stays literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        plain.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("**") {
            // `****` has nothing to embolden; keep it and carry on
            Some(0) => {
                plain.push_str("****");
                rest = &after[2..];
            }
            Some(end) => {
                if !plain.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut plain)));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            None => {
                plain.push_str("**");
                rest = after;
                break;
            }
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let dispatcher = app.controller.dispatcher();
    let title = Line::from(vec![
        Span::styled(" AIChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{}: {} ", app.provider.display_name(), dispatcher.model()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Transcript text with wrapping but no block, so `line_count` sees
/// exactly the rows that end up inside the border
fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let transcript = app.controller.transcript();
    let text = if transcript.is_empty() && !app.is_busy() {
        Text::from(Span::styled(
            "Say something to start the conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();

        for msg in transcript.messages() {
            match msg.role() {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content().lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content().lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.is_busy() {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    Paragraph::new(text).wrap(Wrap { trim: false })
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    // Count rows with the same wrapping the render uses
    let chat = chat_paragraph(app);
    let lines = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    app.set_chat_metrics(lines, inner_height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat history ");

    frame.render_widget(chat.block(block).scroll((app.chat_scroll, 0)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.is_busy();
    let (border_color, title) = if busy {
        (Color::DarkGray, " Your message (waiting for reply) ")
    } else {
        (Color::Cyan, " Your message ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll so the cursor stays inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(if busy { Color::DarkGray } else { Color::White }))
        .block(block);
    frame.render_widget(input, area);

    let cursor_x = (app.cursor - scroll_offset).min(inner_width) as u16;
    frame.set_cursor_position((
        area.x.saturating_add(cursor_x).saturating_add(1),
        area.y.saturating_add(1),
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    if let Some(elapsed) = app.controller.elapsed() {
        spans.push(Span::styled(
            format!(" waiting {}s ", elapsed.as_secs()),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(notice) = app.notice {
        spans.push(Span::styled(format!(" {} ", notice), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn span_texts(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(span_texts(&line), vec!["a ", "b", " c"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("2 ** 3");
        assert_eq!(span_texts(&line), vec!["2 ** 3"]);
    }

    #[test]
    fn test_markdown_empty_marker_keeps_scanning() {
        let line = parse_markdown_line("**** then **bold**");
        assert_eq!(span_texts(&line), vec!["**** then ", "bold"]);
        assert!(!line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_plain_and_empty() {
        assert_eq!(span_texts(&parse_markdown_line("plain")), vec!["plain"]);
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[tokio::test]
    async fn test_wrapped_reply_tail_stays_visible() {
        let (mut app, _) = test_app(Some(
            "one two three four five six seven eight nine ten eleven twelve thirteen LASTWORD",
        ));
        let mut terminal = Terminal::new(TestBackend::new(14, 10)).unwrap();

        app.input = "hi".to_string();
        app.cursor = 2;
        app.send();
        let reply = app.controller.next_reply().await.unwrap();
        app.receive(reply);

        for _ in 0..3 {
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }

        assert!(app.chat_lines > app.chat_height);
        assert_eq!(app.chat_scroll, app.max_scroll());
        assert!(screen_text(&terminal).contains("LASTWORD"));
    }

    #[tokio::test]
    async fn test_cursor_stays_inside_narrow_input() {
        let (mut app, _) = test_app(None);
        app.input = "a fairly long draft message".to_string();
        app.cursor = app.input.chars().count();

        for width in [2u16, 6] {
            let mut terminal = Terminal::new(TestBackend::new(width, 10)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();

            let position = terminal.get_cursor_position().unwrap();
            assert!(position.x < width, "cursor at {} with width {}", position.x, width);
        }
    }
}
