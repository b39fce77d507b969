use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::conversation::{Body, Role};

/// The input box grows with its draft up to this many text rows.
const MAX_INPUT_ROWS: u16 = 6;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Chat on top, input box pinned underneath
    let input_rows = input_height(&app.input, area.width.saturating_sub(2));
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(input_rows + 2),
    ])
    .areas(area);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);

    if let Some(message) = app.alert.clone() {
        render_alert(frame, area, &message);
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.bot_name));

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let lines = if app.conversation.is_empty() {
        vec![Line::from(Span::styled(
            "No messages yet. Ask anything.".to_string(),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        chat_lines(app)
    };

    // The same rows drive both the widget and the scroll arithmetic, so the
    // offset always lands on a row the terminal actually shows.
    let rows = wrap_spans(&lines, inner_width);
    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    let offset = app.scroll.begin_frame(total, inner_height);

    let chat = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((offset, 0));

    frame.render_widget(chat, area);
}

fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for message in app.conversation.messages() {
        lines.push(name_line(message.role, &message.name));
        match &message.body {
            Body::Plain(text) => {
                for line in text.split('\n') {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Body::Rich { rendered, .. } => {
                lines.extend(rendered.lines.iter().cloned());
            }
        }
        lines.push(Line::default());
    }

    if let Some(notice) = app.conversation.typing() {
        lines.push(name_line(Role::Bot, &notice.name));
        lines.push(Line::from(Span::styled(
            notice.shown.clone(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
    }

    lines
}

fn name_line(role: Role, name: &str) -> Line<'static> {
    let color = match role {
        Role::User => Color::Cyan,
        Role::System | Role::Bot => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{name}:"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Wraps styled lines into rows no wider than the pane, breaking after the
/// last space that fits and mid-word only when a word exceeds the width.
/// Character count stands in for display width.
fn wrap_spans(lines: &[Line<'static>], width: u16) -> Vec<Line<'static>> {
    let width = (width as usize).max(1);
    let mut rows: Vec<Line<'static>> = Vec::new();
    for line in lines {
        let chars: Vec<(char, Style)> = line
            .spans
            .iter()
            .flat_map(|span| span.content.chars().map(move |c| (c, span.style)))
            .collect();
        if chars.is_empty() {
            rows.push(Line::default());
            continue;
        }
        let mut start = 0;
        while start < chars.len() {
            let remaining = chars.len() - start;
            let take = if remaining <= width {
                remaining
            } else {
                chars[start..start + width]
                    .iter()
                    .rposition(|(c, _)| *c == ' ')
                    .map(|pos| pos + 1)
                    .unwrap_or(width)
            };
            rows.push(row_from_chars(&chars[start..start + take]));
            start += take;
        }
    }
    rows
}

/// Rebuilds a row from styled characters, merging runs that share a style.
fn row_from_chars(chars: &[(char, Style)]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    for (c, style) in chars {
        match spans.last_mut() {
            Some(span) if span.style == *style => span.content.to_mut().push(*c),
            _ => spans.push(Span::styled(c.to_string(), *style)),
        }
    }
    Line::from(spans)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (border_color, title) = if app.in_flight {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (Color::Yellow, " Message (Enter to send, Shift+Enter for newline) ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;

    if app.input.is_empty() {
        let hint = Paragraph::new(app.greeting.as_str())
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, area);
        if app.alert.is_none() {
            frame.set_cursor_position((area.x + 1, area.y + 1));
        }
        return;
    }

    // Keep the cursor's row visible when the draft outgrows the box.
    let (row, col) = cursor_position(&app.input, app.input_cursor, inner_width);
    let max_row = area.height.saturating_sub(3);
    let scroll_rows = row.saturating_sub(max_row);

    let input = Paragraph::new(Text::from(wrap_chars(&app.input, inner_width)))
        .block(block)
        .style(Style::default().fg(Color::Cyan))
        .scroll((scroll_rows, 0));
    frame.render_widget(input, area);

    if app.alert.is_none() {
        frame.set_cursor_position((area.x + 1 + col, area.y + 1 + row.min(max_row)));
    }
}

/// Splits the draft into display rows, hard-wrapped at the box width so the
/// cursor arithmetic in `cursor_position` matches what is on screen.
fn wrap_chars(input: &str, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows: Vec<Line<'static>> = Vec::new();
    for line in input.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        let row_count = chars.len() / width + 1;
        for row in 0..row_count {
            let start = row * width;
            let end = ((row + 1) * width).min(chars.len());
            rows.push(Line::from(chars[start..end].iter().collect::<String>()));
        }
    }
    rows
}

/// Maps the char-index cursor to a (row, column) inside the input box.
fn cursor_position(input: &str, cursor: usize, width: usize) -> (u16, u16) {
    let width = width.max(1);
    let mut remaining = cursor;
    let mut row = 0usize;
    for line in input.split('\n') {
        let len = line.chars().count();
        if remaining <= len {
            return ((row + remaining / width) as u16, (remaining % width) as u16);
        }
        remaining -= len + 1;
        row += len / width + 1;
    }
    (row as u16, 0)
}

/// Rows of text the input box needs for the draft, between one row and
/// `MAX_INPUT_ROWS`.
fn input_height(input: &str, width: u16) -> u16 {
    let width = (width as usize).max(1);
    let rows: usize = input
        .split('\n')
        .map(|line| line.chars().count() / width + 1)
        .sum();
    (rows as u16).clamp(1, MAX_INPUT_ROWS)
}

fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let text_width = popup_width.saturating_sub(2).max(1);
    // One spare row because word wrapping is looser than this estimate.
    let text_rows = (message.chars().count() / text_width as usize + 2) as u16;
    // Message rows plus a blank line, the dismiss hint, and the borders.
    let popup_height = (text_rows + 4).min(area.height.saturating_sub(4));

    let popup = Rect::new(
        area.x + area.width.saturating_sub(popup_width) / 2,
        area.y + area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height,
    );

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Something went wrong ");

    let body = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let alert = Paragraph::new(body).block(block).wrap(Wrap { trim: false });
    frame.render_widget(alert, popup);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_height_grows_with_newlines_and_caps() {
        assert_eq!(input_height("", 40), 1);
        assert_eq!(input_height("hello", 40), 1);
        assert_eq!(input_height("a\nb\nc", 40), 3);
        assert_eq!(input_height("a\nb\nc\nd\ne\nf\ng\nh", 40), MAX_INPUT_ROWS);
    }

    #[test]
    fn cursor_position_tracks_newlines() {
        assert_eq!(cursor_position("ab\ncd", 0, 40), (0, 0));
        assert_eq!(cursor_position("ab\ncd", 2, 40), (0, 2));
        assert_eq!(cursor_position("ab\ncd", 3, 40), (1, 0));
        assert_eq!(cursor_position("ab\ncd", 5, 40), (1, 2));
    }

    #[test]
    fn cursor_position_wraps_long_lines() {
        let input = "abcdefghij";
        assert_eq!(cursor_position(input, 4, 4), (1, 0));
        assert_eq!(cursor_position(input, 10, 4), (2, 2));
    }

    #[test]
    fn wrap_chars_matches_the_height_estimate() {
        let input = "abcdefghij\nxy";
        let rows = wrap_chars(input, 4);
        assert_eq!(rows.len() as u16, input_height(input, 4));
    }

    #[test]
    fn wrap_spans_keeps_an_exact_width_line_on_one_row() {
        let rows = wrap_spans(&[Line::from("abcd")], 4);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].spans[0].content.as_ref(), "abcd");
    }

    #[test]
    fn wrap_spans_breaks_prose_at_word_boundaries() {
        let rows = wrap_spans(&[Line::from("aaaaa aaaaa aaaaa")], 10);
        let flat: Vec<&str> = rows
            .iter()
            .map(|row| row.spans[0].content.as_ref())
            .collect();
        assert_eq!(flat, vec!["aaaaa ", "aaaaa ", "aaaaa"]);
    }

    #[test]
    fn wrap_spans_hard_breaks_unbroken_words() {
        let rows = wrap_spans(&[Line::from("abcdefghij"), Line::from("xy")], 4);
        let flat: Vec<&str> = rows
            .iter()
            .map(|row| row.spans[0].content.as_ref())
            .collect();
        assert_eq!(flat, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn wrap_spans_keeps_styles_across_breaks() {
        let styled = Line::from(Span::styled(
            "abcdef".to_string(),
            Style::default().fg(Color::Cyan),
        ));
        let rows = wrap_spans(&[styled], 4);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].spans[0].content.as_ref(), "ef");
        assert_eq!(rows[1].spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn wrap_spans_preserves_blank_lines() {
        let lines = vec![Line::from("a"), Line::default(), Line::from("b")];
        assert_eq!(wrap_spans(&lines, 10).len(), 3);
    }
}
