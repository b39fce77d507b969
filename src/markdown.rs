use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Renders a markdown reply into styled terminal text.
///
/// Raw HTML events are dropped rather than rendered, so nothing
/// script-shaped in a reply ever reaches the view. Links keep their text,
/// styled, but the destination URL is not shown.
pub fn render(source: &str) -> Text<'static> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(source, options);

    let mut renderer = Renderer::default();
    for event in parser {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    bold: u8,
    italic: u8,
    strike: u8,
    link: u8,
    quote: u8,
    heading: bool,
    code_block: bool,
    code_buf: String,
    lists: Vec<Option<u64>>,
}

impl Renderer {
    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.code_block {
                    self.code_buf.push_str(&text);
                } else {
                    let style = self.style();
                    self.spans.push(Span::styled(text.to_string(), style));
                }
            }
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.spans.push(Span::styled(code.to_string(), style));
            }
            Event::SoftBreak | Event::HardBreak => {
                self.flush_line();
                self.line_prefix();
            }
            Event::Rule => {
                self.flush_pending();
                self.lines.push(Line::from(Span::styled(
                    "────────".to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
                self.lines.push(Line::default());
            }
            // Raw HTML never reaches the view.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => self.line_prefix(),
            Tag::Heading { level, .. } => {
                self.heading = true;
                let marker = "#".repeat(level as usize);
                self.spans.push(Span::styled(
                    format!("{marker} "),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ));
            }
            Tag::BlockQuote(_) => self.quote += 1,
            Tag::CodeBlock(_) => {
                self.flush_pending();
                self.code_block = true;
                self.code_buf.clear();
            }
            Tag::List(start) => {
                self.flush_pending();
                self.lists.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{indent}{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.spans.push(Span::raw(marker));
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { .. } => self.link += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.end_block(),
            TagEnd::Heading(_) => {
                self.heading = false;
                self.end_block();
            }
            TagEnd::BlockQuote => self.quote = self.quote.saturating_sub(1),
            TagEnd::CodeBlock => {
                self.code_block = false;
                for line in self.code_buf.lines() {
                    self.lines.push(Line::from(Span::styled(
                        format!("  {line}"),
                        Style::default().fg(Color::Gray),
                    )));
                }
                self.code_buf.clear();
                self.lines.push(Line::default());
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.flush_pending();
                    self.lines.push(Line::default());
                }
            }
            TagEnd::Item => self.flush_pending(),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => self.link = self.link.saturating_sub(1),
            _ => {}
        }
    }

    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.heading {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.link > 0 {
            style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
        }
        if self.quote > 0 {
            style = style.add_modifier(Modifier::DIM);
        }
        style
    }

    fn line_prefix(&mut self) {
        if self.quote > 0 {
            self.spans.push(Span::styled(
                "> ".to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    /// Closes the current line unconditionally.
    fn flush_line(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    /// Closes the current line only if it has content.
    fn flush_pending(&mut self) {
        if !self.spans.is_empty() {
            self.flush_line();
        }
    }

    /// Ends a block element: close the line and leave a blank one after it.
    fn end_block(&mut self) {
        self.flush_pending();
        self.lines.push(Line::default());
    }

    fn finish(mut self) -> Text<'static> {
        self.flush_pending();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(text: &Text) -> String {
        text.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn bold_text_gets_the_bold_modifier() {
        let text = render("**hi**");
        assert_eq!(text.lines.len(), 1);
        let span = &text.lines[0].spans[0];
        assert_eq!(span.content.as_ref(), "hi");
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn script_markup_is_dropped() {
        let text = render("<script>alert('x')</script>");
        assert!(!flatten(&text).contains("<script"));

        let text = render("stay <script>alert('x')</script> safe");
        let flat = flatten(&text);
        assert!(flat.contains("stay"));
        assert!(!flat.contains("<script"));
    }

    #[test]
    fn soft_breaks_split_lines() {
        let text = render("line one\nline two");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(flatten(&text), "line one\nline two");
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        let text = render("a\n\nb");
        assert_eq!(text.lines.len(), 3);
        assert!(text.lines[1].spans.is_empty());
    }

    #[test]
    fn unordered_lists_use_bullets() {
        let text = render("- a\n- b");
        assert_eq!(flatten(&text), "• a\n• b");
    }

    #[test]
    fn ordered_lists_count_up() {
        let text = render("1. a\n2. b");
        assert_eq!(flatten(&text), "1. a\n2. b");
    }

    #[test]
    fn nested_list_items_stay_on_separate_lines() {
        let text = render("- a\n  - b");
        assert_eq!(flatten(&text), "• a\n  • b");
    }

    #[test]
    fn headings_keep_their_marker() {
        let text = render("## Title");
        let spans = &text.lines[0].spans;
        assert_eq!(spans[0].content.as_ref(), "## ");
        assert_eq!(spans[1].content.as_ref(), "Title");
        assert_eq!(spans[1].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn fenced_code_is_indented_and_dimmed() {
        let text = render("```\nlet x = 1;\n```");
        assert_eq!(flatten(&text), "  let x = 1;");
        assert_eq!(text.lines[0].spans[0].style.fg, Some(Color::Gray));
    }

    #[test]
    fn inline_code_is_highlighted() {
        let text = render("use `let` here");
        let spans = &text.lines[0].spans;
        assert_eq!(spans[1].content.as_ref(), "let");
        assert_eq!(spans[1].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn block_quotes_carry_a_prefix() {
        let text = render("> quoted");
        assert_eq!(flatten(&text), "> quoted");
        assert!(text.lines[0].spans[1]
            .style
            .add_modifier
            .contains(Modifier::DIM));
    }

    #[test]
    fn links_keep_their_text_without_the_url() {
        let text = render("[click](https://example.com)");
        assert_eq!(flatten(&text), "click");
        let span = &text.lines[0].spans[0];
        assert!(span.style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn empty_input_renders_nothing() {
        let text = render("");
        assert!(text.lines.is_empty());
    }
}
