//! Markdown to terminal lines, driven by pulldown-cmark events. Inline
//! markup becomes span styles and block structure becomes line prefixes.

use std::mem;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkdownError {
    #[error("cannot render into zero columns")]
    ZeroWidth,
    #[error("code fence opened on line {0} is never closed")]
    UnterminatedFence(usize),
}

pub trait MarkdownRender {
    fn render(&self, text: &str, width: u16) -> Result<Vec<Line<'static>>, MarkdownError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TermMarkdown;

impl MarkdownRender for TermMarkdown {
    fn render(&self, text: &str, width: u16) -> Result<Vec<Line<'static>>, MarkdownError> {
        if width == 0 {
            return Err(MarkdownError::ZeroWidth);
        }
        // The parser closes a dangling fence at end of input; callers want
        // the raw text instead.
        if let Some(line) = unclosed_fence(text) {
            return Err(MarkdownError::UnterminatedFence(line));
        }
        let mut r = Renderer::new(width as usize);
        for event in Parser::new_ext(text, options()) {
            r.event(event);
        }
        Ok(r.finish())
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// 1-based line of a code fence that is opened and never closed.
fn unclosed_fence(text: &str) -> Option<usize> {
    let mut open: Option<(char, usize, usize)> = None;
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start();
        let Some(marker) = line.chars().next().filter(|c| *c == '`' || *c == '~') else {
            continue;
        };
        let run = line.chars().take_while(|c| *c == marker).count();
        if run < 3 {
            continue;
        }
        let tail = &line[run..];
        match open {
            None if marker == '`' && tail.contains('`') => {}
            None => open = Some((marker, run, idx + 1)),
            Some((m, len, _)) if m == marker && run >= len && tail.trim().is_empty() => open = None,
            Some(_) => {}
        }
    }
    open.map(|(_, _, line)| line)
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    if level == HeadingLevel::H1 {
        style.add_modifier(Modifier::UNDERLINED)
    } else {
        style
    }
}

#[derive(Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

struct ListLevel {
    kind: ListKind,
    /// Width of the current item's marker; continuation lines hang under it.
    hang: usize,
}

struct Renderer {
    width: usize,
    out: Vec<Line<'static>>,
    /// Inline content of the block being built.
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<ListLevel>,
    /// Marker still owed to the first line of the current list item.
    marker: Option<String>,
    quote_depth: usize,
    in_code: bool,
    /// Destination and start span of each open link.
    links: Vec<(String, usize)>,
    table_cell: usize,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            out: Vec::new(),
            spans: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            marker: None,
            quote_depth: 0,
            in_code: false,
            links: Vec::new(),
            table_cell: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(t) if self.in_code => self.code_lines(&t),
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => self.text(t.into_string(), self.style()),
            Event::Code(t) => {
                let style = self.style().fg(Color::Yellow);
                self.text(t.into_string(), style);
            }
            Event::SoftBreak => self.text(" ".to_string(), self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.gap();
                self.out.push(Line::from(Span::styled(
                    "─".repeat(self.width),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Event::TaskListMarker(done) => {
                let mark = if done { "[x] " } else { "[ ] " };
                self.text(mark.to_string(), self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::HtmlBlock => self.gap(),
            Tag::Heading { level, .. } => {
                self.gap();
                self.styles.push(heading_style(level));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.gap();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.gap();
                self.in_code = true;
                if let CodeBlockKind::Fenced(info) = kind {
                    if let Some(lang) = info.split_whitespace().next() {
                        let line = format!("{}  [{}]", self.indent(), lang);
                        self.out
                            .push(Line::from(Span::styled(line, Style::default().fg(Color::DarkGray))));
                    }
                }
            }
            Tag::List(start) => {
                self.flush();
                if self.lists.is_empty() {
                    self.gap();
                }
                let kind = start.map_or(ListKind::Bullet, ListKind::Ordered);
                self.lists.push(ListLevel { kind, hang: 0 });
            }
            Tag::Item => {
                self.flush();
                if let Some(level) = self.lists.last_mut() {
                    let marker = match &mut level.kind {
                        ListKind::Bullet => "• ".to_string(),
                        ListKind::Ordered(n) => {
                            let m = format!("{}. ", n);
                            *n += 1;
                            m
                        }
                    };
                    level.hang = marker.width();
                    self.marker = Some(marker);
                }
            }
            Tag::Emphasis => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.styles.push(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push((dest_url.into_string(), self.spans.len()));
                self.styles
                    .push(Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Tag::Table(_) => {
                self.flush();
                self.gap();
            }
            Tag::TableHead => {
                self.table_cell = 0;
                self.styles.push(Style::default().add_modifier(Modifier::BOLD));
            }
            Tag::TableRow => self.table_cell = 0,
            Tag::TableCell => {
                if self.table_cell > 0 {
                    self.text(" │ ".to_string(), Style::default().fg(Color::DarkGray));
                }
                self.table_cell += 1;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock | TagEnd::Item | TagEnd::TableRow => self.flush(),
            TagEnd::Heading(_) | TagEnd::TableHead => {
                self.flush();
                self.styles.pop();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => self.in_code = false,
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link | TagEnd::Image => {
                self.styles.pop();
                if let Some((url, from)) = self.links.pop() {
                    let label: String = self.spans[from.min(self.spans.len())..]
                        .iter()
                        .map(|s| s.content.as_ref())
                        .collect();
                    if !url.is_empty() && label != url {
                        self.text(format!(" ({})", url), Style::default().fg(Color::DarkGray));
                    }
                }
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        let base = if self.quote_depth > 0 {
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)
        } else {
            Style::default()
        };
        self.styles.iter().fold(base, |acc, s| acc.patch(*s))
    }

    fn text(&mut self, text: String, style: Style) {
        self.spans.push(Span::styled(text, style));
    }

    fn quote_prefix(&self) -> String {
        "│ ".repeat(self.quote_depth)
    }

    /// Leading columns for lines that continue the current block.
    fn indent(&self) -> String {
        let hang: usize = self.lists.iter().map(|l| l.hang).sum();
        format!("{}{}", self.quote_prefix(), " ".repeat(hang))
    }

    /// Code is never rewrapped.
    fn code_lines(&mut self, text: &str) {
        let indent = self.indent();
        for line in text.lines() {
            self.out.push(Line::from(Span::styled(
                format!("{}  {}", indent, line),
                Style::default().fg(Color::Green),
            )));
        }
    }

    /// Blank separator before a top-level block.
    fn gap(&mut self) {
        if !self.lists.is_empty() {
            return;
        }
        let last_blank = self.out.last().map_or(true, |l| {
            l.spans
                .iter()
                .all(|s| s.content.trim_matches(|c: char| c.is_whitespace() || c == '│').is_empty())
        });
        if !last_blank {
            let bar = self.quote_prefix();
            self.out.push(Line::from(bar.trim_end().to_string()));
        }
    }

    /// Wraps the pending inline content into `out`.
    fn flush(&mut self) {
        if self.spans.is_empty() && self.marker.is_none() {
            return;
        }
        let spans = mem::take(&mut self.spans);
        let rest = self.indent();
        let first = match self.marker.take() {
            Some(marker) => {
                let inner: usize = self.lists.iter().map(|l| l.hang).sum::<usize>()
                    - self.lists.last().map_or(0, |l| l.hang);
                format!("{}{}{}", self.quote_prefix(), " ".repeat(inner), marker)
            }
            None => rest.clone(),
        };
        let prefix_style = if self.quote_depth > 0 {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let mut wrap = Wrapper::new(self.width, &first, rest, prefix_style);
        for span in spans {
            wrap.push(span);
        }
        self.out.extend(wrap.finish());
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self
            .out
            .last()
            .is_some_and(|l| l.spans.iter().all(|s| s.content.trim().is_empty()))
        {
            self.out.pop();
        }
        self.out
    }
}

/// Greedy word wrap over styled spans. Whitespace runs collapse to a single
/// space; a word wider than the line is split by display width.
struct Wrapper {
    width: usize,
    rest: String,
    prefix_style: Style,
    lines: Vec<Line<'static>>,
    line: Vec<Span<'static>>,
    col: usize,
    /// No word placed on `line` yet.
    empty: bool,
    space: Option<Style>,
    word: Vec<Span<'static>>,
    word_width: usize,
}

impl Wrapper {
    fn new(width: usize, first: &str, rest: String, prefix_style: Style) -> Self {
        let mut line = Vec::new();
        if !first.is_empty() {
            line.push(Span::styled(first.to_string(), prefix_style));
        }
        Self {
            width,
            rest,
            prefix_style,
            lines: Vec::new(),
            line,
            col: first.width(),
            empty: true,
            space: None,
            word: Vec::new(),
            word_width: 0,
        }
    }

    fn push(&mut self, span: Span<'static>) {
        let style = span.style;
        let mut text = span.content.as_ref();
        while !text.is_empty() {
            let trimmed = text.trim_start();
            if trimmed.len() < text.len() {
                self.end_word();
                if !self.empty {
                    self.space = Some(style);
                }
                text = trimmed;
                continue;
            }
            let end = text.find(char::is_whitespace).unwrap_or(text.len());
            self.word.push(Span::styled(text[..end].to_string(), style));
            self.word_width += text[..end].width();
            text = &text[end..];
        }
    }

    fn end_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = mem::take(&mut self.word);
        let width = mem::take(&mut self.word_width);
        let space = self.space.take().filter(|_| !self.empty);
        let gap = usize::from(space.is_some());
        if !self.empty && self.col + gap + width > self.width {
            self.break_line();
        } else if let Some(style) = space {
            self.line.push(Span::styled(" ", style));
            self.col += 1;
        }
        if self.col + width <= self.width {
            self.line.extend(word);
            self.col += width;
            self.empty = false;
            return;
        }
        for span in word {
            let mut buf = String::new();
            for ch in span.content.chars() {
                let cw = ch.width().unwrap_or(0);
                if self.col + cw > self.width && (!self.empty || !buf.is_empty()) {
                    if !buf.is_empty() {
                        self.line.push(Span::styled(mem::take(&mut buf), span.style));
                    }
                    self.break_line();
                }
                buf.push(ch);
                self.col += cw;
            }
            if !buf.is_empty() {
                self.line.push(Span::styled(buf, span.style));
                self.empty = false;
            }
        }
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(mem::take(&mut self.line)));
        if !self.rest.is_empty() {
            self.line.push(Span::styled(self.rest.clone(), self.prefix_style));
        }
        self.col = self.rest.width();
        self.empty = true;
        self.space = None;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.end_word();
        if !self.empty || self.lines.is_empty() {
            self.lines.push(Line::from(self.line));
        }
        self.lines
    }
}
