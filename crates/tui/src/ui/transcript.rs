use std::time::Duration;

use luke_core::llm::Role;
use ratatui::{
    style::Style,
    text::{Line, Span},
};
use textwrap::wrap;
use tracing::debug;

use crate::app::chat::TranscriptEntry;
use crate::app::App;
use crate::markdown::MarkdownRender;
use crate::strings::{
    token_usage, using_model, HELP_EMPTY, LABEL_ASSISTANT, LABEL_SYSTEM, LABEL_USER, THINKING,
};
use crate::theme::{label, THEME};

const GLYPH_PERIOD_MS: u128 = 150;

fn glyphs_for(model: &str) -> &'static [&'static str] {
    if model.contains("claude") {
        &["✨", "💫", "✨", "🔮", "✨", "💫"]
    } else if model.contains("gemini") {
        &["🌈", "✨", "🌟", "✨", "🌈", "✨"]
    } else if model.contains("gpt") {
        &["🤖", "✨", "💬", "✨", "🤖", "✨"]
    } else if model.contains("llama") {
        &["🦙", "✨", "🦙", "✨", "🦙", "✨"]
    } else if model.contains("mistral") {
        &["🌬", "✨", "❄", "✨", "🌬", "✨"]
    } else {
        &["✨", "💫", "✨", "💫", "✨", "💫"]
    }
}

/// Text of the in-flight pseudo-message at wall-clock time `clock`.
pub fn streaming_text(buffer: &str, model: &str, clock: Duration) -> String {
    let glyphs = glyphs_for(model);
    let idx = (clock.as_millis() / GLYPH_PERIOD_MS) as usize % glyphs.len();
    let glyph = glyphs[idx];
    if buffer.is_empty() {
        format!("{}{} {}", THINKING, ".".repeat(idx % 3 + 1), glyph)
    } else {
        format!("{} {}", buffer, glyph)
    }
}

fn push_plain(text: &str, width: usize, style: Style, out: &mut Vec<Line<'static>>) {
    for line in text.split('\n') {
        if line.is_empty() {
            out.push(Line::default());
            continue;
        }
        for piece in wrap(line, width) {
            out.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
    }
}

/// Every line of the chat pane, top to bottom, for an inner width of `width`.
pub fn transcript_lines(
    app: &App,
    width: u16,
    clock: Duration,
    md: &dyn MarkdownRender,
) -> Vec<Line<'static>> {
    let w = width.max(1) as usize;
    let mut out: Vec<Line<'static>> = vec![
        Line::from(Span::styled(using_model(&app.selected_model), label(THEME.header))),
        Line::default(),
    ];

    let streaming = app.stream.as_ref().map(|s| s.buffer.as_str());
    let entries = app.conversation.transcript(streaming);
    if entries.is_empty() {
        for help in HELP_EMPTY {
            push_plain(help, w, Style::default().fg(THEME.help), &mut out);
        }
    }

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push(Line::default());
        }
        match entry {
            TranscriptEntry::Committed(msg) => match msg.role {
                Role::User => {
                    out.push(Line::from(Span::styled(LABEL_USER, label(THEME.user))));
                    push_plain(&msg.content, w, Style::default(), &mut out);
                }
                Role::Assistant => {
                    out.push(Line::from(Span::styled(LABEL_ASSISTANT, label(THEME.assistant))));
                    match md.render(&msg.content, width) {
                        Ok(lines) => out.extend(lines),
                        Err(e) => {
                            debug!(target: "tui", "markdown fallback: {}", e);
                            push_plain(&msg.content, w, Style::default(), &mut out);
                        }
                    }
                }
                Role::System => {
                    out.push(Line::from(Span::styled(LABEL_SYSTEM, label(THEME.system))));
                    push_plain(&msg.content, w, Style::default().fg(THEME.system), &mut out);
                }
            },
            TranscriptEntry::Streaming(buffer) => {
                out.push(Line::from(Span::styled(LABEL_ASSISTANT, label(THEME.assistant))));
                let text = streaming_text(buffer, &app.selected_model, clock);
                push_plain(&text, w, Style::default().fg(THEME.streaming), &mut out);
            }
        }
    }

    if let Some(u) = app.usage {
        out.push(Line::default());
        out.push(Line::from(Span::styled(
            token_usage(u.prompt, u.completion, u.total()),
            Style::default().fg(THEME.tokens),
        )));
    }
    out
}

/// First line to show so that `scroll` lines sit below the viewport.
pub fn top_offset(total: usize, viewport: usize, scroll: u16) -> usize {
    let max_top = total.saturating_sub(viewport);
    max_top.saturating_sub(scroll as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stream::{StreamState, Usage};
    use crate::config::SessionConfig;
    use crate::markdown::{MarkdownError, TermMarkdown};
    use luke_core::llm::Message;
    use std::time::Instant;

    struct Broken;

    impl MarkdownRender for Broken {
        fn render(&self, _: &str, _: u16) -> Result<Vec<Line<'static>>, MarkdownError> {
            Err(MarkdownError::ZeroWidth)
        }
    }

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn app() -> App {
        App::new(SessionConfig::default(), None, None)
    }

    #[test]
    fn empty_session_shows_header_and_help() {
        let a = app();
        let lines = text(&transcript_lines(&a, 200, Duration::ZERO, &TermMarkdown));
        assert_eq!(lines[0], "Using model: anthropic/claude-3.7-sonnet");
        assert_eq!(lines[2], HELP_EMPTY[0]);
        assert!(!lines.iter().any(|l| l.contains("You are Claude")));
    }

    #[test]
    fn committed_messages_and_usage_footer() {
        let mut a = app();
        a.conversation.push(Message::user("hello"));
        a.conversation.push(Message::assistant("**hi** there"));
        a.usage = Some(Usage { prompt: 3, completion: 4 });
        let lines = text(&transcript_lines(&a, 80, Duration::ZERO, &TermMarkdown));
        assert_eq!(
            &lines[2..],
            &["You:", "hello", "", "AI:", "hi there", "", "Tokens: 3 prompt + 4 completion = 7 total"]
        );
    }

    #[test]
    fn markdown_failure_falls_back_to_raw_text() {
        let mut a = app();
        a.conversation.push(Message::assistant("**raw**"));
        let lines = text(&transcript_lines(&a, 80, Duration::ZERO, &Broken));
        assert_eq!(lines.last().map(String::as_str), Some("**raw**"));
    }

    #[test]
    fn streaming_entry_is_animated() {
        let mut a = app();
        a.conversation.push(Message::user("hello"));
        a.stream = Some(StreamState::begin(1, Instant::now()));
        let lines = text(&transcript_lines(&a, 80, Duration::ZERO, &TermMarkdown));
        assert_eq!(lines.last().map(String::as_str), Some("Thinking. ✨"));

        a.stream.as_mut().unwrap().buffer = "hi th".into();
        let lines = text(&transcript_lines(&a, 80, Duration::from_millis(150), &TermMarkdown));
        assert_eq!(lines.last().map(String::as_str), Some("hi th 💫"));
    }

    #[test]
    fn glyph_cycle_depends_on_model_and_time() {
        assert_eq!(streaming_text("", "openai/gpt-4o", Duration::from_millis(300)), "Thinking... 💬");
        assert_eq!(streaming_text("x", "meta/llama-3", Duration::from_millis(149)), "x 🦙");
        assert_eq!(streaming_text("x", "other/thing", Duration::from_millis(900)), "x ✨");
    }

    #[test]
    fn offset_counts_from_the_bottom() {
        assert_eq!(top_offset(100, 20, 0), 80);
        assert_eq!(top_offset(100, 20, 30), 50);
        assert_eq!(top_offset(100, 20, 500), 0);
        assert_eq!(top_offset(5, 20, 3), 0);
    }
}
