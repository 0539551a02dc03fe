use std::time::{SystemTime, UNIX_EPOCH};

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Mode};
use crate::markdown::MarkdownRender;
use crate::strings::{error_banner, INPUT_HINT, STATUS_HINT, TITLE_CHAT, TITLE_INPUT, TITLE_MODELS};
use crate::theme::{label, THEME};

pub mod picker;
pub mod transcript;

const INPUT_MAX_LINES: u16 = 6;

/// Renders one frame and returns how far the transcript can scroll up.
pub fn draw(f: &mut Frame, app: &App, md: &dyn MarkdownRender) -> u16 {
    let area = f.area();
    let inner_width = area.width.saturating_sub(2);
    let input_lines = measure_total_lines(app.input.text(), inner_width).clamp(1, INPUT_MAX_LINES as usize) as u16;
    let banner_height = if app.last_error.is_some() { 1 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(banner_height),
            Constraint::Length(1),
            Constraint::Length(input_lines + 2),
        ])
        .split(area);

    let scroll_limit = draw_chat(f, chunks[0], app, md);
    if let Some(err) = &app.last_error {
        let banner = Paragraph::new(Line::from(Span::styled(error_banner(err), label(THEME.error))));
        f.render_widget(banner, chunks[1]);
    }
    let hint = Paragraph::new(Line::from(Span::styled(STATUS_HINT, Style::default().fg(THEME.help))));
    f.render_widget(hint, chunks[2]);
    draw_input(f, chunks[3], app, input_lines, inner_width);

    if app.mode() != Mode::Chat {
        draw_picker(f, area, app);
    }
    scroll_limit
}

fn wall_clock() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

fn draw_chat(f: &mut Frame, area: Rect, app: &App, md: &dyn MarkdownRender) -> u16 {
    let block = Block::default()
        .title(TITLE_CHAT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.border_inactive));
    let inner_width = area.width.saturating_sub(2);
    let viewport = area.height.saturating_sub(2) as usize;

    let lines = transcript::transcript_lines(app, inner_width, wall_clock(), md);
    let total = lines.len();
    let top = transcript::top_offset(total, viewport, app.chat_scroll);
    let visible: Vec<Line> = lines.into_iter().skip(top).take(viewport).collect();
    f.render_widget(Paragraph::new(visible).block(block), area);

    let inner = Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    let max_scroll = total.saturating_sub(viewport);
    if max_scroll > 0 {
        let mut sb_state = ScrollbarState::new(max_scroll).position(top);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner, &mut sb_state);
    }
    max_scroll.min(u16::MAX as usize) as u16
}

fn draw_input(f: &mut Frame, area: Rect, app: &App, visible_lines: u16, inner_width: u16) {
    let focused = app.mode() == Mode::Chat;
    let border_style = if focused {
        Style::default().fg(THEME.border_focus)
    } else {
        Style::default().fg(THEME.border_inactive)
    };
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(border_style);
    let graphemes: Vec<&str> = app.input.text().graphemes(true).collect();
    let upto = app.input.cursor().min(graphemes.len());
    let (line_idx, col_width) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let offset_y = line_idx.saturating_sub(visible_lines.saturating_sub(1));

    let para = if app.input.text().is_empty() {
        let hint = Line::from(Span::styled(INPUT_HINT, Style::default().fg(THEME.help)));
        Paragraph::new(hint).block(block)
    } else {
        Paragraph::new(app.input.text().to_string())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset_y, 0))
    };
    f.render_widget(para, area);

    if focused {
        let cursor_x = area.x + 1 + col_width;
        let cursor_y = area.y + 1 + line_idx.saturating_sub(offset_y);
        f.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

fn draw_picker(f: &mut Frame, area: Rect, app: &App) {
    let Some(state) = &app.picker else {
        return;
    };
    let popup = centered_rect(70, 80, area);
    let block = Block::default()
        .title(Span::styled(TITLE_MODELS, label(THEME.header)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.border_focus));
    let view = picker::picker_lines(state, &app.catalog);
    let viewport = popup.height.saturating_sub(2) as usize;
    let scroll = view
        .cursor_line
        .map(|c| c.saturating_sub(viewport.saturating_sub(2)))
        .unwrap_or(0);
    let para = Paragraph::new(view.lines)
        .block(block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(Clear, popup);
    f.render_widget(para, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

fn measure_total_lines(s: &str, width: u16) -> usize {
    if width == 0 {
        return 1;
    }
    let mut lines = 1usize;
    let mut col = 0usize;
    for g in s.graphemes(true) {
        if g == "\n" {
            lines += 1;
            col = 0;
            continue;
        }
        let w = UnicodeWidthStr::width(g);
        if col + w > width as usize {
            lines += 1;
            col = 0;
        }
        col += w;
    }
    lines
}

fn measure_prefix_line_col(graphemes: &[&str], upto: usize, width: u16) -> (u16, u16) {
    if width == 0 {
        return (0, 0);
    }
    let mut line = 0usize;
    let mut col = 0usize;
    for g in graphemes.iter().take(upto) {
        if *g == "\n" {
            line += 1;
            col = 0;
            continue;
        }
        let w = UnicodeWidthStr::width(*g);
        if col + w > width as usize {
            line += 1;
            col = 0;
        }
        col += w;
    }
    (line as u16, col as u16)
}
