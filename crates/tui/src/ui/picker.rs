use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::app::catalog::{display_name, group_by_provider, provider_of, ModelCatalog};
use crate::app::picker::PickerState;
use crate::strings::{
    match_count, search_prompt, PICKER_HINT, PICKER_NO_MATCHES, PICKER_SEARCH_HINT, PICKER_TITLE,
};
use crate::theme::{label, provider_color, selected, THEME};

pub struct PickerView {
    pub lines: Vec<Line<'static>>,
    /// Line holding the highlighted model, if any is listed.
    pub cursor_line: Option<usize>,
}

fn item(name: &str, provider: &str, is_selected: bool) -> Line<'static> {
    if is_selected {
        Line::from(vec![
            Span::raw(" → "),
            Span::styled(name.to_string(), selected()),
            Span::raw(" ←"),
        ])
    } else {
        Line::from(Span::styled(
            format!("   {}", name),
            Style::default().fg(provider_color(provider)),
        ))
    }
}

/// Flat list while a query is active, provider groups otherwise. The
/// highlight follows `filtered[selected]` in both layouts.
pub fn picker_lines(picker: &PickerState, catalog: &ModelCatalog) -> PickerView {
    let mut lines: Vec<Line<'static>> = Vec::new();
    if picker.searching {
        lines.push(Line::from(Span::styled(search_prompt(&picker.query), label(THEME.header))));
        lines.push(Line::from(PICKER_SEARCH_HINT));
    } else {
        lines.push(Line::from(Span::styled(PICKER_TITLE, label(THEME.header))));
        lines.push(Line::from(PICKER_HINT));
    }
    lines.push(Line::default());

    if !picker.query.is_empty() {
        lines.push(Line::from(Span::styled(
            match_count(picker.filtered.len(), catalog.len(), &picker.query),
            Style::default()
                .fg(THEME.match_info)
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
    }

    if picker.filtered.is_empty() {
        lines.push(Line::from(Span::styled(
            PICKER_NO_MATCHES,
            Style::default().fg(THEME.error),
        )));
        return PickerView {
            lines,
            cursor_line: None,
        };
    }

    let highlighted = picker.highlighted();
    let mut cursor_line = None;
    if !picker.query.is_empty() {
        for (i, id) in picker.filtered.iter().enumerate() {
            if i == picker.selected {
                cursor_line = Some(lines.len());
            }
            lines.push(item(id, provider_of(id), i == picker.selected));
        }
    } else {
        for group in group_by_provider(&picker.filtered) {
            lines.push(Line::from(Span::styled(
                group.provider.to_uppercase(),
                label(provider_color(group.provider)).add_modifier(Modifier::UNDERLINED),
            )));
            for id in group.models {
                let is_selected = Some(id) == highlighted;
                if is_selected {
                    cursor_line = Some(lines.len());
                }
                lines.push(item(display_name(id), group.provider, is_selected));
            }
        }
    }
    PickerView { lines, cursor_line }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(view: &PickerView) -> Vec<String> {
        view.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn catalog() -> ModelCatalog {
        ModelCatalog::from_ids([
            "openai/gpt-4o",
            "anthropic/claude-3.7-sonnet",
            "openai/gpt-3.5-turbo",
            "standalone",
        ])
    }

    #[test]
    fn grouped_view_sorts_providers_and_marks_selection() {
        let c = catalog();
        let p = PickerState::open(&c, "openai/gpt-3.5-turbo");
        let view = picker_lines(&p, &c);
        assert_eq!(
            text(&view)[3..],
            [
                "ANTHROPIC",
                "   claude-3.7-sonnet",
                "OPENAI",
                "   gpt-4o",
                " → gpt-3.5-turbo ←",
                "OTHER",
                "   standalone",
            ]
        );
        assert_eq!(view.cursor_line, Some(7));
    }

    #[test]
    fn down_keys_walk_the_grouped_view_top_to_bottom() {
        let c = ModelCatalog::builtin();
        let mut p = PickerState::open(&c, "google/gemini-1.5-flash");
        let mut lines = vec![picker_lines(&p, &c).cursor_line.unwrap()];
        for _ in 0..6 {
            p.move_by(1);
            lines.push(picker_lines(&p, &c).cursor_line.unwrap());
        }
        assert!(lines.windows(2).all(|w| w[0] < w[1]), "cursor lines {:?}", lines);
        assert_eq!(p.highlighted(), Some("openai/gpt-3.5-turbo"));
    }

    #[test]
    fn search_view_is_flat_with_count() {
        let c = catalog();
        let mut p = PickerState::open(&c, "openai/gpt-4o");
        p.enter_search(&c);
        for ch in "gpt".chars() {
            p.push_char(ch, &c);
        }
        let view = picker_lines(&p, &c);
        let lines = text(&view);
        assert_eq!(lines[0], "Search Models: 'gpt_'");
        assert_eq!(lines[3], "Showing 2/4 models matching 'gpt'");
        assert_eq!(&lines[5..], &[" → openai/gpt-4o ←", "   openai/gpt-3.5-turbo"]);
        assert_eq!(view.cursor_line, Some(5));
    }

    #[test]
    fn no_matches_message() {
        let c = catalog();
        let mut p = PickerState::open(&c, "openai/gpt-4o");
        p.enter_search(&c);
        p.push_char('z', &c);
        let view = picker_lines(&p, &c);
        assert_eq!(text(&view).last().map(String::as_str), Some(PICKER_NO_MATCHES));
        assert_eq!(view.cursor_line, None);
    }
}
