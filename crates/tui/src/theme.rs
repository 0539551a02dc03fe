use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub border_focus: Color,
    pub border_inactive: Color,
    pub header: Color,
    pub user: Color,
    pub assistant: Color,
    pub system: Color,
    pub streaming: Color,
    pub help: Color,
    pub tokens: Color,
    pub error: Color,
    pub match_info: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
}

pub const THEME: Theme = Theme {
    border_focus: Color::Cyan,
    border_inactive: Color::DarkGray,
    header: Color::LightBlue,
    user: Color::Cyan,
    assistant: Color::LightMagenta,
    system: Color::Yellow,
    streaming: Color::LightBlue,
    help: Color::DarkGray,
    tokens: Color::Gray,
    error: Color::LightRed,
    match_info: Color::Gray,
    selected_fg: Color::Black,
    selected_bg: Color::Cyan,
};

/// Group and item color for a provider key.
pub fn provider_color(provider: &str) -> Color {
    match provider {
        "anthropic" => Color::Blue,
        "google" => Color::Green,
        "openai" => Color::Magenta,
        "meta" => Color::Yellow,
        "mistral" => Color::Red,
        _ => Color::White,
    }
}

pub fn label(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn selected() -> Style {
    Style::default()
        .fg(THEME.selected_fg)
        .bg(THEME.selected_bg)
        .add_modifier(Modifier::BOLD)
}
