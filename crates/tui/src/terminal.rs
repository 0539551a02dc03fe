use std::io::stdout;

use anyhow::Result;
use crossterm::{
    cursor::SetCursorStyle,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

pub struct TerminalGuard {
    pub terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        install_panic_hook();
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableBracketedPaste,
            SetCursorStyle::SteadyBar
        )?;
        let backend = CrosstermBackend::new(out);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

fn restore() {
    let _ = execute!(
        stdout(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        SetCursorStyle::DefaultUserShape
    );
    let _ = disable_raw_mode();
}

/// Puts the terminal back before the default hook prints the panic.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        tracing::error!(target: "tui", "panic: {}", info);
        previous(info);
    }));
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            SetCursorStyle::DefaultUserShape
        );
        let _ = self.terminal.show_cursor();
        let _ = disable_raw_mode();
    }
}
