//! Terminal setup and teardown.

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

/// Terminal type used across the app.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode and the alternate screen.
pub fn init_terminal() -> Result<Tui> {
    // A panic must not leave the shell in raw mode.
    install_panic_hook();
    // Key presses arrive immediately, without line buffering.
    enable_raw_mode()?;
    // Draw on the alternate screen so the shell history survives.
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Build the ratatui terminal over crossterm.
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

/// Leave the alternate screen and raw mode.
pub fn restore_terminal() -> Result<()> {
    // Back to cooked mode.
    disable_raw_mode()?;
    // Return to the original screen.
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Restore the terminal before the default panic message is printed.
fn install_panic_hook() {
    // Chain to the existing hook so the panic message still prints.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Best effort; the panic is reported either way.
        let _ = restore_terminal();
        tracing::error!("panic: {info}");
        default_hook(info);
    }));
}
