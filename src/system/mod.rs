/// System module: operator console and terminal interaction

pub mod console;

pub use console::{format_bytes, format_duration, Console};

use std::io::{self, BufRead, IsTerminal, Write};

/// True when stdin is attached to an interactive terminal.
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Wait for the operator to press Enter after a failure.
///
/// Returns `Ok(false)` without reading when stdin is not a terminal, so CI
/// runs and piped invocations never hang.
pub fn pause_for_acknowledgment() -> io::Result<bool> {
    if !stdin_is_terminal() {
        log::debug!("[System] stdin is not a terminal, skipping pause");
        return Ok(false);
    }
    wait_for_enter(&mut io::stdin().lock(), &mut io::stderr())?;
    Ok(true)
}

fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, prompt: &mut W) -> io::Result<()> {
    write!(prompt, "\nPress Enter to exit...")?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}
