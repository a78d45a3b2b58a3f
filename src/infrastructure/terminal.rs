//! Terminal detection for color mode.

use std::io::IsTerminal;

/// Whether standard error, where the setup helpers write, is a terminal.
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Whether standard input is attached to a terminal, i.e. the process was
/// started interactively.
pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// Whether color sequences are likely to be rendered.
///
/// True when either standard error or standard input is a terminal and
/// `NO_COLOR` is unset or empty.
pub fn is_terminal() -> bool {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    !no_color && (stderr_is_terminal() || stdin_is_terminal())
}
