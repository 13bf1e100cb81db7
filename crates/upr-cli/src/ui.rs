//! ANSI color helpers for terminal output.

use std::io::IsTerminal;
use std::sync::OnceLock;

static COLOR: OnceLock<bool> = OnceLock::new();

pub fn init(quiet: bool) {
    let enabled = std::io::stdout().is_terminal()
        && !quiet
        && std::env::var_os("NO_COLOR").is_none();
    let _ = COLOR.set(enabled);
}

fn paint(code: &str, text: &str) -> String {
    if COLOR.get().copied().unwrap_or(false) {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

#[must_use]
pub fn ok(text: &str) -> String {
    paint("32", text)
}

#[must_use]
pub fn warn(text: &str) -> String {
    paint("33", text)
}

#[must_use]
pub fn fail(text: &str) -> String {
    paint("1;31", text)
}
