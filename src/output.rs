//! Terminal output for the particraft CLI.
//!
//! Status lines go to stderr with a right-aligned coloured verb, the way
//! cargo prints them. Stdout carries only machine-readable output (`ids`,
//! `completions`).

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::diagnostics::Diagnostic;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

const VERB_WIDTH: usize = 12;

/// Status printer for stderr. Colour is on when stderr is a terminal.
pub struct Printer {
    color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    /// A printer that never emits escape codes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// e.g. "   Exporting 12 assets (casio-cg)"
    pub fn status(&self, verb: &str, message: &str) {
        self.print_line(GREEN, verb, message);
    }

    pub fn info(&self, verb: &str, message: &str) {
        self.print_line(CYAN, verb, message);
    }

    pub fn warning(&self, verb: &str, message: &str) {
        self.print_line(YELLOW, verb, message);
    }

    pub fn error(&self, verb: &str, message: &str) {
        self.print_line(RED, verb, message);
    }

    /// Print a skipped-asset diagnostic, with its help on a dim second line.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        self.print_line(YELLOW, "Skipped", &self.format_diagnostic(diagnostic));
        if let Some(help) = &diagnostic.help {
            self.print_line(DIM, "", &self.dim(&format!("help: {}", help)));
        }
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        format!(
            "{} {} {}",
            self.bold(&diagnostic.asset),
            diagnostic.message,
            self.dim(&format!("[{}]", diagnostic.code))
        )
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    /// Paths and identifiers.
    pub fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn print_line(&self, color: &str, verb: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        if self.color {
            let _ = writeln!(stderr, "{BOLD}{color}{verb:>VERB_WIDTH$}{RESET} {message}");
        } else {
            let _ = writeln!(stderr, "{verb:>VERB_WIDTH$} {message}");
        }
    }
}

/// `plural(1, "asset", "assets")` is "1 asset".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, pluralized)
    }
}

/// Path relative to the working directory when it is inside it.
pub fn display_path(path: &Path) -> String {
    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(relative) = path.strip_prefix(&cwd) {
            let s = relative.display().to_string();
            return if s.is_empty() { ".".to_string() } else { s };
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "asset", "assets"), "1 asset");
        assert_eq!(plural(0, "asset", "assets"), "0 assets");
        assert_eq!(plural(3, "glyph", "glyphs"), "3 glyphs");
    }

    #[test]
    fn test_display_path_outside_cwd() {
        let p = Path::new("/nonexistent/build/uuid.json");
        assert_eq!(display_path(p), "/nonexistent/build/uuid.json");
    }

    #[test]
    fn test_display_path_cwd_is_dot() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(display_path(&cwd), ".");
    }

    #[test]
    fn test_plain_printer_formats_without_escapes() {
        let printer = Printer::plain();
        let d = Diagnostic::warning("particraft::export::missing-source", "img/a.png", "Missing file");
        assert_eq!(
            printer.format_diagnostic(&d),
            "img/a.png Missing file [particraft::export::missing-source]"
        );
        assert_eq!(printer.cyan("x"), "x");
    }
}
