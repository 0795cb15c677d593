//! Console output abstraction for the shell.
//!
//! The `ShellConsole` trait lets the same shell write to a real terminal
//! (`StdConsole`) or into memory for tests (`BufferConsole`).

use std::io::Write;

use crossterm::style::{style, Stylize};

/// Line-oriented output sink for the shell.
pub trait ShellConsole: Send {
    /// Write a line of normal output.
    fn print(&mut self, text: &str);

    /// Write a warning line (refused access, no-op navigation).
    fn warn(&mut self, text: &str);

    /// Write an error line.
    fn error(&mut self, text: &str);

    /// Show the prompt before reading a line. Default is a no-op.
    fn prompt(&mut self, _text: &str) {}
}

/// Console writing to stdout, optionally coloured.
pub struct StdConsole {
    color: bool,
}

impl StdConsole {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl ShellConsole for StdConsole {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn warn(&mut self, text: &str) {
        if self.color {
            println!("{}", style(text).yellow());
        } else {
            println!("{text}");
        }
    }

    fn error(&mut self, text: &str) {
        if self.color {
            println!("{}", style(text).red());
        } else {
            println!("{text}");
        }
    }

    fn prompt(&mut self, text: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if self.color {
            let _ = write!(handle, "{}", style(text).bold());
        } else {
            let _ = write!(handle, "{text}");
        }
        let _ = handle.flush();
    }
}

/// Console for testing - captures every line in memory.
#[derive(Default)]
pub struct BufferConsole {
    lines: Vec<String>,
    errors: usize,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines, warnings and errors included.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Captured output joined with newlines.
    pub fn output_string(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of error lines written.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.errors = 0;
    }
}

impl ShellConsole for BufferConsole {
    fn print(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn warn(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn error(&mut self, text: &str) {
        self.errors += 1;
        self.lines.push(text.to_string());
    }
}
