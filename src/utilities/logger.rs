//! Verbose-gated console logger with timestamps.
//!
//! Carries the per-agent progress lines an agent prints while working;
//! crate-level diagnostics go through the `log` macros instead.

use chrono::Local;

use crate::utilities::printer::{Printer, PrinterColor};

/// Prints timestamped `[HH:MM:SS][LEVEL]:` lines when verbose mode is on.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    pub verbose: bool,
    printer: Printer,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            printer: Printer::default(),
        }
    }

    /// Print one log line if verbose mode is enabled.
    ///
    /// Without an explicit color the level picks one: errors red, warnings
    /// yellow, everything else bold yellow.
    pub fn log(&self, level: &str, message: &str, color: Option<PrinterColor>) {
        if !self.verbose {
            return;
        }
        let color = color.unwrap_or_else(|| level_color(level));
        let line = format!(
            "[{}][{}]: {}",
            Local::now().format("%H:%M:%S"),
            level.to_uppercase(),
            message
        );
        self.printer.print(&line, color);
    }
}

fn level_color(level: &str) -> PrinterColor {
    match level.to_lowercase().as_str() {
        "error" => PrinterColor::Red,
        "warn" | "warning" => PrinterColor::Yellow,
        _ => PrinterColor::BoldYellow,
    }
}
