//! Console printer with ANSI color support.
//!
//! Human-facing run output goes through here rather than the log macros so
//! it stays visible at the default log filter.

/// Colors available for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
    White,
    BoldRed,
    BoldGreen,
    BoldYellow,
    BoldBlue,
    BoldCyan,
    BoldWhite,
}

impl PrinterColor {
    /// SGR parameters: bold flag plus foreground color code.
    fn sgr(self) -> (bool, u8) {
        match self {
            Self::Red => (false, 31),
            Self::Green => (false, 32),
            Self::Yellow => (false, 33),
            Self::Blue => (false, 34),
            Self::Cyan => (false, 36),
            Self::White => (false, 37),
            Self::BoldRed => (true, 31),
            Self::BoldGreen => (true, 32),
            Self::BoldYellow => (true, 33),
            Self::BoldBlue => (true, 34),
            Self::BoldCyan => (true, 36),
            Self::BoldWhite => (true, 37),
        }
    }

    /// Wrap `text` in the escape sequence for this color.
    pub fn paint(self, text: &str) -> String {
        let (bold, code) = self.sgr();
        if bold {
            format!("\x1b[1;{}m{}\x1b[0m", code, text)
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }
}

/// Printer for console output with color support.
#[derive(Debug, Clone, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Self
    }

    /// Print one line in the given color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        println!("{}", color.paint(content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_with_color_and_reset() {
        assert_eq!(PrinterColor::Red.paint("x"), "\x1b[31mx\x1b[0m");
        assert_eq!(PrinterColor::BoldCyan.paint("x"), "\x1b[1;36mx\x1b[0m");
    }
}
