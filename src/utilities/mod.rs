//! Shared console and string utilities.

pub mod logger;
pub mod printer;
pub mod string_utils;

pub use logger::Logger;
pub use printer::{Printer, PrinterColor};
pub use string_utils::{interpolate_lenient, interpolate_only, sanitize_tool_name};
