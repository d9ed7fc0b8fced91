//! Parser Types and Constants
//!
//! Shared error type and guard limits used across parser modules.

use std::fmt;
use thiserror::Error;

// Guards against pathological input. Parsing is recursive descent, so both
// total size and nesting depth are bounded.
pub const MAX_INPUT_SIZE: usize = 1_000_000;
pub const MAX_PARSER_DEPTH: usize = 200;

/// Error raised on unexpected tokens or malformed constructs.
#[derive(Debug, Clone, Error)]
pub struct ParseException {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}:{}: {}", self.line, self.column, self.message)
    }
}

impl ParseException {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self { message: message.into(), line, column }
    }

    pub fn expected(expected: &str, got: &str, line: usize, column: usize) -> Self {
        Self::new(format!("expected {}, got {}", expected, got), line, column)
    }
}
