//! Recognizes price check commands in game log lines
//!
//! A typical line: `[Fri Oct 16 10:00:00 2026] You say, '!pc Cloak of Flames'`

use crate::constants::{COMMAND_DELIMITER, COMMAND_MARKER, LOG_PREFIX_WIDTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParser {
    marker: String,
    delimiter: char,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(COMMAND_MARKER)
    }
}

impl CommandParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            delimiter: COMMAND_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Extracts the command argument from `line`, if it carries one
    pub fn parse<'a>(&self, line: &'a str) -> Option<&'a str> {
        let body = strip_header(line);
        let start = body.find(self.marker.as_str())? + self.marker.len();
        let rest = &body[start..];

        // `!pcx` is not `!pc`
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let argument = match rest.find(self.delimiter) {
            Some(end) => &rest[..end],
            None => rest,
        }
        .trim();

        (!argument.is_empty()).then_some(argument)
    }
}

/// Drops the fixed-width `[Ddd Mmm DD HH:MM:SS YYYY] ` header when present
fn strip_header(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() >= LOG_PREFIX_WIDTH
        && bytes[0] == b'['
        && bytes[LOG_PREFIX_WIDTH - 2] == b']'
    {
        line.get(LOG_PREFIX_WIDTH..).unwrap_or(line)
    } else {
        line
    }
}
