use serde::{Deserialize, Serialize};
use std::fmt;

/// A tokenizer or parser failure, carrying the byte offset into the
/// source expression where it was detected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseError {
    pub pos: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: usize, message: impl Into<String>) -> Self {
        ParseError {
            pos,
            message: message.into(),
        }
    }

    pub fn lex(pos: usize, ch: char) -> Self {
        ParseError::new(pos, format!("unrecognized character '{}'", ch))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at position {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for ParseError {}
