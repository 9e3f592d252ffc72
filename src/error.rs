//! Error types shared by the reader, tokenizer, parser and writer.
//!
//! The core only ever fails in two ways: an I/O failure bubbling up
//! from the underlying source/sink, or a syntax failure detected at a precise
//! source position. Both are plain structs with hand-written `Display`.

use std::fmt::{Display, Formatter};

/// A one-based line and zero-based column into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A syntax violation detected while reading, tokenizing or parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    pub fn expected(position: Position, what: impl Display) -> Self {
        Self::new(position, format!("Expected {}", what))
    }

    pub fn unexpected(position: Position, what: impl Display) -> Self {
        Self::new(position, format!("Unexpected {}", what))
    }

    pub fn illegal_token(position: Position, text: impl Display) -> Self {
        Self::new(position, format!("Illegal token `{}`", text))
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {} at {}", self.message, self.position)
    }
}

impl std::error::Error for SyntaxError {}

/// The two failure kinds a parse or write can end in.
#[derive(Debug)]
pub enum DjsError {
    Io(std::io::Error),
    Syntax(SyntaxError),
}

impl From<std::io::Error> for DjsError {
    fn from(err: std::io::Error) -> Self {
        DjsError::Io(err)
    }
}

impl From<SyntaxError> for DjsError {
    fn from(err: SyntaxError) -> Self {
        DjsError::Syntax(err)
    }
}

impl Display for DjsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DjsError::Io(err) => write!(f, "I/O error: {}", err),
            DjsError::Syntax(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DjsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DjsError::Io(err) => Some(err),
            DjsError::Syntax(err) => Some(err),
        }
    }
}

impl DjsError {
    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            DjsError::Syntax(err) => Some(err),
            DjsError::Io(_) => None,
        }
    }
}

pub type DjsResult<T> = Result<T, DjsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_expected_message_with_position() {
        let err = SyntaxError::expected(Position::new(3, 7), "'}'");
        assert_eq!(err.to_string(), "SyntaxError: Expected '}' at 3:7");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: DjsError = io_err.into();
        assert!(matches!(err, DjsError::Io(_)));
        assert!(err.as_syntax().is_none());
    }
}
