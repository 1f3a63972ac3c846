//! Error types for UCL decoding and encoding
//!
//! Every layer returns the first error it encounters and stops. Lexical and
//! structural errors carry the 1-based input line on which they were detected.

use std::fmt;
use thiserror::Error;

/// Main error type for UCL operations
#[derive(Debug, Error)]
pub enum UclError {
    /// Lexical analysis error
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Encoding error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Serde (typed extraction) error
    #[error("Serde error: {0}")]
    Serde(#[from] SerdeError),

    /// I/O error from the underlying reader or writer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UclError {
    /// Returns the input line of a lexical or structural error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            UclError::Lex(e) => Some(e.line()),
            UclError::Parse(e) => Some(e.line()),
            _ => None,
        }
    }

    /// Returns true if decoding stopped because the input ended too early
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, UclError::Lex(LexError::UnexpectedEndOfInput { .. }))
    }
}

/// Lexical analysis errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// `]` or `}` closing a scope of the other kind, or no scope at all
    #[error("misplaced '{closer}' at line {line}")]
    MisplacedCloser { closer: char, line: usize },

    /// `,` outside of an array scope
    #[error("unexpected ',' outside of an array at line {line}")]
    MisplacedComma { line: usize },

    /// `=` or `:` that does not follow a quoted key
    #[error("unexpected '{separator}' at line {line}")]
    UnexpectedSeparator { separator: char, line: usize },

    /// Character that is not allowed in the current state
    #[error("unexpected character '{character}' at line {line}")]
    UnexpectedCharacter { character: char, line: usize },

    /// Quoted content that cannot be unescaped
    #[error("invalid escape sequence '\\{sequence}' at line {line}")]
    InvalidEscape { sequence: String, line: usize },

    /// Token bytes that are not valid UTF-8
    #[error("invalid UTF-8 sequence at line {line}")]
    InvalidUtf8 { line: usize },

    /// Input ended inside an open scope, quote, comment or heredoc
    #[error("unexpected end of input at line {line}")]
    UnexpectedEndOfInput { line: usize },
}

impl LexError {
    /// Returns the line where the error was detected
    pub fn line(&self) -> usize {
        match self {
            LexError::MisplacedCloser { line, .. }
            | LexError::MisplacedComma { line }
            | LexError::UnexpectedSeparator { line, .. }
            | LexError::UnexpectedCharacter { line, .. }
            | LexError::InvalidEscape { line, .. }
            | LexError::InvalidUtf8 { line }
            | LexError::UnexpectedEndOfInput { line } => *line,
        }
    }

    /// Replaces the line number, used when an error is raised by a helper
    /// that does not know where it is in the input
    pub(crate) fn at_line(mut self, at: usize) -> Self {
        match &mut self {
            LexError::MisplacedCloser { line, .. }
            | LexError::MisplacedComma { line }
            | LexError::UnexpectedSeparator { line, .. }
            | LexError::UnexpectedCharacter { line, .. }
            | LexError::InvalidEscape { line, .. }
            | LexError::InvalidUtf8 { line }
            | LexError::UnexpectedEndOfInput { line } => *line = at,
        }
        self
    }
}

/// Structural errors raised by the parser
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token that is invalid in its grammatical position
    #[error("unexpected {token} at line {line}, expected {expected}")]
    UnexpectedToken {
        token: String,
        expected: String,
        line: usize,
    },

    /// Maximum nesting depth exceeded
    #[error("maximum nesting depth exceeded at line {line}")]
    MaxDepthExceeded { line: usize },
}

impl ParseError {
    /// Returns the line where the error was detected
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. } | ParseError::MaxDepthExceeded { line } => {
                *line
            }
        }
    }
}

/// Encoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Map entry keyed by something other than a string
    #[error("map key must be a string, found {found}")]
    KeyMustBeAString { found: &'static str },

    /// Error reported by a record's field table
    #[error("{0}")]
    Custom(String),
}

impl EncodeError {
    /// Creates a custom error from any displayable message
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        EncodeError::Custom(msg.to_string())
    }
}

/// Typed extraction errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerdeError {
    /// Custom serde error message
    #[error("{0}")]
    Custom(String),

    /// Stored value cannot be interpreted as the requested type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl serde::de::Error for UclError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        UclError::Serde(SerdeError::Custom(msg.to_string()))
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_line() {
        let err = LexError::MisplacedCloser {
            closer: ']',
            line: 7,
        };
        assert_eq!(err.line(), 7);
        assert_eq!(err.to_string(), "misplaced ']' at line 7");
    }

    #[test]
    fn test_lex_error_at_line() {
        let err = LexError::InvalidEscape {
            sequence: "q".to_string(),
            line: 0,
        }
        .at_line(12);
        assert_eq!(err.line(), 12);
    }

    #[test]
    fn test_ucl_error_line() {
        let err: UclError = ParseError::MaxDepthExceeded { line: 3 }.into();
        assert_eq!(err.line(), Some(3));

        let err: UclError = EncodeError::custom("boom").into();
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "Encode error: boom");
    }

    #[test]
    fn test_unexpected_eof_classification() {
        let err: UclError = LexError::UnexpectedEndOfInput { line: 2 }.into();
        assert!(err.is_unexpected_eof());

        let err: UclError = LexError::MisplacedComma { line: 2 }.into();
        assert!(!err.is_unexpected_eof());
    }
}
